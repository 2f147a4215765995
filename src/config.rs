use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 63074;
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Settings for one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    /// Largest chunk read from a file before it is handed to the HTTP body.
    pub buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn trace_loaded(&self) {
        info!(
            host = %self.server.host,
            port = self.server.port,
            buffer_size = self.buffer_size,
            "Loaded ClientConfig"
        );
        debug!(?self, "ClientConfig loaded (full debug)");
    }
}

/// Where the GeoRocket store listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// URL of the endpoint that accepts uploads.
    pub fn store_url(&self) -> String {
        format!("http://{}:{}/store", self.host, self.port)
    }
}
