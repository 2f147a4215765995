//! Builds the [`ClientConfig`] for a run.
//!
//! Values are layered, later sources winning:
//! built-in defaults, an optional YAML file, the `GEOROCKET_HOST` /
//! `GEOROCKET_PORT` environment variables, and finally command-line overrides.
//!
//! Accepted YAML:
//!
//! ```yaml
//! server:
//!   host: localhost
//!   port: 63074
//! buffer_size: 65536
//! ```
use std::env;
use std::fs;
use std::path::Path;

use tracing::{error, info};

use crate::config::ClientConfig;
use crate::error::{ImportError, Result};

pub const HOST_ENV: &str = "GEOROCKET_HOST";
pub const PORT_ENV: &str = "GEOROCKET_PORT";

/// Values given on the command line; `None` keeps whatever the lower layers chose.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Reads a YAML config file. Missing keys fall back to defaults.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ImportError::Config(format!(
                "Failed to read config file {:?}: {}",
                path_ref, e
            )));
        }
    };

    // an empty file deserializes to null, not to a mapping
    if content.trim().is_empty() {
        return Ok(ClientConfig::default());
    }

    match serde_yaml::from_str::<ClientConfig>(&content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(ImportError::Config(format!("Failed to parse config YAML: {e}")))
        }
    }
}

/// Applies `GEOROCKET_HOST` and `GEOROCKET_PORT` if they are set.
pub fn apply_env(config: &mut ClientConfig) -> Result<()> {
    if let Ok(host) = env::var(HOST_ENV) {
        info!(host = %host, "{HOST_ENV} found in env");
        config.server.host = host;
    }
    if let Ok(raw) = env::var(PORT_ENV) {
        config.server.port = raw.parse::<u16>().map_err(|e| {
            error!(error = ?e, raw = %raw, "{PORT_ENV} must be a valid port number");
            ImportError::Config(format!("{PORT_ENV} must be a valid port number: {e}"))
        })?;
    }
    Ok(())
}

/// Resolves the effective configuration from every layer.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => ClientConfig::default(),
    };
    apply_env(&mut config)?;

    if let Some(host) = &overrides.host {
        config.server.host = host.clone();
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
    if config.buffer_size == 0 {
        return Err(ImportError::Config("buffer_size must be greater than 0".into()));
    }

    config.trace_loaded();
    Ok(config)
}
