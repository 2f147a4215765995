//! Drives `HttpUploader` against a minimal in-process HTTP/1.1 server.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use georocket_import::config::{ClientConfig, ServerConfig};
use georocket_import::error::UploadError;
use georocket_import::upload::{HttpUploader, Uploader};
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct Received {
    request_line: String,
    content_length: Option<u64>,
    body: Vec<u8>,
}

struct TestServer {
    addr: SocketAddr,
    /// Resolves once one request per status has been received.
    requests: JoinHandle<Vec<Received>>,
    connections: Arc<AtomicUsize>,
}

/// Answers requests with `statuses`, in order, on any number of connections.
async fn serve(statuses: Vec<&'static str>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let expected = statuses.len();
    let statuses = Arc::new(Mutex::new(VecDeque::from(statuses)));
    let connections = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let accepted = Arc::clone(&connections);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            let statuses = Arc::clone(&statuses);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                while let Some(request) = read_request(&mut reader).await {
                    let status = statuses
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or("500 Internal Server Error");
                    let _ = tx.send(request);
                    let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\n\r\n");
                    if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    let requests = tokio::spawn(async move {
        let mut received = Vec::new();
        while received.len() < expected {
            match rx.recv().await {
                Some(request) => received.push(request),
                None => break,
            }
        }
        received
    });

    TestServer {
        addr,
        requests,
        connections,
    }
}

async fn read_request(reader: &mut BufReader<TcpStream>) -> Option<Received> {
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.ok()? == 0 {
        return None;
    }

    let mut content_length = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok();
            }
        }
    }

    let mut body = vec![0; content_length.unwrap_or(0) as usize];
    reader.read_exact(&mut body).await.ok()?;

    Some(Received {
        request_line: request_line.trim_end().to_string(),
        content_length,
        body,
    })
}

fn config_for(addr: SocketAddr, buffer_size: usize) -> ClientConfig {
    ClientConfig {
        server: ServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
        },
        buffer_size,
    }
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn streams_file_with_declared_length_to_store_endpoint() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let path = write_file(dir.path(), "big.gml", &content);

    let server = serve(vec!["202 Accepted"]).await;
    let uploader = HttpUploader::new(&config_for(server.addr, 4096)).unwrap();
    assert_eq!(uploader.url(), format!("http://{}/store", server.addr));

    let sent = uploader.upload(&path).await.expect("upload should be accepted");
    assert_eq!(sent, content.len() as u64);

    let received = server.requests.await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].request_line, "POST /store HTTP/1.1");
    assert_eq!(received[0].content_length, Some(content.len() as u64));
    assert_eq!(received[0].body, content);
}

#[tokio::test]
async fn empty_file_sends_zero_content_length() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "empty.xml", b"");

    let server = serve(vec!["202 Accepted"]).await;
    let uploader = HttpUploader::new(&config_for(server.addr, 1024)).unwrap();

    assert_eq!(uploader.upload(&path).await.unwrap(), 0);

    let received = server.requests.await.unwrap();
    assert_eq!(received[0].content_length, Some(0));
    assert!(received[0].body.is_empty());
}

#[tokio::test]
async fn non_accepted_status_is_a_rejection() {
    let cases = [
        ("200 OK", 200, "OK"),
        ("400 Bad Request", 400, "Bad Request"),
        ("500 Internal Server Error", 500, "Internal Server Error"),
        ("409 Duplicate Chunk Detected", 409, "Duplicate Chunk Detected"),
        ("503 Store Is Rebuilding Its Index", 503, "Store Is Rebuilding Its Index"),
    ];

    for (status_line, expected_code, expected_reason) in cases {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "file.xml", b"<root/>");

        let server = serve(vec![status_line]).await;
        let uploader = HttpUploader::new(&config_for(server.addr, 1024)).unwrap();

        match uploader.upload(&path).await {
            Err(UploadError::RejectedStatus { code, reason }) => {
                assert_eq!(code, expected_code);
                assert_eq!(reason, expected_reason);
                let message = UploadError::RejectedStatus { code, reason }.to_string();
                assert_eq!(
                    message,
                    format!(
                        "GeoRocket did not accept the file (status code {expected_code}: {expected_reason})"
                    )
                );
            }
            other => panic!("{status_line}: expected rejection, got {other:?}"),
        }
        server.requests.await.unwrap();
    }
}

#[tokio::test]
async fn one_uploader_serves_sequential_uploads() {
    let dir = tempdir().unwrap();
    let paths: Vec<_> = ["a.xml", "b.xml", "c.xml"]
        .iter()
        .map(|name| write_file(dir.path(), name, name.as_bytes()))
        .collect();

    let server = serve(vec!["202 Accepted", "202 Accepted", "202 Accepted"]).await;
    let uploader = HttpUploader::new(&config_for(server.addr, 1024)).unwrap();

    for path in &paths {
        uploader.upload(path).await.unwrap();
    }

    let connections = Arc::clone(&server.connections);
    let bodies: Vec<Vec<u8>> = server.requests.await.unwrap().into_iter().map(|r| r.body).collect();
    assert_eq!(bodies, vec![b"a.xml".to_vec(), b"b.xml".to_vec(), b"c.xml".to_vec()]);
    assert_eq!(connections.load(Ordering::SeqCst), 1, "uploads should share one keep-alive connection");
}

#[tokio::test]
async fn missing_file_fails_before_connecting() {
    let dir = tempdir().unwrap();
    let uploader = HttpUploader::new(&config_for("127.0.0.1:9".parse().unwrap(), 1024)).unwrap();

    let missing = dir.path().join("nope.xml");
    match uploader.upload(&missing).await {
        Err(UploadError::FileIo { path, source }) => {
            assert_eq!(path, missing.display().to_string());
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected file error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "file.xml", b"<root/>");

    // reserve a port and release it so nothing listens there
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let uploader = HttpUploader::new(&config_for(addr, 1024)).unwrap();

    assert!(matches!(
        uploader.upload(&path).await,
        Err(UploadError::Transport(_))
    ));
}
