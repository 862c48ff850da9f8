//! The hub IPC server (spec §4.9 "Server behavior"): one dispatcher per
//! connection, methods executed sequentially per connection so
//! client-visible response order matches request order, writes to the
//! catalog serialized process-wide through the hub's own write-mutex.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devac_hub::Hub;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use crate::dispatch::dispatch;
use crate::error::IpcError;
use crate::protocol::{Request, Response};

/// Owns the listening socket at `<hub_dir>/mcp.sock` and accepts
/// connections until [`IpcServer::run`]'s cancellation token fires.
pub struct IpcServer {
    hub: Arc<Hub>,
    socket_path: PathBuf,
}

impl IpcServer {
    pub fn new(hub: Arc<Hub>, socket_path: impl Into<PathBuf>) -> Self {
        Self { hub, socket_path: socket_path.into() }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Binds the socket (removing a stale file left by a crashed prior
    /// server) and serves connections until `shutdown` resolves.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) -> Result<(), IpcError> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!(socket = %self.socket_path.display(), "hub ipc server listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("hub ipc server shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let hub = self.hub.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(hub, stream).await {
                                    tracing::debug!(error = %e, "ipc connection ended with an error");
                                }
                            });
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to accept ipc connection"),
                    }
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

/// Reads newline-delimited requests from one connection and answers each
/// in turn before reading the next, so responses on this connection are
/// never reordered relative to their requests.
async fn handle_connection(hub: Arc<Hub>, stream: UnixStream) -> Result<(), IpcError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let id = request.id;
                match dispatch(&hub, &request.method, request.params).await {
                    Ok(result) => Response::success(id, result),
                    Err(e) => Response::failure(id, e.to_error_object()),
                }
            }
            Err(e) => {
                // We can't recover the request id from unparseable JSON;
                // respond with id 0 rather than drop the frame silently.
                Response::failure(0, IpcError::Json(e).to_error_object())
            }
        };

        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        write_half.write_all(encoded.as_bytes()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_a_request_and_stops_on_shutdown() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(Hub::init(hub_dir.path(), false).unwrap());
        let socket_path = hub_dir.path().join("mcp.sock");
        let server = IpcServer::new(hub, socket_path.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server_task = tokio::spawn(async move {
            server.run(async { let _ = shutdown_rx.await; }).await.unwrap();
        });

        // give the listener a moment to bind
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = UnixStream::connect(&socket_path).await.unwrap();
        let request = Request { id: 1, method: "listRepos".to_string(), params: serde_json::json!({}) };
        let mut line = serde_json::to_string(&request).unwrap();
        line.push('\n');
        stream.write_all(line.as_bytes()).await.unwrap();

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line).await.unwrap();
        let response: Response = serde_json::from_str(&response_line).unwrap();
        assert_eq!(response.id, 1);
        assert_eq!(response.result, Some(serde_json::json!([])));

        let _ = shutdown_tx.send(());
        server_task.await.unwrap();
        assert!(!socket_path.exists());
    }
}
