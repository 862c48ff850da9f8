//! The hub IPC client (spec §4.9 "Client behavior"): a short connect
//! timeout against the socket, an optional auto-start hook, and a
//! fall back to direct in-process hub access when neither succeeds.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use devac_hub::{Hub, HubStatus};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::dispatch::dispatch;
use crate::error::IpcError;
use crate::protocol::{Request, Response};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

struct RemoteConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

enum Access {
    Remote(Mutex<RemoteConnection>),
    Local(Arc<Hub>),
}

/// A connected (or locally-falling-back) handle to one hub. `next_id`
/// is shared so ids stay unique even if a caller holds the client
/// across many sequential `call`s.
pub struct IpcClient {
    access: Access,
    request_timeout: Duration,
    next_id: AtomicU64,
}

impl IpcClient {
    /// Tries to connect to `socket_path` within `connect_timeout`. On
    /// refusal, runs `auto_start` (if given) and retries once; if that
    /// also fails, falls back to `fallback` for direct in-process access
    /// — `fallback`'s own write-mutex is the "exclusive write guard"
    /// spec §4.9 calls for in that case.
    pub async fn connect<F, Fut>(
        socket_path: &Path,
        connect_timeout: Duration,
        auto_start: Option<F>,
        fallback: Arc<Hub>,
    ) -> Self
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if let Some(conn) = try_connect(socket_path, connect_timeout).await {
            return Self::remote(conn);
        }
        if let Some(start) = auto_start {
            start().await;
            if let Some(conn) = try_connect(socket_path, connect_timeout).await {
                return Self::remote(conn);
            }
        }
        tracing::info!(socket = %socket_path.display(), "hub unreachable, falling back to in-process access");
        Self { access: Access::Local(fallback), request_timeout: DEFAULT_REQUEST_TIMEOUT, next_id: AtomicU64::new(1) }
    }

    fn remote(stream: UnixStream) -> Self {
        let (read_half, writer) = stream.into_split();
        let conn = RemoteConnection { reader: BufReader::new(read_half), writer };
        Self {
            access: Access::Remote(Mutex::new(conn)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_in_process(&self) -> bool {
        matches!(self.access, Access::Local(_))
    }

    /// Calls `method` with `params` and returns the decoded result,
    /// bounded by the configured request timeout (spec §4.9: "on timeout
    /// the client returns a typed error and the connection is
    /// discarded" — here, the lock is simply dropped and the next call
    /// will hit the broken pipe and surface its own IO error).
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, IpcError> {
        match &self.access {
            Access::Local(hub) => dispatch(hub, method, params).await,
            Access::Remote(conn) => {
                tokio::time::timeout(self.request_timeout, self.call_remote(conn, method, params))
                    .await
                    .map_err(|_| IpcError::Timeout)?
            }
        }
    }

    /// Workspace-wide catalog summary (spec §4.7 "Queries", `getStatus`;
    /// scenario S6). `getStatus` sits outside the IPC closed method set,
    /// so this only ever completes via in-process access — a remote
    /// connection fails fast with [`IpcError::MethodNotFound`] rather
    /// than round-tripping a request the server would reject anyway.
    pub async fn get_status(&self) -> Result<HubStatus, IpcError> {
        match &self.access {
            Access::Local(hub) => hub.get_status().map_err(IpcError::Hub),
            Access::Remote(_) => Err(IpcError::MethodNotFound("getStatus".to_string())),
        }
    }

    async fn call_remote(&self, conn: &Mutex<RemoteConnection>, method: &str, params: Value) -> Result<Value, IpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request { id, method: method.to_string(), params };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let mut guard = conn.lock().await;
        guard.writer.write_all(line.as_bytes()).await?;

        let mut response_line = String::new();
        let n = guard.reader.read_line(&mut response_line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }
        let response: Response = serde_json::from_str(&response_line)?;
        match response.error {
            Some(e) => Err(IpcError::Remote { code: e.code, message: e.message, data: e.data }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }
}

async fn try_connect(socket_path: &Path, connect_timeout: Duration) -> Option<UnixStream> {
    tokio::time::timeout(connect_timeout, UnixStream::connect(socket_path)).await.ok()?.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::IpcServer;

    #[tokio::test]
    async fn falls_back_to_in_process_when_nothing_is_listening() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(Hub::init(hub_dir.path(), false).unwrap());
        let socket_path = hub_dir.path().join("mcp.sock");

        let client = IpcClient::connect::<fn() -> std::future::Ready<()>, _>(
            &socket_path,
            Duration::from_millis(50),
            None,
            hub.clone(),
        )
        .await;

        assert!(client.is_in_process());
        let result = client.call("listRepos", Value::Null).await.unwrap();
        assert_eq!(result, serde_json::json!([]));
    }

    #[tokio::test]
    async fn get_status_completes_in_process_with_no_hub_running_and_leaves_no_socket() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(Hub::init(hub_dir.path(), false).unwrap());
        let socket_path = hub_dir.path().join("mcp.sock");

        let client = IpcClient::connect::<fn() -> std::future::Ready<()>, _>(
            &socket_path,
            Duration::from_millis(50),
            None,
            hub.clone(),
        )
        .await;

        assert!(client.is_in_process());
        let status = client.get_status().await.unwrap();
        assert_eq!(status.repo_count, 0);
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn talks_to_a_running_server_over_the_socket() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(Hub::init(hub_dir.path(), false).unwrap());
        let socket_path = hub_dir.path().join("mcp.sock");

        let server = IpcServer::new(hub.clone(), socket_path.clone());
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server_task = tokio::spawn(async move {
            server
                .run(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = IpcClient::connect::<fn() -> std::future::Ready<()>, _>(
            &socket_path,
            Duration::from_millis(200),
            None,
            hub,
        )
        .await;
        assert!(!client.is_in_process());

        let result = client.call("listRepos", Value::Null).await.unwrap();
        assert_eq!(result, serde_json::json!([]));

        let _ = shutdown_tx.send(());
        server_task.await.unwrap();
    }
}
