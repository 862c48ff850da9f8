//! The hub's IPC surface (spec §4.9, C9): a newline-delimited JSON
//! request/response protocol over a Unix socket, a single-dispatcher-
//! per-connection server, and a client that falls back to direct
//! in-process hub access when no server is reachable.

mod client;
mod dispatch;
mod error;
mod protocol;
mod server;

pub use client::{IpcClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use error::IpcError;
pub use protocol::{ErrorObject, Request, Response, HUB_NOT_READY, INTERNAL_ERROR, INVALID_PARAMS, METHODS, METHOD_NOT_FOUND, OPERATION_FAILED};
pub use server::IpcServer;
