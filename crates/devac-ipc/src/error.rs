//! Error taxonomy for IPC methods (spec §7 "Propagation policy": "IPC
//! methods translate each kind to a JSON-RPC error code").

use crate::protocol::{ErrorObject, HUB_NOT_READY, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, OPERATION_FAILED};

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Hub(#[from] devac_hub::HubError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out")]
    Timeout,

    #[error("hub not ready")]
    HubNotReady,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// An error object the server sent back; the client has no way to
    /// recover the original Rust error type, only what crossed the wire.
    #[error("{message} (code {code})")]
    Remote { code: i32, message: String, data: Option<serde_json::Value> },
}

impl IpcError {
    /// Maps this error to the JSON-RPC error object a server sends back,
    /// per spec §7's kind -> code table.
    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            IpcError::MethodNotFound(method) => {
                ErrorObject { code: METHOD_NOT_FOUND, message: format!("unknown method: {method}"), data: None }
            }
            IpcError::InvalidParams(msg) => {
                ErrorObject { code: INVALID_PARAMS, message: msg.clone(), data: None }
            }
            IpcError::Json(e) => {
                ErrorObject { code: INVALID_PARAMS, message: format!("malformed params: {e}"), data: None }
            }
            IpcError::HubNotReady => {
                ErrorObject { code: HUB_NOT_READY, message: "hub is not running".to_string(), data: None }
            }
            IpcError::Timeout => ErrorObject {
                code: INTERNAL_ERROR,
                message: "request timed out".to_string(),
                data: Some(serde_json::json!({"kind": "timeout"})),
            },
            IpcError::ConnectionClosed => ErrorObject {
                code: INTERNAL_ERROR,
                message: "hub connection closed".to_string(),
                data: Some(serde_json::json!({"kind": "io"})),
            },
            IpcError::Io(e) => ErrorObject {
                code: INTERNAL_ERROR,
                message: e.to_string(),
                data: Some(serde_json::json!({"kind": "io"})),
            },
            IpcError::Hub(hub_error) => hub_error_object(hub_error),
            IpcError::Remote { code, message, data } => {
                ErrorObject { code: *code, message: message.clone(), data: data.clone() }
            }
        }
    }
}

/// `Integrity -> OPERATION_FAILED`, `NotFound/Conflict/IO -> INTERNAL_ERROR`
/// with a `data.kind` hint (spec §7's table), applied to the hub's own
/// error kinds since [`devac_hub::HubError`] doesn't carry the taxonomy
/// as a separate field.
fn hub_error_object(err: &devac_hub::HubError) -> ErrorObject {
    match err {
        devac_hub::HubError::UnknownRepo(_) => ErrorObject {
            code: INTERNAL_ERROR,
            message: err.to_string(),
            data: Some(serde_json::json!({"kind": "not_found"})),
        },
        devac_hub::HubError::Store(store_error) => store_error_object(err, store_error),
        devac_hub::HubError::Sql(_) | devac_hub::HubError::Manifest(_) | devac_hub::HubError::Io { .. } => {
            ErrorObject { code: INTERNAL_ERROR, message: err.to_string(), data: Some(serde_json::json!({"kind": "io"})) }
        }
    }
}

fn store_error_object(err: &devac_hub::HubError, store_error: &devac_store::StoreError) -> ErrorObject {
    match store_error {
        devac_store::StoreError::Validation(_) => ErrorObject {
            code: OPERATION_FAILED,
            message: err.to_string(),
            data: Some(serde_json::json!({"kind": "integrity"})),
        },
        devac_store::StoreError::WriteBusy { .. } => ErrorObject {
            code: INTERNAL_ERROR,
            message: err.to_string(),
            data: Some(serde_json::json!({"kind": "conflict"})),
        },
        devac_store::StoreError::Columnar(_) | devac_store::StoreError::BadEntityId(_) | devac_store::StoreError::Io { .. } => {
            ErrorObject { code: INTERNAL_ERROR, message: err.to_string(), data: Some(serde_json::json!({"kind": "io"})) }
        }
    }
}
