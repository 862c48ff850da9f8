//! The wire envelope (spec §4.9, §6 "IPC wire format"): newline-delimited
//! UTF-8 JSON request/response frames over the hub's Unix socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC-style error codes (spec §4.9 "Error codes"). All are negative
/// integers; the system-specific pair extends the standard trio.
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const HUB_NOT_READY: i32 = -32000;
pub const OPERATION_FAILED: i32 = -32001;

/// The closed method set (spec §4.9 "Method set"): an unlisted method
/// name always resolves to [`METHOD_NOT_FOUND`], regardless of whether
/// the hub happens to expose a same-named Rust API (e.g. `analyze` and
/// `getStatus` are deliberately not wired over IPC).
pub const METHODS: &[&str] = &[
    "register",
    "unregister",
    "refresh",
    "refreshAll",
    "pushDiagnostics",
    "clearDiagnostics",
    "resolveDiagnostics",
    "pushValidationErrors",
    "query",
    "listRepos",
    "getRepoStatus",
    "getValidationErrors",
    "getValidationSummary",
    "getValidationCounts",
    "getDiagnostics",
    "getDiagnosticsSummary",
    "getDiagnosticsCounts",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default = "default_params")]
    pub params: Value,
}

fn default_params() -> Value {
    Value::Null
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn failure(id: u64, error: ErrorObject) -> Self {
        Self { id, result: None, error: Some(error) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let req = Request { id: 7, method: "listRepos".to_string(), params: serde_json::json!({}) };
        let encoded = serde_json::to_string(&req).unwrap();
        let decoded: Request = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, req.id);
        assert_eq!(decoded.method, req.method);
    }

    #[test]
    fn success_response_round_trips() {
        let resp = Response::success(3, serde_json::json!({"ok": true}));
        let encoded = serde_json::to_string(&resp).unwrap();
        let decoded: Response = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, 3);
        assert_eq!(decoded.result, Some(serde_json::json!({"ok": true})));
        assert!(decoded.error.is_none());
    }

    #[test]
    fn error_response_preserves_code_message_and_data() {
        let resp = Response::failure(
            9,
            ErrorObject { code: METHOD_NOT_FOUND, message: "no such method".to_string(), data: None },
        );
        let encoded = serde_json::to_string(&resp).unwrap();
        let decoded: Response = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, 9);
        assert!(decoded.result.is_none());
        let error = decoded.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "no such method");
    }

    #[test]
    fn request_defaults_missing_params_to_null() {
        let decoded: Request = serde_json::from_str(r#"{"id":1,"method":"listRepos"}"#).unwrap();
        assert_eq!(decoded.params, Value::Null);
    }
}
