use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::ChatMessage;

pub const JSONRPC_VERSION: &str = "2.0";
pub const METHOD_MESSAGE_STREAM: &str = "message/stream";
pub const METHOD_MESSAGE_SEND: &str = "message/send";
pub const METHOD_TASKS_GET: &str = "tasks/get";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
/// JSON-RPC error object surfaced by the remote agent.
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
/// Decoded JSON-RPC response: either an untyped `result` payload for the
/// classifier or the server's error object.
pub enum RpcReply {
    Result(Value),
    Error(JsonRpcError),
}

pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a JSON-RPC 2.0 request envelope with a fresh UUID id.
pub fn build_request(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
        "id": new_request_id(),
    })
}

/// Params for `message/stream` and `message/send`.
pub fn message_send_params(message: &ChatMessage) -> Value {
    json!({ "message": message })
}

/// Params for `tasks/get`. History length is left unbounded so the full
/// stored message list comes back for restoration.
pub fn task_query_params(task_id: &str) -> Value {
    json!({ "id": task_id })
}

/// Decodes one JSON-RPC response object. A top-level `error` field wins
/// over any `result`; a missing `result` decodes to `Value::Null` and is
/// left for the classifier to drop.
pub fn parse_reply(raw: &str) -> Result<RpcReply, serde_json::Error> {
    let mut value: Value = serde_json::from_str(raw)?;

    if let Some(error) = value.get_mut("error").filter(|error| !error.is_null()) {
        let error = error.take();
        let reply = match serde_json::from_value::<JsonRpcError>(error.clone()) {
            Ok(parsed) => parsed,
            Err(_) => JsonRpcError {
                code: 0,
                message: error.to_string(),
            },
        };
        return Ok(RpcReply::Error(reply));
    }

    let result = value.get_mut("result").map(Value::take).unwrap_or(Value::Null);
    Ok(RpcReply::Result(result))
}
