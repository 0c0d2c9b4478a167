//! JSON-RPC envelope codec and wire data model for the AstroGuide agent
//! protocol.
//!
//! Requests go out as JSON-RPC 2.0 over HTTP POST; streamed replies come
//! back as JSON-RPC response objects inside SSE `data:` payloads. The
//! classifier turns a decoded `result` into one of the closed set of
//! shapes the conversation bridge understands.

mod classify;
mod envelope;
mod types;

pub use classify::{classify_result, StreamResult};
pub use envelope::{
    build_request, message_send_params, new_request_id, parse_reply, task_query_params,
    JsonRpcError, RpcReply, JSONRPC_VERSION, METHOD_MESSAGE_SEND, METHOD_MESSAGE_STREAM,
    METHOD_TASKS_GET,
};
pub use types::{
    Artifact, Attachment, ChatMessage, FileContent, MessageRole, Part, StatusUpdateEvent,
    TaskSnapshot, TaskState, TaskStatus,
};
