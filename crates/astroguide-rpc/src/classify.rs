use serde_json::Value;

use crate::{ChatMessage, StatusUpdateEvent, TaskSnapshot};

/// Closed set of result shapes the conversation bridge understands.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamResult {
    StatusUpdate(StatusUpdateEvent),
    Task(TaskSnapshot),
    Message(ChatMessage),
    /// Unrecognized payload; dropped by the caller with a diagnostic.
    Unclassified(Value),
}

/// Classifies an untyped decoded `result` payload.
///
/// Discriminators, in order: `kind == "status-update"`; then `status` and
/// `id` both present (a task snapshot); then `role` and `parts` both
/// present (a bare message). A payload matching a discriminator but
/// failing to deserialize degrades to `Unclassified` rather than erroring.
pub fn classify_result(value: Value) -> StreamResult {
    if value.get("kind").and_then(Value::as_str) == Some("status-update") {
        return match serde_json::from_value::<StatusUpdateEvent>(value.clone()) {
            Ok(update) => StreamResult::StatusUpdate(update),
            Err(_) => StreamResult::Unclassified(value),
        };
    }

    if value.get("status").is_some() && value.get("id").is_some() {
        return match serde_json::from_value::<TaskSnapshot>(value.clone()) {
            Ok(task) => StreamResult::Task(task),
            Err(_) => StreamResult::Unclassified(value),
        };
    }

    if value.get("role").is_some() && value.get("parts").is_some() {
        return match serde_json::from_value::<ChatMessage>(value.clone()) {
            Ok(message) => StreamResult::Message(message),
            Err(_) => StreamResult::Unclassified(value),
        };
    }

    StreamResult::Unclassified(value)
}
