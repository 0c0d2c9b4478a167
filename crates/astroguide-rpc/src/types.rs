use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) const MESSAGE_KIND: &str = "message";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Enumerates supported `MessageRole` values.
pub enum MessageRole {
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
/// Enumerates supported message `Part` values.
pub enum Part {
    Text { text: String },
    File { file: FileContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Wire representation of a file part: inline base64 bytes or a linked URI.
pub struct FileContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Client-side attachment handed to the bridge by the UI layer.
pub enum Attachment {
    InlineBytes {
        mime: String,
        name: String,
        bytes: Vec<u8>,
    },
    LinkedResource {
        mime: String,
        name: String,
        uri: String,
    },
}

impl Attachment {
    pub fn to_part(&self) -> Part {
        match self {
            Attachment::InlineBytes { mime, name, bytes } => Part::File {
                file: FileContent {
                    bytes: Some(STANDARD.encode(bytes)),
                    uri: None,
                    mime_type: Some(mime.clone()),
                    name: Some(name.clone()),
                },
            },
            Attachment::LinkedResource { mime, name, uri } => Part::File {
                file: FileContent {
                    bytes: None,
                    uri: Some(uri.clone()),
                    mime_type: Some(mime.clone()),
                    name: Some(name.clone()),
                },
            },
        }
    }

    /// Rebuilds an attachment from a wire file part. Returns `None` for
    /// file parts carrying neither bytes nor a URI, or undecodable bytes.
    pub fn from_file(file: &FileContent) -> Option<Self> {
        let mime = file.mime_type.clone().unwrap_or_default();
        let name = file.name.clone().unwrap_or_default();
        if let Some(encoded) = file.bytes.as_deref() {
            let bytes = STANDARD.decode(encoded).ok()?;
            return Some(Attachment::InlineBytes { mime, name, bytes });
        }
        file.uri.as_ref().map(|uri| Attachment::LinkedResource {
            mime,
            name,
            uri: uri.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Public struct `ChatMessage` used across AstroGuide components.
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default = "default_message_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

fn default_message_kind() -> String {
    MESSAGE_KIND.to_string()
}

impl ChatMessage {
    /// Builds an outbound user message with a fresh `messageId`.
    pub fn user(text: impl Into<String>, attachments: &[Attachment]) -> Self {
        let mut parts = vec![Part::Text { text: text.into() }];
        parts.extend(attachments.iter().map(Attachment::to_part));
        Self {
            role: MessageRole::User,
            parts,
            message_id: Some(Uuid::new_v4().to_string()),
            kind: default_message_kind(),
            context_id: None,
            task_id: None,
        }
    }

    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::File { file } => Attachment::from_file(file),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
/// Enumerates supported `TaskState` values.
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// A finalized task never mutates again on the server.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed | TaskState::Rejected
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Public struct `TaskStatus` used across AstroGuide components.
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Server-side task record: identifier, lifecycle status, artifacts, and
/// the stored message history. Read-only to the client.
pub struct TaskSnapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ChatMessage>>,
}

impl TaskSnapshot {
    pub fn is_final(&self) -> bool {
        self.status.state.is_final()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Public struct `Artifact` used across AstroGuide components.
pub struct Artifact {
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Incremental task status notification from the streaming transport.
pub struct StatusUpdateEvent {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Attachment, ChatMessage, MessageRole, Part, TaskSnapshot, TaskState};

    #[test]
    fn outbound_user_message_carries_kind_and_fresh_message_id() {
        let message = ChatMessage::user("look up", &[]);
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["role"], "user");
        assert_eq!(value["kind"], "message");
        assert_eq!(value["parts"][0]["kind"], "text");
        assert!(value["messageId"].as_str().is_some());
        assert!(value.get("taskId").is_none());
        assert!(value.get("contextId").is_none());

        let other = ChatMessage::user("look up", &[]);
        assert_ne!(message.message_id, other.message_id);
    }

    #[test]
    fn inline_attachment_round_trips_through_a_file_part() {
        let attachment = Attachment::InlineBytes {
            mime: "image/png".to_string(),
            name: "capture.png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };
        let part = attachment.to_part();
        let value = serde_json::to_value(&part).expect("serialize");
        assert_eq!(value["kind"], "file");
        assert_eq!(value["file"]["mimeType"], "image/png");
        assert_eq!(value["file"]["bytes"], "iVBORw==");

        let message = ChatMessage {
            role: MessageRole::User,
            parts: vec![part],
            message_id: None,
            kind: "message".to_string(),
            context_id: None,
            task_id: None,
        };
        assert_eq!(message.attachments(), vec![attachment]);
    }

    #[test]
    fn linked_resource_attachment_maps_to_uri_file_part() {
        let attachment = Attachment::LinkedResource {
            mime: "image/jpeg".to_string(),
            name: "annotated.jpg".to_string(),
            uri: "https://example.com/annotated.jpg".to_string(),
        };
        match attachment.to_part() {
            Part::File { file } => {
                assert_eq!(file.uri.as_deref(), Some("https://example.com/annotated.jpg"));
                assert_eq!(file.bytes, None);
            }
            part => panic!("expected file part, got {part:?}"),
        }
    }

    #[test]
    fn unit_text_content_joins_text_parts_and_skips_files() {
        let message: ChatMessage = serde_json::from_value(json!({
            "role": "agent",
            "parts": [
                {"kind": "text", "text": "That bright point"},
                {"kind": "file", "file": {"uri": "https://example.com/x.png"}},
                {"kind": "text", "text": "is Vega."},
            ],
        }))
        .expect("deserialize");
        assert_eq!(message.text_content(), "That bright point\nis Vega.");
    }

    #[test]
    fn unknown_part_kind_degrades_without_failing_the_message() {
        let message: ChatMessage = serde_json::from_value(json!({
            "role": "agent",
            "parts": [
                {"kind": "data", "data": {"ra": 279.23}},
                {"kind": "text", "text": "ok"},
            ],
        }))
        .expect("deserialize");
        assert_eq!(message.text_content(), "ok");
    }

    #[test]
    fn task_state_decodes_kebab_case_and_tolerates_new_states() {
        assert_eq!(
            serde_json::from_value::<TaskState>(json!("input-required")).expect("state"),
            TaskState::InputRequired
        );
        assert_eq!(
            serde_json::from_value::<TaskState>(json!("some-future-state")).expect("state"),
            TaskState::Unknown
        );
        assert!(TaskState::Completed.is_final());
        assert!(TaskState::Rejected.is_final());
        assert!(!TaskState::Working.is_final());
        assert!(!TaskState::Unknown.is_final());
    }

    #[test]
    fn functional_task_snapshot_decodes_history_and_artifacts() {
        let task: TaskSnapshot = serde_json::from_value(json!({
            "id": "task-1",
            "contextId": "ctx-1",
            "kind": "task",
            "status": {"state": "completed", "timestamp": "2026-03-01T21:04:00Z"},
            "artifacts": [
                {"artifactId": "a-1", "name": "annotated_sky_capture.png",
                 "parts": [{"kind": "file", "file": {"uri": "file:///annotated.png"}}]}
            ],
            "history": [
                {"role": "user", "parts": [{"kind": "text", "text": "What am I seeing?"}],
                 "messageId": "m-1", "kind": "message"}
            ],
        }))
        .expect("deserialize");

        assert!(task.is_final());
        assert_eq!(task.context_id.as_deref(), Some("ctx-1"));
        assert_eq!(task.artifacts.len(), 1);
        let history = task.history.expect("history present");
        assert_eq!(history[0].text_content(), "What am I seeing?");
    }
}
