//! Local persistence for AstroGuide conversation sessions.
//!
//! Stores the durable anchors of a conversation (its ordered task ids,
//! context id, and bookkeeping metadata) in a JSONL file. Transcript
//! text is never persisted: after a restart the task ids are replayed
//! against the server to rebuild the visible conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod store;

pub use store::JsonlSessionStore;

pub(crate) const SESSION_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `PersistedSession` used across AstroGuide components.
pub struct PersistedSession {
    pub local_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Every task id the server ever assigned to this conversation,
    /// oldest first. The only durable anchor for history restoration.
    #[serde(default)]
    pub task_ids: Vec<String>,
    /// Set when the conversation belongs to one image analysis; the main
    /// free-form conversation has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
}

impl PersistedSession {
    pub fn new(local_id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            local_id: local_id.into(),
            context_id: None,
            title: title.into(),
            created_at: now,
            updated_at: now,
            task_ids: Vec::new(),
            analysis_id: None,
        }
    }

    /// Applies a completed operation's checkpoint: adopts the context id,
    /// records a newly assigned task id, bumps `updated_at`.
    pub fn absorb_completion(
        &mut self,
        task_id: Option<&str>,
        context_id: Option<&str>,
        now: DateTime<Utc>,
    ) {
        if let Some(context_id) = context_id {
            self.context_id = Some(context_id.to_string());
        }
        if let Some(task_id) = task_id {
            if !self.task_ids.iter().any(|known| known == task_id) {
                self.task_ids.push(task_id.to_string());
            }
        }
        self.updated_at = now;
    }
}

/// Storage collaborator consumed by the UI layer. The conversation bridge
/// itself never touches the store; completed operations hand back the
/// fields to persist.
pub trait SessionStore {
    fn get(&self, local_id: &str) -> anyhow::Result<Option<PersistedSession>>;
    fn put(&mut self, session: PersistedSession) -> anyhow::Result<()>;
    fn query_by_analysis_id(&self, analysis_id: &str)
        -> anyhow::Result<Option<PersistedSession>>;
    fn query_latest_main_session(&self) -> anyhow::Result<Option<PersistedSession>>;
}
