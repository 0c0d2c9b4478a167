//! JSONL-backed session store with atomic rewrites.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{PersistedSession, SessionStore, SESSION_SCHEMA_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionMetaRecord {
    schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
enum SessionRecord {
    Meta(SessionMetaRecord),
    Session(PersistedSession),
}

#[derive(Debug)]
/// Public struct `JsonlSessionStore` used across AstroGuide components.
pub struct JsonlSessionStore {
    path: PathBuf,
    sessions: Vec<PersistedSession>,
}

impl JsonlSessionStore {
    /// Loads the store, treating a missing file as empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let sessions = read_session_records(&path)?;
        Ok(Self { path, sessions })
    }

    pub fn sessions(&self) -> &[PersistedSession] {
        &self.sessions
    }

    fn persist(&self) -> Result<()> {
        let mut content = String::new();
        let meta = SessionRecord::Meta(SessionMetaRecord {
            schema_version: SESSION_SCHEMA_VERSION,
        });
        content.push_str(&serde_json::to_string(&meta)?);
        content.push('\n');
        for session in &self.sessions {
            let record = SessionRecord::Session(session.clone());
            content.push_str(&serde_json::to_string(&record)?);
            content.push('\n');
        }
        write_text_atomic(&self.path, &content)
    }
}

impl SessionStore for JsonlSessionStore {
    fn get(&self, local_id: &str) -> Result<Option<PersistedSession>> {
        Ok(self
            .sessions
            .iter()
            .find(|session| session.local_id == local_id)
            .cloned())
    }

    fn put(&mut self, session: PersistedSession) -> Result<()> {
        match self
            .sessions
            .iter_mut()
            .find(|existing| existing.local_id == session.local_id)
        {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
        self.persist()
    }

    fn query_by_analysis_id(&self, analysis_id: &str) -> Result<Option<PersistedSession>> {
        Ok(self
            .sessions
            .iter()
            .find(|session| session.analysis_id.as_deref() == Some(analysis_id))
            .cloned())
    }

    fn query_latest_main_session(&self) -> Result<Option<PersistedSession>> {
        Ok(self
            .sessions
            .iter()
            .filter(|session| session.analysis_id.is_none())
            .max_by_key(|session| session.updated_at)
            .cloned())
    }
}

fn read_session_records(path: &Path) -> Result<Vec<PersistedSession>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(path)
        .with_context(|| format!("failed to open session store {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut sessions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line
            .with_context(|| format!("failed to read session store {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: SessionRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid session record at line {}", index + 1))?;
        match record {
            SessionRecord::Meta(meta) => {
                if meta.schema_version != SESSION_SCHEMA_VERSION {
                    bail!(
                        "unsupported session schema version {} (expected {})",
                        meta.schema_version,
                        SESSION_SCHEMA_VERSION
                    );
                }
            }
            SessionRecord::Session(session) => sessions.push(session),
        }
    }
    Ok(sessions)
}

/// Writes via temp file + rename so readers never observe partial data.
fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let temp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("sessions"),
        std::process::id()
    );
    let temp_path = parent.join(temp_name);
    fs::write(&temp_path, content)
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
