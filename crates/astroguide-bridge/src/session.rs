use astroguide_rpc::{StreamResult, TaskSnapshot};

/// Client-owned view of the server-assigned conversation identifiers.
///
/// The server is authoritative: identifiers are only ever adopted from
/// classified results, never invented locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTracker {
    pub current_task_id: Option<String>,
    pub current_context_id: Option<String>,
    pub context_already_sent: bool,
}

impl SessionTracker {
    /// Adopts identifiers from a classified server result. Status updates
    /// and task snapshots both carry them; bare messages do not move the
    /// session.
    pub fn observe(&mut self, result: &StreamResult) {
        match result {
            StreamResult::StatusUpdate(update) => {
                self.current_task_id = Some(update.task_id.clone());
                if let Some(context_id) = update.context_id.as_ref() {
                    self.current_context_id = Some(context_id.clone());
                }
            }
            StreamResult::Task(task) => self.adopt_task(task),
            StreamResult::Message(_) | StreamResult::Unclassified(_) => {}
        }
    }

    pub fn adopt_task(&mut self, task: &TaskSnapshot) {
        self.current_task_id = Some(task.id.clone());
        if let Some(context_id) = task.context_id.as_ref() {
            self.current_context_id = Some(context_id.clone());
        }
    }

    /// Fields to persist once the current operation has completed.
    pub fn checkpoint(&self) -> SessionCheckpoint {
        SessionCheckpoint {
            task_id: self.current_task_id.clone(),
            context_id: self.current_context_id.clone(),
        }
    }
}

/// Persistence payload handed to the caller exactly once per completed
/// operation, in place of storage listeners firing mid-stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCheckpoint {
    pub task_id: Option<String>,
    pub context_id: Option<String>,
}
