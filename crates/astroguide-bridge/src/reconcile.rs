/// Reconciles redundant streamed text into exactly-once deltas.
///
/// The agent transport emits both incremental fragments and periodic
/// re-sends of the full text-so-far for the same logical turn; without
/// this step the transcript would double-render. One reconciler serves
/// one send operation and is discarded with it.
#[derive(Debug, Default)]
pub struct TextReconciler {
    accumulated: String,
}

impl TextReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in one candidate fragment and returns the net-new suffix to
    /// surface, if any.
    ///
    /// Only agent-authored text may be pushed here; user echoes are
    /// filtered by role before this stage.
    pub fn push(&mut self, candidate: &str) -> Option<String> {
        if candidate.is_empty() {
            return None;
        }
        if self.accumulated.is_empty() {
            self.accumulated.push_str(candidate);
            return Some(candidate.to_string());
        }
        if let Some(suffix) = candidate.strip_prefix(self.accumulated.as_str()) {
            // Superseding accumulation: the server re-sent the full text
            // so far, possibly extended.
            if suffix.is_empty() {
                return None;
            }
            let delta = suffix.to_string();
            self.accumulated = candidate.to_string();
            return Some(delta);
        }
        if self.accumulated.ends_with(candidate) {
            // Echo of an earlier partial; already emitted.
            return None;
        }
        // Independent new content.
        self.accumulated.push_str(candidate);
        Some(candidate.to_string())
    }

    /// Full reconciled text for the current operation.
    pub fn text(&self) -> &str {
        &self.accumulated
    }

    pub fn into_text(self) -> String {
        self.accumulated
    }
}
