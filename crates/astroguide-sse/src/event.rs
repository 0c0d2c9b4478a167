/// One logical server-sent event: optional event name plus the joined
/// `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Groups decoded lines into events terminated by a blank line.
///
/// `event:` sets the current name, `data:` appends the trimmed remainder
/// directly (the producer re-frames mid-payload, so no separator is
/// inserted), comments and `id:`/`retry:` fields are skipped. An event
/// name is optional; only the payload is load-bearing downstream.
#[derive(Debug, Default)]
pub struct EventAssembler {
    event: Option<String>,
    data: String,
}

impl EventAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one decoded line and returns a completed event, if any.
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.take_pending();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(name) = line.strip_prefix("event:") {
            self.event = Some(name.trim().to_string());
            return None;
        }
        if let Some(payload) = line.strip_prefix("data:") {
            self.data.push_str(payload.trim());
            return None;
        }
        // id:, retry:, and malformed lines carry nothing downstream.
        None
    }

    /// Flushes a pending event at clean stream end.
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.take_pending()
    }

    fn take_pending(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            return None;
        }
        Some(SseEvent { event, data })
    }
}
