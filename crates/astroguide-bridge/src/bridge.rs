use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use astroguide_rpc::{
    build_request, classify_result, message_send_params, parse_reply, task_query_params,
    Attachment, ChatMessage, MessageRole, RpcReply, StreamResult, TaskSnapshot,
    METHOD_MESSAGE_SEND, METHOD_MESSAGE_STREAM, METHOD_TASKS_GET,
};
use astroguide_sse::{EventAssembler, FrameDecoder};

use crate::error::BridgeError;
use crate::history::{merge_task_histories, TranscriptEntry};
use crate::reconcile::TextReconciler;
use crate::session::{SessionCheckpoint, SessionTracker};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Callback invoked with each net-new text delta during a streaming send.
pub type DeltaHandler = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone)]
/// Public struct `BridgeConfig` used across AstroGuide components.
pub struct BridgeConfig {
    /// JSON-RPC endpoint of the remote agent.
    pub endpoint: String,
    pub request_timeout_ms: u64,
    /// `message/stream` over SSE when true, `message/send` otherwise.
    pub streaming: bool,
    /// One-time context prepended to the first message of a conversation.
    pub initial_context: Option<String>,
}

impl BridgeConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            streaming: true,
            initial_context: None,
        }
    }
}

/// Outcome of one completed send: the full reconciled agent text, whether
/// the server finalized the task, and the identifiers to persist.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub text: String,
    pub finalized: bool,
    pub checkpoint: SessionCheckpoint,
}

struct StreamProgress {
    text: String,
    finalized: bool,
}

/// Streaming conversational client for a single logical conversation with
/// the remote agent.
///
/// One operation may be in flight at a time (`&mut self` on both entry
/// points); per-operation buffers live inside the operation and are
/// dropped with it, so cancelling the future releases the transport.
pub struct ConversationBridge {
    client: reqwest::Client,
    config: BridgeConfig,
    tracker: SessionTracker,
    transcript: Vec<TranscriptEntry>,
}

impl ConversationBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            client,
            config,
            tracker: SessionTracker::default(),
            transcript: Vec::new(),
        })
    }

    /// Sends one user message and yields reconciled agent text deltas via
    /// `on_delta` as the reply streams in.
    ///
    /// Transport failures and JSON-RPC error replies abort the operation;
    /// retrying is the caller's policy, never the bridge's.
    pub async fn send_message(
        &mut self,
        text: &str,
        attachments: &[Attachment],
        on_delta: Option<DeltaHandler>,
    ) -> Result<SendOutcome, BridgeError> {
        let outbound_text = match self.config.initial_context.as_deref() {
            Some(context) if !self.tracker.context_already_sent => {
                format!("{context}\n\n{text}")
            }
            _ => text.to_string(),
        };

        let mut message = ChatMessage::user(outbound_text, attachments);
        // Only the context id goes out. The previous task may already be
        // finalized, and the server allocates a fresh task inside the
        // same context rather than rejecting the write.
        message.context_id = self.tracker.current_context_id.clone();

        let (method, accept) = if self.config.streaming {
            (METHOD_MESSAGE_STREAM, "text/event-stream")
        } else {
            (METHOD_MESSAGE_SEND, "application/json")
        };
        let request = build_request(method, message_send_params(&message));

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(ACCEPT, accept)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().contains("text/event-stream"))
            .unwrap_or(false);

        let progress = if is_event_stream {
            self.consume_stream(response, on_delta.as_ref()).await?
        } else {
            self.consume_single_reply(response, on_delta.as_ref()).await?
        };

        self.tracker.context_already_sent = true;
        self.transcript.push(TranscriptEntry {
            role: MessageRole::User,
            text: text.to_string(),
        });
        if !progress.text.is_empty() {
            self.transcript.push(TranscriptEntry {
                role: MessageRole::Agent,
                text: progress.text.clone(),
            });
        }

        Ok(SendOutcome {
            text: progress.text,
            finalized: progress.finalized,
            checkpoint: self.tracker.checkpoint(),
        })
    }

    /// Refetches the listed tasks (oldest first) and rebuilds the
    /// transcript from their stored histories. Individual task failures
    /// are skipped; returns whether anything was recovered.
    pub async fn restore_history(&mut self, task_ids: &[String]) -> Result<bool, BridgeError> {
        let mut tasks: Vec<TaskSnapshot> = Vec::new();
        for task_id in task_ids {
            match self.fetch_task(task_id).await {
                Ok(task) => tasks.push(task),
                Err(error) => {
                    tracing::warn!(
                        task_id = %task_id,
                        error = %error,
                        "skipping unrecoverable task during history restore"
                    );
                }
            }
        }

        if tasks.is_empty() {
            return Ok(false);
        }

        for task in &tasks {
            self.tracker.adopt_task(task);
        }
        self.transcript = merge_task_histories(&tasks);
        // A restored conversation must never re-send its initial context.
        self.tracker.context_already_sent = true;
        Ok(true)
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn session(&self) -> &SessionTracker {
        &self.tracker
    }

    async fn consume_stream(
        &mut self,
        response: reqwest::Response,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<StreamProgress, BridgeError> {
        let mut stream = response.bytes_stream();
        let mut decoder = FrameDecoder::new();
        let mut assembler = EventAssembler::new();
        let mut reconciler = TextReconciler::new();
        let mut finalized = false;

        'receive: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in decoder.push_chunk(chunk.as_ref()) {
                if let Some(event) = assembler.push_line(&line) {
                    if self.apply_frame(&event.data, &mut reconciler, on_delta)? {
                        finalized = true;
                        break 'receive;
                    }
                }
            }
        }

        if !finalized {
            // Clean stream end: flush the trailing line and pending event.
            if let Some(line) = decoder.finish() {
                if let Some(event) = assembler.push_line(&line) {
                    finalized = self.apply_frame(&event.data, &mut reconciler, on_delta)?;
                }
            }
            if !finalized {
                if let Some(event) = assembler.finish() {
                    finalized = self.apply_frame(&event.data, &mut reconciler, on_delta)?;
                }
            }
        }

        Ok(StreamProgress {
            text: reconciler.into_text(),
            finalized,
        })
    }

    async fn consume_single_reply(
        &mut self,
        response: reqwest::Response,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<StreamProgress, BridgeError> {
        let raw = response.text().await?;
        let reply = parse_reply(&raw).map_err(|error| {
            BridgeError::InvalidResponse(format!("failed to parse agent reply: {error}"))
        })?;

        let mut reconciler = TextReconciler::new();
        let finalized = self.apply_reply(reply, &mut reconciler, on_delta)?;
        Ok(StreamProgress {
            text: reconciler.into_text(),
            finalized,
        })
    }

    /// Applies one SSE frame payload. Malformed JSON is frame-local:
    /// logged, dropped, and the stream continues.
    fn apply_frame(
        &mut self,
        data: &str,
        reconciler: &mut TextReconciler,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<bool, BridgeError> {
        let reply = match parse_reply(data) {
            Ok(reply) => reply,
            Err(error) => {
                tracing::debug!(error = %error, "dropping malformed stream frame");
                return Ok(false);
            }
        };
        self.apply_reply(reply, reconciler, on_delta)
    }

    /// Classifies one decoded reply, updates the session tracker, and
    /// feeds agent text through the reconciler. Returns whether the task
    /// was finalized.
    fn apply_reply(
        &mut self,
        reply: RpcReply,
        reconciler: &mut TextReconciler,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<bool, BridgeError> {
        let result = match reply {
            RpcReply::Error(error) => {
                return Err(BridgeError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            RpcReply::Result(result) => result,
        };

        let classified = classify_result(result);
        self.tracker.observe(&classified);

        let mut finalized = false;
        let candidate = match &classified {
            StreamResult::StatusUpdate(update) => {
                finalized = update.is_final || update.status.state.is_final();
                agent_text(update.status.message.as_ref())
            }
            StreamResult::Task(task) => {
                finalized = task.is_final();
                agent_text(task.status.message.as_ref())
            }
            StreamResult::Message(message) => agent_text(Some(message)),
            StreamResult::Unclassified(value) => {
                tracing::debug!(payload = %value, "dropping unclassified result");
                None
            }
        };

        if let Some(candidate) = candidate {
            if let Some(delta) = reconciler.push(&candidate) {
                if let Some(on_delta) = on_delta {
                    on_delta(delta);
                }
            }
        }

        Ok(finalized)
    }

    async fn fetch_task(&self, task_id: &str) -> Result<TaskSnapshot, BridgeError> {
        let request = build_request(METHOD_TASKS_GET, task_query_params(task_id));
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        let reply = parse_reply(&raw).map_err(|error| {
            BridgeError::InvalidResponse(format!("failed to parse tasks/get reply: {error}"))
        })?;
        let result = match reply {
            RpcReply::Error(error) => {
                return Err(BridgeError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            RpcReply::Result(result) => result,
        };
        match classify_result(result) {
            StreamResult::Task(task) => Ok(task),
            _ => Err(BridgeError::InvalidResponse(
                "tasks/get returned a non-task result".to_string(),
            )),
        }
    }
}

/// Extracts reconciler input from a server message: agent-authored,
/// non-empty text only. User echoes never become candidates.
fn agent_text(message: Option<&ChatMessage>) -> Option<String> {
    let message = message?;
    if message.role != MessageRole::Agent {
        return None;
    }
    let text = message.text_content();
    if text.is_empty() {
        return None;
    }
    Some(text)
}
