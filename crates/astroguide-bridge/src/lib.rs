//! Streaming conversation bridge to the remote AstroGuide agent.
//!
//! Composes the SSE decoding pipeline, the JSON-RPC codec, text
//! reconciliation, and session tracking into the two operations the UI
//! layer consumes: a streaming send and a batch history restore.

mod bridge;
mod error;
mod history;
mod reconcile;
mod session;

pub use bridge::{BridgeConfig, ConversationBridge, DeltaHandler, SendOutcome};
pub use error::BridgeError;
pub use history::{merge_task_histories, TranscriptEntry};
pub use reconcile::TextReconciler;
pub use session::{SessionCheckpoint, SessionTracker};
