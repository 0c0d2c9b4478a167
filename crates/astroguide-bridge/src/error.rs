use thiserror::Error;

#[derive(Debug, Error)]
/// Enumerates supported `BridgeError` values.
///
/// Only transport failures and JSON-RPC error replies terminate an
/// operation; malformed or unrecognized frames are dropped where they
/// occur and never surface here.
pub enum BridgeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("agent endpoint returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("agent returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
