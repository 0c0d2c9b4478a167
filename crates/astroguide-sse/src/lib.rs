//! SSE wire decoding for the AstroGuide agent stream.
//!
//! Turns raw transport chunks into complete text lines and groups lines
//! into logical `(event, data)` pairs, tolerant of arbitrary chunk
//! boundaries and line-ending variants.

mod event;
mod frame;

pub use event::{EventAssembler, SseEvent};
pub use frame::FrameDecoder;
