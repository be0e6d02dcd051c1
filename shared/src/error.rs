use thiserror::Error;

use crate::channel::ChannelState;
use crate::StrokeId;

/// Contract violations on the local stroke buffer.
///
/// These come from a misordered input sequence and are surfaced to the
/// caller rather than swallowed.
#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("author {author} already has an open stroke ({open})")]
    Conflict { author: String, open: StrokeId },
    #[error("stroke not found: {0}")]
    NotFound(StrokeId),
    #[error("stroke {0} is already closed")]
    InvalidState(StrokeId),
    #[error("stroke id already in use: {0}")]
    DuplicateId(StrokeId),
    #[error("point coordinates must be finite")]
    InvalidPoint,
    #[error("invalid stroke {0}: no drawable points")]
    InvalidStroke(StrokeId),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("channel is not open ({0:?})")]
    Closed(ChannelState),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
