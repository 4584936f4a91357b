//! Error types for the panel runtime

use thiserror::Error;

/// Errors surfaced by the library.
///
/// Only `Config` and `Transport` are returned from construction; the
/// remaining kinds are recovered internally and show up here when a caller
/// drives a lower-level API (codec, snapshot file) directly.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration rejected before any connection attempt
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Connection refused, dropped, or not yet open
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Frame failed length, checksum, or tag validation
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// An expected reply did not arrive within its budget
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// Snapshot file missing or unreadable; cold start proceeds
    #[error("snapshot unavailable: {0}")]
    Snapshot(String),
}

/// Per-frame validation failures. Frames carrying these are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too short ({0} chars)")]
    TooShort(usize),

    #[error("frame contains non-ASCII data")]
    NonAscii,

    #[error("length field {field} does not match frame length {actual}")]
    BadLength { field: usize, actual: usize },

    #[error("checksum mismatch (expected {expected}, computed {computed})")]
    BadChecksum { expected: String, computed: String },

    #[error("unknown message tag {0:?}")]
    UnknownTag(String),

    #[error("payload too short for {0} decode")]
    ShortPayload(&'static str),

    #[error("invalid field in {0} payload")]
    BadField(&'static str),
}
