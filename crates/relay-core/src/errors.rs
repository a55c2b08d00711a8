//! Protocol error types.

/// An inbound frame that could not be understood. Always fatal for the
/// connection that sent it.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame body is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame body is JSON but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A binary frame that is not UTF-8 text.
    #[error("binary frame is not valid UTF-8 ({len} bytes)")]
    NonUtf8Binary {
        /// Frame length in bytes.
        len: usize,
    },
}
