/// Unified error type for symdex.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A packed location field (file id, line, or column) would overflow.
    #[error("Location capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// An internal invariant broke (e.g., an empty USR arrived for a
    /// function or variable). Indicates a bug or a malformed event stream;
    /// the current parse is abandoned.
    #[error("Index invariant violated: {0}")]
    InvariantViolated(String),

    /// The frontend could not produce any events for the translation unit.
    #[error("Frontend failed: {0}")]
    FrontendFailed(String),

    /// Cooperative cancellation was observed between events.
    #[error("Parse cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
