use std::fmt;

/// The closed set of error kinds every brain component reports through.
///
/// Every variant carries an [`ErrorContext`] so that logs and CLI output can
/// consistently surface the note/session identifier and timing involved,
/// regardless of which component raised it.
#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    /// Retryable failure: embedding 5xx/408, network error, or timeout.
    #[error("transient failure: {message} ({context})")]
    Transient { message: String, context: ErrorContext },

    /// Non-retryable client error (4xx other than 408), or invalid input
    /// (bad vector dimension, chunk-count mismatch).
    #[error("bad request: {message} ({context})")]
    BadRequest { message: String, context: ErrorContext },

    /// Malformed response body or unexpected schema from an external service.
    #[error("protocol error: {message} ({context})")]
    Protocol { message: String, context: ErrorContext },

    /// Session or note does not exist.
    #[error("not found: {what} ({context})")]
    NotFound { what: String, context: ErrorContext },

    /// Session status-machine transition is not permitted from the current state.
    #[error("invalid status transition for session {session_id}: {from} -> {to}")]
    InvalidStatusTransition {
        session_id: String,
        from: String,
        to: String,
    },

    /// Optimistic-locking retries were exhausted.
    #[error("version conflict on session {session_id}: expected {expected}, actual {actual} after {retries} retries")]
    VersionConflict {
        session_id: String,
        expected: u64,
        actual: u64,
        retries: u32,
    },

    /// HMAC verification failed: the session payload may have been tampered with.
    #[error("signature invalid for session {session_id}")]
    SignatureInvalid { session_id: String },

    /// Could not auto-pause a conflicting IN_PROGRESS session.
    #[error("failed to auto-pause conflicting session {conflicting_session_id}")]
    AutoPauseFailed { conflicting_session_id: String },

    /// Missing secret or an out-of-range configuration value.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BrainError {
    /// Whether a caller may reasonably retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrainError::Transient { .. })
    }
}

/// Structured context threaded through every [`BrainError`] variant that
/// involves I/O against a note or an embedding request.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub note_id: Option<String>,
    pub session_id: Option<String>,
    pub elapsed_ms: Option<u64>,
    pub deadline_ms: Option<u64>,
    pub expected_ms: Option<u64>,
    pub chunk_count: Option<usize>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note_id(mut self, note_id: impl Into<String>) -> Self {
        self.note_id = Some(note_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    pub fn with_expected_ms(mut self, expected_ms: u64) -> Self {
        self.expected_ms = Some(expected_ms);
        self
    }

    pub fn with_chunk_count(mut self, chunk_count: usize) -> Self {
        self.chunk_count = Some(chunk_count);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(n) = &self.note_id {
            parts.push(format!("note={n}"));
        }
        if let Some(s) = &self.session_id {
            parts.push(format!("session={s}"));
        }
        if let Some(e) = self.elapsed_ms {
            parts.push(format!("elapsed_ms={e}"));
        }
        if let Some(d) = self.deadline_ms {
            parts.push(format!("deadline_ms={d}"));
        }
        if let Some(x) = self.expected_ms {
            parts.push(format!("expected_ms={x}"));
        }
        if let Some(c) = self.chunk_count {
            parts.push(format!("chunks={c}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

pub type Result<T> = std::result::Result<T, BrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable() {
        let err = BrainError::Transient {
            message: "connection reset".into(),
            context: ErrorContext::new().with_note_id("n1"),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn bad_request_is_not_retryable() {
        let err = BrainError::BadRequest {
            message: "bad dimension".into(),
            context: ErrorContext::new(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn context_display_includes_fields() {
        let ctx = ErrorContext::new()
            .with_note_id("n1")
            .with_elapsed_ms(42)
            .with_chunk_count(3);
        let rendered = ctx.to_string();
        assert!(rendered.contains("note=n1"));
        assert!(rendered.contains("elapsed_ms=42"));
        assert!(rendered.contains("chunks=3"));
    }
}
