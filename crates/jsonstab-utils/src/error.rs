//! Shared error taxonomy for the jsonstab core.
//!
//! Every public operation across the workspace's crates returns
//! [`JsonStabError`] (or a newtype wrapping it) so that callers can match on
//! [`ErrorKind`] without needing to know which component raised the error.
//! Each kind also carries its own recoverability contract via
//! [`ErrorKind::recoverable`].

use thiserror::Error;

/// The kind of failure, independent of which component raised it.
///
/// Mirrors the error taxonomy: each kind has a fixed recoverability
/// story that callers can rely on without inspecting the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A path string did not parse in any supported style.
    BadPath,
    /// A lookup (session, path) found nothing.
    NotFound,
    /// The session has already transitioned to `Terminal`.
    SessionClosed,
    /// A configured resource limit was exceeded.
    CapacityExceeded,
    /// The completer exhausted every strategy without producing valid JSON.
    ParseUnrecoverable,
    /// A subscriber's bounded queue overflowed.
    SubscriberOverflow,
    /// A cancellable operation observed its cancellation token.
    Cancelled,
    /// An invariant the core assumes was violated; always a bug.
    Internal,
}

impl ErrorKind {
    /// Whether a caller can reasonably retry or work around this error.
    #[must_use]
    pub const fn recoverable(self) -> bool {
        !matches!(self, Self::SessionClosed | Self::Internal)
    }

    /// Short machine code suitable for wire-level error events.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadPath => "bad_path",
            Self::NotFound => "not_found",
            Self::SessionClosed => "session_closed",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::ParseUnrecoverable => "parse_unrecoverable",
            Self::SubscriberOverflow => "subscriber_overflow",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

/// The library-level error type returned by jsonstab operations.
///
/// `JsonStabError` carries a machine-readable [`ErrorKind`] via
/// [`JsonStabError::kind`] plus a human-readable message via `Display`.
/// Library code never panics on malformed external input; this type is how
/// that failure surfaces instead.
#[derive(Error, Debug)]
pub enum JsonStabError {
    #[error("invalid path syntax: {reason}")]
    BadPath { reason: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("session '{session_id}' is closed")]
    SessionClosed { session_id: String },

    #[error("capacity exceeded: {resource} ({detail})")]
    CapacityExceeded { resource: String, detail: String },

    #[error("completion exhausted all strategies: {detail}")]
    ParseUnrecoverable { detail: String },

    #[error("subscriber '{subscriber_id}' overflowed its event queue")]
    SubscriberOverflow { subscriber_id: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl JsonStabError {
    /// Classify this error for callers that branch on recoverability.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadPath { .. } => ErrorKind::BadPath,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::SessionClosed { .. } => ErrorKind::SessionClosed,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::ParseUnrecoverable { .. } => ErrorKind::ParseUnrecoverable,
            Self::SubscriberOverflow { .. } => ErrorKind::SubscriberOverflow,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Short machine code for wire-level error events.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn session_closed(session_id: impl Into<String>) -> Self {
        Self::SessionClosed {
            session_id: session_id.into(),
        }
    }

    pub fn bad_path(reason: impl Into<String>) -> Self {
        Self::BadPath {
            reason: reason.into(),
        }
    }

    pub fn capacity_exceeded(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            resource: resource.into(),
            detail: detail.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T, E = JsonStabError> = std::result::Result<T, E>;
