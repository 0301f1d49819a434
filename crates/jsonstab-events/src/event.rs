//! The [`DeltaEvent`] wire model.

use jsonstab_path::Path;
use serde::{Deserialize, Serialize};

/// A truncated, display-only rendering of a value, used for an "old value"
/// slot rather than the full value — callers who need the complete old
/// value should keep their own copy of the prior tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSketch(pub String);

impl ValueSketch {
    const MAX_CHARS: usize = 120;

    #[must_use]
    pub fn from_display(value: &impl std::fmt::Debug) -> Self {
        let full = format!("{value:?}");
        if full.chars().count() <= Self::MAX_CHARS {
            Self(full)
        } else {
            let truncated: String = full.chars().take(Self::MAX_CHARS).collect();
            Self(format!("{truncated}…"))
        }
    }
}

/// The discriminant of a [`DeltaEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PathAdded,
    PathRemoved,
    ValueChanged,
    Progress,
    Error,
    Complete,
}

/// Machine-readable error payload carried by `Error`-kind events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// The unit of output delivered through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaEvent {
    pub session_id: String,
    /// Monotonic per session.
    pub seq: u64,
    pub timestamp_ms: u64,
    pub kind: EventKind,
    pub path: Path,
    pub value: Option<serde_json::Value>,
    pub old_value: Option<ValueSketch>,
    pub error: Option<ErrorPayload>,
}

impl DeltaEvent {
    #[must_use]
    pub fn progress(session_id: impl Into<String>, seq: u64, timestamp_ms: u64, path: Path) -> Self {
        Self {
            session_id: session_id.into(),
            seq,
            timestamp_ms,
            kind: EventKind::Progress,
            path,
            value: None,
            old_value: None,
            error: None,
        }
    }

    #[must_use]
    pub fn error(
        session_id: impl Into<String>,
        seq: u64,
        timestamp_ms: u64,
        path: Path,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            seq,
            timestamp_ms,
            kind: EventKind::Error,
            path,
            value: None,
            old_value: None,
            error: Some(ErrorPayload {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    #[must_use]
    pub fn complete(session_id: impl Into<String>, seq: u64, timestamp_ms: u64) -> Self {
        Self {
            session_id: session_id.into(),
            seq,
            timestamp_ms,
            kind: EventKind::Complete,
            path: Path::root(),
            value: None,
            old_value: None,
            error: None,
        }
    }
}
