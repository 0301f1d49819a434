//! The repair trace and result types.

use jsonstab_config::Strategy;
use jsonstab_path::Path;
use serde::{Deserialize, Serialize};

/// Which phase of the two-phase algorithm produced a [`RepairStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lexical,
    Syntactic,
}

/// Overall severity of a completion, feeding the confidence penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn penalty(self) -> f64 {
        match self {
            Self::Minor => 1.0,
            Self::Moderate => 0.85,
            Self::Major => 0.6,
            Self::Critical => 0.3,
        }
    }
}

/// One repair action, proposed and possibly rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairStep {
    pub phase: Phase,
    pub operation: String,
    pub description: String,
    /// Byte-offset range in the text this step operated on.
    pub range: (usize, usize),
    pub confidence: f64,
    pub applied: bool,
}

impl RepairStep {
    #[must_use]
    pub fn new(
        phase: Phase,
        operation: impl Into<String>,
        description: impl Into<String>,
        range: (usize, usize),
        confidence: f64,
        applied: bool,
    ) -> Self {
        Self {
            phase,
            operation: operation.into(),
            description: description.into(),
            range,
            confidence,
            applied,
        }
    }
}

/// The full record of one completion attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairTrace {
    pub original_text: String,
    pub repaired_text: String,
    pub steps: Vec<RepairStep>,
    pub confidence: f64,
    pub severity: Severity,
    pub strategy: Strategy,
}

/// A schema-hook suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub path: Path,
    pub suggested_value: serde_json::Value,
    pub confidence: f64,
}

/// What the completer returns for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub repaired: String,
    pub is_valid: bool,
    pub confidence: f64,
    pub strategy: Strategy,
    pub trace: RepairTrace,
    pub schema_suggestions_applied: usize,
    pub historical_success_rate: f64,
}
