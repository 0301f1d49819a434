//! The enumerated configuration surface.
//!
//! A [`Config`] is immutable once a session is created from it: there is no
//! global mutable state besides these defaults, so every session carries
//! its own frozen copy rather than reading shared knobs.

use jsonstab_path::PathStyle;
use serde::{Deserialize, Serialize};

/// The completer's repair strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Conservative,
    Smart,
    Aggressive,
}

impl Strategy {
    /// The order in which the completer retries after a round-trip failure:
    /// each entry falls back to the next more-conservative strategy.
    #[must_use]
    pub fn fallback(self) -> Option<Self> {
        match self {
            Self::Aggressive => Some(Self::Smart),
            Self::Smart => Some(Self::Conservative),
            Self::Conservative => None,
        }
    }

    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self::Conservative, Self::Smart, Self::Aggressive]
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Smart
    }
}

/// The structural differ's algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMode {
    Conservative,
    Smart,
}

impl Default for DiffMode {
    fn default() -> Self {
        Self::Smart
    }
}

/// Frozen configuration for one session, or the process-wide defaults a new
/// session inherits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_buffer_bytes: usize,
    pub session_ttl_seconds: u64,
    pub max_sessions: usize,
    pub default_strategy: Strategy,
    pub adaptive_enabled: bool,
    pub consecutive_failure_threshold: u32,
    pub min_switch_interval_seconds: u64,
    pub diff_mode: DiffMode,
    pub coalesce_enabled: bool,
    pub coalesce_window_ms: u64,
    pub coalesce_stability: u32,
    pub coalesce_max_buffered: usize,
    pub subscriber_queue_cap: usize,
    pub path_style: PathStyle,
    /// How often a background sweep should check for and finalize
    /// timed-out sessions.
    pub cleanup_period_seconds: u64,
    /// Upper bound on how long a push-mode subscriber callback may run
    /// before it's logged as slow.
    pub subscriber_callback_budget_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_buffer_bytes: 1_048_576,
            session_ttl_seconds: 3_600,
            max_sessions: 1_000,
            default_strategy: Strategy::Smart,
            adaptive_enabled: true,
            consecutive_failure_threshold: 3,
            min_switch_interval_seconds: 60,
            diff_mode: DiffMode::Smart,
            coalesce_enabled: true,
            coalesce_window_ms: 100,
            coalesce_stability: 3,
            coalesce_max_buffered: 10,
            subscriber_queue_cap: 1_024,
            path_style: PathStyle::Dot,
            cleanup_period_seconds: 60,
            subscriber_callback_budget_ms: 50,
        }
    }
}

impl Config {
    /// Parse overrides from a TOML document, falling back to [`Config::default`]
    /// for any field left unspecified.
    ///
    /// # Errors
    ///
    /// Returns the underlying `toml` deserialization error on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
