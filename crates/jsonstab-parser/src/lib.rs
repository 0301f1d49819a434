//! Cross-chunk-buffered incremental JSON parsing and session lifecycle.

pub mod boundary;
pub mod session;
pub mod tree_build;

pub use session::{ParseState, ProgressReport, SessionState};
pub use tree_build::{from_serde_value, merge};
