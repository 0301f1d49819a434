//! JSON-aware structural diff engine with idempotent emission.

pub mod algorithm;
pub mod canonical;
pub mod ops;
pub mod state;

pub use algorithm::diff;
pub use ops::ChangeOp;
pub use state::DiffEngineState;
