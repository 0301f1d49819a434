//! Shared, domain-agnostic building blocks used across the jsonstab workspace.
//!
//! Nothing in this crate knows about JSON, sessions, or streaming; it holds
//! only the error taxonomy, the bounded ring buffer, and content hashing
//! that every other crate in the workspace depends on.

pub mod cancel;
pub mod error;
pub mod hash;
pub mod ring_buffer;

pub use cancel::CancellationToken;
pub use error::{ErrorKind, JsonStabError, Result};
pub use ring_buffer::RingBuffer;
