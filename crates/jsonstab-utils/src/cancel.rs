//! A cooperative cancellation flag shared between a caller and a
//! long-running session operation.
//!
//! The core never polls for I/O and never spawns its own threads, so
//! cancellation is checked only at safe points the caller already yields
//! control to — between parse steps and between repair steps — never in
//! the middle of a partial mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable handle; cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// A token that can never be cancelled, for call sites that don't need
    /// one but still go through a cancellable API.
    #[must_use]
    pub fn none() -> Self {
        Self::new()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
