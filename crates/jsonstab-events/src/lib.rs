//! In-process typed publish/subscribe for delta events.

pub mod bus;
pub mod event;

pub use bus::{EventBus, SubscriberId, SubscriptionFilter};
pub use event::{DeltaEvent, ErrorPayload, EventKind, ValueSketch};
