//! Bounded-fan-out typed publish/subscribe.
//!
//! Subscribers are identified by opaque handle and looked up in a registry
//! owned by the bus, rather than the bus holding strong references back to
//! subscriber state, which would risk a reference cycle with anything
//! holding the bus itself.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::event::{DeltaEvent, EventKind};
use jsonstab_path::Path;

/// Opaque handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// What a subscriber wants to see: a kind-set and an optional path-prefix.
#[derive(Debug, Clone)]
pub struct SubscriptionFilter {
    pub kinds: HashSet<EventKind>,
    pub path_prefix: Option<Path>,
}

impl SubscriptionFilter {
    #[must_use]
    pub fn all() -> Self {
        Self {
            kinds: [
                EventKind::PathAdded,
                EventKind::PathRemoved,
                EventKind::ValueChanged,
                EventKind::Progress,
                EventKind::Error,
                EventKind::Complete,
            ]
            .into_iter()
            .collect(),
            path_prefix: None,
        }
    }

    fn matches(&self, event: &DeltaEvent) -> bool {
        if !self.kinds.contains(&event.kind) {
            return false;
        }
        match &self.path_prefix {
            None => true,
            Some(prefix) => prefix.is_strict_prefix_of(&event.path) || prefix == &event.path,
        }
    }
}

struct SubscriberState {
    filter: SubscriptionFilter,
    queue: Mutex<VecDeque<DeltaEvent>>,
    cap: usize,
    callback: Option<Box<dyn Fn(&DeltaEvent) + Send + Sync>>,
}

/// An in-process event bus. Delivery is ordered per session, best-effort
/// across sessions.
pub struct EventBus {
    subscribers: Mutex<Vec<(SubscriberId, SubscriberState)>>,
    next_id: AtomicU64,
    default_queue_cap: usize,
    callback_budget: Duration,
}

impl EventBus {
    #[must_use]
    pub fn new(default_queue_cap: usize, callback_budget_ms: u64) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            default_queue_cap,
            callback_budget: Duration::from_millis(callback_budget_ms),
        }
    }

    /// Register a pull-mode subscriber: events accumulate in its bounded
    /// queue until drained with [`EventBus::poll`].
    pub fn subscribe(&self, filter: SubscriptionFilter) -> SubscriberId {
        self.register(filter, None)
    }

    /// Register a push-mode subscriber invoked synchronously on publish.
    /// If the callback runs longer than the configured budget, a warning is
    /// logged but the subscriber is not removed.
    pub fn subscribe_callback(
        &self,
        filter: SubscriptionFilter,
        callback: Box<dyn Fn(&DeltaEvent) + Send + Sync>,
    ) -> SubscriberId {
        self.register(filter, Some(callback))
    }

    fn register(
        &self,
        filter: SubscriptionFilter,
        callback: Option<Box<dyn Fn(&DeltaEvent) + Send + Sync>>,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = SubscriberState {
            filter,
            queue: Mutex::new(VecDeque::new()),
            cap: self.default_queue_cap,
            callback,
        };
        self.subscribers.lock().push((id, state));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.lock().retain(|(sid, _)| *sid != id);
    }

    /// Deliver an event to every matching subscriber. Push-mode subscribers
    /// are invoked inline; pull-mode subscribers get it enqueued.
    pub fn publish(&self, event: DeltaEvent) {
        let subscribers = self.subscribers.lock();
        for (id, state) in subscribers.iter() {
            if !state.filter.matches(&event) {
                continue;
            }
            if let Some(callback) = &state.callback {
                let start = Instant::now();
                callback(&event);
                let elapsed = start.elapsed();
                if elapsed > self.callback_budget {
                    tracing::warn!(
                        subscriber = id.0,
                        elapsed_ms = elapsed.as_millis() as u64,
                        budget_ms = self.callback_budget.as_millis() as u64,
                        "subscriber callback exceeded budget"
                    );
                }
                continue;
            }
            self.enqueue(*id, state, event.clone());
        }
    }

    fn enqueue(&self, id: SubscriberId, state: &SubscriberState, event: DeltaEvent) {
        let mut queue = state.queue.lock();
        if queue.len() >= state.cap {
            // Overflow: drop the oldest buffered event and replace the
            // incoming one with a notice so the subscriber learns it missed
            // something, instead of growing past the configured cap.
            queue.pop_front();
            let overflow = DeltaEvent::error(
                event.session_id.clone(),
                event.seq,
                event.timestamp_ms,
                event.path.clone(),
                "subscriber_overflow",
                "subscriber queue capacity exceeded; event dropped",
            );
            tracing::warn!(subscriber = id.0, "subscriber queue overflow, dropping oldest event");
            queue.push_back(overflow);
            return;
        }
        queue.push_back(event);
    }

    /// Drain all currently queued events for a pull-mode subscriber.
    #[must_use]
    pub fn poll(&self, id: SubscriberId) -> Vec<DeltaEvent> {
        let subscribers = self.subscribers.lock();
        subscribers
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, state)| state.queue.lock().drain(..).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(seq: u64, kind: EventKind, path: Path) -> DeltaEvent {
        DeltaEvent {
            session_id: "s1".into(),
            seq,
            timestamp_ms: seq,
            kind,
            path,
            value: None,
            old_value: None,
            error: None,
        }
    }

    #[test]
    fn pull_subscriber_receives_matching_events() {
        let bus = EventBus::new(16, 50);
        let id = bus.subscribe(SubscriptionFilter::all());
        bus.publish(event(1, EventKind::Progress, Path::root()));
        bus.publish(event(2, EventKind::Complete, Path::root()));
        let drained = bus.poll(id);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].seq, 1);
        assert_eq!(drained[1].seq, 2);
    }

    #[test]
    fn path_prefix_filter_excludes_unrelated_paths() {
        let bus = EventBus::new(16, 50);
        let filter = SubscriptionFilter {
            kinds: SubscriptionFilter::all().kinds,
            path_prefix: Some(Path::root().child_key("users")),
        };
        let id = bus.subscribe(filter);
        bus.publish(event(1, EventKind::ValueChanged, Path::root().child_key("users").child_index(0)));
        bus.publish(event(2, EventKind::ValueChanged, Path::root().child_key("other")));
        let drained = bus.poll(id);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].seq, 1);
    }

    #[test]
    fn overflow_drops_oldest_and_notifies() {
        let bus = EventBus::new(2, 50);
        let id = bus.subscribe(SubscriptionFilter::all());
        bus.publish(event(1, EventKind::Progress, Path::root()));
        bus.publish(event(2, EventKind::Progress, Path::root()));
        bus.publish(event(3, EventKind::Progress, Path::root()));
        let drained = bus.poll(id);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].seq, 2, "oldest (seq 1) should have been dropped");
        assert_eq!(drained[1].kind, EventKind::Error);
        assert_eq!(drained[1].error.as_ref().unwrap().code, "subscriber_overflow");
    }

    #[test]
    fn callback_subscriber_invoked_inline() {
        let bus = EventBus::new(16, 50);
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe_callback(
            SubscriptionFilter::all(),
            Box::new(move |ev| seen_clone.lock().push(ev.seq)),
        );
        bus.publish(event(1, EventKind::Progress, Path::root()));
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new(16, 50);
        let id = bus.subscribe(SubscriptionFilter::all());
        bus.unsubscribe(id);
        bus.publish(event(1, EventKind::Progress, Path::root()));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
