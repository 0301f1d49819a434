//! The public façade for embedding jsonstab: create sessions, drive
//! `ingest`, read the committed tree, subscribe to delta events, and
//! `finalize`.
//!
//! [`Engine`] owns the concurrent sessions map and shared defaults; drive
//! one [`Session`] at a time through its methods. Different sessions are
//! independent and safe to drive concurrently from different threads.
//!
//! # Quick start
//!
//! ```
//! use jsonstab::{CancellationToken, Config, Engine};
//!
//! let engine = Engine::new(Config::default());
//! engine.create_session("demo").unwrap();
//! let cancel = CancellationToken::none();
//! engine
//!     .with_session("demo", |session| session.ingest(br#"{"a":1}"#, true, &cancel))
//!     .unwrap()
//!     .unwrap();
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex;

use jsonstab_coalescer::CoalescingBuffer;
use jsonstab_differ::DiffEngineState;
use jsonstab_parser::ParseState;

pub use jsonstab_completer::{CompletionResult, Phase, RepairStep, RepairTrace, SchemaHook, Severity, Suggestion};
pub use jsonstab_config::{Config, DiffMode, Strategy};
pub use jsonstab_differ::ChangeOp;
pub use jsonstab_events::{DeltaEvent, ErrorPayload, EventKind, SubscriberId, SubscriptionFilter, ValueSketch};
pub use jsonstab_parser::{ProgressReport, SessionState};
pub use jsonstab_path::{Node, NumberLiteral, Path, PathSegment, PathStyle, PartialTree, Value};
pub use jsonstab_utils::{CancellationToken, ErrorKind, JsonStabError, Result};

use jsonstab_events::EventBus;

/// One streaming session: owns its parse state, diff memory, coalescing
/// buffer, and event bus. Obtained and driven through an [`Engine`].
pub struct Session {
    id: String,
    config: Config,
    schema_hook: Option<Arc<SchemaHook>>,
    parse: ParseState,
    diff_state: DiffEngineState,
    coalescer: CoalescingBuffer,
    bus: EventBus,
    last_tree: Node,
    seq: u64,
    start_instant: Instant,
    start_system: SystemTime,
    last_activity: Instant,
}

impl Session {
    fn new(id: String, config: Config, schema_hook: Option<Arc<SchemaHook>>) -> Self {
        let now = Instant::now();
        Self {
            parse: ParseState::new(&config),
            diff_state: DiffEngineState::new(),
            coalescer: CoalescingBuffer::new(config.coalesce_window_ms, config.coalesce_stability, config.coalesce_max_buffered),
            bus: EventBus::new(config.subscriber_queue_cap, config.subscriber_callback_budget_ms),
            last_tree: Node::null(),
            seq: 0,
            start_instant: now,
            start_system: SystemTime::now(),
            last_activity: now,
            id,
            config,
            schema_hook,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.parse.state()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Snapshot of the committed tree.
    #[must_use]
    pub fn current_tree(&self) -> PartialTree {
        self.parse.current_tree()
    }

    /// The accumulated text not yet folded into the strict-parse cursor.
    #[must_use]
    pub fn raw_buffer(&self) -> Vec<u8> {
        self.parse.raw_buffer()
    }

    /// Append a chunk, extend the committed tree, and emit any resulting
    /// delta events.
    ///
    /// # Errors
    ///
    /// See [`ParseState::ingest`].
    pub fn ingest(&mut self, chunk: &[u8], is_final: bool, cancel: &CancellationToken) -> Result<ProgressReport> {
        let now = Instant::now();
        self.last_activity = now;
        let hook = self.schema_hook.as_deref();
        let report = self.parse.ingest(chunk, is_final, now, hook, cancel)?;

        if report.dropped_bytes > 0 {
            self.emit_progress_drop(report.dropped_bytes, now);
        }
        self.run_diff_and_emit(now);
        if report.unrecoverable {
            self.emit_unrecoverable(now);
        }
        Ok(report)
    }

    /// Mark the stream finished, commit the residual, flush the
    /// coalescer, and emit a terminal `Complete` event, or an `Error`
    /// event if the residual text could not be completed into valid JSON.
    ///
    /// # Errors
    ///
    /// See [`ParseState::finalize`].
    pub fn finalize(&mut self, cancel: &CancellationToken) -> Result<CompletionResult> {
        let now = Instant::now();
        self.last_activity = now;
        let hook = self.schema_hook.as_deref();
        let result = self.parse.finalize(now, hook, cancel)?;

        self.run_diff_and_emit(now);
        let flushed = self.coalescer.flush(None);
        for op in flushed {
            self.emit_change_op(op, now);
        }
        let seq = self.next_seq();
        let ts = self.timestamp_ms(now);
        let event = if result.is_valid {
            DeltaEvent::complete(self.id.clone(), seq, ts)
        } else {
            DeltaEvent::error(
                self.id.clone(),
                seq,
                ts,
                Path::root(),
                ErrorKind::ParseUnrecoverable.code(),
                "residual text could not be completed into valid JSON at finalize",
            )
        };
        self.bus.publish(event);
        Ok(result)
    }

    /// Register a pull-mode subscriber.
    pub fn subscribe(&self, filter: SubscriptionFilter) -> SubscriberId {
        self.bus.subscribe(filter)
    }

    /// Register a push-mode subscriber invoked inline on every matching
    /// event.
    pub fn subscribe_callback(&self, filter: SubscriptionFilter, callback: Box<dyn Fn(&DeltaEvent) + Send + Sync>) -> SubscriberId {
        self.bus.subscribe_callback(filter, callback)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.bus.unsubscribe(id);
    }

    /// Drain queued events for a pull-mode subscriber.
    #[must_use]
    pub fn poll(&self, id: SubscriberId) -> Vec<DeltaEvent> {
        self.bus.poll(id)
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn timestamp_ms(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.start_instant);
        (self.start_system + elapsed)
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    /// Diff the previous committed tree against the current one, drop
    /// already-emitted ops, and route survivors through the coalescer
    /// before publishing.
    fn run_diff_and_emit(&mut self, now: Instant) {
        let new_tree = self.parse.current_tree();
        let ops = jsonstab_differ::diff(&self.last_tree, &new_tree, &Path::root(), self.config.diff_mode);
        let novel = self.diff_state.filter_novel(ops);
        self.last_tree = new_tree;

        let mut touched = HashSet::new();
        for op in novel {
            touched.insert(op.path().clone());
            let to_emit = if self.config.coalesce_enabled {
                self.coalescer.offer(op, now)
            } else {
                Some(op)
            };
            if let Some(op) = to_emit {
                self.emit_change_op(op, now);
            }
        }
        if self.config.coalesce_enabled {
            let ticked = self.coalescer.tick(&touched);
            for op in ticked {
                self.emit_change_op(op, now);
            }
        }
    }

    fn emit_change_op(&mut self, op: ChangeOp, now: Instant) {
        let seq = self.next_seq();
        let ts = self.timestamp_ms(now);
        let event = match op {
            ChangeOp::Add { path, value } => DeltaEvent {
                session_id: self.id.clone(),
                seq,
                timestamp_ms: ts,
                kind: EventKind::PathAdded,
                path,
                value: Some(node_to_json(&value)),
                old_value: None,
                error: None,
            },
            ChangeOp::Remove { path, old_value_sketch } => DeltaEvent {
                session_id: self.id.clone(),
                seq,
                timestamp_ms: ts,
                kind: EventKind::PathRemoved,
                path,
                value: None,
                old_value: Some(ValueSketch(old_value_sketch)),
                error: None,
            },
            ChangeOp::Replace {
                path,
                old_value_sketch,
                new_value,
            } => DeltaEvent {
                session_id: self.id.clone(),
                seq,
                timestamp_ms: ts,
                kind: EventKind::ValueChanged,
                path,
                value: Some(node_to_json(&new_value)),
                old_value: Some(ValueSketch(old_value_sketch)),
                error: None,
            },
        };
        self.bus.publish(event);
    }

    fn emit_progress_drop(&mut self, dropped_bytes: usize, now: Instant) {
        let seq = self.next_seq();
        let mut event = DeltaEvent::progress(self.id.clone(), seq, self.timestamp_ms(now), Path::root());
        event.value = Some(serde_json::json!({ "dropped_bytes": dropped_bytes }));
        self.bus.publish(event);
    }

    fn emit_unrecoverable(&mut self, now: Instant) {
        let seq = self.next_seq();
        let event = DeltaEvent::error(
            self.id.clone(),
            seq,
            self.timestamp_ms(now),
            Path::root(),
            ErrorKind::ParseUnrecoverable.code(),
            "the completer could not produce valid JSON for the buffered tail; more chunks may resolve it",
        );
        self.bus.publish(event);
    }
}

/// Render a [`Node`] tree into a `serde_json::Value` for event egress.
/// This drops only the source-text preservation that `NumberLiteral`
/// carries; callers who need that precision should read `current_tree()`
/// instead.
fn node_to_json(node: &Node) -> serde_json::Value {
    match &node.value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::from_str(n.raw()).unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(node_to_json).collect()),
        Value::Object(map) => serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), node_to_json(v))).collect()),
    }
}

/// Owns the concurrent sessions map and process-wide default
/// configuration.
pub struct Engine {
    config: Config,
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    schema_hook: Option<Arc<SchemaHook>>,
}

impl Engine {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            schema_hook: None,
        }
    }

    /// Register a schema hook applied to every session created afterward.
    #[must_use]
    pub fn with_schema_hook(config: Config, hook: Arc<SchemaHook>) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            schema_hook: Some(hook),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Create a new session keyed by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStabError::CapacityExceeded`] if `max_sessions` is
    /// already reached, or [`JsonStabError::Internal`] if `id` is already
    /// in use (session ids are caller-chosen and must be unique).
    pub fn create_session(&self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        if self.sessions.len() >= self.config.max_sessions {
            return Err(JsonStabError::capacity_exceeded(
                "max_sessions",
                format!("{}/{} in use", self.sessions.len(), self.config.max_sessions),
            ));
        }
        if self.sessions.contains_key(&id) {
            return Err(JsonStabError::Internal(format!("session '{id}' already exists")));
        }
        let session = Session::new(id.clone(), self.config.clone(), self.schema_hook.clone());
        self.sessions.insert(id, Arc::new(Mutex::new(session)));
        Ok(())
    }

    /// Run `f` against the session keyed by `id`, holding its per-session
    /// lock for the duration.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStabError::NotFound`] if no session has that id.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Result<R> {
        let entry = self.sessions.get(id).ok_or_else(|| JsonStabError::not_found(format!("session '{id}'")))?;
        let mut session = entry.lock();
        Ok(f(&mut session))
    }

    /// Explicitly drop a session without finalizing it. Prefer
    /// `with_session(id, |s| s.finalize(cancel))` followed by this when the
    /// caller wants the residual text committed first.
    pub fn close_session(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Remove every session whose `last_activity + ttl < now`, finalizing
    /// each one first so its coalescer flushes and a terminal event is
    /// emitted. Returns the ids removed.
    ///
    /// The core performs no I/O and owns no background task; callers drive
    /// this from whatever scheduler they already have, roughly every
    /// `cleanup_period_seconds`.
    pub fn sweep_expired(&self, now: Instant) -> Vec<String> {
        let ttl = Duration::from_secs(self.config.session_ttl_seconds);
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| now.saturating_duration_since(entry.value().lock().last_activity()) >= ttl)
            .map(|entry| entry.key().clone())
            .collect();

        for id in &expired {
            if let Some((_, session_lock)) = self.sessions.remove(id) {
                let mut session = session_lock.lock();
                if session.state() != SessionState::Terminal {
                    if let Err(err) = session.finalize(&CancellationToken::none()) {
                        tracing::warn!(session = %id, error = %err, "TTL cleanup finalize failed");
                    }
                }
            }
        }
        expired
    }
}
