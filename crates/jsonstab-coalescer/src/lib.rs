//! Time-windowed event coalescing with stability-based early release.
//!
//! "Suppress churn, release stability" — a path that keeps changing stays
//! buffered (each new candidate resets its stability counter), while a path
//! that stops changing for `coalesce_stability` consecutive ingests is
//! considered settled and flushed even before its time window elapses.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use jsonstab_differ::ChangeOp;
use jsonstab_path::Path;

struct PathBuffer {
    latest: ChangeOp,
    first_pending_at: Instant,
    stability_counter: u32,
    buffered_count: usize,
}

/// Per-session pending-event buffer, one instance per session.
pub struct CoalescingBuffer {
    /// Insertion order here is "the order paths first became pending",
    /// which is exactly the order flush_all/flush must preserve.
    buffers: IndexMap<Path, PathBuffer>,
    window: Duration,
    stability_threshold: u32,
    max_buffered: usize,
}

impl CoalescingBuffer {
    #[must_use]
    pub fn new(window_ms: u64, stability_threshold: u32, max_buffered: usize) -> Self {
        Self {
            buffers: IndexMap::new(),
            window: Duration::from_millis(window_ms),
            stability_threshold,
            max_buffered,
        }
    }

    /// Offer a candidate op for its path. Returns `Some` immediately if the
    /// time window or max-buffered condition fires on this offer.
    pub fn offer(&mut self, op: ChangeOp, now: Instant) -> Option<ChangeOp> {
        let path = op.path().clone();
        let entry = self.buffers.entry(path.clone()).or_insert_with(|| PathBuffer {
            latest: op.clone(),
            first_pending_at: now,
            stability_counter: 0,
            buffered_count: 0,
        });
        entry.latest = op;
        entry.buffered_count += 1;
        entry.stability_counter = 0;

        let window_elapsed = now.duration_since(entry.first_pending_at) >= self.window;
        let over_capacity = entry.buffered_count >= self.max_buffered;
        if window_elapsed || over_capacity {
            return self.flush_path(&path);
        }
        None
    }

    /// Advance the stability clock for every currently buffered path that
    /// was *not* touched by the most recent `offer` batch, flushing any that
    /// cross the stability threshold.
    pub fn tick(&mut self, touched: &HashSet<Path>) -> Vec<ChangeOp> {
        let mut flushed = Vec::new();
        let pending_paths: Vec<Path> = self.buffers.keys().cloned().collect();
        for path in pending_paths {
            if touched.contains(&path) {
                continue;
            }
            let reached = {
                let entry = self.buffers.get_mut(&path).expect("path came from buffers.keys()");
                entry.stability_counter += 1;
                entry.stability_counter >= self.stability_threshold
            };
            if reached {
                if let Some(op) = self.flush_path(&path) {
                    flushed.push(op);
                }
            }
        }
        flushed
    }

    /// Explicit flush for one path, or every path when `path` is `None`.
    pub fn flush(&mut self, path: Option<&Path>) -> Vec<ChangeOp> {
        match path {
            Some(p) => self.flush_path(p).into_iter().collect(),
            None => self.flush_all(),
        }
    }

    fn flush_path(&mut self, path: &Path) -> Option<ChangeOp> {
        self.buffers.shift_remove(path).map(|buffer| buffer.latest)
    }

    /// Flush every pending path, e.g. on session terminal.
    pub fn flush_all(&mut self) -> Vec<ChangeOp> {
        self.buffers.drain(..).map(|(_, buffer)| buffer.latest).collect()
    }

    #[must_use]
    pub fn pending_paths(&self) -> Vec<Path> {
        self.buffers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonstab_path::{Node, NumberLiteral, Value};

    fn add(path: Path, n: &str) -> ChangeOp {
        ChangeOp::Add {
            path,
            value: Node::complete(Value::Number(NumberLiteral::from_raw(n))),
        }
    }

    #[test]
    fn holds_below_window_and_capacity() {
        let mut buf = CoalescingBuffer::new(100, 3, 10);
        let t0 = Instant::now();
        let result = buf.offer(add(Path::root().child_key("a"), "1"), t0);
        assert!(result.is_none());
        assert_eq!(buf.pending_paths().len(), 1);
    }

    #[test]
    fn flushes_when_time_window_elapses() {
        let mut buf = CoalescingBuffer::new(50, 3, 100);
        let t0 = Instant::now();
        buf.offer(add(Path::root().child_key("a"), "1"), t0);
        let result = buf.offer(add(Path::root().child_key("a"), "2"), t0 + Duration::from_millis(60));
        assert!(result.is_some());
    }

    #[test]
    fn flushes_when_max_buffered_reached() {
        let mut buf = CoalescingBuffer::new(10_000, 3, 2);
        let t0 = Instant::now();
        assert!(buf.offer(add(Path::root().child_key("a"), "1"), t0).is_none());
        let flushed = buf.offer(add(Path::root().child_key("a"), "2"), t0);
        assert!(flushed.is_some());
        // only the most recent candidate is ever emitted
        if let Some(ChangeOp::Add { value, .. }) = flushed {
            assert_eq!(value.value, Value::Number(NumberLiteral::from_raw("2")));
        } else {
            panic!("expected Add");
        }
    }

    #[test]
    fn stability_counter_flushes_quiet_path() {
        let mut buf = CoalescingBuffer::new(10_000, 2, 100);
        let t0 = Instant::now();
        buf.offer(add(Path::root().child_key("a"), "1"), t0);
        let touched = HashSet::new();
        let first_tick = buf.tick(&touched);
        assert!(first_tick.is_empty());
        let second_tick = buf.tick(&touched);
        assert_eq!(second_tick.len(), 1);
    }

    #[test]
    fn touched_path_resets_stability_via_offer() {
        let mut buf = CoalescingBuffer::new(10_000, 2, 100);
        let t0 = Instant::now();
        let path = Path::root().child_key("a");
        buf.offer(add(path.clone(), "1"), t0);
        let mut touched = HashSet::new();
        touched.insert(path.clone());
        buf.tick(&touched);
        buf.offer(add(path.clone(), "2"), t0); // resets stability counter
        let empty = HashSet::new();
        let flushed = buf.tick(&empty);
        assert!(flushed.is_empty(), "stability counter should have reset");
    }

    #[test]
    fn explicit_flush_all_preserves_pending_order() {
        let mut buf = CoalescingBuffer::new(10_000, 10, 100);
        let t0 = Instant::now();
        buf.offer(add(Path::root().child_key("b"), "1"), t0);
        buf.offer(add(Path::root().child_key("a"), "1"), t0);
        let flushed = buf.flush_all();
        assert_eq!(flushed[0].path(), &Path::root().child_key("b"));
        assert_eq!(flushed[1].path(), &Path::root().child_key("a"));
    }
}
