//! Per-session parse state and the `ingest`/`current_tree`/`raw_buffer`/
//! `finalize` operations.

use std::time::Instant;

use jsonstab_completer::{complete, CompletionResult, SchemaHook};
use jsonstab_config::Config;
use jsonstab_path::{Node, PartialTree};
use jsonstab_selector::StrategySelector;
use jsonstab_utils::{CancellationToken, JsonStabError, Result, RingBuffer};

use crate::boundary::{find_closed_root_boundary, nearest_safe_split_at_or_before};
use crate::tree_build::{from_serde_value, merge};

/// The session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Draining,
    Terminal,
}

/// Returned from every `ingest` call; summarizes what happened without
/// forcing the caller to snapshot the tree just to find out.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub state: SessionState,
    /// True if the committed tree changed as a result of this ingest,
    /// either by a strict-parse commit or a probe-mode overlay.
    pub tree_changed: bool,
    /// True if the change came from a strict parse that advanced the
    /// cursor, as opposed to a non-destructive probe overlay.
    pub cursor_advanced: bool,
    /// Bytes dropped from the ring buffer by an overflow split, if any.
    pub dropped_bytes: usize,
    /// Set when a chunk could not be resolved even in probe mode; the
    /// session keeps running, per the propagation policy.
    pub unrecoverable: bool,
}

/// One session's incremental parse state.
pub struct ParseState {
    buffer: RingBuffer,
    capacity: usize,
    /// Bytes of `buffer`'s current content already folded into
    /// `strict_committed`, i.e. the strict-parse cursor.
    cursor: usize,
    strict_committed: Node,
    /// What `current_tree()` returns: `strict_committed`, or a probe-mode
    /// overlay when the tail hasn't strictly parsed yet.
    display_tree: Node,
    state: SessionState,
    selector: StrategySelector,
}

impl ParseState {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            buffer: RingBuffer::new(config.max_buffer_bytes),
            capacity: config.max_buffer_bytes,
            cursor: 0,
            strict_committed: Node::null(),
            display_tree: Node::null(),
            state: SessionState::Idle,
            selector: StrategySelector::new(
                config.default_strategy,
                config.adaptive_enabled,
                config.consecutive_failure_threshold,
                config.min_switch_interval_seconds,
            ),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Snapshot of the committed tree.
    #[must_use]
    pub fn current_tree(&self) -> PartialTree {
        self.display_tree.clone()
    }

    /// The accumulated text not yet folded into the strict-parse cursor.
    #[must_use]
    pub fn raw_buffer(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Append a chunk and try to extend the committed tree.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStabError::SessionClosed`] if the session is already
    /// `Terminal`, or [`JsonStabError::Cancelled`] if `cancel` was already
    /// signalled before this call's one cooperative checkpoint.
    pub fn ingest(
        &mut self,
        chunk: &[u8],
        is_final: bool,
        now: Instant,
        schema_hook: Option<&SchemaHook>,
        cancel: &CancellationToken,
    ) -> Result<ProgressReport> {
        if self.state == SessionState::Terminal {
            return Err(JsonStabError::session_closed("session"));
        }
        if cancel.is_cancelled() {
            return Err(JsonStabError::Cancelled);
        }
        if self.state == SessionState::Idle {
            self.state = SessionState::Active;
        }

        let dropped_bytes = self.write_chunk(chunk);
        let text = self.buffer_as_str();

        let mut tree_changed = false;
        let mut cursor_advanced = false;
        let mut unrecoverable = false;

        if let Some(boundary) = find_closed_root_boundary(&text[self.cursor..]) {
            let candidate = &text[self.cursor..self.cursor + boundary];
            match serde_json::from_str::<serde_json::Value>(candidate) {
                Ok(value) => {
                    let parsed = from_serde_value(value);
                    self.strict_committed = merge(&self.strict_committed, &parsed);
                    self.display_tree = self.strict_committed.clone();
                    self.cursor += boundary;
                    tree_changed = true;
                    cursor_advanced = true;
                }
                Err(_) => {
                    // Safe point: between boundary detection and the
                    // completer's repair pass.
                    if cancel.is_cancelled() {
                        return Err(JsonStabError::Cancelled);
                    }
                    let probe = self.probe(&text[self.cursor..], now, schema_hook);
                    tree_changed = probe.0;
                    unrecoverable = probe.1;
                }
            }
        } else if self.cursor < text.len() {
            if cancel.is_cancelled() {
                return Err(JsonStabError::Cancelled);
            }
            let probe = self.probe(&text[self.cursor..], now, schema_hook);
            tree_changed = probe.0;
            unrecoverable = probe.1;
        }

        if is_final {
            self.state = SessionState::Draining;
        }

        Ok(ProgressReport {
            state: self.state,
            tree_changed,
            cursor_advanced,
            dropped_bytes,
            unrecoverable,
        })
    }

    /// Run the completer in non-destructive probe mode over the
    /// not-yet-committed tail and overlay the result onto `display_tree`
    /// without moving the cursor.
    fn probe(&mut self, tail: &str, now: Instant, schema_hook: Option<&SchemaHook>) -> (bool, bool) {
        let result: CompletionResult = complete(tail, None, &mut self.selector, schema_hook, now);
        match serde_json::from_str::<serde_json::Value>(&result.repaired) {
            Ok(value) => {
                let probed = from_serde_value(value);
                self.display_tree = merge(&self.strict_committed, &probed);
                (true, !result.is_valid)
            }
            Err(_) => (false, true),
        }
    }

    /// Mark the stream finished: run the completer over whatever remains
    /// unparsed, commit the final tree, and transition to `Terminal`.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStabError::SessionClosed`] if already `Terminal`, or
    /// [`JsonStabError::Cancelled`] if cancelled before the completer ran;
    /// in the cancelled case the session is left in `Draining`, not
    /// `Terminal`, so a retry can still complete it.
    pub fn finalize(&mut self, now: Instant, schema_hook: Option<&SchemaHook>, cancel: &CancellationToken) -> Result<CompletionResult> {
        if self.state == SessionState::Terminal {
            return Err(JsonStabError::session_closed("session"));
        }
        self.state = SessionState::Draining;
        if cancel.is_cancelled() {
            return Err(JsonStabError::Cancelled);
        }
        let text = self.buffer_as_str();
        let residual = &text[self.cursor..];
        let result = complete(residual, None, &mut self.selector, schema_hook, now);
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&result.repaired) {
            let parsed = from_serde_value(value);
            self.strict_committed = merge(&self.strict_committed, &parsed);
            self.display_tree = self.strict_committed.clone();
        }
        self.state = SessionState::Terminal;
        Ok(result)
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> usize {
        let incoming_end = self.buffer.len() + chunk.len();
        let mut dropped = 0usize;
        if incoming_end > self.capacity {
            let text = self.buffer_as_str();
            let overflow_by = incoming_end - self.capacity;
            let split = nearest_safe_split_at_or_before(&text, overflow_by.min(text.len()));
            if split > 0 {
                self.buffer.drop_prefix(split);
                self.cursor = self.cursor.saturating_sub(split);
                dropped = split;
            }
        }
        self.buffer.write(chunk);
        dropped
    }

    fn buffer_as_str(&self) -> String {
        let bytes = self.buffer.to_vec();
        match std::str::from_utf8(&bytes) {
            Ok(s) => s.to_string(),
            Err(e) => {
                // A chunk boundary split a multi-byte codepoint; only use
                // the valid prefix until the rest of the codepoint arrives.
                String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
            }
        }
    }
}
