//! Adaptive strategy selection driven by historical success rates.
//!
//! This state lives entirely on a [`StrategySelector`] instance owned by a
//! session, never in module statics, so tests get deterministic behavior
//! from a fresh selector.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use jsonstab_config::Strategy;

const RECENT_FAILURE_HISTORY: usize = 8;

/// Per-strategy historical record.
#[derive(Debug, Clone)]
pub struct StrategyRecord {
    pub attempts: u32,
    pub successes: u32,
    pub failures: u32,
    pub mean_confidence: f64,
    pub last_used: Option<Instant>,
    pub recent_failure_types: VecDeque<String>,
    consecutive_failures: u32,
}

impl Default for StrategyRecord {
    fn default() -> Self {
        Self {
            attempts: 0,
            successes: 0,
            failures: 0,
            mean_confidence: 0.0,
            last_used: None,
            recent_failure_types: VecDeque::new(),
            consecutive_failures: 0,
        }
    }
}

impl StrategyRecord {
    /// `successes / attempts`, or `0.0` with no history — a strategy that has
    /// never run contributes no confidence boost.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.successes) / f64::from(self.attempts)
        }
    }

    /// `0.6·success_rate + 0.4·mean_confidence`, the ranking used both to pick
    /// a replacement strategy and as the historical-success confidence factor.
    #[must_use]
    pub fn weighted_score(&self) -> f64 {
        0.6 * self.success_rate() + 0.4 * self.mean_confidence
    }

    fn record(&mut self, success: bool, confidence: f64, failure_type: Option<String>, now: Instant) {
        self.attempts += 1;
        if success {
            self.successes += 1;
            self.consecutive_failures = 0;
        } else {
            self.failures += 1;
            self.consecutive_failures += 1;
            if let Some(ft) = failure_type {
                if self.recent_failure_types.len() == RECENT_FAILURE_HISTORY {
                    self.recent_failure_types.pop_front();
                }
                self.recent_failure_types.push_back(ft);
            }
        }
        // running mean
        let n = f64::from(self.attempts);
        self.mean_confidence += (confidence - self.mean_confidence) / n;
        self.last_used = Some(now);
    }
}

/// Owns per-strategy history and the current-strategy switching policy.
/// One instance per session.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    records: [StrategyRecord; 3],
    current: Strategy,
    last_switch: Option<Instant>,
    consecutive_failure_threshold: u32,
    min_switch_interval: Duration,
    adaptive_enabled: bool,
}

fn index_of(strategy: Strategy) -> usize {
    match strategy {
        Strategy::Conservative => 0,
        Strategy::Smart => 1,
        Strategy::Aggressive => 2,
    }
}

impl StrategySelector {
    #[must_use]
    pub fn new(
        default_strategy: Strategy,
        adaptive_enabled: bool,
        consecutive_failure_threshold: u32,
        min_switch_interval_seconds: u64,
    ) -> Self {
        Self {
            records: Default::default(),
            current: default_strategy,
            last_switch: None,
            consecutive_failure_threshold,
            min_switch_interval: Duration::from_secs(min_switch_interval_seconds),
            adaptive_enabled,
        }
    }

    #[must_use]
    pub fn current(&self) -> Strategy {
        self.current
    }

    #[must_use]
    pub fn record_for(&self, strategy: Strategy) -> &StrategyRecord {
        &self.records[index_of(strategy)]
    }

    /// Select a strategy for the next completion call, honoring an explicit
    /// caller hint or applying the adaptive switching rule.
    pub fn select(&mut self, explicit: Option<Strategy>, now: Instant) -> Strategy {
        if let Some(s) = explicit {
            return s;
        }
        if !self.adaptive_enabled {
            return self.current;
        }
        let current_record = &self.records[index_of(self.current)];
        let exceeded_threshold = current_record.consecutive_failures >= self.consecutive_failure_threshold;
        let cooldown_elapsed = self
            .last_switch
            .map_or(true, |t| now.duration_since(t) >= self.min_switch_interval);

        if exceeded_threshold && cooldown_elapsed {
            if let Some(best) = self.best_alternative(self.current) {
                self.current = best;
                self.last_switch = Some(now);
            }
        }
        self.current
    }

    fn best_alternative(&self, excluding: Strategy) -> Option<Strategy> {
        Strategy::all()
            .into_iter()
            .filter(|s| *s != excluding)
            .max_by(|a, b| {
                let sa = self.records[index_of(*a)].weighted_score();
                let sb = self.records[index_of(*b)].weighted_score();
                sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Record the outcome of a completion attempt made with `strategy`.
    pub fn record_outcome(
        &mut self,
        strategy: Strategy,
        success: bool,
        confidence: f64,
        failure_type: Option<String>,
        now: Instant,
    ) {
        self.records[index_of(strategy)].record(success, confidence, failure_type, now);
        if !success {
            tracing::debug!(?strategy, "completion attempt failed");
        }
    }
}
