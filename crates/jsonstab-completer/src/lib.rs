//! The two-phase repair engine.
//!
//! Phase L (lexical) and Phase S (syntactic) never fail loudly: a malformed
//! input always produces a [`CompletionResult`] with `is_valid=false` and a
//! populated trace rather than an error.

pub mod confidence;
pub mod json_patch;
pub mod lexical;
pub mod syntactic;
pub mod types;

use std::time::Instant;

use jsonstab_config::Strategy;
use jsonstab_path::Path;
use jsonstab_selector::StrategySelector;

pub use types::{CompletionResult, Phase, RepairStep, RepairTrace, Severity, Suggestion};

/// `(tree, path) -> suggestions`, invoked after every successful completion
/// when registered. Kept over `serde_json::Value` rather
/// than our own tree type to avoid coupling this crate to the parser.
pub type SchemaHook = dyn Fn(&serde_json::Value, &Path) -> Vec<Suggestion> + Send + Sync;

/// Run one completion attempt, retrying with progressively more
/// conservative strategies on round-trip failure.
///
/// Never panics on malformed input. Selector outcomes are recorded as a
/// side effect so the adaptive selector's history stays current.
pub fn complete(
    input: &str,
    strategy_hint: Option<Strategy>,
    selector: &mut StrategySelector,
    schema_hook: Option<&SchemaHook>,
    now: Instant,
) -> CompletionResult {
    if input.is_empty() {
        return complete_empty(selector, strategy_hint, now);
    }
    if let Ok(_already) = serde_json::from_str::<serde_json::Value>(input) {
        return complete_already_valid(input, selector, strategy_hint, now);
    }

    let mut strategy = selector.select(strategy_hint, now);
    loop {
        let (lex_text, lex_steps) = lexical::normalize(input);
        let syn = syntactic::close(&lex_text, strategy);

        if syn.irrecoverable {
            let mut steps = lex_steps;
            steps.extend(syn.steps);
            selector.record_outcome(strategy, false, 0.0, Some("irrecoverable".to_string()), now);
            let trace = RepairTrace {
                original_text: input.to_string(),
                repaired_text: syn.text.clone(),
                steps,
                confidence: 0.0,
                severity: Severity::Critical,
                strategy,
            };
            return CompletionResult {
                repaired: syn.text,
                is_valid: false,
                confidence: 0.0,
                strategy,
                trace,
                schema_suggestions_applied: 0,
                historical_success_rate: selector.record_for(strategy).success_rate(),
            };
        }

        let mut steps = lex_steps;
        steps.extend(syn.steps.clone());

        match serde_json::from_str::<serde_json::Value>(&syn.text) {
            Ok(mut value) => {
                let severity = confidence::determine_severity(&steps);
                let mut applied_count = 0usize;
                if let Some(hook) = schema_hook {
                    let suggestions = hook(&value, &Path::root());
                    for suggestion in suggestions {
                        let exists_already = json_patch::get_in(&value, &suggestion.path).is_some();
                        if exists_already
                            && strategy == Strategy::Aggressive
                            && json_patch::set_in(&mut value, &suggestion.path, suggestion.suggested_value)
                        {
                            applied_count += 1;
                        }
                    }
                }
                let schema_factor = schema_hook.map(|_| (0.8 + 0.04 * applied_count as f64).min(1.0));
                let historical_rate = selector.record_for(strategy).success_rate();
                let conf = confidence::compute(input, &syn.text, &steps, severity, schema_factor, Some(historical_rate));
                let repaired_text = if applied_count > 0 {
                    serde_json::to_string(&value).unwrap_or_else(|_| syn.text.clone())
                } else {
                    syn.text.clone()
                };

                selector.record_outcome(strategy, true, conf, None, now);
                let trace = RepairTrace {
                    original_text: input.to_string(),
                    repaired_text: repaired_text.clone(),
                    steps,
                    confidence: conf,
                    severity,
                    strategy,
                };
                return CompletionResult {
                    repaired: repaired_text,
                    is_valid: true,
                    confidence: conf,
                    strategy,
                    trace,
                    schema_suggestions_applied: applied_count,
                    historical_success_rate: historical_rate,
                };
            }
            Err(_) => {
                selector.record_outcome(strategy, false, 0.0, Some("round-trip-failed".to_string()), now);
                match strategy.fallback() {
                    Some(next) => strategy = next,
                    None => {
                        let trace = RepairTrace {
                            original_text: input.to_string(),
                            repaired_text: syn.text.clone(),
                            steps,
                            confidence: 0.0,
                            severity: Severity::Critical,
                            strategy,
                        };
                        return CompletionResult {
                            repaired: syn.text,
                            is_valid: false,
                            confidence: 0.0,
                            strategy,
                            trace,
                            schema_suggestions_applied: 0,
                            historical_success_rate: selector.record_for(strategy).success_rate(),
                        };
                    }
                }
            }
        }
    }
}

fn complete_empty(selector: &mut StrategySelector, strategy_hint: Option<Strategy>, now: Instant) -> CompletionResult {
    let strategy = selector.select(strategy_hint, now);
    let confidence = if strategy == Strategy::Aggressive { 1.0 } else { 0.0 };
    selector.record_outcome(strategy, true, confidence, None, now);
    let trace = RepairTrace {
        original_text: String::new(),
        repaired_text: "null".to_string(),
        steps: Vec::new(),
        confidence,
        severity: Severity::Minor,
        strategy,
    };
    CompletionResult {
        repaired: "null".to_string(),
        is_valid: true,
        confidence,
        strategy,
        trace,
        schema_suggestions_applied: 0,
        historical_success_rate: selector.record_for(strategy).success_rate(),
    }
}

fn complete_already_valid(
    input: &str,
    selector: &mut StrategySelector,
    strategy_hint: Option<Strategy>,
    now: Instant,
) -> CompletionResult {
    let strategy = selector.select(strategy_hint, now);
    selector.record_outcome(strategy, true, 1.0, None, now);
    let step = RepairStep::new(Phase::Lexical, "already-valid", "input was already valid JSON", (0, input.len()), 1.0, true);
    let trace = RepairTrace {
        original_text: input.to_string(),
        repaired_text: input.to_string(),
        steps: vec![step],
        confidence: 1.0,
        severity: Severity::Minor,
        strategy,
    };
    CompletionResult {
        repaired: input.to_string(),
        is_valid: true,
        confidence: 1.0,
        strategy,
        trace,
        schema_suggestions_applied: 0,
        historical_success_rate: selector.record_for(strategy).success_rate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> StrategySelector {
        StrategySelector::new(Strategy::Smart, true, 3, 60)
    }

    #[test]
    fn empty_input_smart_has_zero_confidence() {
        let mut sel = selector();
        let result = complete("", None, &mut sel, None, Instant::now());
        assert_eq!(result.repaired, "null");
        assert!(result.is_valid);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn empty_input_aggressive_has_full_confidence() {
        let mut sel = selector();
        let result = complete("", Some(Strategy::Aggressive), &mut sel, None, Instant::now());
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn already_valid_short_circuits() {
        let mut sel = selector();
        let result = complete("{\"a\":1}", None, &mut sel, None, Instant::now());
        assert_eq!(result.repaired, "{\"a\":1}");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.trace.steps.len(), 1);
        assert_eq!(result.trace.steps[0].operation, "already-valid");
    }

    #[test]
    fn smart_completion_of_truncated_object() {
        let mut sel = selector();
        let result = complete(r#"{"name": "Alice", "age": 25"#, Some(Strategy::Smart), &mut sel, None, Instant::now());
        assert_eq!(result.repaired, r#"{"name": "Alice", "age": 25}"#);
        assert!(result.is_valid);
        assert!(result.confidence >= 0.7);
        assert!(result.trace.steps.iter().any(|s| s.operation == "close-object"));
        assert_eq!(result.strategy, Strategy::Smart);
    }

    #[test]
    fn aggressive_completion_of_mid_key_object() {
        let mut sel = selector();
        let result = complete(r#"{"name": "Alice", "ag"#, Some(Strategy::Aggressive), &mut sel, None, Instant::now());
        assert_eq!(result.repaired, r#"{"name": "Alice", "ag": null}"#);
        assert!(result.is_valid);
    }

    #[test]
    fn conservative_completion_of_mid_key_object() {
        let mut sel = selector();
        let result = complete(r#"{"name": "Alice", "ag"#, Some(Strategy::Conservative), &mut sel, None, Instant::now());
        assert_eq!(result.repaired, r#"{"name": "Alice"}"#);
        assert!(result.is_valid);
    }

    #[test]
    fn irrecoverable_closer_yields_invalid_with_critical_severity() {
        let mut sel = selector();
        let result = complete("}", None, &mut sel, None, Instant::now());
        assert!(!result.is_valid);
        assert_eq!(result.trace.severity, Severity::Critical);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn failure_retries_fall_back_to_more_conservative_strategy() {
        // An input with a stray closer is irrecoverable before any
        // strategy-dependent rule runs, so this exercises the short-circuit
        // path rather than the fallback loop; the fallback loop is exercised
        // indirectly whenever Aggressive's round-trip fails, which the
        // literal/number completion paths are built to avoid in practice.
        let mut sel = selector();
        let result = complete(r#"{"a": tru"#, None, &mut sel, None, Instant::now());
        assert!(result.is_valid);
    }
}
