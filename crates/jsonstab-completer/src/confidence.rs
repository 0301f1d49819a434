//! Confidence scoring and severity classification.

use crate::types::{Phase, RepairStep, Severity};

/// Severity follows from which repair rules fired: closing an already-open
/// container is cosmetic, synthesizing a missing value is more invasive,
/// and closing strings or dropping dangling keys changes the most content.
#[must_use]
pub fn determine_severity(steps: &[RepairStep]) -> Severity {
    if steps.is_empty() {
        return Severity::Minor;
    }
    let has_major = steps
        .iter()
        .any(|s| matches!(s.operation.as_str(), "close-string" | "insert-key-value" | "remove-dangling-key"));
    if has_major {
        return Severity::Major;
    }
    let has_moderate = steps.iter().any(|s| {
        matches!(
            s.operation.as_str(),
            "complete-trailing-literal" | "complete-trailing-number" | "insert-dangling-value" | "remove-dangling-separator"
        )
    });
    if has_moderate {
        return Severity::Moderate;
    }
    Severity::Minor
}

/// Final confidence is the arithmetic mean of the contributing factors
/// that are available, with the severity penalty applied as a
/// multiplicative scaling of that mean rather than averaged in alongside
/// the others — it's a `×` penalty, not another `[0,1]` factor.
#[must_use]
pub fn compute(
    original: &str,
    repaired: &str,
    steps: &[RepairStep],
    severity: Severity,
    schema_factor: Option<f64>,
    historical_success_rate: Option<f64>,
) -> f64 {
    let original_len = original.chars().count() as f64;
    let repaired_len = repaired.chars().count() as f64;
    let added = (repaired_len - original_len).max(0.0);
    let base_factor = if original_len == 0.0 {
        0.1
    } else {
        (1.0 - (added / original_len).min(0.9)).max(0.1)
    };

    let total_steps = steps.len();
    let lexical_steps = steps.iter().filter(|s| s.phase == Phase::Lexical).count();
    let lexical_ratio = if total_steps == 0 {
        1.0
    } else {
        0.7 + 0.3 * (lexical_steps as f64 / total_steps as f64)
    };

    let applied: Vec<&RepairStep> = steps.iter().filter(|s| s.applied).collect();
    let step_confidence_mean = if applied.is_empty() {
        1.0
    } else {
        applied.iter().map(|s| s.confidence).sum::<f64>() / applied.len() as f64
    };

    let mut factors = vec![base_factor, lexical_ratio, step_confidence_mean];
    if let Some(s) = schema_factor {
        factors.push(s);
    }
    if let Some(h) = historical_success_rate {
        factors.push(h);
    }
    let mean = factors.iter().sum::<f64>() / factors.len() as f64;
    (mean * severity.penalty()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_steps_means_minor_severity() {
        assert_eq!(determine_severity(&[]), Severity::Minor);
    }

    #[test]
    fn string_closure_is_major() {
        let steps = vec![RepairStep::new(Phase::Syntactic, "close-string", "x", (0, 1), 0.8, true)];
        assert_eq!(determine_severity(&steps), Severity::Major);
    }

    #[test]
    fn container_close_only_is_minor() {
        let steps = vec![RepairStep::new(Phase::Syntactic, "close-object", "x", (0, 1), 0.9, true)];
        assert_eq!(determine_severity(&steps), Severity::Minor);
    }

    #[test]
    fn confidence_is_clamped_and_penalized_by_severity() {
        let steps = vec![RepairStep::new(Phase::Syntactic, "close-string", "x", (0, 1), 0.7, true)];
        let c = compute("abc", "abcd", &steps, Severity::Major, None, None);
        assert!(c > 0.0 && c <= 1.0);
    }
}
