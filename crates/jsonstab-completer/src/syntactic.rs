//! Phase S: structural closure of a truncated JSON fragment.
//!
//! Operates on the Phase-L output, scanning left to right with a stack of
//! open-container frames, applying repair rules in decreasing order of
//! locality: unterminated string, trailing primitive, dangling separator,
//! then closing whatever containers remain open.

use jsonstab_config::Strategy;

use crate::types::{Phase, RepairStep};

struct Scan {
    /// Expected closers, in open order (`}` for `{`, `]` for `[`).
    stack: Vec<char>,
    in_string: bool,
    last_quote_start: Option<usize>,
    /// Byte offset of a closing bracket with no matching open frame — the
    /// point past which this scheme cannot repair.
    irrecoverable_at: Option<usize>,
}

fn scan(text: &str) -> Scan {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut last_quote_start = None;
    let mut irrecoverable_at = None;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                last_quote_start = Some(idx);
            }
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => match stack.pop() {
                Some(expected) if expected == ch => {}
                _ => {
                    if irrecoverable_at.is_none() {
                        irrecoverable_at = Some(idx);
                    }
                }
            },
            _ => {}
        }
    }

    Scan {
        stack,
        in_string,
        last_quote_start,
        irrecoverable_at,
    }
}

fn last_top_level_separator(text: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escape = false;
    let mut last = None;
    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ',' | ':' | '{' | '[' => last = Some(idx),
            _ => {}
        }
    }
    last
}

enum TailKind<'a> {
    Empty,
    LiteralPrefix(&'a str),
    NumberFragment,
    Other,
}

fn is_number_fragment(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let looks_numeric = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        && s.chars().next().is_some_and(|c| c == '-' || c.is_ascii_digit());
    if !looks_numeric {
        return false;
    }
    let complete = s.parse::<f64>().is_ok()
        && !s.ends_with(['.', '-', '+'])
        && !s.to_ascii_lowercase().ends_with('e');
    !complete
}

fn classify_tail(tail: &str) -> TailKind<'_> {
    if tail.is_empty() {
        return TailKind::Empty;
    }
    for lit in ["true", "false", "null"] {
        if lit.starts_with(tail) && tail.len() < lit.len() {
            return TailKind::LiteralPrefix(lit);
        }
    }
    if is_number_fragment(tail) {
        return TailKind::NumberFragment;
    }
    TailKind::Other
}

/// Result of Phase S: the repaired text, the steps applied, and whether the
/// input was irrecoverable by this scheme (a closer with no open frame).
pub struct SyntacticResult {
    pub text: String,
    pub steps: Vec<RepairStep>,
    pub irrecoverable: bool,
}

pub fn close(text: &str, strategy: Strategy) -> SyntacticResult {
    let scan_result = scan(text);
    if let Some(pos) = scan_result.irrecoverable_at {
        return SyntacticResult {
            text: text.to_string(),
            steps: vec![RepairStep::new(
                Phase::Syntactic,
                "irrecoverable-closer",
                "closing punctuation with no matching open frame",
                (pos, pos + 1),
                0.0,
                false,
            )],
            irrecoverable: true,
        };
    }

    let mut base = text.to_string();
    let mut steps = Vec::new();
    let mut skip_primitive_and_separator_rules = false;

    if scan_result.in_string {
        let quote_start = scan_result.last_quote_start.unwrap_or(text.len());
        let enclosing_is_object = scan_result.stack.last() == Some(&'}');
        let prefix_trimmed_len = text[..quote_start].trim_end().len();
        let preceding = if prefix_trimmed_len == 0 {
            None
        } else {
            text[..prefix_trimmed_len].chars().last()
        };
        let is_dangling_key = enclosing_is_object && matches!(preceding, Some('{') | Some(','));

        if is_dangling_key {
            let sep_pos = prefix_trimmed_len - 1;
            let sep_char = preceding.expect("is_dangling_key implies Some");
            match strategy {
                Strategy::Aggressive => {
                    let distance = text.len().saturating_sub(quote_start);
                    let confidence = (0.85 - (distance as f64 * 0.0005)).clamp(0.70, 0.85);
                    let at = base.len();
                    base.push('"');
                    steps.push(RepairStep::new(
                        Phase::Syntactic,
                        "close-string",
                        "closed an unterminated object-key string",
                        (at, at + 1),
                        confidence,
                        true,
                    ));
                    let at2 = base.len();
                    base.push_str(": null");
                    steps.push(RepairStep::new(
                        Phase::Syntactic,
                        "insert-key-value",
                        "synthesized a null value for a dangling key",
                        (at2, at2 + 6),
                        0.6,
                        true,
                    ));
                }
                Strategy::Conservative | Strategy::Smart => {
                    let truncate_at = if sep_char == ',' { sep_pos } else { sep_pos + 1 };
                    base.truncate(truncate_at);
                    steps.push(RepairStep::new(
                        Phase::Syntactic,
                        "remove-dangling-key",
                        "removed an incomplete trailing object key",
                        (sep_pos, text.len()),
                        0.8,
                        true,
                    ));
                }
            }
        } else {
            let distance = text.len().saturating_sub(quote_start);
            let confidence = (0.85 - (distance as f64 * 0.0005)).clamp(0.70, 0.85);
            let at = base.len();
            base.push('"');
            steps.push(RepairStep::new(
                Phase::Syntactic,
                "close-string",
                "closed an unterminated string literal",
                (at, at + 1),
                confidence,
                true,
            ));
        }
        skip_primitive_and_separator_rules = true;
    }

    if !skip_primitive_and_separator_rules {
        let sep_idx = last_top_level_separator(&base);
        let tail_start = sep_idx.map_or(0, |i| i + 1);
        let raw_tail = &base[tail_start..];
        let tail = raw_tail.trim();
        let separator_char = sep_idx.and_then(|i| base[i..].chars().next());

        match classify_tail(tail) {
            TailKind::LiteralPrefix(lit) => {
                let at = tail_start;
                let replacement = match strategy {
                    Strategy::Conservative => "null".to_string(),
                    Strategy::Smart | Strategy::Aggressive => lit.to_string(),
                };
                let confidence = match strategy {
                    Strategy::Conservative => 0.75,
                    Strategy::Smart => 0.8,
                    Strategy::Aggressive => 0.8,
                };
                base.truncate(tail_start);
                base.push_str(&replacement);
                steps.push(RepairStep::new(
                    Phase::Syntactic,
                    "complete-trailing-literal",
                    format!("completed trailing partial literal '{tail}' to '{replacement}'"),
                    (at, at + raw_tail.len()),
                    confidence,
                    true,
                ));
            }
            TailKind::NumberFragment => {
                let at = tail_start;
                let replacement = match strategy {
                    Strategy::Conservative => "null".to_string(),
                    Strategy::Smart => truncate_to_valid_number(tail),
                    Strategy::Aggressive => extend_number_fragment(tail),
                };
                let confidence = match strategy {
                    Strategy::Conservative => 0.7,
                    Strategy::Smart => 0.75,
                    Strategy::Aggressive => 0.65,
                };
                base.truncate(tail_start);
                base.push_str(&replacement);
                steps.push(RepairStep::new(
                    Phase::Syntactic,
                    "complete-trailing-number",
                    format!("completed trailing numeric fragment '{tail}' to '{replacement}'"),
                    (at, at + raw_tail.len()),
                    confidence,
                    true,
                ));
            }
            TailKind::Empty => {
                if let Some(sep) = separator_char {
                    if sep == ',' {
                        let at = sep_idx.unwrap();
                        match strategy {
                            Strategy::Conservative => {
                                base.truncate(at);
                                steps.push(RepairStep::new(
                                    Phase::Syntactic,
                                    "remove-dangling-separator",
                                    "removed a trailing comma with no following element",
                                    (at, at + 1),
                                    0.8,
                                    true,
                                ));
                            }
                            Strategy::Smart | Strategy::Aggressive => {
                                let default_value = if strategy == Strategy::Aggressive { "\"\"" } else { "null" };
                                base.truncate(tail_start);
                                base.push_str(default_value);
                                steps.push(RepairStep::new(
                                    Phase::Syntactic,
                                    "insert-dangling-value",
                                    format!("synthesized a value ({default_value}) after a dangling comma"),
                                    (at, at + 1),
                                    0.75,
                                    true,
                                ));
                            }
                        }
                    } else if sep == ':' {
                        let at = sep_idx.unwrap();
                        let default_value = match strategy {
                            Strategy::Conservative => "null",
                            Strategy::Smart => "null",
                            Strategy::Aggressive => "\"\"",
                        };
                        base.truncate(tail_start);
                        base.push_str(default_value);
                        steps.push(RepairStep::new(
                            Phase::Syntactic,
                            "insert-dangling-value",
                            format!("synthesized a value ({default_value}) for a key with no value"),
                            (at, at + 1),
                            0.75,
                            true,
                        ));
                    }
                }
            }
            TailKind::Other => {}
        }
    }

    let rescan = scan(&base);
    for closer in rescan.stack.iter().rev() {
        let at = base.len();
        base.push(*closer);
        let op = if *closer == '}' { "close-object" } else { "close-array" };
        steps.push(RepairStep::new(Phase::Syntactic, op, format!("closed open container with '{closer}'"), (at, at + 1), 0.9, true));
    }

    SyntacticResult {
        text: base,
        steps,
        irrecoverable: false,
    }
}

fn truncate_to_valid_number(tail: &str) -> String {
    let mut candidate = tail.to_string();
    while !candidate.is_empty() && candidate.parse::<f64>().is_err() {
        candidate.pop();
    }
    if candidate.is_empty() {
        "0".to_string()
    } else {
        candidate
    }
}

fn extend_number_fragment(tail: &str) -> String {
    if tail.ends_with(['.', 'e', 'E']) {
        format!("{tail}0")
    } else if tail.ends_with(['-', '+']) {
        format!("{tail}1")
    } else {
        truncate_to_valid_number(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggressive_completes_dangling_key_with_null_value() {
        let result = close("{\"name\": \"Alice\", \"ag", Strategy::Aggressive);
        assert_eq!(result.text, "{\"name\": \"Alice\", \"ag\": null}");
    }

    #[test]
    fn conservative_and_smart_drop_dangling_key_entirely() {
        let conservative = close("{\"name\": \"Alice\", \"ag", Strategy::Conservative);
        assert_eq!(conservative.text, "{\"name\": \"Alice\"}");
        let smart = close("{\"name\": \"Alice\", \"ag", Strategy::Smart);
        assert_eq!(smart.text, "{\"name\": \"Alice\"}");
    }

    #[test]
    fn closes_unterminated_string() {
        let result = close("{\"name\":\"Alice", Strategy::Smart);
        assert_eq!(result.text, "{\"name\":\"Alice\"}");
        assert!(result.steps.iter().any(|s| s.operation == "close-string"));
    }

    #[test]
    fn completes_trailing_literal_smart() {
        let result = close("{\"ok\":tru", Strategy::Smart);
        assert_eq!(result.text, "{\"ok\":true}");
    }

    #[test]
    fn completes_trailing_literal_conservative_uses_null() {
        let result = close("{\"ok\":tru", Strategy::Conservative);
        assert_eq!(result.text, "{\"ok\":null}");
    }

    #[test]
    fn dangling_comma_removed_under_conservative() {
        let result = close("{\"a\":1,", Strategy::Conservative);
        assert_eq!(result.text, "{\"a\":1}");
    }

    #[test]
    fn dangling_comma_gets_null_under_smart() {
        let result = close("{\"a\":1,", Strategy::Smart);
        assert_eq!(result.text, "{\"a\":1,null}");
    }

    #[test]
    fn dangling_colon_gets_null_under_smart() {
        let result = close("{\"a\":", Strategy::Smart);
        assert_eq!(result.text, "{\"a\":null}");
    }

    #[test]
    fn closes_nested_open_containers_in_order() {
        let result = close("{\"a\":[1,2", Strategy::Smart);
        assert_eq!(result.text, "{\"a\":[1,2]}");
    }

    #[test]
    fn detects_irrecoverable_stray_closer() {
        let result = close("}", Strategy::Smart);
        assert!(result.irrecoverable);
    }

    #[test]
    fn already_balanced_input_only_applies_available_rules() {
        let result = close("{\"a\":1}", Strategy::Smart);
        assert_eq!(result.text, "{\"a\":1}");
        assert!(result.steps.is_empty());
    }
}
