//! Phase L: character-level normalization that never changes structural
//! token count or nesting.
//!
//! Operates only outside string literals: trimming or normalizing
//! whitespace inside a string literal would corrupt user data.

use crate::types::{Phase, RepairStep};

pub fn normalize(input: &str) -> (String, Vec<RepairStep>) {
    let mut out = String::with_capacity(input.len());
    let mut steps = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut changed_whitespace = false;

    for (idx, ch) in input.char_indices() {
        if in_string {
            out.push(ch);
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
                out.push(ch);
            }
            c if c.is_whitespace() && c != ' ' => {
                out.push(' ');
                changed_whitespace = true;
                let _ = idx;
            }
            c => out.push(c),
        }
    }

    if changed_whitespace {
        steps.push(RepairStep::new(
            Phase::Lexical,
            "normalize-whitespace",
            "normalized non-ASCII whitespace to space outside string literals",
            (0, input.len()),
            0.95,
            true,
        ));
    }

    let trimmed_len = out.trim_end().len();
    if trimmed_len < out.len() && !in_string {
        let removed = out.len() - trimmed_len;
        out.truncate(trimmed_len);
        steps.push(RepairStep::new(
            Phase::Lexical,
            "trim-trailing-whitespace",
            format!("trimmed {removed} trailing whitespace byte(s)"),
            (trimmed_len, trimmed_len + removed),
            0.99,
            true,
        ));
    }

    (out, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_whitespace() {
        let (out, steps) = normalize("{\"a\":1}   ");
        assert_eq!(out, "{\"a\":1}");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].operation, "trim-trailing-whitespace");
    }

    #[test]
    fn normalizes_unicode_whitespace_outside_strings() {
        let (out, steps) = normalize("{\"a\":\u{00A0}1}");
        assert_eq!(out, "{\"a\": 1}");
        assert!(steps.iter().any(|s| s.operation == "normalize-whitespace"));
    }

    #[test]
    fn does_not_touch_whitespace_inside_strings() {
        let input = "{\"a\":\"x\u{00A0}y\"}";
        let (out, steps) = normalize(input);
        assert_eq!(out, input);
        assert!(steps.is_empty());
    }

    #[test]
    fn already_clean_input_produces_no_steps() {
        let (out, steps) = normalize("{\"a\":1}");
        assert_eq!(out, "{\"a\":1}");
        assert!(steps.is_empty());
    }
}
