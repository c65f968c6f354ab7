//! Rule-file reader.
//!
//! Rules may span several physical lines. Lines are accumulated until the
//! candidate contains an arrow, does not end with one, and has balanced
//! `()`, `[]` and `{}` nesting.
//!
//! Comment stripping is not string-aware: a `//` inside a quoted literal still
//! starts a comment. Rule files are written around this, so it is kept.

use crate::errors::{GenErrorKind, GenResult};
use crate::rule::{Location, Rule};

/// Split rule-file text into complete rules, in file order.
pub fn read_rules(file: &str, text: &str) -> GenResult<Vec<Rule>> {
    let mut rules = Vec::new();
    let mut rule = String::new();
    let mut start_line = 0;
    let mut arrow_line = 0;

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = match line.find("//") {
            Some(i) => &line[..i],
            None => line,
        };

        rule.push(' ');
        rule.push_str(line.trim());
        rule = rule.trim().to_owned();
        if rule.is_empty() {
            continue;
        }
        if start_line == 0 {
            start_line = lineno;
        }
        if !rule.contains("->") {
            continue;
        }
        if arrow_line == 0 {
            arrow_line = lineno;
        }
        if rule.ends_with("->") || unbalanced(&rule) {
            continue;
        }

        rules.push(Rule::new(
            std::mem::take(&mut rule),
            Location::new(file, arrow_line),
        ));
        start_line = 0;
        arrow_line = 0;
    }

    if !rule.is_empty() {
        let loc = Location::new(file, start_line);
        return Err(if unbalanced(&rule) {
            GenErrorKind::UnbalancedRule { loc, text: rule }
        } else {
            GenErrorKind::IncompleteRule { loc, text: rule }
        }
        .into());
    }

    tracing::debug!(file, count = rules.len(), "read rules");
    Ok(rules)
}

/// Whether any of `()`, `[]` or `{}` has mismatched open/close counts.
fn unbalanced(s: &str) -> bool {
    let mut counts = [0i64; 3];
    for c in s.chars() {
        match c {
            '(' => counts[0] += 1,
            ')' => counts[0] -= 1,
            '[' => counts[1] += 1,
            ']' => counts[1] -= 1,
            '{' => counts[2] += 1,
            '}' => counts[2] -= 1,
            _ => {}
        }
    }
    counts.iter().any(|&n| n != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_rules() {
        let rules = read_rules(
            "generic.rules",
            "(Add64 x (Const64 [0])) -> x\n(Neg64 (Neg64 x)) -> x\n",
        )
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].text, "(Add64 x (Const64 [0])) -> x");
        assert_eq!(rules[0].loc, Location::new("generic.rules", 1));
        assert_eq!(rules[1].loc.line, 2);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text =
            "// Copyright header\n\n(Neg64 (Neg64 x)) -> x // double negation\n   // trailing\n";
        let rules = read_rules("generic.rules", text).unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].text, "(Neg64 (Neg64 x)) -> x");
        assert_eq!(rules[0].loc.line, 3);
    }

    #[test]
    fn test_wrapped_rule_location_is_arrow_line() {
        let text = "(Add64\n  x\n  (Const64 [0]))\n  ->\n  x\n";
        let rules = read_rules("generic.rules", text).unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].text, "(Add64 x (Const64 [0])) -> x");
        assert_eq!(rules[0].loc.line, 4);
    }

    #[test]
    fn test_result_wrapped_across_lines() {
        let text = "(Mul64 x (Const64 [2])) -> (Add64\n    x x)\n";
        let rules = read_rules("generic.rules", text).unwrap();

        assert_eq!(rules[0].text, "(Mul64 x (Const64 [2])) -> (Add64 x x)");
        assert_eq!(rules[0].loc.line, 1);
    }

    #[test]
    fn test_brackets_must_balance() {
        let text = "(Load {sym -> x\n} ptr) -> (Copy ptr)\n";
        let rules = read_rules("generic.rules", text).unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].text, "(Load {sym -> x } ptr) -> (Copy ptr)");
    }

    #[test]
    fn test_comment_inside_literal_is_still_a_comment() {
        let text = "(StringMake {\"a//b\"} x) -> x\n)\n";
        let err = read_rules("generic.rules", text).unwrap_err();

        // The line is cut at `//`, leaving `(StringMake {"a` which never balances.
        assert!(matches!(err.kind(), GenErrorKind::UnbalancedRule { .. }));
    }

    #[test]
    fn test_unbalanced_at_end_of_input() {
        let text = "(Neg64 (Neg64 x)) -> x\n\n(Add64 x (Const64 [0]) -> x\n";
        let err = read_rules("generic.rules", text).unwrap_err();

        assert_eq!(
            err.to_string(),
            "generic.rules:3: unbalanced rule: (Add64 x (Const64 [0]) -> x"
        );
    }

    #[test]
    fn test_dangling_arrow_at_end_of_input() {
        let err = read_rules("generic.rules", "(Neg64 x) ->\n").unwrap_err();
        assert!(matches!(err.kind(), GenErrorKind::IncompleteRule { .. }));
    }
}
