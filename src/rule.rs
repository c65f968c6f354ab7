//! Rules and the top-level rule splitter.
//!
//! A rule reads `pattern [&& condition] -> result`. Only arrows and `&&` at
//! bracket depth zero count as separators, so host code inside `[...]`,
//! `{...}` or nested s-expressions is never split.

use std::fmt;

use crate::errors::{GenErrorKind, GenResult};

/// Source position of a rule: file name and the line holding its arrow.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One complete rule as read from a rule file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub text: String,
    pub loc: Location,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {:?} at {}", self.text, self.loc)
    }
}

/// The three textual parts of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleParts<'a> {
    pub pattern: &'a str,
    pub cond: Option<&'a str>,
    pub result: &'a str,
}

impl Rule {
    pub fn new(text: impl Into<String>, loc: Location) -> Self {
        Self {
            text: text.into(),
            loc,
        }
    }

    /// Split the rule into pattern, optional condition and result.
    pub fn parts(&self) -> GenResult<RuleParts<'_>> {
        let arrows = top_level_matches(&self.text, "->");
        let arrow = match arrows.as_slice() {
            [] => {
                return Err(GenErrorKind::NoArrow {
                    loc: self.loc.clone(),
                    text: self.text.clone(),
                }
                .into());
            }
            [arrow] => *arrow,
            _ => {
                return Err(GenErrorKind::MultipleArrows {
                    loc: self.loc.clone(),
                    text: self.text.clone(),
                }
                .into());
            }
        };

        let lhs = self.text[..arrow].trim();
        let result = self.text[arrow + 2..].trim();
        let (pattern, cond) = match top_level_matches(lhs, "&&").first() {
            Some(&i) => (lhs[..i].trim(), Some(lhs[i + 2..].trim())),
            None => (lhs, None),
        };

        if pattern.is_empty() || result.is_empty() || cond == Some("") {
            return Err(GenErrorKind::Syntax {
                loc: self.loc.clone(),
                message: format!("rule {:?} has an empty pattern, condition or result", self.text),
            }
            .into());
        }

        Ok(RuleParts {
            pattern,
            cond,
            result,
        })
    }
}

/// Byte offsets of `needle` occurrences outside any `()`, `[]` or `{}`.
fn top_level_matches(text: &str, needle: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ if depth == 0 && bytes[i..].starts_with(needle.as_bytes()) => {
                found.push(i);
                i += needle.len();
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    found
}
