//! Regex source helpers.
//!
//! Grammars describe patterns as regex *source* text. Nothing is compiled until
//! the grammar compiler knows the language's case sensitivity, so everything in
//! this module produces strings.
//!
//! ## Learning: Combining Regexes
//!
//! The engine scans with one big alternation per mode instead of trying every
//! child pattern separately. Gluing patterns together shifts their capture
//! groups, so [`join_alternation`] has to renumber backreferences like `\1` as
//! it goes.

use std::fmt;

use fancy_regex::Regex;

use crate::{GrammarError, GrammarResult};

/// A regex source as written by a grammar author.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern(String);

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// A pattern matching `text` literally.
    pub fn literal(text: &str) -> Self {
        Self(escape(text))
    }

    pub fn source(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Self(source)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escapes `text` so that it matches literally.
pub fn escape(text: &str) -> String {
    fancy_regex::escape(text).into_owned()
}

/// Source of an optional pattern. `None` stays `None`.
pub fn to_source(pattern: Option<&Pattern>) -> Option<&str> {
    pattern.map(Pattern::source)
}

/// Concatenates pattern sources.
pub fn concat<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts.into_iter().fold(String::new(), |mut acc, part| {
        acc.push_str(part.as_ref());
        acc
    })
}

pub fn lookahead(pattern: &str) -> String {
    format!("(?={pattern})")
}

pub fn optional(pattern: &str) -> String {
    format!("(?:{pattern})?")
}

/// Any one of `alternatives`, as a non-capturing group.
pub fn either<I, S>(alternatives: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<S> = alternatives.into_iter().collect();
    let joined: Vec<&str> = parts.iter().map(AsRef::as_ref).collect();
    format!("(?:{})", joined.join("|"))
}

/// Number of capture groups in `source`, not counting the whole match.
pub fn count_capture_groups(source: &str) -> GrammarResult<usize> {
    let regex = Regex::new(source).map_err(|err| GrammarError::invalid_pattern(source, &err))?;
    Ok(regex.captures_len().saturating_sub(1))
}

/// Joins `patterns` into one alternation, wrapping each in a capture group.
///
/// Every backreference inside a pattern is shifted by the number of groups
/// that precede it in the combined regex, so `\1` keeps pointing at the
/// pattern's own first group.
///
/// ```
/// use glint_grammar::pattern::join_alternation;
///
/// assert_eq!(join_alternation(&[r"(a)\1", r"(b)\1"]), r"((a)\2)|((b)\4)");
/// ```
pub fn join_alternation<S: AsRef<str>>(patterns: &[S]) -> String {
    let mut out = String::new();
    let mut captures = 0;

    for (i, pattern) in patterns.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        captures += 1;
        let offset = captures;
        out.push('(');
        captures += shift_backreferences(pattern.as_ref(), offset, &mut out);
        out.push(')');
    }

    out
}

/// Copies `source` into `out` with every `\N` rewritten to `\(N + offset)`.
/// Returns the number of capture groups opened by `source`.
fn shift_backreferences(source: &str, offset: usize, out: &mut String) -> usize {
    let bytes = source.as_bytes();
    let mut groups = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let digits = bytes[i + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
                let reference = if digits > 0 && bytes[i + 1] != b'0' {
                    source[i + 1..i + 1 + digits].parse::<usize>().ok()
                } else {
                    None
                };
                match reference {
                    Some(n) => {
                        out.push('\\');
                        out.push_str(&(n + offset).to_string());
                        i += 1 + digits;
                    }
                    None => {
                        let len = 1 + char_len(source, i + 1);
                        out.push_str(&source[i..i + len]);
                        i += len;
                    }
                }
            }
            b'[' => {
                let end = class_end(source, i);
                out.push_str(&source[i..end]);
                i = end;
            }
            b'(' => {
                if opens_capture(&source[i..]) {
                    groups += 1;
                }
                out.push('(');
                i += 1;
            }
            _ => {
                let len = char_len(source, i);
                out.push_str(&source[i..i + len]);
                i += len;
            }
        }
    }

    groups
}

fn char_len(source: &str, index: usize) -> usize {
    source
        .get(index..)
        .and_then(|rest| rest.chars().next())
        .map_or(0, char::len_utf8)
}

/// Index just past the character class that opens at `start`.
fn class_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = start + 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }

    let mut depth = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1 + char_len(source, i + 1),
            b'[' => {
                depth += 1;
                i += 1;
            }
            b']' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += char_len(source, i),
        }
    }
    bytes.len()
}

fn opens_capture(group: &str) -> bool {
    let Some(rest) = group.strip_prefix("(?") else {
        return true;
    };
    // named groups capture; lookbehinds and flag groups do not
    rest.starts_with("P<") || (rest.starts_with('<') && !rest.starts_with("<=") && !rest.starts_with("<!"))
}
