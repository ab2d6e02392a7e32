//! Combined matchers.
//!
//! Each compiled mode owns a [`ResumableMatcher`] over its ordered rules: one
//! begin rule per child, then the mode's end terminator, then its illegal
//! pattern. All rules are joined into a single alternation so one regex search
//! finds the earliest candidate, with ties going to the earlier rule.
//!
//! ## Learning: Resuming After a Rejected Match
//!
//! A begin callback may veto a match. The engine then wants "the next
//! candidate at this same position", which a plain regex search cannot give:
//! it would find the vetoed rule again. The resumable matcher keeps one
//! alternation per starting rule and retries with only the rules after the
//! vetoed one.

use std::ops::Range;
use std::sync::OnceLock;

use fancy_regex::Regex;

use crate::compiler::{ModeId, lang_re};
use crate::pattern::{count_capture_groups, join_alternation};
use crate::GrammarResult;

/// What a rule does when it wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Enter the child mode.
    Begin(ModeId),
    /// Leave the current mode (or an ancestor).
    End,
    /// The text is not allowed here.
    Illegal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherRule {
    pub source: String,
    pub kind: RuleKind,
}

impl MatcherRule {
    pub fn new(source: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }
}

/// A successful match of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub start: usize,
    pub end: usize,
    pub kind: RuleKind,
    /// Position of the rule in the mode's rule list.
    pub position: usize,
    /// `groups[0]` is the whole match, then the rule's own capture groups.
    pub groups: Vec<Option<Range<usize>>>,
}

impl RuleMatch {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A regex failed while searching, e.g. by exceeding its backtracking limit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("regex evaluation failed: {message}")]
pub struct MatchFailure {
    pub message: String,
}

impl From<fancy_regex::Error> for MatchFailure {
    fn from(err: fancy_regex::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RuleSlot {
    group: usize,
    captures: usize,
    position: usize,
    kind: RuleKind,
}

/// One alternation over a run of rules.
#[derive(Debug)]
pub struct MultiMatcher {
    regex: Option<Regex>,
    slots: Vec<RuleSlot>,
}

impl MultiMatcher {
    /// Builds a matcher over `rules`, which start at `first_position` in the
    /// mode's full rule list.
    pub fn new(rules: &[MatcherRule], first_position: usize, case_insensitive: bool) -> GrammarResult<Self> {
        let captures = rules
            .iter()
            .map(|rule| count_capture_groups(&rule.source))
            .collect::<GrammarResult<Vec<_>>>()?;
        Self::with_captures(rules, &captures, first_position, case_insensitive)
    }

    fn with_captures(
        rules: &[MatcherRule],
        captures: &[usize],
        first_position: usize,
        case_insensitive: bool,
    ) -> GrammarResult<Self> {
        let mut slots = Vec::with_capacity(rules.len());
        let mut group = 1;
        for (offset, (rule, &count)) in rules.iter().zip(captures).enumerate() {
            slots.push(RuleSlot {
                group,
                captures: count,
                position: first_position + offset,
                kind: rule.kind,
            });
            group += count + 1;
        }

        let regex = if rules.is_empty() {
            None
        } else {
            let sources: Vec<&str> = rules.iter().map(|rule| rule.source.as_str()).collect();
            Some(lang_re(&join_alternation(&sources), case_insensitive)?)
        };

        Ok(Self { regex, slots })
    }

    /// Earliest match at or after byte offset `from`.
    pub fn exec(&self, text: &str, from: usize) -> Result<Option<RuleMatch>, MatchFailure> {
        let Some(regex) = &self.regex else {
            return Ok(None);
        };
        if from > text.len() {
            return Ok(None);
        }
        let Some(caps) = regex.captures_from_pos(text, from)? else {
            return Ok(None);
        };
        let Some(whole) = caps.get(0) else {
            return Ok(None);
        };
        // only the winning rule's wrapper group participates
        let Some(slot) = self.slots.iter().find(|slot| caps.get(slot.group).is_some()) else {
            return Ok(None);
        };

        let groups = (slot.group..=slot.group + slot.captures)
            .map(|i| caps.get(i).map(|m| m.start()..m.end()))
            .collect();

        Ok(Some(RuleMatch {
            start: whole.start(),
            end: whole.end(),
            kind: slot.kind,
            position: slot.position,
            groups,
        }))
    }
}

/// Where a scan is, and which rules are still in play there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCursor {
    pub last_index: usize,
    regex_index: usize,
}

impl ScanCursor {
    pub fn at(last_index: usize) -> Self {
        Self {
            last_index,
            regex_index: 0,
        }
    }

    /// Puts every rule back in play.
    pub fn consider_all(&mut self) {
        self.regex_index = 0;
    }

    /// Index of the first rule still in play. Zero means all of them.
    pub fn regex_index(&self) -> usize {
        self.regex_index
    }
}

/// Rule matcher that can resume after a rejected match.
#[derive(Debug)]
pub struct ResumableMatcher {
    rules: Vec<MatcherRule>,
    captures: Vec<usize>,
    matchers: Vec<OnceLock<MultiMatcher>>,
    begin_count: usize,
    case_insensitive: bool,
}

impl ResumableMatcher {
    /// Validates every rule and builds the full matcher up front. Truncated
    /// matchers are built on first use.
    pub fn new(rules: Vec<MatcherRule>, case_insensitive: bool) -> GrammarResult<Self> {
        let captures = rules
            .iter()
            .map(|rule| count_capture_groups(&rule.source))
            .collect::<GrammarResult<Vec<_>>>()?;
        let begin_count = rules.iter().filter(|rule| matches!(rule.kind, RuleKind::Begin(_))).count();

        let matchers: Vec<OnceLock<MultiMatcher>> = (0..=rules.len()).map(|_| OnceLock::new()).collect();
        let full = MultiMatcher::with_captures(&rules, &captures, 0, case_insensitive)?;
        let _ = matchers[0].set(full);

        Ok(Self {
            rules,
            captures,
            matchers,
            begin_count,
            case_insensitive,
        })
    }

    pub fn rules(&self) -> &[MatcherRule] {
        &self.rules
    }

    pub fn begin_count(&self) -> usize {
        self.begin_count
    }

    fn matcher_from(&self, index: usize) -> Result<&MultiMatcher, MatchFailure> {
        let index = index.min(self.rules.len());
        let slot = &self.matchers[index];
        if let Some(matcher) = slot.get() {
            return Ok(matcher);
        }

        let built = MultiMatcher::with_captures(
            &self.rules[index..],
            &self.captures[index..],
            index,
            self.case_insensitive,
        )
        .map_err(|err| MatchFailure {
            message: err.to_string(),
        })?;
        // a concurrent caller may have won the race; either value is equal
        let _ = slot.set(built);
        slot.get().ok_or_else(|| MatchFailure {
            message: "matcher was not initialized".to_string(),
        })
    }

    /// Finds the next rule match at or after `cursor.last_index`.
    ///
    /// When the cursor was left mid-list by a rejected match, only the rules
    /// after the rejected one are tried at that position; if none of them
    /// matches exactly there, the search restarts with all rules one character
    /// further on.
    pub fn exec(&self, text: &str, cursor: &mut ScanCursor) -> Result<Option<RuleMatch>, MatchFailure> {
        let resuming = cursor.regex_index != 0;
        let mut result = self.matcher_from(cursor.regex_index)?.exec(text, cursor.last_index)?;

        if resuming && !result.as_ref().is_some_and(|m| m.start == cursor.last_index) {
            result = match next_char_boundary(text, cursor.last_index) {
                Some(next) => self.matcher_from(0)?.exec(text, next)?,
                None => None,
            };
        }

        if let Some(found) = &result {
            cursor.regex_index = found.position + 1;
            if cursor.regex_index >= self.begin_count {
                cursor.consider_all();
            }
        }
        Ok(result)
    }
}

/// Byte offset of the character after the one at `index`.
pub fn next_char_boundary(text: &str, index: usize) -> Option<usize> {
    let ch = text.get(index..)?.chars().next()?;
    Some(index + ch.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin(source: &str, id: usize) -> MatcherRule {
        MatcherRule::new(source, RuleKind::Begin(ModeId::new(id)))
    }

    #[test]
    fn test_multi_matcher_reports_rule_and_groups() {
        let rules = vec![begin("x", 1), begin(r"(a)(b)?", 2), MatcherRule::new(";", RuleKind::End)];
        let matcher = MultiMatcher::new(&rules, 0, false).unwrap();

        let found = matcher.exec("zza;", 0).unwrap().unwrap();
        assert_eq!(found.kind, RuleKind::Begin(ModeId::new(2)));
        assert_eq!(found.position, 1);
        assert_eq!((found.start, found.end), (2, 3));
        assert_eq!(found.groups, vec![Some(2..3), Some(2..3), None]);

        let end = matcher.exec("zza;", 3).unwrap().unwrap();
        assert_eq!(end.kind, RuleKind::End);
        assert!(matcher.exec("zza;", 4).unwrap().is_none());
    }

    #[test]
    fn test_earlier_rule_wins_ties() {
        let rules = vec![begin("ab", 1), begin("a", 2)];
        let matcher = MultiMatcher::new(&rules, 0, false).unwrap();
        let found = matcher.exec("ab", 0).unwrap().unwrap();
        assert_eq!(found.position, 0);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let rules = vec![begin("select", 1)];
        let matcher = MultiMatcher::new(&rules, 0, true).unwrap();
        assert!(matcher.exec("SELECT", 0).unwrap().is_some());
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = MultiMatcher::new(&[], 0, false).unwrap();
        assert!(matcher.exec("anything", 0).unwrap().is_none());
    }

    #[test]
    fn test_resume_tries_later_rules_at_same_position() {
        let rules = vec![begin("a", 1), begin("a", 2), begin("b", 3)];
        let matcher = ResumableMatcher::new(rules, false).unwrap();

        let mut cursor = ScanCursor::at(0);
        let first = matcher.exec("ab", &mut cursor).unwrap().unwrap();
        assert_eq!(first.position, 0);
        assert_eq!(cursor.regex_index(), 1);

        // rejected: try again at the same spot
        let second = matcher.exec("ab", &mut cursor).unwrap().unwrap();
        assert_eq!(second.position, 1);
        assert_eq!(second.start, 0);

        // rejected again: no later rule matches at 0, so scan on from 1
        let third = matcher.exec("ab", &mut cursor).unwrap().unwrap();
        assert_eq!(third.position, 2);
        assert_eq!(third.start, 1);
        assert_eq!(cursor.regex_index(), 0);
    }

    #[test]
    fn test_invalid_rule_is_rejected_eagerly() {
        let rules = vec![begin("(", 1)];
        assert!(ResumableMatcher::new(rules, false).is_err());
    }

    #[test]
    fn test_next_char_boundary() {
        assert_eq!(next_char_boundary("aé", 0), Some(1));
        assert_eq!(next_char_boundary("aé", 1), Some(3));
        assert_eq!(next_char_boundary("aé", 3), None);
    }
}
