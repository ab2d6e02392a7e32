//! Grammar compiler.
//!
//! Turns a declarative [`Language`] into a [`CompiledLanguage`]: every mode
//! resolved to its final begin, end and terminator patterns, keywords compiled
//! into lookup tables, and a ready-to-run matcher per mode.
//!
//! ## Learning: Identity-Keyed Memoization
//!
//! The same `Arc<Mode>` may be reachable from many parents. The compiler keys
//! its memo on the `Arc`'s pointer and keeps the `Arc` alive inside the memo,
//! so an address can never be reused by a different mode mid-compilation.
//! Modes that depend on their parent are copied into a fresh `Arc` first, which
//! gives each parent its own compiled instance.

use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;

use crate::hooks::{Hook, skip_if_dot_adjacent};
use crate::keywords::{KeywordTable, Keywords};
use crate::matcher::{MatcherRule, ResumableMatcher, RuleKind};
use crate::mode::{ChildRef, Language, Mode, SubLanguage, flag};
use crate::pattern::Pattern;
use crate::{GrammarError, GrammarResult};

/// Matches the empty string anywhere.
const MATCH_ANYWHERE: &str = r"\B|\b";
const DEFAULT_KEYWORD_PATTERN: &str = r"\w+";
const DEFAULT_RELEVANCE: u32 = 1;

/// Index of a compiled mode in its language's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(usize);

impl ModeId {
    /// The language's top-level context.
    pub const ROOT: ModeId = ModeId(0);

    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A mode ready for scanning.
#[derive(Debug)]
pub struct CompiledMode {
    pub class_name: Option<String>,
    /// Final begin source. `None` only for the root.
    pub begin: Option<String>,
    /// The mode's own end pattern.
    pub end_re: Option<Regex>,
    /// Everything that can end this mode: its end, then inherited parent ends.
    pub terminator_end: Option<String>,
    pub illegal: Option<String>,
    pub keywords: Option<KeywordTable>,
    pub keyword_pattern: Regex,
    pub relevance: u32,
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_begin: bool,
    pub return_end: bool,
    pub ends_with_parent: bool,
    pub ends_parent: bool,
    pub end_same_as_begin: bool,
    pub skip: bool,
    pub sub_language: Option<SubLanguage>,
    pub contains: Vec<ModeId>,
    pub starts: Option<ModeId>,
    pub before_begin: Option<Hook>,
    pub on_begin: Option<Hook>,
    pub on_end: Option<Hook>,
    pub matcher: ResumableMatcher,
}

/// A compiled grammar. Immutable, and safe to share across threads.
#[derive(Debug)]
pub struct CompiledLanguage {
    pub name: String,
    pub aliases: Vec<String>,
    pub case_insensitive: bool,
    pub disable_autodetect: bool,
    modes: Vec<CompiledMode>,
}

impl CompiledLanguage {
    pub fn root(&self) -> &CompiledMode {
        self.mode(ModeId::ROOT)
    }

    /// # Panics
    ///
    /// If `id` did not come from this language.
    pub fn mode(&self, id: ModeId) -> &CompiledMode {
        &self.modes[id.0]
    }

    pub fn modes(&self) -> impl Iterator<Item = (ModeId, &CompiledMode)> {
        self.modes.iter().enumerate().map(|(i, mode)| (ModeId(i), mode))
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    /// Compiles `source` with this language's flags.
    pub fn regex(&self, source: &str) -> GrammarResult<Regex> {
        lang_re(source, self.case_insensitive)
    }
}

/// Compiles `source` in multi-line mode, adding case folding when asked.
pub fn lang_re(source: &str, case_insensitive: bool) -> GrammarResult<Regex> {
    let flags = if case_insensitive { "(?mi)" } else { "(?m)" };
    Regex::new(&format!("{flags}{source}")).map_err(|err| GrammarError::invalid_pattern(source, &err))
}

/// The modes a child reference stands for.
///
/// Variants become one merged mode each, cached on the declaring mode so later
/// expansions return the same instances. A mode that depends on its parent is
/// copied, since its terminator differs per parent. Anything else is shared.
pub fn expand_or_clone(mode: &Arc<Mode>) -> Vec<Arc<Mode>> {
    if let Some(variants) = mode.expanded_variants() {
        return variants.to_vec();
    }
    if mode.depends_on_parent() {
        let mut copy = Mode::clone(mode);
        copy.starts = mode.starts.as_ref().map(|starts| Arc::new(Mode::clone(starts)));
        return vec![Arc::new(copy)];
    }
    vec![Arc::clone(mode)]
}

/// Compiles a grammar.
pub fn compile_language(language: &Language) -> GrammarResult<CompiledLanguage> {
    if language.mode.children().iter().any(ChildRef::is_self) {
        return Err(GrammarError::TopLevelSelfReference {
            language: language.name.clone(),
        });
    }

    let mut compiler = Compiler::new(language.case_insensitive);
    let root = Arc::new(language.mode.clone());
    compiler.compile_mode(&root, None)?;
    let modes = compiler.finish();

    tracing::debug!(language = %language.name, modes = modes.len(), "Compiled grammar");

    Ok(CompiledLanguage {
        name: language.name.clone(),
        aliases: language.aliases.clone(),
        case_insensitive: language.case_insensitive,
        disable_autodetect: language.disable_autodetect,
        modes,
    })
}

struct ParentContext {
    terminator_end: Option<String>,
}

struct Compiler {
    case_insensitive: bool,
    slots: Vec<Option<CompiledMode>>,
    begins: Vec<Option<String>>,
    memo: HashMap<*const Mode, (Arc<Mode>, ModeId)>,
}

impl Compiler {
    fn new(case_insensitive: bool) -> Self {
        Self {
            case_insensitive,
            slots: Vec::new(),
            begins: Vec::new(),
            memo: HashMap::new(),
        }
    }

    fn lang_re(&self, source: &str) -> GrammarResult<Regex> {
        lang_re(source, self.case_insensitive)
    }

    fn finish(self) -> Vec<CompiledMode> {
        // every reserved slot is filled before compile_mode returns
        self.slots.into_iter().flatten().collect()
    }

    fn compile_mode(&mut self, mode: &Arc<Mode>, parent: Option<&ParentContext>) -> GrammarResult<ModeId> {
        if let Some((_, id)) = self.memo.get(&Arc::as_ptr(mode)) {
            return Ok(*id);
        }

        let id = ModeId(self.slots.len());
        self.slots.push(None);
        self.begins.push(None);
        self.memo.insert(Arc::as_ptr(mode), (Arc::clone(mode), id));

        if mode.lexemes.is_some() && mode.keyword_pattern.is_some() {
            return Err(GrammarError::ConflictingKeywordPattern);
        }
        let keyword_source = mode
            .keyword_pattern
            .as_ref()
            .or(mode.lexemes.as_ref())
            .map_or(DEFAULT_KEYWORD_PATTERN, Pattern::source);
        let keyword_pattern = self.lang_re(keyword_source)?;

        let raw_keywords = mode
            .keywords
            .clone()
            .or_else(|| mode.begin_keywords.clone().map(Keywords::Flat));
        let keywords = raw_keywords.map(|raw| KeywordTable::compile(&raw, self.case_insensitive));

        let ends_with_parent = flag(mode.ends_with_parent);
        let mut before_begin = None;
        let mut end_re = None;
        let mut terminator_end = None;

        if let Some(parent) = parent {
            let begin = match &mode.begin_keywords {
                Some(words) => {
                    before_begin = Some(Hook::from_fn(skip_if_dot_adjacent));
                    let words: Vec<&str> = words.split_whitespace().collect();
                    format!(r"\b({})(?=\b|\s)", words.join("|"))
                }
                None => mode.begin.as_ref().map_or(MATCH_ANYWHERE, Pattern::source).to_string(),
            };
            self.lang_re(&begin)?;

            let end = if flag(mode.end_same_as_begin) {
                Some(begin.clone())
            } else {
                mode.end.as_ref().map(|end| end.source().to_string())
            };
            let end = match end {
                None if !ends_with_parent => Some(MATCH_ANYWHERE.to_string()),
                other => other,
            };
            if let Some(end) = &end {
                end_re = Some(self.lang_re(end)?);
            }

            let mut terminator = end.unwrap_or_default();
            if ends_with_parent {
                if let Some(parent_end) = parent.terminator_end.as_deref() {
                    if !terminator.is_empty() {
                        terminator.push('|');
                    }
                    terminator.push_str(parent_end);
                }
            }
            terminator_end = Some(terminator).filter(|t| !t.is_empty());
            self.begins[id.0] = Some(begin);
        }

        let illegal = match &mode.illegal {
            Some(pattern) => {
                self.lang_re(pattern.source())?;
                Some(pattern.source().to_string())
            }
            None => None,
        };

        let context = ParentContext {
            terminator_end: terminator_end.clone(),
        };
        let mut contains = Vec::new();
        for child in mode.children() {
            match child {
                ChildRef::SelfRef => contains.push(id),
                ChildRef::Mode(child) => {
                    for expanded in expand_or_clone(child) {
                        contains.push(self.compile_mode(&expanded, Some(&context))?);
                    }
                }
            }
        }

        let starts = match &mode.starts {
            Some(starts) => Some(self.compile_mode(starts, parent)?),
            None => None,
        };

        let mut rules = Vec::with_capacity(contains.len() + 2);
        for &child in &contains {
            // the root never appears as a child, so every child has a begin
            if let Some(begin) = &self.begins[child.0] {
                rules.push(MatcherRule::new(begin.clone(), RuleKind::Begin(child)));
            }
        }
        if let Some(terminator) = &terminator_end {
            rules.push(MatcherRule::new(terminator.clone(), RuleKind::End));
        }
        if let Some(illegal) = &illegal {
            rules.push(MatcherRule::new(illegal.clone(), RuleKind::Illegal));
        }
        let matcher = ResumableMatcher::new(rules, self.case_insensitive)?;

        self.slots[id.0] = Some(CompiledMode {
            class_name: mode.class_name.clone(),
            begin: self.begins[id.0].clone(),
            end_re,
            terminator_end,
            illegal,
            keywords,
            keyword_pattern,
            relevance: mode.relevance.unwrap_or(DEFAULT_RELEVANCE),
            exclude_begin: flag(mode.exclude_begin),
            exclude_end: flag(mode.exclude_end),
            return_begin: flag(mode.return_begin),
            return_end: flag(mode.return_end),
            ends_with_parent,
            ends_parent: flag(mode.ends_parent),
            end_same_as_begin: flag(mode.end_same_as_begin),
            skip: flag(mode.skip),
            sub_language: mode.sub_language.clone(),
            contains,
            starts,
            before_begin,
            on_begin: mode.on_begin.clone(),
            on_end: mode.on_end.clone(),
            matcher,
        });

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::ScanCursor;

    fn string_mode() -> Arc<Mode> {
        Arc::new(Mode::new().class_name("string").begin("\"").end("\""))
    }

    #[test]
    fn test_shared_child_compiles_once() {
        let string = string_mode();
        let language = Language::new("test").mode(
            Mode::new().contains([
                ChildRef::from(&string),
                ChildRef::from(Mode::new().begin(r"\(").end(r"\)").contains([ChildRef::from(&string)])),
            ]),
        );
        let compiled = compile_language(&language).unwrap();

        // root, string, parens
        assert_eq!(compiled.mode_count(), 3);
        let root = compiled.root();
        let parens = compiled.mode(root.contains[1]);
        assert_eq!(parens.contains[0], root.contains[0]);
    }

    #[test]
    fn test_top_level_self_is_rejected() {
        let language = Language::new("bad").mode(Mode::new().contains([ChildRef::SelfRef]));
        assert_eq!(
            compile_language(&language).unwrap_err(),
            GrammarError::TopLevelSelfReference { language: "bad".into() }
        );
    }

    #[test]
    fn test_self_reference_points_back() {
        let language = Language::new("nest").mode(
            Mode::new().contains([Mode::new().begin(r"\{").end(r"\}").contains([ChildRef::SelfRef])]),
        );
        let compiled = compile_language(&language).unwrap();
        let block_id = compiled.root().contains[0];
        assert_eq!(compiled.mode(block_id).contains, vec![block_id]);
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let language = Language::new("test").mode(Mode::new().contains([Mode::new().class_name("x")]));
        let compiled = compile_language(&language).unwrap();
        let child = compiled.mode(compiled.root().contains[0]);
        assert_eq!(child.begin.as_deref(), Some(MATCH_ANYWHERE));
        assert_eq!(child.terminator_end.as_deref(), Some(MATCH_ANYWHERE));
        assert_eq!(child.relevance, 1);
        assert!(compiled.root().begin.is_none());
        assert!(compiled.root().terminator_end.is_none());
    }

    #[test]
    fn test_terminators_inherit_parent_ends() {
        let c = Mode::new().class_name("c").begin("y").ends_with_parent();
        let b = Mode::new().class_name("b").begin("x").ends_with_parent().contains([c]);
        let a = Mode::new().class_name("a").begin("<").end(">").contains([b]);
        let compiled = compile_language(&Language::new("t").mode(Mode::new().contains([a]))).unwrap();

        let a_id = compiled.root().contains[0];
        let b_id = compiled.mode(a_id).contains[0];
        let c_id = compiled.mode(b_id).contains[0];
        assert_eq!(compiled.mode(b_id).terminator_end.as_deref(), Some(">"));
        assert_eq!(compiled.mode(c_id).terminator_end.as_deref(), Some(">"));
        assert!(compiled.mode(c_id).end_re.is_none());
    }

    #[test]
    fn test_parent_dependent_modes_get_private_copies() {
        let value = Arc::new(Mode::new().class_name("value").begin(":").ends_with_parent());
        let language = Language::new("t").mode(Mode::new().contains([
            Mode::new().begin(r"\{").end(r"\}").contains([ChildRef::from(&value)]),
            Mode::new().begin(r"\[").end(r"\]").contains([ChildRef::from(&value)]),
        ]));
        let compiled = compile_language(&language).unwrap();

        let root = compiled.root();
        let in_braces = compiled.mode(root.contains[0]).contains[0];
        let in_brackets = compiled.mode(root.contains[1]).contains[0];
        assert_ne!(in_braces, in_brackets);
        assert_eq!(compiled.mode(in_braces).terminator_end.as_deref(), Some(r"\}"));
        assert_eq!(compiled.mode(in_brackets).terminator_end.as_deref(), Some(r"\]"));
    }

    #[test]
    fn test_variants_expand_into_siblings() {
        let string = Mode::new()
            .class_name("string")
            .variants([Mode::new().begin("'").end("'"), Mode::new().begin("\"").end("\"")]);
        let compiled = compile_language(&Language::new("t").mode(Mode::new().contains([string]))).unwrap();
        assert_eq!(compiled.root().contains.len(), 2);
        for &id in &compiled.root().contains {
            assert_eq!(compiled.mode(id).class_name.as_deref(), Some("string"));
        }
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let string = string_mode();
        let language = Language::new("t").mode(Mode::new().contains([ChildRef::from(&string)]));
        let first = compile_language(&language).unwrap();
        let second = compile_language(&language).unwrap();
        assert_eq!(first.mode_count(), second.mode_count());
        assert_eq!(first.mode(ModeId(1)).begin, second.mode(ModeId(1)).begin);
    }

    #[test]
    fn test_begin_keywords() {
        let language = Language::new("t").mode(Mode::new().contains([Mode::new().begin_keywords("class struct")]));
        let compiled = compile_language(&language).unwrap();
        let child = compiled.mode(compiled.root().contains[0]);
        assert_eq!(child.begin.as_deref(), Some(r"\b(class|struct)(?=\b|\s)"));
        assert!(child.before_begin.is_some());
        assert!(child.keywords.as_ref().unwrap().get("struct").is_some());
    }

    #[test]
    fn test_invalid_patterns_fail_at_compile_time() {
        let language = Language::new("t").mode(Mode::new().contains([Mode::new().begin("(")]));
        assert!(matches!(
            compile_language(&language),
            Err(GrammarError::InvalidPattern { .. })
        ));

        let language = Language::new("t").mode(Mode::new().illegal("[").contains([Mode::new().begin("a")]));
        assert!(compile_language(&language).is_err());
    }

    #[test]
    fn test_conflicting_keyword_patterns() {
        let language = Language::new("t").mode(Mode::new().keyword_pattern(r"\w+").lexemes(r"\w+"));
        assert_eq!(
            compile_language(&language).unwrap_err(),
            GrammarError::ConflictingKeywordPattern
        );
    }

    #[test]
    fn test_rule_order() {
        let language = Language::new("t").mode(Mode::new().contains([
            Mode::new().begin("a").end(";").illegal("!").contains([Mode::new().begin("b")]),
        ]));
        let compiled = compile_language(&language).unwrap();
        let a = compiled.mode(compiled.root().contains[0]);
        let kinds: Vec<RuleKind> = a.matcher.rules().iter().map(|rule| rule.kind).collect();
        assert_eq!(kinds, vec![RuleKind::Begin(a.contains[0]), RuleKind::End, RuleKind::Illegal]);

        let mut cursor = ScanCursor::at(0);
        let found = a.matcher.exec("x!", &mut cursor).unwrap().unwrap();
        assert_eq!(found.kind, RuleKind::Illegal);
    }

    #[test]
    fn test_case_insensitive_language() {
        let language = Language::new("t")
            .case_insensitive()
            .mode(Mode::new().contains([Mode::new().begin("select")]));
        let compiled = compile_language(&language).unwrap();
        let mut cursor = ScanCursor::at(0);
        assert!(compiled.root().matcher.exec("SELECT", &mut cursor).unwrap().is_some());
    }
}
