//! The declarative grammar model.
//!
//! A [`Mode`] describes one lexical context: where it begins, where it ends,
//! what it is called, and which modes may appear inside it. Every attribute is
//! optional. An unset attribute means "use the default", which is why the
//! fields are `Option`s: merging a variant over its base mode only overwrites
//! the attributes the variant actually sets.
//!
//! Modes are built with chained setters:
//!
//! ```
//! use glint_grammar::{ChildRef, Mode};
//!
//! let string = Mode::new().class_name("string").begin("\"").end("\"");
//! let block = Mode::new()
//!     .begin(r"\{")
//!     .end(r"\}")
//!     .contains([ChildRef::from(string), ChildRef::SelfRef]);
//! assert_eq!(block.children().len(), 2);
//! ```

use std::sync::{Arc, OnceLock};

use crate::hooks::Hook;
use crate::keywords::Keywords;
use crate::pattern::Pattern;

/// A child of a mode.
#[derive(Debug, Clone)]
pub enum ChildRef {
    /// The containing mode itself, for recursive constructs.
    SelfRef,
    Mode(Arc<Mode>),
}

impl ChildRef {
    pub fn is_self(&self) -> bool {
        matches!(self, Self::SelfRef)
    }
}

impl From<Mode> for ChildRef {
    fn from(mode: Mode) -> Self {
        Self::Mode(Arc::new(mode))
    }
}

impl From<Arc<Mode>> for ChildRef {
    fn from(mode: Arc<Mode>) -> Self {
        Self::Mode(mode)
    }
}

impl From<&Arc<Mode>> for ChildRef {
    fn from(mode: &Arc<Mode>) -> Self {
        Self::Mode(Arc::clone(mode))
    }
}

/// Language embedded in a mode's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubLanguage {
    /// Always this language.
    Named(String),
    /// Whichever of these candidates scores best. Empty means every
    /// registered language.
    Candidates(Vec<String>),
}

/// One lexical context of a grammar.
#[derive(Debug, Clone, Default)]
pub struct Mode {
    pub class_name: Option<String>,
    pub begin: Option<Pattern>,
    pub end: Option<Pattern>,
    pub illegal: Option<Pattern>,
    pub contains: Option<Vec<ChildRef>>,
    pub keywords: Option<Keywords>,
    /// Words that start this mode. Also registered as its keywords.
    pub begin_keywords: Option<String>,
    pub keyword_pattern: Option<Pattern>,
    /// Deprecated spelling of `keyword_pattern`.
    pub lexemes: Option<Pattern>,
    pub relevance: Option<u32>,
    pub exclude_begin: Option<bool>,
    pub exclude_end: Option<bool>,
    pub return_begin: Option<bool>,
    pub return_end: Option<bool>,
    pub ends_with_parent: Option<bool>,
    pub ends_parent: Option<bool>,
    pub end_same_as_begin: Option<bool>,
    pub skip: Option<bool>,
    pub sub_language: Option<SubLanguage>,
    pub starts: Option<Arc<Mode>>,
    pub variants: Option<Vec<Mode>>,
    pub on_begin: Option<Hook>,
    pub on_end: Option<Hook>,
    cached_variants: OnceLock<Vec<Arc<Mode>>>,
}

impl Mode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    pub fn begin(mut self, pattern: impl Into<Pattern>) -> Self {
        self.begin = Some(pattern.into());
        self
    }

    pub fn end(mut self, pattern: impl Into<Pattern>) -> Self {
        self.end = Some(pattern.into());
        self
    }

    pub fn illegal(mut self, pattern: impl Into<Pattern>) -> Self {
        self.illegal = Some(pattern.into());
        self
    }

    pub fn contains<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChildRef>,
    {
        self.contains = Some(children.into_iter().map(Into::into).collect());
        self
    }

    pub fn keywords(mut self, keywords: impl Into<Keywords>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn begin_keywords(mut self, words: impl Into<String>) -> Self {
        self.begin_keywords = Some(words.into());
        self
    }

    pub fn keyword_pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.keyword_pattern = Some(pattern.into());
        self
    }

    pub fn lexemes(mut self, pattern: impl Into<Pattern>) -> Self {
        self.lexemes = Some(pattern.into());
        self
    }

    pub fn relevance(mut self, relevance: u32) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn exclude_begin(mut self) -> Self {
        self.exclude_begin = Some(true);
        self
    }

    pub fn exclude_end(mut self) -> Self {
        self.exclude_end = Some(true);
        self
    }

    pub fn return_begin(mut self) -> Self {
        self.return_begin = Some(true);
        self
    }

    pub fn return_end(mut self) -> Self {
        self.return_end = Some(true);
        self
    }

    pub fn ends_with_parent(mut self) -> Self {
        self.ends_with_parent = Some(true);
        self
    }

    pub fn ends_parent(mut self) -> Self {
        self.ends_parent = Some(true);
        self
    }

    pub fn end_same_as_begin(mut self) -> Self {
        self.end_same_as_begin = Some(true);
        self
    }

    pub fn skip(mut self) -> Self {
        self.skip = Some(true);
        self
    }

    pub fn sub_language(mut self, language: SubLanguage) -> Self {
        self.sub_language = Some(language);
        self
    }

    pub fn starts(mut self, mode: impl Into<Arc<Mode>>) -> Self {
        self.starts = Some(mode.into());
        self
    }

    pub fn variants(mut self, variants: impl IntoIterator<Item = Mode>) -> Self {
        self.variants = Some(variants.into_iter().collect());
        self
    }

    pub fn on_begin(mut self, hook: Hook) -> Self {
        self.on_begin = Some(hook);
        self
    }

    pub fn on_end(mut self, hook: Hook) -> Self {
        self.on_end = Some(hook);
        self
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[ChildRef] {
        self.contains.as_deref().unwrap_or_default()
    }

    /// Copy of `self` with every attribute `overrides` sets written over it.
    pub fn merge(&self, overrides: &Mode) -> Mode {
        fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
            over.as_ref().or(base.as_ref()).cloned()
        }

        Mode {
            class_name: pick(&overrides.class_name, &self.class_name),
            begin: pick(&overrides.begin, &self.begin),
            end: pick(&overrides.end, &self.end),
            illegal: pick(&overrides.illegal, &self.illegal),
            contains: pick(&overrides.contains, &self.contains),
            keywords: pick(&overrides.keywords, &self.keywords),
            begin_keywords: pick(&overrides.begin_keywords, &self.begin_keywords),
            keyword_pattern: pick(&overrides.keyword_pattern, &self.keyword_pattern),
            lexemes: pick(&overrides.lexemes, &self.lexemes),
            relevance: pick(&overrides.relevance, &self.relevance),
            exclude_begin: pick(&overrides.exclude_begin, &self.exclude_begin),
            exclude_end: pick(&overrides.exclude_end, &self.exclude_end),
            return_begin: pick(&overrides.return_begin, &self.return_begin),
            return_end: pick(&overrides.return_end, &self.return_end),
            ends_with_parent: pick(&overrides.ends_with_parent, &self.ends_with_parent),
            ends_parent: pick(&overrides.ends_parent, &self.ends_parent),
            end_same_as_begin: pick(&overrides.end_same_as_begin, &self.end_same_as_begin),
            skip: pick(&overrides.skip, &self.skip),
            sub_language: pick(&overrides.sub_language, &self.sub_language),
            starts: pick(&overrides.starts, &self.starts),
            variants: pick(&overrides.variants, &self.variants),
            on_begin: pick(&overrides.on_begin, &self.on_begin),
            on_end: pick(&overrides.on_end, &self.on_end),
            cached_variants: OnceLock::new(),
        }
    }

    /// True when this mode's end depends on its parent, either directly or
    /// through the mode it `starts`.
    pub fn depends_on_parent(&self) -> bool {
        flag(self.ends_with_parent) || self.starts.as_deref().is_some_and(Mode::depends_on_parent)
    }

    /// The variants merged over this mode, computed once and reused on every
    /// later expansion.
    pub fn expanded_variants(&self) -> Option<&[Arc<Mode>]> {
        let variants = self.variants.as_ref().filter(|v| !v.is_empty())?;
        let expanded = self.cached_variants.get_or_init(|| {
            let mut base = self.clone();
            base.variants = None;
            variants.iter().map(|variant| Arc::new(base.merge(variant))).collect()
        });
        Some(expanded)
    }
}

pub(crate) fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

/// A complete grammar.
#[derive(Debug, Clone, Default)]
pub struct Language {
    /// Display name, such as `"JSON"`.
    pub name: String,
    pub aliases: Vec<String>,
    pub case_insensitive: bool,
    pub disable_autodetect: bool,
    /// The top-level context. Its `begin` and `end` are ignored.
    pub mode: Mode,
}

impl Language {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn disable_autodetect(mut self) -> Self {
        self.disable_autodetect = true;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}
