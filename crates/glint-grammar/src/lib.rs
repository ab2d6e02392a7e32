//! # Glint Grammar
//!
//! The data model a language grammar is written in, and the compiler that turns
//! it into something the highlighting engine can scan with.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   compile_language   ┌──────────────────┐
//! │ Language │ ───────────────────► │ CompiledLanguage │
//! │  (Mode)  │                      │ arena of modes   │
//! └──────────┘                      │ + matchers       │
//!                                   └──────────────────┘
//! ```
//!
//! A grammar is a tree of [`Mode`]s. Children are shared through `Arc`, so the
//! same mode (a string literal, a comment) can appear under many parents and is
//! still compiled exactly once. The compiled form lives in an arena indexed by
//! [`ModeId`]; child lists, `starts` links and self-references are plain ids.
//!
//! ## Learning: Arena Allocation
//!
//! Grammars are naturally cyclic (a mode may contain itself). Instead of fighting
//! the borrow checker with `Rc<RefCell<..>>`, the compiler stores every compiled
//! mode in a `Vec` and links them by index. Cycles become harmless integers.

pub mod compiler;
pub mod hooks;
pub mod keywords;
pub mod matcher;
pub mod mode;
pub mod pattern;

pub use compiler::{CompiledLanguage, CompiledMode, ModeId, compile_language, expand_or_clone, lang_re};
pub use hooks::{Hook, HookMatch, HookResponse, ModeHook};
pub use keywords::{COMMON_KEYWORDS, KeywordData, KeywordTable, Keywords, score_for_keyword};
pub use matcher::{MatchFailure, MatcherRule, MultiMatcher, ResumableMatcher, RuleKind, RuleMatch, ScanCursor};
pub use mode::{ChildRef, Language, Mode, SubLanguage};
pub use pattern::Pattern;

/// Errors raised while compiling a grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("Top level `self` is not supported in language `{language}`")]
    TopLevelSelfReference { language: String },

    #[error("Invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Mode sets both `keyword_pattern` and the legacy `lexemes`")]
    ConflictingKeywordPattern,
}

impl GrammarError {
    pub(crate) fn invalid_pattern(pattern: &str, err: &fancy_regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for grammar compilation.
pub type GrammarResult<T> = Result<T, GrammarError>;
