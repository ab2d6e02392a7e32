//! # Glint Syntax
//!
//! The highlighting engine. Given a registry of compiled grammars, it turns
//! source text into a [`TokenTree`] and a relevance score, and can guess which
//! registered language a snippet is written in.
//!
//! ## Example
//!
//! ```
//! use glint_grammar::{Language, Mode};
//! use glint_syntax::{Highlighter, Registry};
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_language("demo", || Language::new("Demo").mode(Mode::new().keywords("let")))
//!     .unwrap();
//!
//! let highlighter = Highlighter::new(&registry);
//! let result = highlighter.highlight("demo", "let x", false, None).unwrap();
//! assert_eq!(result.relevance, 1);
//! assert_eq!(result.to_html("hl-"), "<span class=\"hl-keyword\">let</span> x");
//! ```
//!
//! ## Learning: Recoverable vs. Fatal Errors
//!
//! Highlighting is cosmetic, so by default the engine never fails on bad
//! input. Illegal text and internal faults come back as a successful result
//! holding the unhighlighted text, with the problem attached as metadata.
//! Turning off `safe_mode` makes the same problems surface as `Err`.

mod detect;
mod engine;
mod highlighter;
mod registry;
pub mod render;
mod result;
pub mod tree;


pub use glint_grammar::GrammarError;
pub use highlighter::{HighlightOptions, Highlighter, SublanguageRelevance};
pub use registry::Registry;
pub use render::{HtmlRenderer, Renderer, escape_html};
pub use result::{AutoHighlightResult, Continuation, HighlightResult, IllegalBy};
pub use tree::{Node, ScopeNode, TokenTree};

/// Errors that can occur while highlighting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightError {
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("Illegal lexeme \"{lexeme}\" for mode \"{mode}\"")]
    IllegalLexeme {
        lexeme: String,
        mode: String,
        offset: usize,
        context: String,
    },

    #[error("Engine fault: {0}")]
    Internal(#[from] EngineFault),
}

/// Conditions that mean the engine (or a grammar) misbehaved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineFault {
    #[error("0 width match regex at offset {offset}")]
    ZeroWidthMatch { offset: usize },

    #[error("potential infinite loop after {iterations} iterations at offset {offset}")]
    RunawayLoop { iterations: usize, offset: usize },

    #[error("{0}")]
    Regex(#[from] glint_grammar::MatchFailure),
}
