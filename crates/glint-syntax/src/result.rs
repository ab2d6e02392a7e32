//! Highlighting results.

use std::fmt;
use std::sync::Arc;

use fancy_regex::Regex;
use glint_grammar::{CompiledLanguage, ModeId};

use crate::HighlightError;
use crate::render::HtmlRenderer;
use crate::tree::TokenTree;

/// Outcome of highlighting one piece of text.
#[derive(Debug, Clone)]
pub struct HighlightResult {
    /// Registered name of the language used, `None` for the plain-text
    /// baseline of auto-detection.
    pub language: Option<String>,
    pub relevance: u32,
    pub tree: TokenTree,
    /// The text contained something the grammar forbids. The tree then holds
    /// the input unhighlighted.
    pub illegal: bool,
    pub illegal_by: Option<IllegalBy>,
    /// Internal fault swallowed in safe mode.
    pub error_raised: Option<HighlightError>,
    /// Scan state at the end of the text, for highlighting the next chunk.
    pub continuation: Option<Continuation>,
    pub code: String,
}

impl HighlightResult {
    /// Unhighlighted text with zero relevance.
    pub fn plain(language: Option<String>, code: &str) -> Self {
        Self {
            language,
            relevance: 0,
            tree: TokenTree::plain(code),
            illegal: false,
            illegal_by: None,
            error_raised: None,
            continuation: None,
            code: code.to_string(),
        }
    }

    pub fn to_html(&self, class_prefix: &str) -> String {
        HtmlRenderer::render(&self.tree, class_prefix)
    }

    pub fn text(&self) -> String {
        self.tree.text()
    }
}

/// Details about an illegal match.
#[derive(Debug, Clone)]
pub struct IllegalBy {
    pub message: String,
    /// Up to 100 bytes either side of the offending offset.
    pub context: String,
    /// Category of the mode that rejected the text.
    pub mode: Option<String>,
    /// What had been highlighted before the illegal text.
    pub sofar: TokenTree,
}

/// Outcome of auto-detection.
#[derive(Debug, Clone)]
pub struct AutoHighlightResult {
    pub best: HighlightResult,
    pub second_best: Option<HighlightResult>,
}

#[derive(Debug, Clone)]
pub(crate) struct SavedFrame {
    pub mode: ModeId,
    /// End pattern fixed by the begin match, for modes that end the way they
    /// began.
    pub end_override: Option<Arc<Regex>>,
}

/// Saved scan state: the stack of open modes at the end of a chunk.
///
/// Only valid with the language it was produced by; with any other language
/// it is ignored.
#[derive(Clone)]
pub struct Continuation {
    pub(crate) language: Arc<CompiledLanguage>,
    pub(crate) frames: Vec<SavedFrame>,
}

impl Continuation {
    pub fn language_name(&self) -> &str {
        &self.language.name
    }

    /// Number of open modes, the root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Categories of the open modes, outermost first.
    pub fn open_scopes(&self) -> Vec<&str> {
        self.frames
            .iter()
            .filter_map(|frame| self.language.mode(frame.mode).class_name.as_deref())
            .collect()
    }

    pub(crate) fn belongs_to(&self, language: &Arc<CompiledLanguage>) -> bool {
        Arc::ptr_eq(&self.language, language)
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("language", &self.language.name)
            .field("depth", &self.frames.len())
            .finish()
    }
}
