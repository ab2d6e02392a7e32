//! Highlighter front end.

use std::sync::Arc;

use glint_grammar::CompiledLanguage;
use serde::{Deserialize, Serialize};

use crate::engine::Scanner;
use crate::registry::Registry;
use crate::result::{Continuation, HighlightResult};
use crate::HighlightError;

/// When an embedded language's relevance counts towards its host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SublanguageRelevance {
    /// Only when the embedding mode itself carries relevance.
    #[default]
    WhenHostRelevant,
    Always,
    Never,
}

/// Engine-wide options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    /// Prefix for CSS classes in HTML output.
    pub class_prefix: String,
    /// Swallow illegal text and engine faults instead of returning errors.
    pub safe_mode: bool,
    /// Candidate languages for auto-detection. `None` means all of them.
    pub languages: Option<Vec<String>>,
    pub sublanguage_relevance: SublanguageRelevance,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            class_prefix: "hl-".to_string(),
            safe_mode: true,
            languages: None,
            sublanguage_relevance: SublanguageRelevance::default(),
        }
    }
}

/// How one scan treats problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanPolicy {
    pub ignore_illegals: bool,
    pub propagate_illegal: bool,
    pub propagate_faults: bool,
}

/// Highlights text with the grammars of a [`Registry`].
#[derive(Debug, Clone)]
pub struct Highlighter<'r> {
    registry: &'r Registry,
    options: HighlightOptions,
}

impl<'r> Highlighter<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_options(registry, HighlightOptions::default())
    }

    pub fn with_options(registry: &'r Registry, options: HighlightOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn options(&self) -> &HighlightOptions {
        &self.options
    }

    /// Highlights `code` as `language`.
    ///
    /// With `ignore_illegals` set, text the grammar forbids is passed through
    /// as plain text. Otherwise it yields an `illegal` result in safe mode and
    /// an [`HighlightError::IllegalLexeme`] in strict mode.
    ///
    /// A `continuation` from an earlier chunk resumes that chunk's open modes.
    pub fn highlight(
        &self,
        language: &str,
        code: &str,
        ignore_illegals: bool,
        continuation: Option<&Continuation>,
    ) -> Result<HighlightResult, HighlightError> {
        let (name, compiled) = self.registry.resolve(language)?;
        let strict = !self.options.safe_mode;
        let policy = ScanPolicy {
            ignore_illegals,
            propagate_illegal: strict,
            propagate_faults: strict,
        };
        self.scan(name, compiled, code, policy, continuation)
    }

    pub(crate) fn scan(
        &self,
        name: &str,
        language: &Arc<CompiledLanguage>,
        code: &str,
        policy: ScanPolicy,
        continuation: Option<&Continuation>,
    ) -> Result<HighlightResult, HighlightError> {
        let mut scanner = Scanner::new(self, name, Arc::clone(language), code, policy, continuation);
        match scanner.run() {
            Ok(()) => Ok(scanner.into_result()),
            Err(err @ HighlightError::IllegalLexeme { .. }) => {
                if policy.propagate_illegal {
                    Err(err)
                } else {
                    Ok(scanner.into_illegal_result(err))
                }
            }
            Err(err) if !policy.propagate_faults => {
                tracing::warn!(language = name, error = %err, "Highlighting failed, falling back to plain text");
                Ok(scanner.into_fallback_result(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Whether an embedded result's relevance counts for a host mode with
    /// `host_relevance`.
    pub(crate) fn counts_sublanguage(&self, host_relevance: u32) -> bool {
        match self.options.sublanguage_relevance {
            SublanguageRelevance::WhenHostRelevant => host_relevance > 0,
            SublanguageRelevance::Always => true,
            SublanguageRelevance::Never => false,
        }
    }
}
