//! Language auto-detection.
//!
//! Every candidate grammar highlights the text and the highest relevance wins.
//! Ties go to the candidate tried first, and a plain-text baseline with zero
//! relevance stands in when nothing scores.

use crate::highlighter::{Highlighter, ScanPolicy};
use crate::result::{AutoHighlightResult, HighlightResult};
use crate::HighlightError;

impl Highlighter<'_> {
    /// Highlights `code` with the language that describes it best.
    ///
    /// Candidates are `subset`, else the configured `languages`, else every
    /// registered language, skipping those opted out of auto-detection.
    pub fn highlight_auto(&self, code: &str, subset: Option<&[String]>) -> Result<AutoHighlightResult, HighlightError> {
        self.auto_scan(code, subset, !self.options().safe_mode)
    }

    pub(crate) fn auto_scan(
        &self,
        code: &str,
        subset: Option<&[String]>,
        propagate_faults: bool,
    ) -> Result<AutoHighlightResult, HighlightError> {
        let registry = self.registry();
        let candidates: Vec<&str> = match subset.or(self.options().languages.as_deref()) {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => registry.list_languages(),
        };
        let policy = ScanPolicy {
            ignore_illegals: false,
            propagate_illegal: false,
            propagate_faults,
        };

        let mut best = HighlightResult::plain(None, code);
        let mut second_best: Option<HighlightResult> = None;

        for candidate in candidates {
            let Ok((name, language)) = registry.resolve(candidate) else {
                continue;
            };
            if !registry.auto_detection(name) {
                continue;
            }

            let current = self.scan(name, language, code, policy, None)?;
            let second_relevance = second_best.as_ref().map_or(0, |result| result.relevance);
            if current.relevance > best.relevance {
                second_best = Some(std::mem::replace(&mut best, current));
            } else if current.relevance > second_relevance {
                second_best = Some(current);
            }
        }

        tracing::debug!(
            best = ?best.language,
            relevance = best.relevance,
            "Auto-detected language"
        );

        Ok(AutoHighlightResult {
            best,
            second_best: second_best.filter(|result| result.language.is_some()),
        })
    }
}
