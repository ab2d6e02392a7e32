//! Keyword tables.
//!
//! Grammars declare keywords either as one space separated string (everything
//! becomes a `keyword`) or as a list of categories. Each word may carry a
//! relevance override with a `|` suffix: `"self|10 none"`.

use std::collections::HashMap;
use std::sync::Arc;

/// Words so common across languages that matching them says nothing about
/// which language the text is written in.
pub const COMMON_KEYWORDS: &[&str] = &["of", "and", "for", "in", "not", "or", "if", "then"];

const DEFAULT_CATEGORY: &str = "keyword";

/// Keyword declaration as written in a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keywords {
    /// Space separated words, all in the `keyword` category.
    Flat(String),
    /// `(category, words)` pairs.
    Classed(Vec<(String, String)>),
}

impl Keywords {
    pub fn classed<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Classed(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<&str> for Keywords {
    fn from(words: &str) -> Self {
        Self::Flat(words.to_string())
    }
}

/// Category and relevance of one keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordData {
    pub category: Arc<str>,
    pub relevance: u32,
}

/// Compiled keyword lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    entries: HashMap<String, KeywordData>,
}

impl KeywordTable {
    /// Builds the table. Words are lowercased when the language is case
    /// insensitive, so lookups must lowercase too.
    pub fn compile(raw: &Keywords, case_insensitive: bool) -> Self {
        let mut table = Self::default();
        match raw {
            Keywords::Flat(words) => table.add_words(DEFAULT_CATEGORY, words, case_insensitive),
            Keywords::Classed(groups) => {
                for (category, words) in groups {
                    table.add_words(category, words, case_insensitive);
                }
            }
        }
        table
    }

    fn add_words(&mut self, category: &str, words: &str, case_insensitive: bool) {
        let category: Arc<str> = Arc::from(category);
        let words = if case_insensitive {
            words.to_lowercase()
        } else {
            words.to_string()
        };

        for entry in words.split_whitespace() {
            let (word, score) = match entry.split_once('|') {
                Some((word, score)) => (word, Some(score)),
                None => (entry, None),
            };
            self.entries.insert(
                word.to_string(),
                KeywordData {
                    category: Arc::clone(&category),
                    relevance: score_for_keyword(word, score),
                },
            );
        }
    }

    pub fn get(&self, word: &str) -> Option<&KeywordData> {
        self.entries.get(word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Relevance of `keyword`: the explicit score when one parses, else 0 for
/// common words and 1 for everything else.
pub fn score_for_keyword(keyword: &str, provided: Option<&str>) -> u32 {
    if let Some(score) = provided.and_then(|s| s.parse::<u32>().ok()) {
        return score;
    }
    if COMMON_KEYWORDS.contains(&keyword) { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_keywords() {
        let table = KeywordTable::compile(&Keywords::from("fn let if"), false);
        assert_eq!(table.len(), 3);
        let data = table.get("fn").unwrap();
        assert_eq!(&*data.category, "keyword");
        assert_eq!(data.relevance, 1);
        assert_eq!(table.get("if").unwrap().relevance, 0);
        assert!(table.get("else").is_none());
    }

    #[test]
    fn test_classed_keywords_with_scores() {
        let raw = Keywords::classed([("keyword", "def class|5"), ("literal", "None True|0")]);
        let table = KeywordTable::compile(&raw, false);
        assert_eq!(table.get("class").unwrap().relevance, 5);
        assert_eq!(table.get("True").unwrap().relevance, 0);
        assert_eq!(&*table.get("None").unwrap().category, "literal");
    }

    #[test]
    fn test_case_insensitive_keywords_are_lowercased() {
        let table = KeywordTable::compile(&Keywords::from("SELECT From"), true);
        assert!(table.get("select").is_some());
        assert!(table.get("from").is_some());
        assert!(table.get("SELECT").is_none());
    }

    #[test]
    fn test_score_for_keyword() {
        assert_eq!(score_for_keyword("for", None), 0);
        assert_eq!(score_for_keyword("while", None), 1);
        assert_eq!(score_for_keyword("while", Some("7")), 7);
        assert_eq!(score_for_keyword("while", Some("x")), 1);
    }
}
