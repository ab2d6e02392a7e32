//! Language registry.
//!
//! Grammars are registered through factories and compiled right away, so a
//! broken grammar is reported at registration instead of on first use.
//! Lookups are case insensitive and go through aliases.

use std::collections::HashMap;
use std::sync::Arc;

use glint_grammar::{CompiledLanguage, GrammarError, Language, compile_language};

use crate::HighlightError;

#[derive(Debug)]
struct Entry {
    language: Arc<CompiledLanguage>,
    autodetect: bool,
}

/// Registered languages, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
    aliases: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles the grammar built by `factory` and registers it under `name`
    /// and its declared aliases. Registering a name again replaces the
    /// earlier grammar but keeps its place in the detection order.
    pub fn register_language<F>(&mut self, name: &str, factory: F) -> Result<(), GrammarError>
    where
        F: FnOnce() -> Language,
    {
        let mut language = factory();
        if language.name.is_empty() {
            language.name = name.to_string();
        }

        let compiled = compile_language(&language)?;
        let key = name.to_lowercase();
        let entry = Entry {
            autodetect: !compiled.disable_autodetect,
            language: Arc::new(compiled),
        };

        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push(key.clone());
        }
        self.register_aliases(&language.aliases, &key);

        tracing::debug!(language = %key, aliases = ?language.aliases, "Registered language");
        Ok(())
    }

    /// Makes each alias resolve to `language`.
    pub fn register_aliases<S: AsRef<str>>(&mut self, aliases: &[S], language: &str) {
        let target = language.to_lowercase();
        for alias in aliases {
            self.aliases.insert(alias.as_ref().to_lowercase(), target.clone());
        }
    }

    /// Registered name that `name` or an alias of it resolves to.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let key = name.to_lowercase();
        if let Some((registered, _)) = self.entries.get_key_value(&key) {
            return Some(registered);
        }
        let target = self.aliases.get(&key)?;
        self.entries.get_key_value(target).map(|(registered, _)| registered.as_str())
    }

    /// Looks a language up by name or alias.
    pub fn get_language(&self, name: &str) -> Option<&Arc<CompiledLanguage>> {
        let key = self.canonical_name(name)?;
        self.entries.get(key).map(|entry| &entry.language)
    }

    /// Like [`Registry::get_language`], with an error for unknown names.
    pub fn require_language(&self, name: &str) -> Result<&Arc<CompiledLanguage>, HighlightError> {
        self.resolve(name).map(|(_, language)| language)
    }

    /// Registered name and grammar for `name`.
    pub(crate) fn resolve(&self, name: &str) -> Result<(&str, &Arc<CompiledLanguage>), HighlightError> {
        self.canonical_name(name)
            .and_then(|key| self.entries.get(key).map(|entry| (key, &entry.language)))
            .ok_or_else(|| HighlightError::UnknownLanguage(name.to_string()))
    }

    /// Registered names in registration order.
    pub fn list_languages(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.canonical_name(name).is_some()
    }

    /// Whether `name` takes part in auto-detection.
    pub fn auto_detection(&self, name: &str) -> bool {
        self.canonical_name(name)
            .and_then(|key| self.entries.get(key))
            .is_some_and(|entry| entry.autodetect)
    }

    /// Opts a language in or out of auto-detection. Returns `false` for
    /// unknown names.
    pub fn set_autodetect(&mut self, name: &str, enabled: bool) -> bool {
        let Some(key) = self.canonical_name(name).map(str::to_string) else {
            return false;
        };
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.autodetect = enabled;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_grammar::{ChildRef, Mode};

    fn tiny(name: &str) -> Language {
        Language::new(name).aliases(["t"]).mode(Mode::new().keywords("x"))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry.register_language("Tiny", || tiny("Tiny Lang")).unwrap();

        assert!(registry.get_language("tiny").is_some());
        assert!(registry.get_language("TINY").is_some());
        assert!(registry.get_language("t").is_some());
        assert!(registry.get_language("nope").is_none());
        assert_eq!(registry.get_language("t").unwrap().name, "Tiny Lang");
        assert_eq!(registry.list_languages(), vec!["tiny"]);
    }

    #[test]
    fn test_require_language_errors() {
        let registry = Registry::new();
        assert_eq!(
            registry.require_language("cobol").unwrap_err(),
            HighlightError::UnknownLanguage("cobol".into())
        );
    }

    #[test]
    fn test_reregistering_keeps_order() {
        let mut registry = Registry::new();
        registry.register_language("a", || tiny("")).unwrap();
        registry.register_language("b", || tiny("")).unwrap();
        registry.register_language("a", || tiny("")).unwrap();
        assert_eq!(registry.list_languages(), vec!["a", "b"]);
        assert_eq!(registry.get_language("a").unwrap().name, "a");
    }

    #[test]
    fn test_broken_grammar_is_rejected() {
        let mut registry = Registry::new();
        let result = registry.register_language("bad", || {
            Language::new("Bad").mode(Mode::new().contains([ChildRef::SelfRef]))
        });
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_autodetect_toggle() {
        let mut registry = Registry::new();
        registry.register_language("a", || tiny("")).unwrap();
        registry
            .register_language("b", || tiny("").disable_autodetect())
            .unwrap();

        assert!(registry.auto_detection("a"));
        assert!(!registry.auto_detection("b"));
        assert!(registry.set_autodetect("a", false));
        assert!(!registry.auto_detection("a"));
        assert!(!registry.set_autodetect("zzz", true));
    }

    #[test]
    fn test_extra_aliases() {
        let mut registry = Registry::new();
        registry.register_language("a", || tiny("")).unwrap();
        registry.register_aliases(&["Alpha", "aa"], "a");
        assert!(registry.get_language("alpha").is_some());
        assert!(registry.get_language("AA").is_some());
        assert_eq!(registry.canonical_name("Alpha"), Some("a"));
    }
}
