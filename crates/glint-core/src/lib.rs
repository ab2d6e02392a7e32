//! # Glint Core
//!
//! Glue between configuration and the highlighting engine: builds a registry
//! holding the bundled grammars with the user's overrides applied, and writes
//! results in the configured output format.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────┐  build_registry  ┌──────────┐   Highlighter   ┌────────────────┐
//! │   Config   │ ───────────────► │ Registry │ ──────────────► │ HighlightResult│
//! └────────────┘                  └──────────┘                 └───────┬────────┘
//!                                                                     │ render
//!                                                          html / json / text
//! ```
//!
//! ## Learning: Module Organization
//!
//! `pub use` re-exports the types front ends need, so a binary can depend on
//! this crate alone for the common path.

pub mod config;

pub use config::{Config, ConfigError, DetectionConfig, HighlightConfig, LanguageConfig, OutputConfig, OutputFormat};

use glint_grammar::GrammarError;
use glint_syntax::{HighlightError, HighlightResult, Registry};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("Highlight error: {0}")]
    Highlight(#[from] HighlightError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registers every bundled grammar, then applies the per-language overrides
/// from `config`. Overrides for unknown languages are skipped with a warning.
pub fn build_registry(config: &Config) -> CoreResult<Registry> {
    let mut registry = Registry::new();
    for (name, factory) in glint_languages::bundled() {
        registry.register_language(name, factory)?;
    }

    for (name, overrides) in &config.languages {
        let Some(canonical) = registry.canonical_name(name).map(str::to_string) else {
            tracing::warn!(language = %name, "Config mentions an unknown language");
            continue;
        };
        registry.register_aliases(&overrides.aliases, &canonical);
        if let Some(disabled) = overrides.disable_autodetect {
            registry.set_autodetect(&canonical, !disabled);
        }
    }

    tracing::debug!(languages = registry.len(), "Registry ready");
    Ok(registry)
}

/// Writes `result` in `format`. HTML classes get `class_prefix`.
pub fn render(result: &HighlightResult, format: OutputFormat, class_prefix: &str) -> CoreResult<String> {
    let rendered = match format {
        OutputFormat::Html => result.to_html(class_prefix),
        OutputFormat::Json => result.tree.to_json()?,
        OutputFormat::Text => result.text(),
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_syntax::Highlighter;

    #[test]
    fn test_build_registry_defaults() {
        let registry = build_registry(&Config::default()).unwrap();
        assert_eq!(registry.list_languages(), vec!["json", "ini", "css", "xml", "markdown"]);
        assert!(registry.is_registered("html"));
        assert!(registry.is_registered("toml"));
    }

    #[test]
    fn test_build_registry_overrides() {
        let mut config = Config::default();
        config.languages.insert(
            "html".into(),
            LanguageConfig {
                aliases: vec!["vue".into()],
                disable_autodetect: Some(true),
            },
        );
        config.languages.insert("cobol".into(), LanguageConfig::default());

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.canonical_name("vue"), Some("xml"));
        assert!(!registry.auto_detection("xml"));
        assert!(!registry.is_registered("cobol"));
    }

    #[test]
    fn test_render_formats() {
        let registry = build_registry(&Config::default()).unwrap();
        let result = Highlighter::new(&registry)
            .highlight("json", "[true]", false, None)
            .unwrap();

        assert_eq!(
            render(&result, OutputFormat::Html, "hl-").unwrap(),
            "[<span class=\"hl-literal\">true</span>]"
        );
        assert_eq!(render(&result, OutputFormat::Text, "hl-").unwrap(), "[true]");
        assert!(render(&result, OutputFormat::Json, "hl-").unwrap().contains("\"kind\":\"literal\""));
    }
}
