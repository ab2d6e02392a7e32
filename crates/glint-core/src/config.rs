//! Highlighter configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` on every section means a config file only needs the
//! keys it changes. An empty file, or no file at all, gives the defaults.
//!
//! ```toml
//! [highlight]
//! class_prefix = "code-"
//!
//! [detection]
//! languages = ["json", "css"]
//!
//! [languages.markdown]
//! aliases = ["readme"]
//! disable_autodetect = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glint_syntax::{HighlightOptions, SublanguageRelevance};

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub highlight: HighlightConfig,

    pub detection: DetectionConfig,

    pub output: OutputConfig,

    /// Per-language overrides, keyed by language name or alias
    pub languages: HashMap<String, LanguageConfig>,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "Could not load config, using defaults");
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded config");
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("glint").join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Saves the config to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns config for a specific language.
    pub fn language(&self, lang: &str) -> LanguageConfig {
        self.languages.get(lang).cloned().unwrap_or_default()
    }

    /// Engine options described by this config.
    pub fn highlight_options(&self) -> HighlightOptions {
        HighlightOptions {
            class_prefix: self.highlight.class_prefix.clone(),
            safe_mode: self.highlight.safe_mode,
            languages: self.detection.languages.clone(),
            sublanguage_relevance: self.highlight.sublanguage_relevance,
        }
    }
}

/// Engine behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Prefix for CSS classes in HTML output
    pub class_prefix: String,

    /// Report problems in the result instead of failing
    pub safe_mode: bool,

    /// Treat text a grammar forbids as plain text
    pub ignore_illegals: bool,

    /// When embedded languages add to their host's relevance
    pub sublanguage_relevance: SublanguageRelevance,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            class_prefix: "hl-".to_string(),
            safe_mode: true,
            ignore_illegals: false,
            sublanguage_relevance: SublanguageRelevance::default(),
        }
    }
}

/// Auto-detection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Candidate languages (all registered languages when unset)
    pub languages: Option<Vec<String>>,
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// How a highlighted result is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
    Text,
}

/// Language-specific configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Extra names the language answers to
    pub aliases: Vec<String>,

    /// Overrides whether the language takes part in auto-detection
    pub disable_autodetect: Option<bool>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.highlight.class_prefix, "hl-");
        assert!(config.highlight.safe_mode);
        assert!(!config.highlight.ignore_illegals);
        assert_eq!(config.output.format, OutputFormat::Html);
        assert!(config.detection.languages.is_none());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [highlight]
            safe_mode = false
            sublanguage_relevance = "always"

            [output]
            format = "json"

            [languages.md]
            aliases = ["readme"]
            "#,
        )
        .unwrap();

        assert!(!config.highlight.safe_mode);
        assert_eq!(config.highlight.class_prefix, "hl-");
        assert_eq!(config.highlight.sublanguage_relevance, SublanguageRelevance::Always);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.language("md").aliases, vec!["readme".to_string()]);
        assert_eq!(config.language("css"), LanguageConfig::default());
    }

    #[test]
    fn test_highlight_options() {
        let mut config = Config::default();
        config.highlight.class_prefix = "code-".into();
        config.detection.languages = Some(vec!["json".into()]);

        let options = config.highlight_options();
        assert_eq!(options.class_prefix, "code-");
        assert!(options.safe_mode);
        assert_eq!(options.languages, Some(vec!["json".to_string()]));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.output.format = OutputFormat::Text;
        config.languages.insert(
            "xml".into(),
            LanguageConfig {
                aliases: vec!["svgz".into()],
                disable_autodetect: Some(true),
            },
        );
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\nformat = \"pdf\"\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::load_from(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
