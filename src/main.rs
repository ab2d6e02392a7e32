//! # Glint - A Grammar-Driven Syntax Highlighter
//!
//! Highlights a file or standard input as HTML, a JSON token tree or plain
//! text. The language comes from `--language`, the file extension, or
//! auto-detection, in that order.
//!
//! ## Quick Start
//!
//! ```bash
//! # Highlight a file, language from its extension
//! cargo run -- config.toml
//!
//! # Let glint guess, from a subset of languages
//! cat snippet | cargo run -- --languages json,css -v
//!
//! # Emit the token tree
//! cargo run -- --language html --format json page.html
//! ```

use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glint_core::{Config, OutputFormat, build_registry, render};
use glint_syntax::{HighlightResult, Highlighter, Registry};

/// Glint - highlight source code
#[derive(Parser, Debug)]
#[command(name = "glint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to highlight (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Language to highlight as, skipping detection
    #[arg(short, long)]
    language: Option<String>,

    /// Candidate languages for auto-detection
    #[arg(long, value_delimiter = ',')]
    languages: Option<Vec<String>>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Pass text the grammar forbids through as plain text
    #[arg(long)]
    ignore_illegals: bool,

    /// Fail on illegal text and engine faults instead of degrading
    #[arg(long)]
    strict: bool,

    /// List registered languages and exit
    #[arg(long)]
    list: bool,

    /// Config file to use instead of the default one
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Html,
    Json,
    Text,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Html => OutputFormat::Html,
            Format::Json => OutputFormat::Json,
            Format::Text => OutputFormat::Text,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Unknown language '{0}' (see --list)")]
    UnknownLanguage(String),
}

impl Args {
    /// Applies command line overrides on top of the loaded config.
    fn apply(&self, config: &mut Config) {
        if self.strict {
            config.highlight.safe_mode = false;
        }
        if self.ignore_illegals {
            config.highlight.ignore_illegals = true;
        }
        if let Some(languages) = &self.languages {
            config.detection.languages = Some(languages.clone());
        }
        if let Some(format) = self.format {
            config.output.format = format.into();
        }
    }

    /// Explicit language, or the one the file extension suggests.
    fn language_hint(&self) -> Option<String> {
        if let Some(language) = &self.language {
            return Some(language.clone());
        }
        let name = self.file.as_deref()?.file_name()?.to_str()?;
        glint_languages::detect_language(name).map(str::to_string)
    }
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    args.apply(&mut config);

    let registry = build_registry(&config)?;

    if args.list {
        print!("{}", list_languages(&registry));
        return Ok(());
    }

    let code = read_input(args.file.as_deref())?;
    let output = highlight_input(&args, &config, &registry, &code)?;
    print!("{output}");

    Ok(())
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut code = String::new();
            std::io::stdin().read_to_string(&mut code)?;
            Ok(code)
        }
    }
}

fn list_languages(registry: &Registry) -> String {
    registry
        .list_languages()
        .into_iter()
        .filter_map(|name| registry.get_language(name).map(|language| (name, language)))
        .map(|(name, language)| format!("{name}\t{}\n", language.name))
        .collect()
}

/// Highlights `code` according to `args` and `config` and renders it.
fn highlight_input(args: &Args, config: &Config, registry: &Registry, code: &str) -> anyhow::Result<String> {
    let highlighter = Highlighter::with_options(registry, config.highlight_options());

    let result = match args.language_hint() {
        Some(language) => {
            if !registry.is_registered(&language) {
                return Err(CliError::UnknownLanguage(language).into());
            }
            highlighter.highlight(&language, code, config.highlight.ignore_illegals, None)?
        }
        None => {
            let auto = highlighter.highlight_auto(code, None)?;
            tracing::info!(
                language = auto.best.language.as_deref().unwrap_or("none"),
                relevance = auto.best.relevance,
                second_best = auto.second_best.as_ref().and_then(|r| r.language.as_deref()).unwrap_or("none"),
                "Detected language"
            );
            auto.best
        }
    };
    report_problems(&result);

    Ok(render(&result, config.output.format, &config.highlight.class_prefix)?)
}

fn report_problems(result: &HighlightResult) {
    if let Some(illegal) = &result.illegal_by {
        tracing::warn!(message = %illegal.message, "Input is not valid for this language, printed unhighlighted");
    }
    if let Some(err) = &result.error_raised {
        tracing::warn!(error = %err, "Highlighting failed, printed unhighlighted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(argv: &[&str]) -> (Args, Config, Registry) {
        let args = Args::parse_from(argv);
        let mut config = Config::default();
        args.apply(&mut config);
        let registry = build_registry(&config).unwrap();
        (args, config, registry)
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["glint"]);
        assert!(args.file.is_none());
        assert!(args.language.is_none());
        assert!(!args.strict);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from(["glint", "--languages", "json,css", "--format", "json", "-vv", "in.txt"]);
        assert_eq!(args.languages, Some(vec!["json".to_string(), "css".to_string()]));
        assert_eq!(args.format, Some(Format::Json));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.file, Some(PathBuf::from("in.txt")));
    }

    #[test]
    fn test_apply_overrides() {
        let (_, config, _) = setup(&["glint", "--strict", "--ignore-illegals", "--format", "text"]);
        assert!(!config.highlight.safe_mode);
        assert!(config.highlight.ignore_illegals);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_language_hint() {
        let args = Args::parse_from(["glint", "styles/site.css"]);
        assert_eq!(args.language_hint().as_deref(), Some("css"));

        let args = Args::parse_from(["glint", "-l", "md", "site.css"]);
        assert_eq!(args.language_hint().as_deref(), Some("md"));

        let args = Args::parse_from(["glint", "notes"]);
        assert_eq!(args.language_hint(), None);
    }

    #[test]
    fn test_highlight_explicit_language() {
        let (args, config, registry) = setup(&["glint", "--language", "json"]);
        let output = highlight_input(&args, &config, &registry, "[null]").unwrap();
        assert_eq!(output, "[<span class=\"hl-literal\">null</span>]");
    }

    #[test]
    fn test_highlight_auto() {
        let (args, config, registry) = setup(&["glint", "--format", "text"]);
        let output = highlight_input(&args, &config, &registry, "a { color: red; }").unwrap();
        assert_eq!(output, "a { color: red; }");
    }

    #[test]
    fn test_unknown_language() {
        let (args, config, registry) = setup(&["glint", "-l", "cobol"]);
        let err = highlight_input(&args, &config, &registry, "x").unwrap_err();
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn test_strict_mode_surfaces_illegal_input() {
        let (args, config, registry) = setup(&["glint", "-l", "json", "--strict"]);
        assert!(highlight_input(&args, &config, &registry, "{ $ }").is_err());

        let (args, config, registry) = setup(&["glint", "-l", "json"]);
        assert_eq!(highlight_input(&args, &config, &registry, "{ $ }").unwrap(), "{ $ }");
    }

    #[test]
    fn test_list_languages() {
        let registry = build_registry(&Config::default()).unwrap();
        let listing = list_languages(&registry);
        assert!(listing.starts_with("json\tJSON\n"));
        assert!(listing.contains("xml\tHTML, XML\n"));
    }

    #[test]
    fn test_read_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(read_input(Some(path.as_path())).unwrap(), "{}");
        assert!(read_input(Some(dir.path().join("missing").as_path())).is_err());
    }
}
