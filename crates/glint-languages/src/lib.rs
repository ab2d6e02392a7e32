//! # Glint Languages
//!
//! Grammars bundled with glint, plus the helpers they share.
//!
//! Every grammar is a plain function returning a [`Language`]. Nothing is
//! compiled here; the registry compiles a grammar when it is registered.
//!
//! ```
//! use glint_languages::bundled;
//!
//! let names: Vec<&str> = bundled().iter().map(|(name, _)| *name).collect();
//! assert!(names.contains(&"json"));
//! ```
//!
//! ## Learning: Function Pointers as Factories
//!
//! `fn() -> Language` is a plain function pointer. A table of them is a
//! `const`, costs nothing until a grammar is actually built, and needs no
//! boxing or trait objects.

pub mod common;
mod css;
mod ini;
mod json;
mod markdown;
mod xml;

use glint_grammar::Language;

pub use css::css;
pub use ini::ini;
pub use json::json;
pub use markdown::markdown;
pub use xml::xml;

/// Builds a grammar.
pub type GrammarFactory = fn() -> Language;

const BUNDLED: &[(&str, GrammarFactory)] = &[
    ("json", json),
    ("ini", ini),
    ("css", css),
    ("xml", xml),
    ("markdown", markdown),
];

/// Bundled grammars with their registration names, in registration order.
/// Markdown comes after XML, which it embeds.
pub fn bundled() -> &'static [(&'static str, GrammarFactory)] {
    BUNDLED
}

/// Looks up a bundled grammar by its registration name.
pub fn factory(name: &str) -> Option<GrammarFactory> {
    BUNDLED
        .iter()
        .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
        .map(|(_, factory)| *factory)
}

/// Guesses the grammar for a file from its extension.
pub fn detect_language(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();

    let language = match ext.as_str() {
        "json" | "jsonc" | "geojson" => "json",
        "ini" | "cfg" | "conf" | "toml" | "properties" => "ini",
        "css" => "css",
        "html" | "htm" | "xhtml" | "xml" | "xsl" | "xslt" | "xsd" | "svg" | "rss" | "atom" | "plist" => "xml",
        "md" | "mdx" | "markdown" | "mkd" | "mkdown" => "markdown",
        _ => return None,
    };
    Some(language)
}
