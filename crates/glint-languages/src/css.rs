//! CSS.

use std::sync::Arc;

use glint_grammar::{ChildRef, Language, Mode};

use crate::common;

const AT_IDENTIFIER: &str = "@[a-z-]+";
const AT_PROPERTY_RE: &str = r"@-?\w[\w]*(-\w+)*";
const IDENT_RE: &str = "[a-zA-Z-][a-zA-Z0-9_-]*";

fn at_modifiers() -> &'static [&'static str] {
    &["and", "or", "not", "only"]
}

/// `name(...)`, such as `rgba(0, 0, 0, 0.5)` or `url("a.png")`.
fn function_like() -> Mode {
    Mode::new().begin(r"[\w-]+\(").return_begin().contains([
        Mode::new().class_name("built_in").begin(r"[\w-]+"),
        Mode::new().begin(r"\(").end(r"\)").contains([
            common::apos_string(),
            common::quote_string(),
            common::css_number(),
        ]),
    ])
}

/// `property: value` inside a block. The value runs to the `;` that ends the
/// rule, or to the end of the block.
fn rule() -> Mode {
    let value = Mode::new().ends_with_parent().exclude_end().contains([
        ChildRef::from(function_like()),
        ChildRef::from(common::css_number()),
        ChildRef::from(common::quote_string()),
        ChildRef::from(common::apos_string()),
        ChildRef::from(common::c_block_comment()),
        ChildRef::from(Mode::new().class_name("number").begin("#[0-9A-Fa-f]+")),
        ChildRef::from(Mode::new().class_name("meta").begin("!important")),
    ]);
    let attribute = Mode::new()
        .class_name("attribute")
        .begin(r"\S")
        .end(":")
        .exclude_end()
        .starts(value);

    Mode::new()
        .begin(r"(?:[A-Z_.-]+|--[a-zA-Z0-9_-]+)\s*:")
        .return_begin()
        .end(";")
        .ends_with_parent()
        .contains([attribute])
}

fn at_rule() -> Mode {
    let modifiers = Mode::new()
        .begin(r"\s")
        .ends_with_parent()
        .exclude_end()
        .relevance(0)
        .keywords(at_modifiers().join(" ").as_str())
        .contains([
            ChildRef::from(Mode::new().class_name("attribute").begin("[a-z-]+:")),
            ChildRef::from(common::apos_string()),
            ChildRef::from(common::quote_string()),
            ChildRef::from(common::css_number()),
        ]);

    // Eating the opening brace drops the scanner back to the top level, which
    // is where the nested rules of `@media` belong.
    Mode::new()
        .begin("@")
        .end("[{;]")
        .illegal(":")
        .return_begin()
        .contains([
            Mode::new().class_name("keyword").begin(AT_PROPERTY_RE),
            modifiers,
        ])
}

pub fn css() -> Language {
    let block_comment: Arc<Mode> = common::c_block_comment();

    let root = Mode::new().illegal(r"[=/|'\$]").contains([
        ChildRef::from(&block_comment),
        ChildRef::from(Mode::new().class_name("selector-id").begin("#[A-Za-z0-9_-]+")),
        ChildRef::from(Mode::new().class_name("selector-class").begin(r"\.[A-Za-z0-9_-]+")),
        ChildRef::from(
            Mode::new()
                .class_name("selector-attr")
                .begin(r"\[")
                .end(r"\]")
                .illegal("$")
                .contains([common::apos_string(), common::quote_string()]),
        ),
        ChildRef::from(
            Mode::new()
                .class_name("selector-pseudo")
                .begin(r#":(:)?[a-zA-Z0-9_+()"'.-]+"#),
        ),
        ChildRef::from(
            Mode::new()
                .begin("@(page|font-face)")
                .lexemes(AT_IDENTIFIER)
                .keywords("@page @font-face"),
        ),
        ChildRef::from(at_rule()),
        ChildRef::from(Mode::new().class_name("selector-tag").begin(IDENT_RE).relevance(0)),
        ChildRef::from(
            Mode::new()
                .begin(r"\{")
                .end(r"\}")
                .illegal(r"\S")
                .contains([ChildRef::from(&block_comment), ChildRef::from(rule())]),
        ),
    ]);

    Language::new("CSS").case_insensitive().mode(root)
}
