//! JSON.
//!
//! Objects and arrays share one container mode that contains itself, which
//! keeps nesting unbounded without a cycle between two modes.

use glint_grammar::{ChildRef, Keywords, Language, Mode};

use crate::common;

fn literals() -> Keywords {
    Keywords::classed([("literal", "true false null")])
}

pub fn json() -> Language {
    let attr = Mode::new()
        .class_name("attr")
        .begin(r#""(?=(?:[^"\\\n]|\\.)*"\s*:)"#)
        .end("\"")
        .illegal(r"\n")
        .contains([common::backslash_escape()]);

    // Bare words stay legal so the literals reach keyword matching.
    let container = Mode::new()
        .begin(r"[{\[]")
        .end(r"[}\]]")
        .keywords(literals())
        .illegal(r"[^\s:,a-z]")
        .contains([
            ChildRef::from(attr),
            ChildRef::SelfRef,
            ChildRef::from(common::quote_string()),
            ChildRef::from(common::c_number()),
            ChildRef::from(common::c_line_comment()),
            ChildRef::from(common::c_block_comment()),
        ]);

    Language::new("JSON").mode(
        Mode::new()
            .keywords(literals())
            .illegal(r"\S")
            .contains([
                ChildRef::from(container),
                ChildRef::from(common::quote_string()),
                ChildRef::from(common::c_number()),
                ChildRef::from(common::c_line_comment()),
                ChildRef::from(common::c_block_comment()),
            ]),
    )
}
