//! Modes shared by several grammars.
//!
//! Each shared mode is built once and handed out as an `Arc`, so a grammar
//! that uses the same string mode in five places still compiles it once.

use std::sync::{Arc, LazyLock};

use glint_grammar::{ChildRef, Hook, HookMatch, HookResponse, Mode};

pub const IDENT_RE: &str = r"[a-zA-Z]\w*";
pub const UNDERSCORE_IDENT_RE: &str = r"[a-zA-Z_]\w*";
pub const NUMBER_RE: &str = r"\b\d+(\.\d+)?";
pub const C_NUMBER_RE: &str = r"(-?)(\b0[xX][a-fA-F0-9]+|(\b\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?)";

const CSS_UNITS: &[&str] = &[
    "%", "em", "ex", "ch", "rem", "vw", "vh", "vmin", "vmax", "cm", "mm", "in", "pt", "pc", "px", "deg", "grad",
    "rad", "turn", "s", "ms", "Hz", "kHz", "dpi", "dpcm", "dppx",
];

const BEGIN_MATCH_KEY: &str = "begin_match";

static BACKSLASH_ESCAPE: LazyLock<Arc<Mode>> =
    LazyLock::new(|| Arc::new(Mode::new().begin(r"\\[\s\S]").relevance(0)));

// Runs of plain English, so words in comments are not taken for keywords.
static PHRASAL_WORDS: LazyLock<Arc<Mode>> = LazyLock::new(|| {
    Arc::new(Mode::new().begin(
        r"\b(a|an|the|are|I'm|isn't|don't|doesn't|won't|but|just|should|pretty|simply|enough|gonna|going|wtf|so|such|will|you|your|they|like|more)\b",
    ))
});

static DOCTAG: LazyLock<Arc<Mode>> = LazyLock::new(|| {
    Arc::new(
        Mode::new()
            .class_name("doctag")
            .begin("(?:TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):")
            .relevance(0),
    )
});

static APOS_STRING: LazyLock<Arc<Mode>> = LazyLock::new(|| {
    Arc::new(
        Mode::new()
            .class_name("string")
            .begin("'")
            .end("'")
            .illegal(r"\n")
            .contains([backslash_escape()]),
    )
});

static QUOTE_STRING: LazyLock<Arc<Mode>> = LazyLock::new(|| {
    Arc::new(
        Mode::new()
            .class_name("string")
            .begin("\"")
            .end("\"")
            .illegal(r"\n")
            .contains([backslash_escape()]),
    )
});

static C_LINE_COMMENT: LazyLock<Arc<Mode>> = LazyLock::new(|| Arc::new(comment("//", "$")));
static C_BLOCK_COMMENT: LazyLock<Arc<Mode>> = LazyLock::new(|| Arc::new(comment(r"/\*", r"\*/")));
static HASH_COMMENT: LazyLock<Arc<Mode>> = LazyLock::new(|| Arc::new(comment("#", "$")));

static NUMBER: LazyLock<Arc<Mode>> =
    LazyLock::new(|| Arc::new(Mode::new().class_name("number").begin(NUMBER_RE).relevance(0)));

static C_NUMBER: LazyLock<Arc<Mode>> =
    LazyLock::new(|| Arc::new(Mode::new().class_name("number").begin(C_NUMBER_RE).relevance(0)));

static CSS_NUMBER: LazyLock<Arc<Mode>> = LazyLock::new(|| {
    let units = CSS_UNITS.join("|");
    Arc::new(
        Mode::new()
            .class_name("number")
            .begin(format!("{NUMBER_RE}({units})?"))
            .relevance(0),
    )
});

static TITLE: LazyLock<Arc<Mode>> =
    LazyLock::new(|| Arc::new(Mode::new().class_name("title").begin(IDENT_RE).relevance(0)));

pub fn backslash_escape() -> Arc<Mode> {
    Arc::clone(&BACKSLASH_ESCAPE)
}

pub fn phrasal_words() -> Arc<Mode> {
    Arc::clone(&PHRASAL_WORDS)
}

pub fn apos_string() -> Arc<Mode> {
    Arc::clone(&APOS_STRING)
}

pub fn quote_string() -> Arc<Mode> {
    Arc::clone(&QUOTE_STRING)
}

pub fn c_line_comment() -> Arc<Mode> {
    Arc::clone(&C_LINE_COMMENT)
}

pub fn c_block_comment() -> Arc<Mode> {
    Arc::clone(&C_BLOCK_COMMENT)
}

pub fn hash_comment() -> Arc<Mode> {
    Arc::clone(&HASH_COMMENT)
}

pub fn number() -> Arc<Mode> {
    Arc::clone(&NUMBER)
}

pub fn c_number() -> Arc<Mode> {
    Arc::clone(&C_NUMBER)
}

pub fn css_number() -> Arc<Mode> {
    Arc::clone(&CSS_NUMBER)
}

pub fn title() -> Arc<Mode> {
    Arc::clone(&TITLE)
}

/// A comment from `begin` to `end`.
pub fn comment(begin: &str, end: &str) -> Mode {
    comment_with(Mode::new().begin(begin).end(end))
}

/// A comment built over `options`. English prose and doc tags such as
/// `TODO:` are recognized inside it.
pub fn comment_with(options: Mode) -> Mode {
    let mut children = options.children().to_vec();
    children.push(ChildRef::from(phrasal_words()));
    children.push(ChildRef::from(Arc::clone(&DOCTAG)));
    Mode::new().class_name("comment").merge(&options).contains(children)
}

/// A `#!` line, recognized only at the very start of the text.
pub fn shebang() -> Mode {
    Mode::new()
        .class_name("meta")
        .begin(r"^#![ ]*/")
        .end("$")
        .relevance(0)
        .on_begin(Hook::from_fn(|found, response| {
            if found.start() != 0 {
                response.ignore_match();
            }
        }))
}

/// Makes `mode` end only where its end's first group repeats its begin's
/// first group, as with heredoc markers.
pub fn end_same_as_begin(mode: Mode) -> Mode {
    mode.on_begin(Hook::from_fn(remember_begin)).on_end(Hook::from_fn(require_same_end))
}

fn remember_begin(found: &HookMatch<'_>, response: &mut HookResponse<'_>) {
    let captured = found.group(1).unwrap_or_default().to_string();
    response.data().insert(BEGIN_MATCH_KEY.to_string(), captured);
}

fn require_same_end(found: &HookMatch<'_>, response: &mut HookResponse<'_>) {
    let expected = response.data().get(BEGIN_MATCH_KEY).cloned();
    if expected.as_deref() != found.group(1) {
        response.ignore_match();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_grammar::{Language, compile_language};

    #[test]
    fn test_shared_modes_are_shared() {
        assert!(Arc::ptr_eq(&quote_string(), &quote_string()));
        assert!(Arc::ptr_eq(&c_block_comment(), &c_block_comment()));
    }

    #[test]
    fn test_comment_children() {
        let comment = comment("<!--", "-->");
        assert_eq!(comment.class_name.as_deref(), Some("comment"));
        assert_eq!(comment.children().len(), 2);
    }

    #[test]
    fn test_common_modes_compile() {
        let language = Language::new("common").mode(Mode::new().contains([
            ChildRef::from(quote_string()),
            ChildRef::from(apos_string()),
            ChildRef::from(c_line_comment()),
            ChildRef::from(c_block_comment()),
            ChildRef::from(hash_comment()),
            ChildRef::from(number()),
            ChildRef::from(c_number()),
            ChildRef::from(css_number()),
            ChildRef::from(title()),
            ChildRef::from(shebang()),
            ChildRef::from(end_same_as_begin(Mode::new().begin(r"<<(\w+)").end(r"^(\w+)$"))),
        ]));
        assert!(compile_language(&language).is_ok());
    }
}
