//! Markdown.
//!
//! Inline HTML is delegated to the `xml` grammar. Strong and emphasis nest
//! one level inside each other (`**bold _italic_**`), which covers the way
//! they are written in practice.

use std::sync::Arc;

use glint_grammar::{ChildRef, Language, Mode, SubLanguage};

fn inline_html() -> Mode {
    Mode::new()
        .begin("<")
        .end(">")
        .sub_language(SubLanguage::Named("xml".to_string()))
        .relevance(0)
}

fn code() -> Mode {
    let indented = Mode::new()
        .begin(r"(?=^( {4}|\t))")
        .contains([Mode::new().begin(r"^( {4}|\t)").end(r"(\n)$")])
        .relevance(0);

    Mode::new().class_name("code").variants([
        Mode::new().begin(r"(`{3,})(.|\n)*?\1`*[ ]*"),
        Mode::new().begin(r"(~{3,})(.|\n)*?\1~*[ ]*"),
        Mode::new().begin("```").end("```+[ ]*$"),
        Mode::new().begin("~~~").end("~~~+[ ]*$"),
        Mode::new().begin("`.+?`"),
        indented,
    ])
}

fn list() -> Mode {
    Mode::new()
        .class_name("bullet")
        .begin(r"^[ \t]*([*+-]|(\d+\.))(?=\s+)")
        .end(r"\s+")
        .exclude_end()
}

fn link_reference() -> Mode {
    Mode::new().begin(r"^\[[^\n]+\]:").return_begin().contains([
        Mode::new()
            .class_name("symbol")
            .begin(r"\[")
            .end(r"\]")
            .exclude_begin()
            .exclude_end(),
        Mode::new().class_name("link").begin(r":\s*").end("$").exclude_begin(),
    ])
}

fn link() -> Mode {
    Mode::new()
        .begin(r"\[.+?\][(\[].*?[)\]]")
        .return_begin()
        .relevance(10)
        .contains([
            Mode::new()
                .class_name("string")
                .begin(r"\[")
                .end(r"\]")
                .exclude_begin()
                .return_end()
                .relevance(0),
            Mode::new()
                .class_name("link")
                .begin(r"\]\(")
                .end(r"\)")
                .exclude_begin()
                .exclude_end(),
            Mode::new()
                .class_name("symbol")
                .begin(r"\]\[")
                .end(r"\]")
                .exclude_begin()
                .exclude_end(),
        ])
}

fn bold(contains: Vec<ChildRef>) -> Mode {
    Mode::new()
        .class_name("strong")
        .contains(contains)
        .variants([
            Mode::new().begin("_{2}").end("_{2}"),
            Mode::new().begin(r"\*{2}").end(r"\*{2}"),
        ])
}

fn italic(contains: Vec<ChildRef>) -> Mode {
    Mode::new()
        .class_name("emphasis")
        .contains(contains)
        .variants([
            Mode::new().begin(r"\*(?!\*)").end(r"\*"),
            Mode::new().begin("_(?!_)").end("_").relevance(0),
        ])
}

pub fn markdown() -> Language {
    let inline_html = Arc::new(inline_html());
    let link = Arc::new(link());
    let inline: Vec<ChildRef> = vec![ChildRef::from(&inline_html), ChildRef::from(&link)];

    let with = |extra: Mode| -> Vec<ChildRef> {
        let mut children = vec![ChildRef::from(extra)];
        children.extend(inline.iter().cloned());
        children
    };
    let bold = Arc::new(bold(with(italic(inline.clone()))));
    let italic = Arc::new(italic(with(self::bold(inline.clone()))));

    let mut containable = inline.clone();
    containable.push(ChildRef::from(&bold));
    containable.push(ChildRef::from(&italic));

    let header = Mode::new().class_name("section").variants([
        Mode::new().begin("^#{1,6}").end("$").contains(containable.clone()),
        Mode::new().begin(r"(?=^.+?\n[=-]{2,}$)").contains([
            Mode::new().begin("^[=-]*$"),
            Mode::new().begin("^").end(r"\n").contains(containable.clone()),
        ]),
    ]);
    let blockquote = Mode::new()
        .class_name("quote")
        .begin(r"^>\s+")
        .end("$")
        .contains(containable);

    Language::new("Markdown")
        .aliases(["md", "mkdown", "mkd"])
        .mode(Mode::new().contains([
            ChildRef::from(header),
            ChildRef::from(&inline_html),
            ChildRef::from(list()),
            ChildRef::from(&bold),
            ChildRef::from(&italic),
            ChildRef::from(blockquote),
            ChildRef::from(code()),
            ChildRef::from(Mode::new().begin(r"^[-*]{3,}").end("$")),
            ChildRef::from(&link),
            ChildRef::from(link_reference()),
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_grammar::compile_language;

    #[test]
    fn test_markdown_compiles() {
        let compiled = compile_language(&markdown()).unwrap();
        assert_eq!(compiled.name, "Markdown");
    }

    #[test]
    fn test_emphasis_nests_once() {
        let strong = bold(vec![ChildRef::from(italic(Vec::new()))]);
        let ChildRef::Mode(inner) = &strong.children()[0] else {
            panic!("expected a nested mode");
        };
        assert_eq!(inner.class_name.as_deref(), Some("emphasis"));
        assert!(inner.children().is_empty());
    }
}
