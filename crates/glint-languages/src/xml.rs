//! HTML and XML.
//!
//! `<style>` and `<script>` bodies are handed to whichever embedded language
//! scores best, so CSS inside HTML is highlighted as CSS.

use std::sync::Arc;

use glint_grammar::{ChildRef, Keywords, Language, Mode, SubLanguage};

use crate::common;

const XML_IDENT_RE: &str = r"[A-Za-z0-9._:-]+";

fn entities() -> Mode {
    Mode::new()
        .class_name("symbol")
        .begin("&[a-z]+;|&#[0-9]+;|&#x[a-f0-9]+;")
}

/// Attributes of an open tag. Values may be quoted or bare.
fn tag_internals() -> Arc<Mode> {
    let entities = Arc::new(entities());
    let value = Mode::new().class_name("string").ends_parent().variants([
        Mode::new().begin("\"").end("\"").contains([&entities]),
        Mode::new().begin("'").end("'").contains([&entities]),
        Mode::new().begin(r#"[^\s"'=<>`]+"#),
    ]);

    Arc::new(
        Mode::new()
            .ends_with_parent()
            .illegal("<")
            .relevance(0)
            .contains([
                Mode::new().class_name("attr").begin(XML_IDENT_RE).relevance(0),
                Mode::new().begin(r"=\s*").relevance(0).contains([value]),
            ]),
    )
}

/// `<!DOCTYPE ...>` and the declarations nested in its internal subset.
fn doctype() -> Mode {
    let meta_keywords = Arc::new(
        Mode::new().begin(r"\s").contains([Mode::new()
            .class_name("meta-keyword")
            .begin("#?[a-z_][a-z1-9_-]+")
            .illegal(r"\n")]),
    );
    let meta_par_keywords = Arc::new(meta_keywords.merge(&Mode::new().begin(r"\(").end(r"\)")));
    let apos_meta_string = Arc::new(common::apos_string().merge(&Mode::new().class_name("meta-string")));
    let quote_meta_string = Arc::new(common::quote_string().merge(&Mode::new().class_name("meta-string")));

    let nested = Mode::new().class_name("meta").begin("<![a-z]").end(">").contains([
        &meta_keywords,
        &meta_par_keywords,
        &quote_meta_string,
        &apos_meta_string,
    ]);

    Mode::new()
        .class_name("meta")
        .begin("<![a-z]")
        .end(">")
        .relevance(10)
        .contains([
            ChildRef::from(&meta_keywords),
            ChildRef::from(&quote_meta_string),
            ChildRef::from(&apos_meta_string),
            ChildRef::from(&meta_par_keywords),
            ChildRef::from(Mode::new().begin(r"\[").end(r"\]").contains([nested])),
        ])
}

/// An open tag whose body belongs to another language.
fn embedding_tag(name: &str, close: &str, candidates: &[&str], internals: &Arc<Mode>) -> Mode {
    let body = Mode::new()
        .end(close)
        .return_end()
        .sub_language(SubLanguage::Candidates(candidates.iter().map(|c| c.to_string()).collect()));

    Mode::new()
        .class_name("tag")
        .begin(format!(r"<{name}(?=\s|>)"))
        .end(">")
        .keywords(Keywords::classed([("name", name)]))
        .contains([internals])
        .starts(body)
}

pub fn xml() -> Language {
    let internals = tag_internals();

    let tag = Mode::new().class_name("tag").begin("</?").end("/?>").contains([
        ChildRef::from(Mode::new().class_name("name").begin(r"[^/><\s]+").relevance(0)),
        ChildRef::from(&internals),
    ]);

    Language::new("HTML, XML")
        .aliases(["html", "xhtml", "rss", "atom", "xjb", "xsd", "xsl", "plist", "wsf", "svg"])
        .case_insensitive()
        .mode(Mode::new().contains([
            doctype(),
            common::comment_with(Mode::new().begin("<!--").end("-->").relevance(10)),
            Mode::new().begin(r"<!\[CDATA\[").end(r"\]\]>").relevance(10),
            entities(),
            Mode::new().class_name("meta").begin(r"<\?xml").end(r"\?>").relevance(10),
            embedding_tag("style", "</style>", &["css", "xml"], &internals),
            embedding_tag("script", "</script>", &["javascript", "handlebars", "xml"], &internals),
            tag,
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_grammar::compile_language;

    #[test]
    fn test_xml_compiles() {
        let compiled = compile_language(&xml()).unwrap();
        assert!(compiled.aliases.iter().any(|alias| alias == "html"));
    }

    #[test]
    fn test_embedding_tag_starts_sublanguage() {
        let internals = tag_internals();
        let style = embedding_tag("style", "</style>", &["css"], &internals);
        let body = style.starts.as_deref().unwrap();
        assert_eq!(body.sub_language, Some(SubLanguage::Candidates(vec!["css".into()])));
        assert_eq!(body.return_end, Some(true));
    }
}
