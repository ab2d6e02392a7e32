//! TOML, also INI.

use glint_grammar::pattern::{concat, either, lookahead};
use glint_grammar::{ChildRef, Language, Mode};

use crate::common;

const BARE_KEY: &str = r"[A-Za-z0-9_-]+";
const QUOTED_KEY_DOUBLE_QUOTE: &str = r#""(\\"|[^"])*""#;
const QUOTED_KEY_SINGLE_QUOTE: &str = r"'[^']*'";

fn dotted_key() -> String {
    let any_key = either([BARE_KEY, QUOTED_KEY_DOUBLE_QUOTE, QUOTED_KEY_SINGLE_QUOTE]);
    concat([
        any_key.as_str(),
        r"(\s*\.\s*",
        any_key.as_str(),
        ")*",
        lookahead(r"\s*=\s*[^#\s]").as_str(),
    ])
}

pub fn ini() -> Language {
    let numbers = Mode::new().class_name("number").relevance(0).variants([
        Mode::new().begin(r"([+-]+)?[\d]+_[\d_]+"),
        Mode::new().begin(common::NUMBER_RE),
    ]);
    let comments = common::comment_with(
        Mode::new().variants([Mode::new().begin(";").end("$"), Mode::new().begin("#").end("$")]),
    );
    let variables = Mode::new()
        .class_name("variable")
        .variants([Mode::new().begin(r#"\$[\w"][\w]*"#), Mode::new().begin(r"\$\{(.*?)\}")]);
    // Only the outer words are anchored, which is how the format has always
    // been matched.
    let literals = Mode::new().class_name("literal").begin(r"\bon|off|true|false|yes|no\b");
    let strings = Mode::new()
        .class_name("string")
        .contains([common::backslash_escape()])
        .variants([
            Mode::new().begin("'''").end("'''").relevance(10),
            Mode::new().begin("\"\"\"").end("\"\"\"").relevance(10),
            Mode::new().begin("\"").end("\""),
            Mode::new().begin("'").end("'"),
        ]);

    let array = Mode::new()
        .begin(r"\[")
        .end(r"\]")
        .relevance(0)
        .contains([
            ChildRef::from(comments.clone()),
            ChildRef::from(literals.clone()),
            ChildRef::from(variables.clone()),
            ChildRef::from(strings.clone()),
            ChildRef::from(numbers.clone()),
            ChildRef::SelfRef,
        ]);

    let value = Mode::new().end("$").contains([
        ChildRef::from(comments.clone()),
        ChildRef::from(array),
        ChildRef::from(literals),
        ChildRef::from(variables),
        ChildRef::from(strings),
        ChildRef::from(numbers),
    ]);

    Language::new("TOML, also INI")
        .aliases(["toml"])
        .case_insensitive()
        .mode(
            Mode::new().illegal(r"\S").contains([
                ChildRef::from(comments),
                ChildRef::from(Mode::new().class_name("section").begin(r"\[+").end(r"\]+")),
                ChildRef::from(Mode::new().class_name("attr").begin(dotted_key()).starts(value)),
            ]),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_grammar::compile_language;

    #[test]
    fn test_ini_compiles() {
        let compiled = compile_language(&ini()).unwrap();
        assert!(compiled.case_insensitive);
        assert_eq!(compiled.aliases, vec!["toml".to_string()]);
    }

    #[test]
    fn test_dotted_key_shape() {
        let key = dotted_key();
        assert!(key.starts_with("(?:"));
        assert!(key.ends_with(r"(?=\s*=\s*[^#\s])"));
    }
}
