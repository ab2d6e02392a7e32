//! Rendering token trees.
//!
//! A [`Renderer`] receives the tree as a stream of open, text and close
//! events. [`HtmlRenderer`] turns scopes into `<span>` elements.

use crate::tree::{ScopeNode, TokenTree};

/// Consumer of a token tree walk.
pub trait Renderer {
    fn add_text(&mut self, text: &str);
    fn open_node(&mut self, node: &ScopeNode);
    fn close_node(&mut self, node: &ScopeNode);
}

/// Renders scopes as `<span class="...">`.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    buffer: String,
    class_prefix: String,
}

impl HtmlRenderer {
    pub fn new(class_prefix: impl Into<String>) -> Self {
        Self {
            buffer: String::new(),
            class_prefix: class_prefix.into(),
        }
    }

    /// Renders `tree` in one go.
    pub fn render(tree: &TokenTree, class_prefix: &str) -> String {
        let mut renderer = Self::new(class_prefix);
        tree.walk(&mut renderer);
        renderer.into_string()
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    // Embedded language roots are named after the bare language.
    fn class_for(&self, node: &ScopeNode) -> Option<String> {
        let kind = node.kind.as_deref()?;
        if node.sublanguage {
            Some(kind.to_string())
        } else {
            Some(format!("{}{kind}", self.class_prefix))
        }
    }
}

impl Renderer for HtmlRenderer {
    fn add_text(&mut self, text: &str) {
        self.buffer.push_str(&escape_html(text));
    }

    fn open_node(&mut self, node: &ScopeNode) {
        if let Some(class) = self.class_for(node) {
            self.buffer.push_str("<span class=\"");
            self.buffer.push_str(&class);
            self.buffer.push_str("\">");
        }
    }

    fn close_node(&mut self, node: &ScopeNode) {
        if node.kind.is_some() {
            self.buffer.push_str("</span>");
        }
    }
}

/// Escapes the characters that are special in HTML text and attributes.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
