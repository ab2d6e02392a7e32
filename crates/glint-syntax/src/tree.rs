//! The token tree.
//!
//! Highlighting produces a tree rather than a flat token list: a string inside
//! a function inside a class is three nested scopes. Leaves are plain text
//! and, read in order, reproduce the input exactly.

use serde::Serialize;

use crate::render::Renderer;

/// A tree node: a run of text or a scope with children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Scope(ScopeNode),
}

/// A classified region of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeNode {
    /// Category such as `"string"`. For embedded languages, the language name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Set on the root of an embedded language's tree.
    #[serde(skip_serializing_if = "is_false")]
    pub sublanguage: bool,
    pub children: Vec<Node>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ScopeNode {
    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Scope(scope) => scope.push_text(out),
            }
        }
    }

    /// All leaf text in order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }
}

/// Builds a tree as the engine opens and closes scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "ScopeNode")]
pub struct TokenTree {
    root: ScopeNode,
    open: Vec<ScopeNode>,
}

impl From<TokenTree> for ScopeNode {
    fn from(tree: TokenTree) -> Self {
        tree.into_root()
    }
}

impl TokenTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree holding `text` as a single leaf.
    pub fn plain(text: &str) -> Self {
        let mut tree = Self::new();
        tree.add_text(text);
        tree
    }

    fn top(&mut self) -> &mut ScopeNode {
        self.open.last_mut().unwrap_or(&mut self.root)
    }

    pub fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.top().children.push(Node::Text(text.to_string()));
    }

    /// Adds `text` wrapped in its own `kind` scope.
    pub fn add_keyword(&mut self, text: &str, kind: &str) {
        if text.is_empty() {
            return;
        }
        self.open_node(kind);
        self.add_text(text);
        self.close_node();
    }

    pub fn open_node(&mut self, kind: &str) {
        self.open.push(ScopeNode {
            kind: Some(kind.to_string()),
            ..Default::default()
        });
    }

    /// Closes the innermost open scope. Returns `false` when only the root is
    /// left.
    pub fn close_node(&mut self) -> bool {
        match self.open.pop() {
            Some(node) => {
                self.top().children.push(Node::Scope(node));
                true
            }
            None => false,
        }
    }

    pub fn close_all_nodes(&mut self) {
        while self.close_node() {}
    }

    /// Grafts the tree of an embedded language under the current scope.
    pub fn add_sublanguage(&mut self, tree: TokenTree, language: Option<&str>) {
        let mut node = tree.into_root();
        node.kind = language.map(str::to_string);
        node.sublanguage = true;
        self.top().children.push(Node::Scope(node));
    }

    /// Number of scopes currently open, not counting the root.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// The root scope. Scopes still open are not part of it yet.
    pub fn root(&self) -> &ScopeNode {
        &self.root
    }

    pub fn into_root(mut self) -> ScopeNode {
        self.close_all_nodes();
        self.root
    }

    pub fn text(&self) -> String {
        self.root.text()
    }

    /// Walks the finished tree depth first.
    pub fn walk<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        for child in &self.root.children {
            walk_node(child, renderer);
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.root)
    }
}

fn walk_node<R: Renderer + ?Sized>(node: &Node, renderer: &mut R) {
    match node {
        Node::Text(text) => renderer.add_text(text),
        Node::Scope(scope) => {
            renderer.open_node(scope);
            for child in &scope.children {
                walk_node(child, renderer);
            }
            renderer.close_node(scope);
        }
    }
}
