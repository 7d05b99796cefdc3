//! Generic attributed-node document tree consumed by the engine.
//!
//! These nodes are the output of a concrete syntax reader (XML, JSON, ...)
//! which lives outside this crate behind the [`crate::reader::DocumentReader`]
//! trait. The engine never looks at raw source text; it only walks this tree.

use indexmap::IndexMap;

// ──────────────────────────────────────────────
// Provenance
// ──────────────────────────────────────────────

/// Source location attached to declarations and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub file: String,
    pub line: u32,
}

// ──────────────────────────────────────────────
// Nodes
// ──────────────────────────────────────────────

/// A named attribute with the line it appeared on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub value: String,
    pub line: u32,
}

/// One node of a document tree: a name, ordered attributes, an optional
/// text payload, and ordered child nodes. Immutable once handed to a
/// session.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    pub name: String,
    pub line: u32,
    pub attributes: IndexMap<String, Attribute>,
    pub text: String,
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        DocumentNode {
            name: name.into(),
            line,
            attributes: IndexMap::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style: add an attribute on the same line as the node.
    pub fn attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let line = self.line;
        self.attr_at(name, value, line)
    }

    /// Builder-style: add an attribute with its own source line.
    pub fn attr_at(mut self, name: impl Into<String>, value: impl Into<String>, line: u32) -> Self {
        self.attributes.insert(
            name.into(),
            Attribute {
                value: value.into(),
                line,
            },
        );
        self
    }

    /// Builder-style: set the text payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder-style: append a child node.
    pub fn child(mut self, node: DocumentNode) -> Self {
        self.children.push(node);
        self
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|a| a.value.as_str())
    }

    /// First child with the given name, if any.
    pub fn find_child(&self, name: &str) -> Option<&DocumentNode> {
        self.children.iter().find(|c| c.name == name)
    }
}
