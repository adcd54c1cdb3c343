//! Report tree nodes.

use serde::Serialize;

/// A named element with ordered attributes, ordered children and optional text.
///
/// Leaves produced by [`crate::ReportBuilder::tagged_value`] carry text; blocks
/// carry children. Nothing stops a caller from building mixed nodes by hand,
/// and the XML writer handles them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Node {
    /// Create an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Create a text leaf.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::new(name);
        node.text = Some(text.into());
        node
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder-style text setter.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set an attribute, replacing an existing one with the same key in place.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Add every pair from `attrs`.
    pub fn extend_attributes<I, K, V>(&mut self, attrs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        for (k, v) in attrs {
            self.set_attribute(k, v);
        }
    }

    /// Append a child node.
    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Look up an attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First direct child with the given name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}
