//! Owned XML tree with `ElementTree`-style path lookup.
//!
//! [`roxmltree`] documents borrow their input, so successful responses are
//! copied into an owned [`XmlElement`] tree that can outlive the body text.

use crate::error::{ProviderError, Result};

/// One element: name, namespace, direct text, children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    namespace: Option<String>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parses `text` into an owned tree rooted at the document element.
    pub fn parse(provider: &str, text: &str) -> Result<Self> {
        let document = roxmltree::Document::parse(text).map_err(|e| ProviderError::ParseError {
            provider: provider.to_string(),
            detail: format!("invalid XML: {e}"),
        })?;
        Ok(Self::from_node(document.root_element()))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        Self {
            name: tag.name().to_string(),
            namespace: tag.namespace().map(str::to_string),
            text: node
                .children()
                .filter(roxmltree::Node::is_text)
                .filter_map(|child| child.text())
                .collect(),
            children: node
                .children()
                .filter(roxmltree::Node::is_element)
                .map(Self::from_node)
                .collect(),
        }
    }

    /// Local name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Text directly inside this element, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    fn matches(&self, name: &str, namespace: Option<&str>) -> bool {
        self.name == name && namespace.is_none_or(|ns| self.namespace() == Some(ns))
    }

    /// All elements reached by the `/`-separated `path`, relative to `self`.
    ///
    /// With `namespace` set, every step must be in that namespace; with `None`
    /// only local names are compared.
    pub fn find_all(&self, path: &str, namespace: Option<&str>) -> Vec<&XmlElement> {
        let mut frontier = vec![self];
        for step in path.split('/').filter(|step| !step.is_empty()) {
            frontier = frontier
                .into_iter()
                .flat_map(|element| element.children.iter())
                .filter(|child| child.matches(step, namespace))
                .collect();
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    /// First element reached by `path`.
    pub fn find(&self, path: &str, namespace: Option<&str>) -> Option<&XmlElement> {
        self.find_all(path, namespace).into_iter().next()
    }

    /// Trimmed text of the first element reached by `path`, if non-empty.
    pub fn find_text(&self, path: &str, namespace: Option<&str>) -> Option<&str> {
        self.find(path, namespace)
            .map(XmlElement::text)
            .filter(|text| !text.is_empty())
    }
}

/// A parsed document together with the namespace its paths are resolved in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
    namespace: Option<String>,
}

impl XmlDocument {
    pub fn parse(provider: &str, text: &str, namespace: Option<&str>) -> Result<Self> {
        Ok(Self {
            root: XmlElement::parse(provider, text)?,
            namespace: namespace.map(str::to_string),
        })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// [`XmlElement::find_all`] from the root in the document namespace.
    pub fn find_all(&self, path: &str) -> Vec<&XmlElement> {
        self.root.find_all(path, self.namespace())
    }

    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        self.root.find(path, self.namespace())
    }

    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.root.find_text(path, self.namespace())
    }
}
