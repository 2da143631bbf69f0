//! Schema-agnostic content tree sitting between clipboard markup and the
//! document model.
//!
//! Element names are lowercase HTML tag names kept as hints for the
//! upcast. No raw markup survives into this tree.

use std::collections::BTreeMap;

use smol_str::SmolStr;

/// A node of the intermediate content tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentNode {
    Text(String),
    Element(ContentElement),
}

/// An element with its attributes and children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentElement {
    pub name: SmolStr,
    pub attributes: BTreeMap<SmolStr, String>,
    pub children: Vec<ContentNode>,
}

impl ContentElement {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ContentNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_children([ContentNode::Text(text.into())])
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Value of one declaration of the inline `style` attribute.
    pub fn style(&self, property: &str) -> Option<&str> {
        self.attribute("style")?.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case(property)
                .then(|| value.trim())
        })
    }
}

impl ContentNode {
    pub fn text(data: impl Into<String>) -> Self {
        ContentNode::Text(data.into())
    }

    pub fn as_element(&self) -> Option<&ContentElement> {
        match self {
            ContentNode::Element(element) => Some(element),
            ContentNode::Text(_) => None,
        }
    }

    pub fn is_element(&self, name: &str) -> bool {
        self.as_element().is_some_and(|e| e.name == name)
    }
}

impl From<ContentElement> for ContentNode {
    fn from(element: ContentElement) -> Self {
        ContentNode::Element(element)
    }
}

/// A forest of content nodes, produced by the normalizer and by downcasting
/// model content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentFragment {
    pub children: Vec<ContentNode>,
}

impl ContentFragment {
    pub fn new(children: Vec<ContentNode>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Concatenated text of every node.
    pub fn text_content(&self) -> String {
        fn collect(nodes: &[ContentNode], out: &mut String) {
            for node in nodes {
                match node {
                    ContentNode::Text(text) => out.push_str(text),
                    ContentNode::Element(element) => collect(&element.children, out),
                }
            }
        }
        let mut out = String::new();
        collect(&self.children, &mut out);
        out
    }
}

impl FromIterator<ContentNode> for ContentFragment {
    fn from_iter<I: IntoIterator<Item = ContentNode>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Block-level tag names, as far as layout of clipboard content goes.
pub fn is_block_name(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "blockquote"
            | "ul"
            | "ol"
            | "li"
            | "pre"
            | "hr"
    )
}

/// Tags with no content and no end tag.
pub fn is_void_name(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}
