//! Schema rules: which elements may contain what, and attribute categories.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::model::node::Node;

/// Name of the root element.
pub const ROOT: &str = "$root";

/// Conversion context that accepts any content. Used when the final
/// insertion point is not known yet.
pub const CLIPBOARD_HOLDER: &str = "$clipboardHolder";

/// What kind of child is being checked against a parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildKind<'a> {
    Text,
    Element(&'a str),
}

impl<'a> ChildKind<'a> {
    pub fn of(node: &'a Node) -> Self {
        match node {
            Node::Text(_) => ChildKind::Text,
            Node::Element(element) => ChildKind::Element(&element.name),
        }
    }
}

/// Registration of one element name.
#[derive(Clone, Debug, Default)]
pub struct SchemaItem {
    /// Block-level element (paragraph-like or container).
    pub is_block: bool,
    /// Inline element living among text.
    pub is_inline: bool,
    /// Atomic element: no selection position inside, handled as one unit.
    pub is_object: bool,
    /// Selection walkers and merges never cross this element's boundary.
    pub is_limit: bool,
    /// Text may be placed directly inside.
    pub allow_text: bool,
    /// Parents this element may be placed in.
    pub allow_in: Vec<SmolStr>,
}

impl SchemaItem {
    pub fn block(allow_in: &[&str]) -> Self {
        Self {
            is_block: true,
            allow_text: true,
            allow_in: allow_in.iter().map(|s| SmolStr::new(s)).collect(),
            ..Default::default()
        }
    }

    pub fn container(allow_in: &[&str]) -> Self {
        Self {
            is_block: true,
            allow_in: allow_in.iter().map(|s| SmolStr::new(s)).collect(),
            ..Default::default()
        }
    }

    pub fn object(allow_in: &[&str]) -> Self {
        Self {
            is_block: true,
            is_object: true,
            is_limit: true,
            allow_in: allow_in.iter().map(|s| SmolStr::new(s)).collect(),
            ..Default::default()
        }
    }

    pub fn inline(allow_in: &[&str]) -> Self {
        Self {
            is_inline: true,
            allow_in: allow_in.iter().map(|s| SmolStr::new(s)).collect(),
            ..Default::default()
        }
    }
}

/// Properties of an attribute key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttributeProperties {
    /// Purely presentational (bold, italic). Inherited by pasted plain text.
    pub is_formatting: bool,
}

/// Element and attribute registry consulted by every structural edit.
#[derive(Clone, Debug)]
pub struct Schema {
    items: HashMap<SmolStr, SchemaItem>,
    attributes: HashMap<SmolStr, AttributeProperties>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::rich_text()
    }
}

const TEXT_BLOCKS: &[&str] = &["paragraph", "heading1", "heading2", "heading3", "listItem"];

impl Schema {
    /// An empty schema with only the root registered.
    pub fn new() -> Self {
        let mut items = HashMap::new();
        items.insert(
            SmolStr::new(ROOT),
            SchemaItem {
                is_limit: true,
                ..Default::default()
            },
        );
        Self {
            items,
            attributes: HashMap::new(),
        }
    }

    /// The schema used by the rich text editor.
    pub fn rich_text() -> Self {
        let mut schema = Self::new();
        let block_parents = [ROOT, "blockQuote"];
        for name in TEXT_BLOCKS {
            schema.register(*name, SchemaItem::block(&block_parents));
        }
        schema.register("blockQuote", SchemaItem::container(&[ROOT]));
        schema.register("image", SchemaItem::object(&block_parents));
        schema.register("horizontalLine", SchemaItem::object(&block_parents));
        schema.register("softBreak", SchemaItem::inline(TEXT_BLOCKS));

        for key in ["bold", "italic", "underline", "strikethrough", "code"] {
            schema.register_attribute(key, AttributeProperties { is_formatting: true });
        }
        schema.register_attribute("linkHref", AttributeProperties::default());
        schema
    }

    pub fn register(&mut self, name: impl Into<SmolStr>, item: SchemaItem) {
        self.items.insert(name.into(), item);
    }

    pub fn register_attribute(&mut self, key: impl Into<SmolStr>, properties: AttributeProperties) {
        self.attributes.insert(key.into(), properties);
    }

    pub fn item(&self, name: &str) -> Option<&SchemaItem> {
        self.items.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.item(name).is_some_and(|item| item.is_object)
    }

    /// Object check for a node; text is never an object.
    pub fn is_object_node(&self, node: &Node) -> bool {
        node.as_element().is_some_and(|e| self.is_object(&e.name))
    }

    pub fn is_block(&self, name: &str) -> bool {
        self.item(name).is_some_and(|item| item.is_block)
    }

    pub fn is_inline(&self, name: &str) -> bool {
        self.item(name).is_some_and(|item| item.is_inline)
    }

    pub fn is_limit(&self, name: &str) -> bool {
        self.item(name)
            .is_some_and(|item| item.is_limit || item.is_object)
    }

    /// A text block whose content can be merged with another text block.
    pub fn is_mergeable(&self, name: &str) -> bool {
        self.item(name)
            .is_some_and(|item| item.is_block && item.allow_text && !item.is_object)
    }

    /// Whether `parent` may directly contain a child of `kind`.
    pub fn allows_child(&self, parent: &str, kind: ChildKind<'_>) -> bool {
        if parent == CLIPBOARD_HOLDER {
            return true;
        }
        match kind {
            ChildKind::Text => self.item(parent).is_some_and(|item| item.allow_text),
            ChildKind::Element(name) => self
                .item(name)
                .is_some_and(|item| item.allow_in.iter().any(|p| p == parent)),
        }
    }

    /// Properties of an attribute key. Unknown keys are not formatting.
    pub fn attribute_properties(&self, key: &str) -> AttributeProperties {
        self.attributes.get(key).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rich_text_rules() {
        let schema = Schema::rich_text();
        assert!(schema.allows_child(ROOT, ChildKind::Element("paragraph")));
        assert!(!schema.allows_child(ROOT, ChildKind::Text));
        assert!(schema.allows_child("paragraph", ChildKind::Text));
        assert!(schema.allows_child("paragraph", ChildKind::Element("softBreak")));
        assert!(!schema.allows_child("paragraph", ChildKind::Element("image")));
        assert!(schema.allows_child(CLIPBOARD_HOLDER, ChildKind::Element("anything")));
    }

    #[test]
    fn test_objects_are_limits() {
        let schema = Schema::rich_text();
        assert!(schema.is_object("image"));
        assert!(schema.is_limit("image"));
        assert!(schema.is_limit(ROOT));
        assert!(!schema.is_mergeable("image"));
        assert!(schema.is_mergeable("heading2"));
        assert!(!schema.is_mergeable("blockQuote"));
    }

    #[test]
    fn test_formatting_attributes() {
        let schema = Schema::rich_text();
        assert!(schema.attribute_properties("bold").is_formatting);
        assert!(!schema.attribute_properties("linkHref").is_formatting);
        assert!(!schema.attribute_properties("unknown").is_formatting);
    }
}
