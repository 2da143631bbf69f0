//! Model tree nodes: text runs with attributes and named elements.
//!
//! Offsets inside an element count one unit per char of text and one unit
//! per child element, so a position can land inside a text run but never
//! inside an element without descending into it.

use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

/// Value of a model attribute.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Str(SmolStr),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(SmolStr::new(value))
    }
}

impl From<SmolStr> for AttributeValue {
    fn from(value: SmolStr) -> Self {
        AttributeValue::Str(value)
    }
}

/// Ordered attribute set. Ordering keeps stringified output stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Attributes(BTreeMap<SmolStr, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<SmolStr>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &AttributeValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.keys()
    }

    /// Copy every entry of `other` into `self`, overriding shared keys.
    pub fn merge(&mut self, other: &Attributes) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&SmolStr, &AttributeValue) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }
}

impl<K: Into<SmolStr>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A run of text sharing one attribute set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    pub data: String,
    pub attributes: Attributes,
}

impl Text {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<SmolStr>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.set(key, value);
        self
    }

    /// Length in chars, which is also the offset size of the run.
    pub fn len(&self) -> usize {
        self.data.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A named element with attributes and children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: SmolStr,
    pub attributes: Attributes,
    pub children: Vec<Node>,
}

/// A model node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Text(Text),
    Element(Element),
}

impl Node {
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text(Text::new(data))
    }

    /// Offset size of the node inside its parent.
    pub fn size(&self) -> usize {
        match self {
            Node::Text(text) => text.len(),
            Node::Element(_) => 1,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Text(text) => &text.attributes,
            Node::Element(element) => &element.attributes,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    /// Visit every text node in this subtree.
    pub fn for_each_text_mut(&mut self, f: &mut impl FnMut(&mut Text)) {
        match self {
            Node::Text(text) => f(text),
            Node::Element(element) => {
                for child in &mut element.children {
                    child.for_each_text_mut(f);
                }
            }
        }
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// Where an offset lands inside an element's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Location {
    /// Between children; the index of the child after the offset.
    Boundary(usize),
    /// Strictly inside the text child at `index`.
    InText { index: usize, char_offset: usize },
}

fn split_chars(data: &str, at: usize) -> (String, String) {
    let byte = data
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(data.len());
    (data[..byte].to_string(), data[byte..].to_string())
}

impl Element {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<SmolStr>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.set(key, value);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(self, data: impl Into<String>) -> Self {
        self.with_children([Node::text(data)])
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Offset just past the last child.
    pub fn max_offset(&self) -> usize {
        self.children.iter().map(Node::size).sum()
    }

    pub(crate) fn locate(&self, offset: usize) -> Option<Location> {
        let mut start = 0;
        for (index, child) in self.children.iter().enumerate() {
            if offset == start {
                return Some(Location::Boundary(index));
            }
            let end = start + child.size();
            if offset < end {
                return Some(Location::InText {
                    index,
                    char_offset: offset - start,
                });
            }
            start = end;
        }
        (offset == start).then_some(Location::Boundary(self.children.len()))
    }

    /// Offset of the child at `index`.
    pub fn offset_of(&self, index: usize) -> usize {
        self.children[..index.min(self.children.len())]
            .iter()
            .map(Node::size)
            .sum()
    }

    /// Ensure a node boundary at `offset`, splitting a text run if needed.
    ///
    /// Returns the index of the first child at or after `offset`.
    pub(crate) fn split_at(&mut self, offset: usize) -> Option<usize> {
        match self.locate(offset)? {
            Location::Boundary(index) => Some(index),
            Location::InText { index, char_offset } => {
                let Node::Text(text) = &mut self.children[index] else {
                    return None;
                };
                let (head, tail) = split_chars(&text.data, char_offset);
                let tail = Text {
                    data: tail,
                    attributes: text.attributes.clone(),
                };
                text.data = head;
                self.children.insert(index + 1, Node::Text(tail));
                Some(index + 1)
            }
        }
    }

    /// Insert nodes at `offset`, returning the inserted offset size.
    pub(crate) fn insert_at(&mut self, offset: usize, nodes: Vec<Node>) -> Option<usize> {
        let index = self.split_at(offset)?;
        let size = nodes.iter().map(Node::size).sum();
        self.children.splice(index..index, nodes);
        Some(size)
    }

    /// Remove everything between two offsets and return the removed nodes.
    pub(crate) fn remove_between(&mut self, start: usize, end: usize) -> Option<Vec<Node>> {
        if start >= end {
            return Some(Vec::new());
        }
        // Splitting at `end` only touches children at or after `start_index`.
        let start_index = self.split_at(start)?;
        let end_index = self.split_at(end)?;
        Some(self.children.drain(start_index..end_index).collect())
    }

    /// Clone the children between two offsets, cutting text runs as needed.
    pub fn slice(&self, start: usize, end: usize) -> Vec<Node> {
        let mut out = Vec::new();
        let mut offset = 0;
        for child in &self.children {
            let size = child.size();
            let child_start = offset;
            let child_end = offset + size;
            offset = child_end;
            if child_end <= start || child_start >= end {
                continue;
            }
            match child {
                Node::Text(text) => {
                    let from = start.saturating_sub(child_start);
                    let to = end.min(child_end) - child_start;
                    let data: String = text.data.chars().skip(from).take(to - from).collect();
                    out.push(Node::Text(Text {
                        data,
                        attributes: text.attributes.clone(),
                    }));
                }
                Node::Element(_) => out.push(child.clone()),
            }
        }
        out
    }

    /// The element starting exactly at `offset`.
    pub fn element_at(&self, offset: usize) -> Option<&Element> {
        match self.locate(offset)? {
            Location::Boundary(index) => self.children.get(index)?.as_element(),
            Location::InText { .. } => None,
        }
    }

    pub(crate) fn element_at_mut(&mut self, offset: usize) -> Option<&mut Element> {
        match self.locate(offset)? {
            Location::Boundary(index) => self.children.get_mut(index)?.as_element_mut(),
            Location::InText { .. } => None,
        }
    }

    /// The node ending at `offset` (a text run may continue past it).
    pub fn node_before(&self, offset: usize) -> Option<&Node> {
        if offset == 0 {
            return None;
        }
        match self.locate(offset)? {
            Location::Boundary(index) => index.checked_sub(1).and_then(|i| self.children.get(i)),
            Location::InText { index, .. } => self.children.get(index),
        }
    }

    /// The node starting at `offset` (or the text run containing it).
    pub fn node_after(&self, offset: usize) -> Option<&Node> {
        match self.locate(offset)? {
            Location::Boundary(index) => self.children.get(index),
            Location::InText { index, .. } => self.children.get(index),
        }
    }

    /// Merge adjacent text runs with equal attributes and drop empty runs.
    pub(crate) fn normalize(&mut self) {
        let mut merged: Vec<Node> = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            match child {
                Node::Text(text) if text.is_empty() => {}
                Node::Text(text) => match merged.last_mut() {
                    Some(Node::Text(prev)) if prev.attributes == text.attributes => {
                        prev.data.push_str(&text.data);
                    }
                    _ => merged.push(Node::Text(text)),
                },
                other => merged.push(other),
            }
        }
        self.children = merged;
    }

    /// Concatenated text of the subtree, elements contributing nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(&text.data),
                Node::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }
}

/// A detached forest of model nodes.
///
/// Produced by conversion and by `get_selected_content`, consumed by
/// `insert_content`. It is never attached to the live tree, so later
/// document edits do not affect it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fragment {
    children: Vec<Node>,
}

impl Fragment {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    /// Visit every text node in the fragment.
    pub fn for_each_text_mut(&mut self, mut f: impl FnMut(&mut Text)) {
        for child in &mut self.children {
            child.for_each_text_mut(&mut f);
        }
    }

    /// Concatenated text of all nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(&text.data),
                Node::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }
}

impl FromIterator<Node> for Fragment {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(children: Vec<Node>) -> Element {
        Element::new("paragraph").with_children(children)
    }

    #[test]
    fn test_offsets_count_chars_and_elements() {
        let p = para(vec![
            Node::text("héllo"),
            Element::new("softBreak").into(),
            Node::text("x"),
        ]);
        assert_eq!(p.max_offset(), 7);
        assert_eq!(p.locate(5), Some(Location::Boundary(1)));
        assert_eq!(p.locate(2), Some(Location::InText { index: 0, char_offset: 2 }));
        assert_eq!(p.locate(7), Some(Location::Boundary(3)));
        assert_eq!(p.locate(8), None);
        assert!(p.element_at(5).is_some());
    }

    #[test]
    fn test_split_and_remove_keep_attributes() {
        let mut p = para(vec![Text::new("abcdef").with_attribute("bold", true).into()]);
        let removed = p.remove_between(2, 4).unwrap();
        assert_eq!(removed, vec![Node::Text(Text::new("cd").with_attribute("bold", true))]);
        p.normalize();
        assert_eq!(p.children, vec![Node::Text(Text::new("abef").with_attribute("bold", true))]);
    }

    #[test]
    fn test_remove_inside_single_run() {
        let mut p = para(vec![Node::text("hello world")]);
        p.remove_between(5, 11).unwrap();
        p.normalize();
        assert_eq!(p.text_content(), "hello");
    }

    #[test]
    fn test_insert_merges_equal_runs() {
        let mut p = para(vec![Node::text("ac")]);
        p.insert_at(1, vec![Node::text("b")]).unwrap();
        p.normalize();
        assert_eq!(p.children, vec![Node::text("abc")]);
    }

    #[test]
    fn test_slice_cuts_text() {
        let p = para(vec![
            Node::text("Hello "),
            Text::new("World").with_attribute("bold", true).into(),
        ]);
        let slice = p.slice(3, 8);
        assert_eq!(
            slice,
            vec![
                Node::text("lo "),
                Text::new("Wo").with_attribute("bold", true).into(),
            ]
        );
    }

    #[test]
    fn test_node_before_and_after() {
        let p = para(vec![Node::text("ab"), Text::new("cd").with_attribute("bold", true).into()]);
        assert_eq!(p.node_before(2).and_then(Node::as_text).unwrap().data, "ab");
        assert_eq!(p.node_after(2).and_then(Node::as_text).unwrap().data, "cd");
        assert!(p.node_before(0).is_none());
        assert!(p.node_after(4).is_none());
    }
}
