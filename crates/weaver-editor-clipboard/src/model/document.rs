//! In-memory document: tree, selection, markers, live ranges, change blocks.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::error::ModelError;
use crate::model::node::{Attributes, Element, Fragment, Node};
use crate::model::operation::{Batch, Operation};
use crate::model::position::{Position, Range};
use crate::model::schema::{ChildKind, ROOT, Schema};

/// Handle to a range that follows document edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LiveRangeId(u64);

/// State restored when a change block fails.
struct Snapshot {
    root: Element,
    selection: Range,
    markers: BTreeMap<SmolStr, Range>,
    live_ranges: BTreeMap<LiveRangeId, Range>,
}

/// A rich text document held in memory.
///
/// All mutations go through `change` blocks. A change block records the
/// primitive operations it performs as one `Batch`; if the block fails,
/// the document is restored to the state it had when the block opened.
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) schema: Schema,
    pub(crate) root: Element,
    pub(crate) selection: Range,
    markers: BTreeMap<SmolStr, Range>,
    live_ranges: BTreeMap<LiveRangeId, Range>,
    next_live_range: u64,
    change_depth: usize,
    change_count: usize,
    pending: Vec<Operation>,
    batches: Vec<Batch>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Schema::rich_text(), Vec::new())
    }
}

impl Document {
    /// Create a document with the given root children. The selection is
    /// placed at the first valid text position.
    pub fn new(schema: Schema, children: Vec<Node>) -> Self {
        let mut doc = Self {
            schema,
            root: Element::new(ROOT).with_children(children),
            selection: Range::collapsed(Position::new(vec![0])),
            markers: BTreeMap::new(),
            live_ranges: BTreeMap::new(),
            next_live_range: 0,
            change_depth: 0,
            change_count: 0,
            pending: Vec::new(),
            batches: Vec::new(),
        };
        doc.root.normalize();
        if let Some(range) = doc.nearest_selection_range(
            &Position::new(vec![0]),
            crate::model::SearchDirection::Forward,
        ) {
            doc.selection = range;
        }
        doc
    }

    /// Document using the rich text schema.
    pub fn with_children(children: Vec<Node>) -> Self {
        Self::new(Schema::rich_text(), children)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    // === Change blocks ===

    /// Run `f` inside a change block.
    ///
    /// A nested call joins the outer block. An error from the outermost
    /// block rolls the document back to where the block started.
    pub fn change<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        if self.change_depth > 0 {
            return f(self);
        }
        let snapshot = self.snapshot();
        self.change_depth = 1;
        self.change_count += 1;
        let result = f(self);
        self.change_depth = 0;
        let operations = std::mem::take(&mut self.pending);
        match result {
            Ok(value) => {
                if !operations.is_empty() {
                    self.batches.push(Batch { operations });
                }
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(error = %err, "change block failed, rolling back");
                self.restore(snapshot);
                Err(err)
            }
        }
    }

    /// Whether a change block is currently open.
    pub fn is_in_change(&self) -> bool {
        self.change_depth > 0
    }

    /// Number of outermost change blocks opened so far.
    pub fn change_count(&self) -> usize {
        self.change_count
    }

    /// Batches recorded by finished change blocks.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn last_batch(&self) -> Option<&Batch> {
        self.batches.last()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            root: self.root.clone(),
            selection: self.selection.clone(),
            markers: self.markers.clone(),
            live_ranges: self.live_ranges.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.root = snapshot.root;
        self.selection = snapshot.selection;
        self.markers = snapshot.markers;
        // Ranges detached inside the failed block stay detached.
        for (id, range) in snapshot.live_ranges {
            if let Some(live) = self.live_ranges.get_mut(&id) {
                *live = range;
            }
        }
    }

    pub(crate) fn ensure_in_change(&self) -> Result<(), ModelError> {
        if self.change_depth == 0 {
            return Err(ModelError::NoActiveChange);
        }
        Ok(())
    }

    /// Record an applied operation and map every tracked range through it.
    fn apply(&mut self, op: Operation) {
        if op.is_structural() {
            self.selection = self.selection.transformed_by(&op);
            for range in self.markers.values_mut() {
                *range = range.transformed_by(&op);
            }
            for range in self.live_ranges.values_mut() {
                *range = range.transformed_by(&op);
            }
        }
        tracing::trace!(?op, "applied");
        self.pending.push(op);
    }

    // === Tree access ===

    /// The element at an offset path; the empty path is the root.
    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        let mut element = &self.root;
        for &offset in path {
            element = element.element_at(offset)?;
        }
        Some(element)
    }

    pub(crate) fn element_mut(&mut self, path: &[usize]) -> Result<&mut Element, ModelError> {
        let mut element = &mut self.root;
        for &offset in path {
            element = element
                .element_at_mut(offset)
                .ok_or_else(|| ModelError::InvalidPosition(path.to_vec()))?;
        }
        Ok(element)
    }

    /// The element containing `position`.
    pub fn parent(&self, position: &Position) -> Option<&Element> {
        self.element(position.parent_path())
    }

    /// Whether the position addresses a real place in the tree.
    pub fn is_valid(&self, position: &Position) -> bool {
        self.parent(position)
            .is_some_and(|parent| position.offset() <= parent.max_offset())
    }

    pub(crate) fn validate(&self, position: &Position) -> Result<(), ModelError> {
        if self.is_valid(position) {
            Ok(())
        } else {
            Err(ModelError::InvalidPosition(position.path().to_vec()))
        }
    }

    /// Schema check of a child kind at a position.
    pub fn check_child(&self, position: &Position, kind: ChildKind<'_>) -> bool {
        self.parent(position)
            .is_some_and(|parent| self.schema.allows_child(&parent.name, kind))
    }

    pub fn is_object_at(&self, path: &[usize]) -> bool {
        !path.is_empty() && self.element(path).is_some_and(|e| self.schema.is_object(&e.name))
    }

    /// Full content of the root as a detached fragment.
    pub fn to_fragment(&self) -> Fragment {
        Fragment::new(self.root.children.clone())
    }

    // === Selection ===

    pub fn selection(&self) -> &Range {
        &self.selection
    }

    pub fn set_selection(&mut self, range: Range) -> Result<(), ModelError> {
        self.ensure_in_change()?;
        self.validate(&range.start)?;
        self.validate(&range.end)?;
        self.selection = range;
        Ok(())
    }

    /// Attributes the selection carries for typing or pasting.
    ///
    /// A collapsed selection takes them from the text before it, or from the
    /// text after it at a block start. A non-collapsed selection takes them
    /// from the first selected text node.
    pub fn selection_attributes(&self) -> Attributes {
        let range = &self.selection;
        if !range.is_collapsed() {
            let content = self.get_selected_content(range);
            return first_text_attributes(content.children()).unwrap_or_default();
        }
        let Some(parent) = self.parent(&range.start) else {
            return Attributes::new();
        };
        let offset = range.start.offset();
        let before = parent.node_before(offset).and_then(Node::as_text);
        let after = parent.node_after(offset).and_then(Node::as_text);
        before
            .or(after)
            .map(|text| text.attributes.clone())
            .unwrap_or_default()
    }

    // === Primitive mutations ===

    /// Insert nodes at a position, returning the range they now occupy.
    pub(crate) fn insert_nodes(&mut self, position: &Position, nodes: Vec<Node>) -> Result<Range, ModelError> {
        self.ensure_in_change()?;
        self.validate(position)?;
        if nodes.is_empty() {
            return Ok(Range::collapsed(position.clone()));
        }
        let parent = self.element_mut(position.parent_path())?;
        let how_many = parent
            .insert_at(position.offset(), nodes)
            .ok_or_else(|| ModelError::InvalidPosition(position.path().to_vec()))?;
        parent.normalize();
        self.apply(Operation::Insert {
            position: position.clone(),
            how_many,
        });
        Ok(Range::new(
            position.clone(),
            position.with_offset(position.offset() + how_many),
        ))
    }

    /// Remove the offsets `start..end` of the element at `parent`.
    pub(crate) fn remove(&mut self, parent: &[usize], start: usize, end: usize) -> Result<Vec<Node>, ModelError> {
        self.ensure_in_change()?;
        if start >= end {
            return Ok(Vec::new());
        }
        let element = self.element_mut(parent)?;
        let removed = element
            .remove_between(start, end)
            .ok_or_else(|| ModelError::InvalidPosition(Position::at(parent, end).path().to_vec()))?;
        element.normalize();
        self.apply(Operation::Remove {
            position: Position::at(parent, start),
            how_many: end - start,
        });
        Ok(removed)
    }

    /// Split the parent of `position` at its offset.
    pub(crate) fn split(&mut self, position: &Position) -> Result<(), ModelError> {
        self.ensure_in_change()?;
        self.validate(position)?;
        let parent_path = position.parent_path().to_vec();
        let Some((&element_offset, grandparent_path)) = parent_path.split_last() else {
            return Err(ModelError::InvalidPosition(position.path().to_vec()));
        };
        let element = self.element_mut(&parent_path)?;
        let index = element
            .split_at(position.offset())
            .ok_or_else(|| ModelError::InvalidPosition(position.path().to_vec()))?;
        let tail: Vec<Node> = element.children.drain(index..).collect();
        let sibling = Element {
            name: element.name.clone(),
            attributes: element.attributes.clone(),
            children: tail,
        };
        element.normalize();
        let grandparent = self.element_mut(grandparent_path)?;
        grandparent
            .insert_at(element_offset + 1, vec![Node::Element(sibling)])
            .ok_or_else(|| ModelError::InvalidPosition(parent_path.clone()))?;
        self.apply(Operation::Split {
            position: position.clone(),
        });
        Ok(())
    }

    /// Merge the element right after `position` into the element right
    /// before it.
    pub(crate) fn merge(&mut self, position: &Position) -> Result<(), ModelError> {
        self.ensure_in_change()?;
        let offset = position.offset();
        if offset == 0 {
            return Err(ModelError::InvalidPosition(position.path().to_vec()));
        }
        let parent_path = position.parent_path().to_vec();
        let invalid = || ModelError::InvalidPosition(position.path().to_vec());
        let parent = self.element_mut(&parent_path)?;
        let Some(super::node::Location::Boundary(right_index)) = parent.locate(offset) else {
            return Err(invalid());
        };
        if right_index == 0 || right_index >= parent.children.len() {
            return Err(invalid());
        }
        let Node::Element(right) = parent.children.remove(right_index) else {
            return Err(invalid());
        };
        let Some(Node::Element(left)) = parent.children.get_mut(right_index - 1) else {
            return Err(invalid());
        };
        let left_len = left.max_offset();
        left.children.extend(right.children);
        left.normalize();
        self.apply(Operation::Merge {
            position: position.clone(),
            left_len,
        });
        Ok(())
    }

    // === Markers ===

    pub fn add_marker(&mut self, name: &str, range: Range) -> Result<(), ModelError> {
        self.ensure_in_change()?;
        if self.markers.contains_key(name) {
            return Err(ModelError::MarkerExists(SmolStr::new(name)));
        }
        self.validate(&range.start)?;
        self.validate(&range.end)?;
        self.markers.insert(SmolStr::new(name), range.clone());
        self.apply(Operation::Marker {
            name: SmolStr::new(name),
            old_range: None,
            new_range: Some(range),
        });
        Ok(())
    }

    pub fn update_marker(&mut self, name: &str, range: Range) -> Result<(), ModelError> {
        self.ensure_in_change()?;
        self.validate(&range.start)?;
        self.validate(&range.end)?;
        let Some(current) = self.markers.get_mut(name) else {
            return Err(ModelError::MarkerMissing(SmolStr::new(name)));
        };
        let old_range = std::mem::replace(current, range.clone());
        self.apply(Operation::Marker {
            name: SmolStr::new(name),
            old_range: Some(old_range),
            new_range: Some(range),
        });
        Ok(())
    }

    pub fn remove_marker(&mut self, name: &str) -> Result<(), ModelError> {
        self.ensure_in_change()?;
        let Some(old_range) = self.markers.remove(name) else {
            return Err(ModelError::MarkerMissing(SmolStr::new(name)));
        };
        self.apply(Operation::Marker {
            name: SmolStr::new(name),
            old_range: Some(old_range),
            new_range: None,
        });
        Ok(())
    }

    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    pub fn marker(&self, name: &str) -> Option<&Range> {
        self.markers.get(name)
    }

    pub fn marker_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.markers.keys()
    }

    // === Live ranges ===

    /// Start tracking a range through future edits.
    pub fn create_live_range(&mut self, range: Range) -> LiveRangeId {
        let id = LiveRangeId(self.next_live_range);
        self.next_live_range += 1;
        self.live_ranges.insert(id, range);
        id
    }

    pub fn live_range(&self, id: LiveRangeId) -> Option<&Range> {
        self.live_ranges.get(&id)
    }

    /// Stop tracking a live range. Returns false if it was already detached.
    pub fn detach_live_range(&mut self, id: LiveRangeId) -> bool {
        self.live_ranges.remove(&id).is_some()
    }

    pub fn live_range_count(&self) -> usize {
        self.live_ranges.len()
    }
}

fn first_text_attributes(nodes: &[Node]) -> Option<Attributes> {
    nodes.iter().find_map(|node| match node {
        Node::Text(text) => Some(text.attributes.clone()),
        Node::Element(element) => first_text_attributes(&element.children),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::Text;

    fn paragraph(children: Vec<Node>) -> Node {
        Element::new("paragraph").with_children(children).into()
    }

    fn pos(path: &[usize]) -> Position {
        Position::new(path.to_vec())
    }

    #[test]
    fn test_mutation_requires_change_block() {
        let mut doc = Document::with_children(vec![paragraph(vec![Node::text("foo")])]);
        assert_eq!(
            doc.insert_nodes(&pos(&[0, 0]), vec![Node::text("x")]),
            Err(ModelError::NoActiveChange)
        );
        assert_eq!(doc.change_count(), 0);
    }

    #[test]
    fn test_nested_change_joins_outer_block() {
        let mut doc = Document::with_children(vec![paragraph(vec![Node::text("foo")])]);
        doc.change(|doc| {
            doc.insert_nodes(&pos(&[0, 3]), vec![Node::text("bar")])?;
            doc.change(|doc| doc.insert_nodes(&pos(&[0, 0]), vec![Node::text(">")]).map(|_| ()))
        })
        .unwrap();
        assert_eq!(doc.change_count(), 1);
        assert_eq!(doc.batches().len(), 1);
        assert_eq!(doc.batches()[0].operations.len(), 2);
        assert_eq!(doc.root().text_content(), ">foobar");
    }

    #[test]
    fn test_failed_change_rolls_back() {
        let mut doc = Document::with_children(vec![paragraph(vec![Node::text("foo")])]);
        let result = doc.change(|doc| {
            doc.insert_nodes(&pos(&[0, 3]), vec![Node::text("bar")])?;
            doc.insert_nodes(&pos(&[7, 0]), vec![Node::text("x")])?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(doc.root().text_content(), "foo");
        assert!(doc.batches().is_empty());
    }

    #[test]
    fn test_markers_follow_edits() {
        let mut doc = Document::with_children(vec![paragraph(vec![Node::text("hello")])]);
        doc.change(|doc| doc.add_marker("m", Range::new(pos(&[0, 2]), pos(&[0, 4]))))
            .unwrap();
        doc.change(|doc| doc.insert_nodes(&pos(&[0, 0]), vec![Node::text("ab")]).map(|_| ()))
            .unwrap();
        assert_eq!(doc.marker("m"), Some(&Range::new(pos(&[0, 4]), pos(&[0, 6]))));
        assert_eq!(
            doc.change(|doc| doc.add_marker("m", Range::collapsed(pos(&[0, 0])))),
            Err(ModelError::MarkerExists("m".into()))
        );
        doc.change(|doc| doc.remove_marker("m")).unwrap();
        assert!(!doc.has_marker("m"));
    }

    #[test]
    fn test_split_and_merge_round_trip() {
        let mut doc = Document::with_children(vec![paragraph(vec![Node::text("foobar")])]);
        let live = doc.create_live_range(Range::new(pos(&[0, 4]), pos(&[0, 5])));
        doc.change(|doc| doc.split(&pos(&[0, 3]))).unwrap();
        assert_eq!(doc.root().children.len(), 2);
        assert_eq!(doc.live_range(live), Some(&Range::new(pos(&[1, 1]), pos(&[1, 2]))));
        doc.change(|doc| doc.merge(&pos(&[1]))).unwrap();
        assert_eq!(doc.root().children.len(), 1);
        assert_eq!(doc.live_range(live), Some(&Range::new(pos(&[0, 4]), pos(&[0, 5]))));
        assert!(doc.detach_live_range(live));
        assert!(!doc.detach_live_range(live));
    }

    #[test]
    fn test_selection_attributes_collapsed() {
        let mut doc = Document::with_children(vec![paragraph(vec![
            Text::new("ab").with_attribute("bold", true).into(),
            Node::text("cd"),
        ])]);
        doc.change(|doc| doc.set_selection(Range::collapsed(pos(&[0, 2]))))
            .unwrap();
        assert!(doc.selection_attributes().contains("bold"));
        doc.change(|doc| doc.set_selection(Range::collapsed(pos(&[0, 3]))))
            .unwrap();
        assert!(doc.selection_attributes().is_empty());
        doc.change(|doc| doc.set_selection(Range::collapsed(pos(&[0, 0]))))
            .unwrap();
        assert!(doc.selection_attributes().contains("bold"));
    }
}
