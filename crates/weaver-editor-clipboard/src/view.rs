//! Mapping between the rendered editing surface and the model.
//!
//! The host renders the document and reports pointer targets as view node
//! ids. [`EditingView`] is the contract the drag handling needs from that
//! layer; [`MappedView`] is a registry implementation for headless use.

use std::collections::BTreeMap;

use crate::model::{Document, Element, Node, Position};

/// Opaque id of a rendered node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewNodeId(pub u32);

/// A position in the rendered tree: an offset inside a view node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewPosition {
    pub parent: ViewNodeId,
    pub offset: usize,
}

/// What the clipboard pipeline needs from the rendering layer.
pub trait EditingView {
    fn parent(&self, node: ViewNodeId) -> Option<ViewNodeId>;

    /// The editable root of the surface.
    fn is_root(&self, node: ViewNodeId) -> bool;

    /// Whether the node sits inside the editable surface.
    fn is_in_editable(&self, node: ViewNodeId) -> bool;

    /// Model element path rendered by `node`, if it renders one.
    fn to_model_element(&self, node: ViewNodeId) -> Option<Vec<usize>>;

    fn to_model_position(&self, position: &ViewPosition) -> Option<Position>;

    fn set_draggable(&mut self, node: ViewNodeId, draggable: bool);

    /// Closest node at or above `node` that maps to a model element,
    /// together with that element's path. UI decorations inside a widget
    /// resolve to the widget.
    fn nearest_mapped_ancestor(&self, node: ViewNodeId) -> Option<(ViewNodeId, Vec<usize>)> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(path) = self.to_model_element(id) {
                return Some((id, path));
            }
            current = self.parent(id);
        }
        None
    }
}

#[derive(Clone, Debug, Default)]
struct ViewNode {
    parent: Option<ViewNodeId>,
    /// Model element this node renders. The root maps to the empty path.
    model: Option<Vec<usize>>,
    editable: bool,
    draggable: bool,
}

/// Registry-backed [`EditingView`].
#[derive(Clone, Debug, Default)]
pub struct MappedView {
    nodes: BTreeMap<ViewNodeId, ViewNode>,
    next_id: u32,
}

impl MappedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render every element of `doc` as one view node, mirroring the tree.
    pub fn from_document(doc: &Document) -> Self {
        let mut view = Self::new();
        let root = view.insert(None, Some(Vec::new()), true);
        view.mirror(root, doc.root(), &mut Vec::new());
        view
    }

    fn mirror(&mut self, parent: ViewNodeId, element: &Element, path: &mut Vec<usize>) {
        let mut offset = 0;
        for child in &element.children {
            if let Node::Element(inner) = child {
                path.push(offset);
                let id = self.insert(Some(parent), Some(path.clone()), true);
                self.mirror(id, inner, path);
                path.pop();
            }
            offset += child.size();
        }
    }

    fn insert(&mut self, parent: Option<ViewNodeId>, model: Option<Vec<usize>>, editable: bool) -> ViewNodeId {
        let id = ViewNodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            ViewNode {
                parent,
                model,
                editable,
                draggable: false,
            },
        );
        id
    }

    /// Id of the editable root.
    pub fn root(&self) -> Option<ViewNodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.parent.is_none() && node.editable)
            .map(|(&id, _)| id)
    }

    /// View node rendering the model element at `path`.
    pub fn node_for(&self, path: &[usize]) -> Option<ViewNodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.model.as_deref() == Some(path))
            .map(|(&id, _)| id)
    }

    /// Add an unmapped node, such as a widget's drag handle.
    pub fn add_decoration(&mut self, parent: ViewNodeId) -> ViewNodeId {
        let editable = self.nodes.get(&parent).is_some_and(|node| node.editable);
        self.insert(Some(parent), None, editable)
    }

    /// Add a node outside the editable surface.
    pub fn add_outside(&mut self) -> ViewNodeId {
        self.insert(None, None, false)
    }

    pub fn is_draggable(&self, node: ViewNodeId) -> bool {
        self.nodes.get(&node).is_some_and(|node| node.draggable)
    }

    /// Nodes currently marked draggable.
    pub fn draggable_nodes(&self) -> Vec<ViewNodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.draggable)
            .map(|(&id, _)| id)
            .collect()
    }
}

impl EditingView for MappedView {
    fn parent(&self, node: ViewNodeId) -> Option<ViewNodeId> {
        self.nodes.get(&node)?.parent
    }

    fn is_root(&self, node: ViewNodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|n| n.parent.is_none() && n.editable)
    }

    fn is_in_editable(&self, node: ViewNodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.editable)
    }

    fn to_model_element(&self, node: ViewNodeId) -> Option<Vec<usize>> {
        let node = self.nodes.get(&node)?;
        // The root renders the document itself, not an element in it.
        if node.parent.is_none() {
            return None;
        }
        node.model.clone()
    }

    fn to_model_position(&self, position: &ViewPosition) -> Option<Position> {
        let parent = self.nodes.get(&position.parent)?;
        let path = parent.model.as_ref()?;
        Some(Position::at(path, position.offset))
    }

    fn set_draggable(&mut self, node: ViewNodeId, draggable: bool) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.draggable = draggable;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::with_children(vec![
            Element::new("paragraph").with_text("foo").into(),
            Element::new("image").into(),
        ])
    }

    #[test]
    fn test_mirror_maps_elements() {
        let view = MappedView::from_document(&doc());
        let root = view.root().unwrap();
        assert!(view.is_root(root));
        let image = view.node_for(&[1]).unwrap();
        assert_eq!(view.parent(image), Some(root));
        assert_eq!(view.to_model_element(image), Some(vec![1]));
        assert_eq!(view.to_model_element(root), None);
        assert_eq!(
            view.to_model_position(&ViewPosition {
                parent: root,
                offset: 1
            }),
            Some(Position::new(vec![1]))
        );
    }

    #[test]
    fn test_decoration_resolves_to_widget() {
        let mut view = MappedView::from_document(&doc());
        let image = view.node_for(&[1]).unwrap();
        let handle = view.add_decoration(image);
        assert_eq!(view.to_model_element(handle), None);
        assert_eq!(view.nearest_mapped_ancestor(handle), Some((image, vec![1])));
        assert!(view.is_in_editable(handle));
        let outside = view.add_outside();
        assert!(!view.is_in_editable(outside));
        assert_eq!(view.nearest_mapped_ancestor(outside), None);
    }
}
