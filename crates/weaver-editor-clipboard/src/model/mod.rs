//! Document model consumed by the clipboard pipeline.
//!
//! The pipeline never touches a concrete tree directly. Everything goes
//! through [`EditingModel`], which [`Document`] implements for the
//! in-memory tree used by the editor and the tests.

mod document;
mod edit;
pub mod node;
pub mod operation;
pub mod position;
pub mod schema;
mod stringify;
mod walker;

pub use document::{Document, LiveRangeId};
pub use node::{AttributeValue, Attributes, Element, Fragment, Node, Text};
pub use operation::{Batch, Operation};
pub use position::{Position, Range, Stickiness};
pub use schema::{AttributeProperties, CLIPBOARD_HOLDER, ChildKind, ROOT, Schema, SchemaItem};
pub use stringify::{stringify, stringify_nodes, stringify_with_selection};

use crate::error::ModelError;

/// Options for [`EditingModel::delete_content`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Leave the collapsed position where it is even if text is not
    /// allowed there, instead of inserting an empty paragraph.
    pub do_not_autoparagraph: bool,
}

/// Direction of a selection range search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
    /// Alternate backward and forward steps, nearest match wins.
    Both,
}

/// Model operations the clipboard pipeline relies on.
pub trait EditingModel {
    fn schema(&self) -> &Schema;

    /// Run `f` as one change block. Nested calls join the outer block.
    fn change<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ModelError>,
    ) -> Result<R, ModelError>
    where
        Self: Sized;

    fn selection(&self) -> &Range;

    fn set_selection(&mut self, range: Range) -> Result<(), ModelError>;

    /// Attributes that content typed at the selection would get.
    fn selection_attributes(&self) -> Attributes;

    /// Remove the content of `range` and return the collapsed position
    /// left behind.
    fn delete_content(&mut self, range: &Range, options: DeleteOptions) -> Result<Position, ModelError>;

    /// Insert a fragment at the selection, replacing selected content.
    fn insert_content(&mut self, fragment: Fragment) -> Result<Range, ModelError>;

    /// Detached copy of the content of `range`.
    fn get_selected_content(&self, range: &Range) -> Fragment;

    /// The element at an offset path; the empty path is the root.
    fn element(&self, path: &[usize]) -> Option<&Element>;

    fn check_child(&self, position: &Position, kind: ChildKind<'_>) -> bool;

    /// Closest valid selection range to `position`, or `None` if there is
    /// none before hitting a limit element.
    fn nearest_selection_range(&self, position: &Position, direction: SearchDirection) -> Option<Range>;

    fn add_marker(&mut self, name: &str, range: Range) -> Result<(), ModelError>;

    fn update_marker(&mut self, name: &str, range: Range) -> Result<(), ModelError>;

    fn remove_marker(&mut self, name: &str) -> Result<(), ModelError>;

    fn marker(&self, name: &str) -> Option<&Range>;

    fn create_live_range(&mut self, range: Range) -> LiveRangeId;

    fn live_range(&self, id: LiveRangeId) -> Option<&Range>;

    /// Stop tracking a live range. Detaching twice is a no-op.
    fn detach_live_range(&mut self, id: LiveRangeId) -> bool;

    fn has_marker(&self, name: &str) -> bool {
        self.marker(name).is_some()
    }

    fn is_object_at(&self, path: &[usize]) -> bool {
        !path.is_empty()
            && self
                .element(path)
                .is_some_and(|element| self.schema().is_object(&element.name))
    }

    /// Add the marker, or move it if it already exists.
    fn set_marker(&mut self, name: &str, range: Range) -> Result<(), ModelError> {
        if self.has_marker(name) {
            self.update_marker(name, range)
        } else {
            self.add_marker(name, range)
        }
    }
}

impl EditingModel for Document {
    fn schema(&self) -> &Schema {
        Document::schema(self)
    }

    fn change<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        Document::change(self, f)
    }

    fn selection(&self) -> &Range {
        Document::selection(self)
    }

    fn set_selection(&mut self, range: Range) -> Result<(), ModelError> {
        Document::set_selection(self, range)
    }

    fn selection_attributes(&self) -> Attributes {
        Document::selection_attributes(self)
    }

    fn delete_content(&mut self, range: &Range, options: DeleteOptions) -> Result<Position, ModelError> {
        Document::delete_content(self, range, options)
    }

    fn insert_content(&mut self, fragment: Fragment) -> Result<Range, ModelError> {
        Document::insert_content(self, fragment)
    }

    fn get_selected_content(&self, range: &Range) -> Fragment {
        Document::get_selected_content(self, range)
    }

    fn element(&self, path: &[usize]) -> Option<&Element> {
        Document::element(self, path)
    }

    fn check_child(&self, position: &Position, kind: ChildKind<'_>) -> bool {
        Document::check_child(self, position, kind)
    }

    fn nearest_selection_range(&self, position: &Position, direction: SearchDirection) -> Option<Range> {
        Document::nearest_selection_range(self, position, direction)
    }

    fn add_marker(&mut self, name: &str, range: Range) -> Result<(), ModelError> {
        Document::add_marker(self, name, range)
    }

    fn update_marker(&mut self, name: &str, range: Range) -> Result<(), ModelError> {
        Document::update_marker(self, name, range)
    }

    fn remove_marker(&mut self, name: &str) -> Result<(), ModelError> {
        Document::remove_marker(self, name)
    }

    fn marker(&self, name: &str) -> Option<&Range> {
        Document::marker(self, name)
    }

    fn create_live_range(&mut self, range: Range) -> LiveRangeId {
        Document::create_live_range(self, range)
    }

    fn live_range(&self, id: LiveRangeId) -> Option<&Range> {
        Document::live_range(self, id)
    }

    fn detach_live_range(&mut self, id: LiveRangeId) -> bool {
        Document::detach_live_range(self, id)
    }
}
