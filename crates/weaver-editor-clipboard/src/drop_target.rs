//! Resolve where a drop under the pointer lands in the model.

use crate::model::{ChildKind, EditingModel, Position, Range, SearchDirection};
use crate::view::{EditingView, ViewNodeId, ViewPosition};

pub const POSITION_MARKER: &str = "drop-target:position";
pub const RANGE_MARKER: &str = "drop-target:range";

/// Representative block used to ask whether an element holds blocks.
const BLOCK_PROBE: &str = "paragraph";

/// A resolved drop target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropTarget {
    /// A caret position where text is allowed.
    Position(Position),
    /// A range on one whole object element.
    Element(Range),
}

impl DropTarget {
    fn from_range(range: Range) -> Self {
        if range.is_collapsed() {
            DropTarget::Position(range.start)
        } else {
            DropTarget::Element(range)
        }
    }

    pub fn range(&self) -> Range {
        match self {
            DropTarget::Position(position) => Range::collapsed(position.clone()),
            DropTarget::Element(range) => range.clone(),
        }
    }

    /// Marker showing this target. The other kind must not exist at the
    /// same time.
    pub fn marker_name(&self) -> &'static str {
        match self {
            DropTarget::Position(_) => POSITION_MARKER,
            DropTarget::Element(_) => RANGE_MARKER,
        }
    }

    /// Collapsed position content is inserted at. Objects take content
    /// after themselves.
    pub fn insertion_position(&self) -> Position {
        match self {
            DropTarget::Position(position) => position.clone(),
            DropTarget::Element(range) => range.end.clone(),
        }
    }
}

/// Find the drop target for a pointer over `target`, with the caret
/// position the engine reported, if any.
///
/// Returns `None` when nothing under the pointer can take a drop.
pub fn resolve<M, V>(
    model: &M,
    view: &V,
    target: ViewNodeId,
    target_position: Option<&ViewPosition>,
    direction: SearchDirection,
) -> Option<DropTarget>
where
    M: EditingModel,
    V: EditingView,
{
    if !view.is_in_editable(target) {
        tracing::trace!(?target, "drop target outside the editable");
        return None;
    }

    // Pointer over a widget or something rendered inside one.
    let mapped = view.nearest_mapped_ancestor(target);
    if let Some((_, path)) = &mapped {
        if model.is_object_at(path) {
            tracing::trace!(?path, "drop on widget");
            return Some(DropTarget::Element(Range::on(path)));
        }
    }
    let element = mapped.map(|(_, path)| path).unwrap_or_default();

    // No caret position, e.g. over an empty cell or a widget in Safari.
    let Some(position) = target_position.and_then(|p| view.to_model_position(p)) else {
        let start = Position::at(&element, 0);
        return match model.nearest_selection_range(&start, direction) {
            Some(range) => Some(DropTarget::from_range(range)),
            None => object_ancestor(model, &element).map(DropTarget::Element),
        };
    };

    if let Some(range) = between_blocks(model, &position, &element) {
        tracing::trace!(?range, "drop between blocks snapped to object");
        return Some(DropTarget::Element(range));
    }

    if let Some(range) = model.nearest_selection_range(&position, direction) {
        return Some(DropTarget::from_range(range));
    }
    object_ancestor(model, position.parent_path()).map(DropTarget::Element)
}

/// A position between blocks right before an object resolves to the
/// object. Carets there jump around as the pointer moves along a widget.
fn between_blocks<M: EditingModel>(model: &M, position: &Position, element: &[usize]) -> Option<Range> {
    let element_start = Position::at(element, 0);
    if !model.check_child(&element_start, ChildKind::Element(BLOCK_PROBE)) {
        return None;
    }
    let depth = element.len() + 1;
    if position.depth() < depth {
        return None;
    }
    let base = &position.path()[..depth];
    model.is_object_at(base).then(|| Range::on(base))
}

/// Range on the closest object at or above `path`.
fn object_ancestor<M: EditingModel>(model: &M, path: &[usize]) -> Option<Range> {
    (1..=path.len())
        .rev()
        .map(|len| &path[..len])
        .find(|ancestor| model.is_object_at(ancestor))
        .map(Range::on)
}
