//! Search for the closest valid selection range around a position.

use crate::model::SearchDirection;
use crate::model::document::Document;
use crate::model::node::Node;
use crate::model::position::{Position, Range};
use crate::model::schema::ChildKind;

/// One walker step: what was crossed, and where the walker stands after.
enum Step {
    /// Crossed a text run.
    Text(Position),
    /// Stepped into an element. The path is the element's.
    Enter(Vec<usize>, Position),
    /// Stepped out of the parent element.
    Leave(Position),
}

impl Step {
    fn position(&self) -> &Position {
        match self {
            Step::Text(p) | Step::Enter(_, p) | Step::Leave(p) => p,
        }
    }
}

impl Document {
    /// Closest selection range to `position`.
    ///
    /// A position where text is allowed is returned as is. Otherwise the
    /// walker moves in the given direction (alternating for `Both`) until it
    /// finds a text position or steps into an object, whose whole range is
    /// returned. The walk never leaves the nearest limit ancestor.
    pub fn nearest_selection_range(&self, position: &Position, direction: SearchDirection) -> Option<Range> {
        if !self.is_valid(position) {
            return None;
        }
        if self.check_child(position, ChildKind::Text) {
            return Some(Range::collapsed(position.clone()));
        }
        let limit = self.limit_ancestor(position);
        let mut backward = matches!(direction, SearchDirection::Backward | SearchDirection::Both)
            .then(|| position.clone());
        let mut forward = matches!(direction, SearchDirection::Forward | SearchDirection::Both)
            .then(|| position.clone());

        while backward.is_some() || forward.is_some() {
            if let Some(at) = backward.take() {
                if let Some(step) = self.step_backward(&at, &limit) {
                    if let Some(found) = self.check_step(&step) {
                        return Some(found);
                    }
                    backward = Some(step.position().clone());
                }
            }
            if let Some(at) = forward.take() {
                if let Some(step) = self.step_forward(&at, &limit) {
                    if let Some(found) = self.check_step(&step) {
                        return Some(found);
                    }
                    forward = Some(step.position().clone());
                }
            }
        }
        None
    }

    fn check_step(&self, step: &Step) -> Option<Range> {
        if let Step::Enter(path, _) = step {
            if self.is_object_at(path) {
                return Some(Range::on(path));
            }
        }
        let at = step.position();
        self.check_child(at, ChildKind::Text)
            .then(|| Range::collapsed(at.clone()))
    }

    /// Path of the closest ancestor of `position` that is a limit.
    fn limit_ancestor(&self, position: &Position) -> Vec<usize> {
        let parent = position.parent_path();
        (0..=parent.len())
            .rev()
            .map(|len| &parent[..len])
            .find(|path| {
                self.element(path)
                    .is_some_and(|e| path.is_empty() || self.schema.is_limit(&e.name))
            })
            .map(<[usize]>::to_vec)
            .unwrap_or_default()
    }

    fn step_forward(&self, at: &Position, limit: &[usize]) -> Option<Step> {
        let parent = self.parent(at)?;
        let offset = at.offset();
        if offset < parent.max_offset() {
            return Some(match parent.node_after(offset)? {
                Node::Element(_) => {
                    let path = at.path().to_vec();
                    let inside = Position::at(&path, 0);
                    Step::Enter(path, inside)
                }
                Node::Text(_) => Step::Text(at.with_offset(text_end(parent, offset))),
            });
        }
        let parent_path = at.parent_path();
        if parent_path.len() <= limit.len() {
            return None;
        }
        Some(Step::Leave(Position::after(parent_path)))
    }

    fn step_backward(&self, at: &Position, limit: &[usize]) -> Option<Step> {
        let parent = self.parent(at)?;
        let offset = at.offset();
        if offset > 0 {
            return Some(match parent.node_before(offset)? {
                Node::Element(element) => {
                    let path = at.with_offset(offset - 1).path().to_vec();
                    let inside = Position::at(&path, element.max_offset());
                    Step::Enter(path, inside)
                }
                Node::Text(_) => Step::Text(at.with_offset(text_start(parent, offset))),
            });
        }
        let parent_path = at.parent_path();
        if parent_path.len() <= limit.len() {
            return None;
        }
        Some(Step::Leave(Position::before(parent_path)))
    }
}

/// End offset of the text run starting at or containing `offset`.
fn text_end(parent: &crate::model::node::Element, offset: usize) -> usize {
    let mut start = 0;
    for child in &parent.children {
        let end = start + child.size();
        if offset < end {
            return end;
        }
        start = end;
    }
    offset
}

/// Start offset of the text run ending at or containing `offset`.
fn text_start(parent: &crate::model::node::Element, offset: usize) -> usize {
    let mut start = 0;
    for child in &parent.children {
        let end = start + child.size();
        if offset <= end {
            return start;
        }
        start = end;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::Element;

    fn pos(path: &[usize]) -> Position {
        Position::new(path.to_vec())
    }

    fn doc() -> Document {
        Document::with_children(vec![
            Element::new("paragraph").with_text("foo").into(),
            Element::new("image").into(),
            Element::new("blockQuote")
                .with_children([Element::new("paragraph").with_text("bar").into()])
                .into(),
        ])
    }

    #[test]
    fn test_text_position_is_returned_as_is() {
        let doc = doc();
        assert_eq!(
            doc.nearest_selection_range(&pos(&[0, 1]), SearchDirection::Forward),
            Some(Range::collapsed(pos(&[0, 1])))
        );
    }

    #[test]
    fn test_forward_enters_next_block() {
        let doc = doc();
        assert_eq!(
            doc.nearest_selection_range(&pos(&[0]), SearchDirection::Forward),
            Some(Range::collapsed(pos(&[0, 0])))
        );
        assert_eq!(
            doc.nearest_selection_range(&pos(&[2]), SearchDirection::Forward),
            Some(Range::collapsed(pos(&[2, 0, 0])))
        );
    }

    #[test]
    fn test_backward_enters_previous_block_at_end() {
        let doc = doc();
        assert_eq!(
            doc.nearest_selection_range(&pos(&[1]), SearchDirection::Backward),
            Some(Range::collapsed(pos(&[0, 3])))
        );
    }

    #[test]
    fn test_objects_are_selected_whole() {
        let doc = doc();
        assert_eq!(
            doc.nearest_selection_range(&pos(&[1]), SearchDirection::Forward),
            Some(Range::on(&[1]))
        );
        assert_eq!(
            doc.nearest_selection_range(&pos(&[2]), SearchDirection::Backward),
            Some(Range::on(&[1]))
        );
    }

    #[test]
    fn test_walk_stays_inside_limit() {
        let doc = doc();
        assert_eq!(
            doc.nearest_selection_range(&pos(&[1, 0]), SearchDirection::Both),
            None
        );
        assert_eq!(doc.nearest_selection_range(&pos(&[3]), SearchDirection::Forward), None);
    }
}
