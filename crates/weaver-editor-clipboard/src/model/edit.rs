//! Composite edits built from primitive operations: delete, insert, and
//! extraction of selected content.

use crate::error::ModelError;
use crate::model::document::Document;
use crate::model::node::{Element, Fragment, Node, Text};
use crate::model::position::{Position, Range};
use crate::model::schema::ChildKind;
use crate::model::{DeleteOptions, SearchDirection};

/// Default block created around loose inline content.
pub(crate) const PARAGRAPH: &str = "paragraph";

/// Index of the deepest element shared by both paths, capped so that each
/// path still has an entry at that level.
fn common_level(start: &[usize], end: &[usize]) -> usize {
    let shared = start.iter().zip(end).take_while(|(a, b)| a == b).count();
    shared.min(start.len() - 1).min(end.len() - 1)
}

impl Document {
    /// Remove the content of `range`.
    ///
    /// Partially covered elements on both sides are trimmed and, where the
    /// schema permits, merged back together. If the range was the document
    /// selection, the selection collapses at the returned position.
    pub fn delete_content(&mut self, range: &Range, options: DeleteOptions) -> Result<Position, ModelError> {
        self.ensure_in_change()?;
        self.validate(&range.start)?;
        self.validate(&range.end)?;
        if range.is_collapsed() {
            return Ok(range.start.clone());
        }
        let is_selection = self.selection == *range;
        let start = range.start.path().to_vec();
        let end = range.end.path().to_vec();

        if range.is_flat() {
            self.remove(range.start.parent_path(), range.start.offset(), range.end.offset())?;
        } else {
            let level = common_level(&start, &end);
            let start_deeper = start.len() > level + 1;
            let end_deeper = end.len() > level + 1;

            // Trim the end side first so the start side paths stay valid.
            for depth in (level + 1..end.len()).rev() {
                self.remove(&end[..depth], 0, end[depth])?;
            }
            for depth in (level + 1..start.len()).rev() {
                let from = start[depth] + usize::from(depth + 1 < start.len());
                let parent = &start[..depth];
                let max = self
                    .element(parent)
                    .map(Element::max_offset)
                    .ok_or_else(|| ModelError::InvalidPosition(parent.to_vec()))?;
                self.remove(parent, from, max)?;
            }
            let from = start[level] + usize::from(start_deeper);
            self.remove(&start[..level], from, end[level])?;

            if start_deeper && end_deeper {
                self.merge_branches(&start, &end, level)?;
            }
        }

        let mut position = range.start.clone();
        if !options.do_not_autoparagraph && self.should_autoparagraph(&position) {
            self.insert_nodes(&position, vec![Element::new(PARAGRAPH).into()])?;
            position = Position::at(position.path(), 0);
        }
        if is_selection {
            self.selection = Range::collapsed(position.clone());
        }
        Ok(position)
    }

    /// Merge the trimmed start branch with the trimmed end branch, level by
    /// level, while both sides are mergeable elements.
    fn merge_branches(&mut self, start: &[usize], end: &[usize], level: usize) -> Result<(), ModelError> {
        let mut left = start[..=level].to_vec();
        loop {
            let Some((&offset, parent)) = left.split_last() else {
                return Ok(());
            };
            let right = Position::at(parent, offset + 1);
            if !self.can_merge(&left, right.path()) {
                return Ok(());
            }
            let left_len = self.element(&left).map_or(0, Element::max_offset);
            self.merge(&right)?;
            let depth = left.len();
            // The first child taken from the right side sits at `left_len`.
            if start.len() <= depth + 1 || end.len() <= depth + 1 || left_len == 0 {
                return Ok(());
            }
            let next = start[depth];
            if next + 1 != left_len {
                return Ok(());
            }
            left.push(next);
        }
    }

    fn can_merge(&self, left: &[usize], right: &[usize]) -> bool {
        let (Some(left), Some(right)) = (self.element(left), self.element(right)) else {
            return false;
        };
        if self.schema.is_limit(&left.name) || self.schema.is_limit(&right.name) {
            return false;
        }
        right
            .children
            .iter()
            .all(|child| self.schema.allows_child(&left.name, ChildKind::of(child)))
    }

    fn should_autoparagraph(&self, position: &Position) -> bool {
        !self.check_child(position, ChildKind::Text)
            && self.check_child(position, ChildKind::Element(PARAGRAPH))
    }

    /// Insert `fragment` at the selection.
    ///
    /// A non-collapsed selection is deleted first. Inline content is
    /// spliced into the text block at the insertion point; block content
    /// splits it, merging the first and last pasted blocks into the two
    /// halves when they are text blocks. The selection ends up at the end of
    /// the inserted content.
    pub fn insert_content(&mut self, fragment: Fragment) -> Result<Range, ModelError> {
        self.ensure_in_change()?;
        let selection = self.selection.clone();
        let position = if selection.is_collapsed() {
            self.validate(&selection.start)?;
            selection.start
        } else {
            self.delete_content(
                &selection,
                DeleteOptions {
                    do_not_autoparagraph: true,
                },
            )?
        };
        let nodes = fragment.into_children();
        if nodes.is_empty() {
            return Ok(Range::collapsed(position));
        }
        if self.check_child(&position, ChildKind::Text) {
            self.insert_into_text_block(position, nodes)
        } else {
            self.insert_into_container(position, nodes)
        }
    }

    fn insert_into_text_block(&mut self, position: Position, nodes: Vec<Node>) -> Result<Range, ModelError> {
        let nodes = match <[Node; 1]>::try_from(nodes) {
            Ok([Node::Element(block)]) if self.schema.is_mergeable(&block.name) => block.children,
            Ok([node]) => vec![node],
            Err(nodes) => nodes,
        };
        if nodes
            .iter()
            .all(|node| self.check_child(&position, ChildKind::of(node)))
        {
            let range = self.insert_nodes(&position, nodes)?;
            self.selection = Range::collapsed(range.end.clone());
            return Ok(range);
        }

        let block_path = position.parent_path().to_vec();
        let Some((&block_offset, container)) = block_path.split_last() else {
            return Err(ModelError::InvalidPosition(position.path().to_vec()));
        };
        let container = container.to_vec();
        let container_name = self
            .element(&container)
            .map(|e| e.name.clone())
            .ok_or_else(|| ModelError::InvalidPosition(container.clone()))?;
        let mut blocks = self.fit_blocks(&container_name, self.autoparagraph(nodes));

        self.split(&position)?;
        let left_len = self.element(&block_path).map_or(0, Element::max_offset);
        let mut start = Position::at(&container, block_offset + 1);

        let first_merged = blocks
            .first()
            .is_some_and(|block| self.schema.is_mergeable(&block.name));
        if first_merged {
            let first = blocks.remove(0);
            start = Position::at(&block_path, left_len);
            self.insert_nodes(&start, first.children)?;
        }
        let last = match blocks.last() {
            Some(block) if self.schema.is_mergeable(&block.name) => blocks.pop(),
            _ => None,
        };

        let mut offset = block_offset + 1;
        for block in blocks {
            self.insert_nodes(&Position::at(&container, offset), vec![block.into()])?;
            offset += 1;
        }
        let right = Position::at(&container, offset);
        let end = match last {
            Some(last) => {
                let inserted = self.insert_nodes(&Position::at(right.path(), 0), last.children)?;
                inserted.end
            }
            None => right.clone(),
        };

        let tracked = self.create_live_range(Range::new(start, end));
        if !first_merged && self.element(&block_path).is_some_and(Element::is_empty) {
            // Removing the right half first keeps the left path stable.
            self.remove_if_empty(right.path())?;
            self.remove(&container, block_offset, block_offset + 1)?;
        } else {
            self.remove_if_empty(right.path())?;
        }
        let range = self.live_range(tracked).cloned();
        self.detach_live_range(tracked);
        let range = range.ok_or(ModelError::InvalidPosition(block_path))?;

        self.place_selection_after(&range.end);
        Ok(range)
    }

    /// Remove an element left empty after a split, unless something was
    /// merged into it.
    fn remove_if_empty(&mut self, path: &[usize]) -> Result<(), ModelError> {
        let Some((&offset, parent)) = path.split_last() else {
            return Ok(());
        };
        if self.element(path).is_some_and(Element::is_empty) {
            self.remove(parent, offset, offset + 1)?;
        }
        Ok(())
    }

    fn insert_into_container(&mut self, position: Position, nodes: Vec<Node>) -> Result<Range, ModelError> {
        let container = position.parent_path().to_vec();
        let container_name = self
            .element(&container)
            .map(|e| e.name.clone())
            .ok_or_else(|| ModelError::InvalidPosition(container.clone()))?;
        let blocks = self.fit_blocks(&container_name, self.autoparagraph(nodes));
        let mut offset = position.offset();
        for block in blocks {
            self.insert_nodes(&Position::at(&container, offset), vec![block.into()])?;
            offset += 1;
        }
        let range = Range::new(position, Position::at(&container, offset));
        self.place_selection_after(&range.end);
        Ok(range)
    }

    fn place_selection_after(&mut self, end: &Position) {
        self.selection = if self.check_child(end, ChildKind::Text) {
            Range::collapsed(end.clone())
        } else {
            self.nearest_selection_range(end, SearchDirection::Backward)
                .unwrap_or_else(|| Range::collapsed(end.clone()))
        };
    }

    /// Wrap runs of inline nodes into default paragraphs.
    fn autoparagraph(&self, nodes: Vec<Node>) -> Vec<Element> {
        let mut blocks = Vec::new();
        let mut run: Vec<Node> = Vec::new();
        for node in nodes {
            match node {
                Node::Element(element) if self.schema.is_block(&element.name) => {
                    if !run.is_empty() {
                        blocks.push(Element::new(PARAGRAPH).with_children(run.drain(..)));
                    }
                    blocks.push(element);
                }
                inline => run.push(inline),
            }
        }
        if !run.is_empty() {
            blocks.push(Element::new(PARAGRAPH).with_children(run));
        }
        blocks
    }

    /// Adapt blocks to what `container` accepts: disallowed text blocks
    /// become paragraphs, disallowed containers are unwrapped, and anything
    /// else that still does not fit is dropped.
    fn fit_blocks(&self, container: &str, blocks: Vec<Element>) -> Vec<Element> {
        let mut out = Vec::with_capacity(blocks.len());
        for block in blocks {
            if self.schema.allows_child(container, ChildKind::Element(&block.name)) {
                out.push(block);
                continue;
            }
            let allows_text = self
                .schema
                .item(&block.name)
                .is_some_and(|item| item.allow_text);
            if allows_text {
                if self.schema.allows_child(container, ChildKind::Element(PARAGRAPH)) {
                    out.push(Element::new(PARAGRAPH).with_children(block.children));
                } else {
                    tracing::debug!(block = %block.name, container, "dropping text block");
                }
            } else if self.schema.is_object(&block.name) {
                tracing::debug!(block = %block.name, container, "dropping object");
            } else {
                let inner = self.autoparagraph(block.children);
                out.extend(self.fit_blocks(container, inner));
            }
        }
        out
    }

    /// Detached copy of everything inside `range`, cutting partially
    /// selected elements down to their selected part.
    pub fn get_selected_content(&self, range: &Range) -> Fragment {
        if range.is_collapsed() {
            return Fragment::default();
        }
        let start = range.start.path();
        let end = range.end.path();
        let level = common_level(start, end);
        let Some(ancestor) = self.element(&start[..level]) else {
            return Fragment::default();
        };
        Fragment::new(clone_between(ancestor, Some(&start[level..]), Some(&end[level..])))
    }
}

/// Clone the children of `element` between two relative paths. `None`
/// stands for the element's own start or end.
fn clone_between(element: &Element, start: Option<&[usize]>, end: Option<&[usize]>) -> Vec<Node> {
    let from = start.map_or(0, |p| p[0]);
    let to = end.map_or(element.max_offset(), |p| p[0]);
    let start_inner = start.filter(|p| p.len() > 1);
    let end_inner = end.filter(|p| p.len() > 1);
    let mut out = Vec::new();
    let mut offset = 0;
    for child in &element.children {
        let child_start = offset;
        offset += child.size();
        match child {
            Node::Text(text) => {
                let lo = from.max(child_start);
                let hi = to.min(offset);
                if lo < hi {
                    out.push(Node::Text(Text {
                        data: text
                            .data
                            .chars()
                            .skip(lo - child_start)
                            .take(hi - lo)
                            .collect(),
                        attributes: text.attributes.clone(),
                    }));
                }
            }
            Node::Element(inner) => {
                let partial_start = start_inner.filter(|p| p[0] == child_start).map(|p| &p[1..]);
                let partial_end = end_inner.filter(|p| p[0] == child_start).map(|p| &p[1..]);
                if partial_start.is_some() || partial_end.is_some() {
                    out.push(Node::Element(Element {
                        name: inner.name.clone(),
                        attributes: inner.attributes.clone(),
                        children: clone_between(inner, partial_start, partial_end),
                    }));
                } else if child_start >= from && child_start < to {
                    out.push(child.clone());
                }
            }
        }
    }
    out
}
