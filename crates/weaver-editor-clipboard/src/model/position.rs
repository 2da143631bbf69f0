//! Tree positions, ranges, and their transformation by model operations.

use crate::model::operation::Operation;

/// A position in the model tree.
///
/// The path holds one offset per tree level, starting at the root. Every
/// entry but the last addresses an element; the last one is the offset
/// inside the parent. Lexicographic order of paths is document order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    path: Vec<usize>,
}

/// Which way a position moves when content is inserted exactly at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stickiness {
    /// Stick to the content after: inserted content lands before the position.
    ToNext,
    /// Stick to the content before: inserted content lands after the position.
    ToPrevious,
}

impl Position {
    /// Create a position from a full offset path. An empty path means the
    /// start of the root.
    pub fn new(path: Vec<usize>) -> Self {
        if path.is_empty() {
            return Self { path: vec![0] };
        }
        Self { path }
    }

    /// Position at `offset` inside the element at `parent`.
    pub fn at(parent: &[usize], offset: usize) -> Self {
        let mut path = parent.to_vec();
        path.push(offset);
        Self { path }
    }

    /// Position right before the element at `element`.
    pub fn before(element: &[usize]) -> Self {
        Self::new(element.to_vec())
    }

    /// Position right after the element at `element`.
    pub fn after(element: &[usize]) -> Self {
        let mut path = element.to_vec();
        if let Some(last) = path.last_mut() {
            *last += 1;
        }
        Self::new(path)
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Path of the element containing this position.
    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len() - 1]
    }

    pub fn offset(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    /// Number of elements between the root and this position.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        Self::at(self.parent_path(), offset)
    }

    /// Whether both positions share the same parent element.
    pub fn has_same_parent_as(&self, other: &Position) -> bool {
        self.parent_path() == other.parent_path()
    }

    /// Whether `element` is an ancestor of this position.
    pub fn is_inside(&self, element: &[usize]) -> bool {
        self.path.len() > element.len() && self.path[..element.len()] == *element
    }

    /// Map this position through an operation applied to the tree.
    pub fn transformed_by(&self, op: &Operation, stickiness: Stickiness) -> Position {
        match op {
            Operation::Insert { position, how_many } => {
                self.transformed_by_insert(position, *how_many, stickiness)
            }
            Operation::Remove { position, how_many } => {
                self.transformed_by_remove(position, *how_many)
            }
            Operation::Split { position } => self.transformed_by_split(position, stickiness),
            Operation::Merge { position, left_len } => {
                self.transformed_by_merge(position, *left_len)
            }
            Operation::Marker { .. } => self.clone(),
        }
    }

    fn transformed_by_insert(&self, at: &Position, how_many: usize, stickiness: Stickiness) -> Position {
        let parent = at.parent_path();
        if !self.is_inside(parent) {
            return self.clone();
        }
        let depth = parent.len();
        let own = self.path[depth];
        let shift = if self.path.len() == depth + 1 {
            own > at.offset() || (own == at.offset() && stickiness == Stickiness::ToNext)
        } else {
            own >= at.offset()
        };
        let mut path = self.path.clone();
        if shift {
            path[depth] += how_many;
        }
        Position { path }
    }

    fn transformed_by_remove(&self, at: &Position, how_many: usize) -> Position {
        let parent = at.parent_path();
        if !self.is_inside(parent) {
            return self.clone();
        }
        let depth = parent.len();
        let start = at.offset();
        let end = start + how_many;
        let own = self.path[depth];
        let at_level = self.path.len() == depth + 1;
        let mut path = self.path.clone();
        if own >= end {
            path[depth] -= how_many;
        } else if at_level && own > start {
            path[depth] = start;
        } else if !at_level && own >= start {
            // Inside a removed element.
            return at.clone();
        }
        Position { path }
    }

    fn transformed_by_split(&self, at: &Position, stickiness: Stickiness) -> Position {
        let parent = at.parent_path();
        if parent.is_empty() {
            return self.clone();
        }
        let depth = parent.len();
        let split_offset = at.offset();
        if self.is_inside(parent) {
            let own = self.path[depth];
            let moves = if self.path.len() == depth + 1 {
                own > split_offset || (own == split_offset && stickiness == Stickiness::ToNext)
            } else {
                own >= split_offset
            };
            if !moves {
                return self.clone();
            }
            let mut path = parent.to_vec();
            path[depth - 1] += 1;
            path.push(own - split_offset);
            path.extend_from_slice(&self.path[depth + 1..]);
            return Position { path };
        }
        let grandparent = &parent[..depth - 1];
        if self.is_inside(grandparent) && self.path[depth - 1] > parent[depth - 1] {
            let mut path = self.path.clone();
            path[depth - 1] += 1;
            return Position { path };
        }
        self.clone()
    }

    fn transformed_by_merge(&self, at: &Position, left_len: usize) -> Position {
        let grandparent = at.parent_path();
        let depth = grandparent.len();
        let right_offset = at.offset();
        let mut right = grandparent.to_vec();
        right.push(right_offset);
        if self.is_inside(&right) {
            let mut path = grandparent.to_vec();
            path.push(right_offset - 1);
            path.push(left_len + self.path[depth + 1]);
            path.extend_from_slice(&self.path[depth + 2..]);
            return Position { path };
        }
        if self.is_inside(grandparent) && self.path[depth] > right_offset {
            let mut path = self.path.clone();
            path[depth] -= 1;
            return Position { path };
        }
        self.clone()
    }
}

/// An ordered pair of positions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a range, ordering the boundaries.
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    /// Range spanning exactly the element at `element`.
    pub fn on(element: &[usize]) -> Self {
        Self {
            start: Position::before(element),
            end: Position::after(element),
        }
    }

    /// Range covering all children of the element at `element`.
    pub fn inside(element: &[usize], max_offset: usize) -> Self {
        Self {
            start: Position::at(element, 0),
            end: Position::at(element, max_offset),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Both boundaries share a parent.
    pub fn is_flat(&self) -> bool {
        self.start.has_same_parent_as(&self.end)
    }

    /// If this range spans exactly one element, its path.
    pub fn element_path(&self) -> Option<Vec<usize>> {
        if self.is_flat() && self.end.offset() == self.start.offset() + 1 {
            Some(self.start.path().to_vec())
        } else {
            None
        }
    }

    /// Strict containment: boundaries themselves are outside.
    pub fn contains_position(&self, position: &Position) -> bool {
        *position > self.start && *position < self.end
    }

    /// Whether `other` lies within this range.
    ///
    /// With `loose`, a shared boundary counts as contained. A collapsed
    /// `other` is always checked strictly.
    pub fn contains_range(&self, other: &Range, loose: bool) -> bool {
        let loose = loose && !other.is_collapsed();
        let start_inside =
            self.contains_position(&other.start) || (loose && other.start == self.start);
        let end_inside = self.contains_position(&other.end) || (loose && other.end == self.end);
        start_inside && end_inside
    }

    /// Map the range through an operation. The range does not grow when
    /// content is inserted at either boundary.
    pub fn transformed_by(&self, op: &Operation) -> Range {
        if self.is_collapsed() {
            let position = self.start.transformed_by(op, Stickiness::ToNext);
            return Range::collapsed(position);
        }
        let start = self.start.transformed_by(op, Stickiness::ToNext);
        let end = self.end.transformed_by(op, Stickiness::ToPrevious);
        if end < start {
            return Range::collapsed(start);
        }
        Range { start, end }
    }
}
