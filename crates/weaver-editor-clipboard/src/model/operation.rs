//! Primitive model operations recorded by change blocks.

use smol_str::SmolStr;

use crate::model::position::{Position, Range};

/// One primitive change to the model.
///
/// Every structural edit is expressed through these so markers, live
/// ranges, and the selection can be mapped through it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `how_many` offsets were inserted at `position`.
    Insert { position: Position, how_many: usize },
    /// `how_many` offsets were removed starting at `position`.
    Remove { position: Position, how_many: usize },
    /// The parent of `position` was split at its offset; the tail now lives
    /// in a new sibling right after it.
    Split { position: Position },
    /// The element right after `position` was merged into the element
    /// right before it, which held `left_len` offsets at the time.
    Merge { position: Position, left_len: usize },
    /// A marker was added, moved, or removed.
    Marker {
        name: SmolStr,
        old_range: Option<Range>,
        new_range: Option<Range>,
    },
}

impl Operation {
    pub fn is_structural(&self) -> bool {
        !matches!(self, Operation::Marker { .. })
    }
}

/// Operations recorded by one outermost change block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    pub operations: Vec<Operation>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Marker operations touching `name`, in order.
    pub fn marker_operations<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Operation> + 'a {
        self.operations
            .iter()
            .filter(move |op| matches!(op, Operation::Marker { name: n, .. } if n == name))
    }
}
