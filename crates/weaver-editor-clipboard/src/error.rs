//! Error types for model edits and the clipboard pipeline.

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by the document model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    /// A mutation was attempted outside a change block.
    #[error("model mutation outside of a change block")]
    NoActiveChange,

    /// A path does not address a node or offset in the tree.
    #[error("invalid position {0:?}")]
    InvalidPosition(Vec<usize>),

    /// The schema rejected content at a position.
    #[error("schema does not allow {child} in {parent}")]
    NotAllowed { parent: SmolStr, child: SmolStr },

    /// A marker with this name already exists.
    #[error("marker {0} already exists")]
    MarkerExists(SmolStr),

    /// No marker with this name exists.
    #[error("marker {0} does not exist")]
    MarkerMissing(SmolStr),
}

/// Errors surfaced by the clipboard pipeline helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClipboardError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The editor is read-only and the operation would modify it.
    #[error("editor is read-only")]
    ReadOnly,
}
