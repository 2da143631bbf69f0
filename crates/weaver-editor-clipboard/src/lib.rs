//! weaver-editor-clipboard: clipboard and drag-and-drop pipeline for the
//! weaver rich text editor.
//!
//! This crate provides:
//! - `Clipboard` - paste, copy, cut and drag handlers driving the pipeline
//! - `normalize` - raw clipboard payloads to a generic content tree
//! - `drop_target` - pointer targets to model insertion points
//! - `DragTracker` - drag session state, drop markers, source ranges
//! - `insert_fragment` - atomic insertion with plain-text attribute inheritance
//! - `output` - model ranges to HTML and plain text
//! - `Document` / `MappedView` - headless model and view the pipeline runs against

pub mod config;
pub mod content;
pub mod convert;
pub mod drag;
pub mod drop_target;
pub mod error;
pub mod insertion;
pub mod markup;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod quirks;
pub mod throttle;
pub mod transfer;
pub mod view;

pub use config::ClipboardConfig;
pub use content::{ContentElement, ContentFragment, ContentNode};
pub use drag::{DragSession, DragSource, DragTracker};
pub use drop_target::{DropTarget, POSITION_MARKER, RANGE_MARKER};
pub use error::{ClipboardError, ModelError};
pub use insertion::{insert_fragment, is_plain_text_fragment, to_model_fragment};
pub use model::{Document, EditingModel, Fragment, Position, Range, Schema};
pub use output::ClipboardData;
pub use pipeline::{
    Clipboard, ClipboardHooks, ClipboardOutput, InputOutcome, InputStage, InputTransformation,
    OutputOutcome,
};
pub use quirks::{BlinkQuirks, Engine, GeckoQuirks, InputQuirksPolicy, WebKitQuirks};
pub use smol_str::SmolStr;
pub use transfer::{
    ClipboardEvent, ClipboardMethod, ClipboardPayload, DataTransfer, DragEvent, DropEffect,
    EffectAllowed,
};
pub use view::{EditingView, MappedView, ViewNodeId, ViewPosition};
