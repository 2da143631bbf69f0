//! Native transfer payloads and the events that carry them.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::view::{ViewNodeId, ViewPosition};

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

/// Operation the drop target accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DropEffect {
    #[default]
    None,
    Copy,
    Move,
    Link,
}

/// Operations the drag source allows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EffectAllowed {
    None,
    Copy,
    Move,
    Link,
    CopyMove,
    CopyLink,
    LinkMove,
    All,
    #[default]
    Uninitialized,
}

impl EffectAllowed {
    /// The drop effect implied by the allowed set. `all` and `copyMove`
    /// resolve to move; a source that never set the field implies copy.
    pub fn implied_drop_effect(self) -> DropEffect {
        match self {
            EffectAllowed::None => DropEffect::None,
            EffectAllowed::Copy | EffectAllowed::CopyLink | EffectAllowed::Uninitialized => {
                DropEffect::Copy
            }
            EffectAllowed::Link | EffectAllowed::LinkMove => DropEffect::Link,
            EffectAllowed::Move | EffectAllowed::CopyMove | EffectAllowed::All => DropEffect::Move,
        }
    }
}

/// Data carried by a clipboard or drag event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataTransfer {
    data: BTreeMap<SmolStr, String>,
    pub effect_allowed: EffectAllowed,
    pub drop_effect: DropEffect,
    /// Set by engines that report an explicit user cancellation.
    pub user_cancelled: bool,
}

impl DataTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, mime: &str, data: impl Into<String>) -> Self {
        self.set_data(mime, data);
        self
    }

    pub fn set_data(&mut self, mime: &str, data: impl Into<String>) {
        self.data.insert(SmolStr::new(mime), data.into());
    }

    /// Data for a type. Empty entries read as absent.
    pub fn get_data(&self, mime: &str) -> Option<&str> {
        self.data
            .get(mime)
            .map(String::as_str)
            .filter(|data| !data.is_empty())
    }

    pub fn has_type(&self, mime: &str) -> bool {
        self.data.contains_key(mime)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(SmolStr::as_str)
    }

    pub fn clear_data(&mut self) {
        self.data.clear();
    }

    /// A finished drag was cancelled: nothing accepted the drop.
    pub fn is_canceled(&self) -> bool {
        self.drop_effect == DropEffect::None || self.user_cancelled
    }
}

/// Raw external input of one gesture.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: Option<String>,
    pub plain_text: Option<String>,
}

impl ClipboardPayload {
    /// Read the payload from a transfer. With `plain_text_only` the markup
    /// flavor is ignored.
    pub fn from_transfer(transfer: &DataTransfer, plain_text_only: bool) -> Self {
        let html = if plain_text_only {
            None
        } else {
            transfer.get_data(TEXT_HTML).map(str::to_string)
        };
        Self {
            html,
            plain_text: transfer.get_data(TEXT_PLAIN).map(str::to_string),
        }
    }
}

/// What gesture a payload belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipboardMethod {
    Paste,
    Drop,
    Copy,
    Cut,
    DragStart,
}

impl ClipboardMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ClipboardMethod::Paste => "paste",
            ClipboardMethod::Drop => "drop",
            ClipboardMethod::Copy => "copy",
            ClipboardMethod::Cut => "cut",
            ClipboardMethod::DragStart => "dragstart",
        }
    }
}

/// A paste, copy, or cut event.
#[derive(Clone, Debug, Default)]
pub struct ClipboardEvent {
    pub data_transfer: DataTransfer,
    /// Paste requested as plain text (Shift+paste).
    pub as_plain_text: bool,
    default_prevented: bool,
}

impl ClipboardEvent {
    pub fn new(data_transfer: DataTransfer) -> Self {
        Self {
            data_transfer,
            ..Default::default()
        }
    }

    /// An empty event for copy and cut, to be filled by the handler.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn plain_text(mut self) -> Self {
        self.as_plain_text = true;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// A drag event over the editing surface.
#[derive(Clone, Debug, Default)]
pub struct DragEvent {
    pub data_transfer: DataTransfer,
    /// Node under the pointer.
    pub target: Option<ViewNodeId>,
    /// Caret position under the pointer, when the engine reports one.
    pub target_position: Option<ViewPosition>,
    /// Node the pointer moved to, on leave.
    pub related_target: Option<ViewNodeId>,
    default_prevented: bool,
}

impl DragEvent {
    pub fn new(data_transfer: DataTransfer) -> Self {
        Self {
            data_transfer,
            ..Default::default()
        }
    }

    pub fn at(mut self, target: ViewNodeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn at_position(mut self, target: ViewNodeId, position: ViewPosition) -> Self {
        self.target = Some(target);
        self.target_position = Some(position);
        self
    }

    pub fn leaving_to(mut self, related: ViewNodeId) -> Self {
        self.related_target = Some(related);
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_data_reads_as_absent() {
        let transfer = DataTransfer::new()
            .with_data(TEXT_HTML, "")
            .with_data(TEXT_PLAIN, "x");
        assert!(transfer.has_type(TEXT_HTML));
        assert_eq!(transfer.get_data(TEXT_HTML), None);
        let payload = ClipboardPayload::from_transfer(&transfer, false);
        assert_eq!(payload.html, None);
        assert_eq!(payload.plain_text.as_deref(), Some("x"));
    }

    #[test]
    fn test_plain_text_only_ignores_markup() {
        let transfer = DataTransfer::new()
            .with_data(TEXT_HTML, "<b>x</b>")
            .with_data(TEXT_PLAIN, "x");
        let payload = ClipboardPayload::from_transfer(&transfer, true);
        assert_eq!(payload.html, None);
    }

    #[test]
    fn test_implied_drop_effect() {
        assert_eq!(EffectAllowed::All.implied_drop_effect(), DropEffect::Move);
        assert_eq!(EffectAllowed::CopyMove.implied_drop_effect(), DropEffect::Move);
        assert_eq!(EffectAllowed::Copy.implied_drop_effect(), DropEffect::Copy);
        assert_eq!(EffectAllowed::None.implied_drop_effect(), DropEffect::None);
        assert_eq!(EffectAllowed::Uninitialized.implied_drop_effect(), DropEffect::Copy);
    }
}
