//! Engine-specific input behavior.
//!
//! Engines disagree on where the final drag operation is reported and on
//! which way a drop caret should snap. Those decisions live behind
//! [`InputQuirksPolicy`] so the drag handling itself has no engine checks.

use crate::model::SearchDirection;
use crate::transfer::{DataTransfer, DropEffect};

/// Which transfer field carries the user's copy/move choice on drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropEffectSource {
    DropEffect,
    EffectAllowed,
}

/// When the self-overlap check of a drop runs relative to moving the
/// selection onto the drop target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapCheck {
    /// Compare against the selection after it moved to the target.
    #[default]
    AfterSelection,
    /// Compare against the raw resolved target, before touching the
    /// selection.
    BeforeSelection,
}

pub trait InputQuirksPolicy {
    fn drop_effect_source(&self) -> DropEffectSource;

    /// Direction to search for a caret position around a drop point.
    fn target_search_direction(&self) -> SearchDirection;

    /// Whether drag-over must write the drop effect back into the transfer.
    fn sets_drop_effect_on_dragover(&self) -> bool;

    fn overlap_check(&self) -> OverlapCheck {
        OverlapCheck::AfterSelection
    }

    /// Whether a text selection is dragged by making the editable root
    /// draggable on pointer-down.
    fn drags_selection_via_editable(&self) -> bool {
        false
    }

    /// The operation the user chose, read from the field this engine uses.
    fn final_drop_effect(&self, transfer: &DataTransfer) -> DropEffect {
        match self.drop_effect_source() {
            DropEffectSource::DropEffect => transfer.drop_effect,
            DropEffectSource::EffectAllowed => transfer.effect_allowed.implied_drop_effect(),
        }
    }
}

impl<Q: InputQuirksPolicy + ?Sized> InputQuirksPolicy for Box<Q> {
    fn drop_effect_source(&self) -> DropEffectSource {
        (**self).drop_effect_source()
    }

    fn target_search_direction(&self) -> SearchDirection {
        (**self).target_search_direction()
    }

    fn sets_drop_effect_on_dragover(&self) -> bool {
        (**self).sets_drop_effect_on_dragover()
    }

    fn overlap_check(&self) -> OverlapCheck {
        (**self).overlap_check()
    }

    fn drags_selection_via_editable(&self) -> bool {
        (**self).drags_selection_via_editable()
    }
}

/// Chromium-based engines.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlinkQuirks;

impl InputQuirksPolicy for BlinkQuirks {
    fn drop_effect_source(&self) -> DropEffectSource {
        DropEffectSource::EffectAllowed
    }

    fn target_search_direction(&self) -> SearchDirection {
        SearchDirection::Backward
    }

    fn sets_drop_effect_on_dragover(&self) -> bool {
        true
    }

    fn drags_selection_via_editable(&self) -> bool {
        true
    }
}

/// Firefox. Reports the final operation in `dropEffect` and places the
/// drop caret before the pointer.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeckoQuirks;

impl InputQuirksPolicy for GeckoQuirks {
    fn drop_effect_source(&self) -> DropEffectSource {
        DropEffectSource::DropEffect
    }

    fn target_search_direction(&self) -> SearchDirection {
        SearchDirection::Forward
    }

    fn sets_drop_effect_on_dragover(&self) -> bool {
        false
    }
}

/// Safari and other WebKit engines. Same answers as Blink today.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebKitQuirks;

impl InputQuirksPolicy for WebKitQuirks {
    fn drop_effect_source(&self) -> DropEffectSource {
        DropEffectSource::EffectAllowed
    }

    fn target_search_direction(&self) -> SearchDirection {
        SearchDirection::Backward
    }

    fn sets_drop_effect_on_dragover(&self) -> bool {
        true
    }
}

/// Browser engine family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    Blink,
    Gecko,
    WebKit,
}

impl Engine {
    /// Classify a user agent string. Unknown agents count as Blink.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ua.contains("gecko/") && !ua.contains("like gecko") {
            Engine::Gecko
        } else if ua.contains("safari") && !ua.contains("chrome") && !ua.contains("chromium") {
            Engine::WebKit
        } else {
            Engine::Blink
        }
    }

    pub fn quirks(self) -> Box<dyn InputQuirksPolicy> {
        match self {
            Engine::Blink => Box::new(BlinkQuirks),
            Engine::Gecko => Box::new(GeckoQuirks),
            Engine::WebKit => Box::new(WebKitQuirks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::EffectAllowed;

    #[test]
    fn test_engine_detection() {
        let firefox = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
        let safari = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15";
        let chrome = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
        assert_eq!(Engine::from_user_agent(firefox), Engine::Gecko);
        assert_eq!(Engine::from_user_agent(safari), Engine::WebKit);
        assert_eq!(Engine::from_user_agent(chrome), Engine::Blink);
    }

    #[test]
    fn test_final_drop_effect_per_engine() {
        let mut transfer = DataTransfer::new();
        transfer.effect_allowed = EffectAllowed::CopyMove;
        transfer.drop_effect = DropEffect::Copy;
        assert_eq!(GeckoQuirks.final_drop_effect(&transfer), DropEffect::Copy);
        assert_eq!(BlinkQuirks.final_drop_effect(&transfer), DropEffect::Move);
        assert_eq!(Engine::WebKit.quirks().final_drop_effect(&transfer), DropEffect::Move);
    }
}
