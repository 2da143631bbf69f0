//! Pipeline configuration.

use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

/// Settings for a [`Clipboard`](crate::Clipboard).
///
/// Every field has a default, so a partial config deserializes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Coalescing interval for drop marker updates, in milliseconds.
    pub marker_throttle_ms: u64,
    /// Transfer type carrying the id of a local drag session.
    pub dragging_uid_type: SmolStr,
    /// Element wrapping plain-text lines.
    pub paragraph_element: SmolStr,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            marker_throttle_ms: 40,
            dragging_uid_type: SmolStr::new_static("application/x-weaver-dragging-uid"),
            paragraph_element: SmolStr::new_static("paragraph"),
        }
    }
}

impl ClipboardConfig {
    pub fn marker_throttle(&self) -> Duration {
        Duration::from_millis(self.marker_throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ClipboardConfig = serde_json::from_str(r#"{ "marker_throttle_ms": 16 }"#).unwrap();
        assert_eq!(config.marker_throttle(), Duration::from_millis(16));
        assert_eq!(config.paragraph_element, "paragraph");
        assert_eq!(config.dragging_uid_type, ClipboardConfig::default().dragging_uid_type);
    }
}
