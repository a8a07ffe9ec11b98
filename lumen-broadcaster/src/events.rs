use lumen_content::{ContentItem, ThemeUpdate, TransitionSpec, WIRE_VERSION};
use serde::{Deserialize, Serialize};

use crate::error::{BroadcasterError, Result};

/// Events pushed from the operator to the output surface
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutputEvent {
    /// Render a content item
    ContentUpdate {
        item: ContentItem,
        /// Overrides the theme's default transition for this update only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transition: Option<TransitionSpec>,
    },

    /// Back to the idle placeholder
    ContentClear,

    /// Black overlay; the underlying content is kept
    ShowBlack,

    /// Logo overlay; the underlying content is kept
    ShowLogo,

    /// Merge a partial theme
    ThemeUpdate { theme: ThemeUpdate },
}

impl OutputEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutputEvent::ContentUpdate { .. } => "content-update",
            OutputEvent::ContentClear => "content-clear",
            OutputEvent::ShowBlack => "show-black",
            OutputEvent::ShowLogo => "show-logo",
            OutputEvent::ThemeUpdate { .. } => "theme-update",
        }
    }
}

/// One line on the wire
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub v: u32,
    pub seq: u64,
    #[serde(flatten)]
    pub event: OutputEvent,
}

impl Envelope {
    pub fn new(seq: u64, event: OutputEvent) -> Self {
        Self {
            v: WIRE_VERSION,
            seq,
            event,
        }
    }

    /// Convert envelope to JSON string with newline
    pub fn to_json_line(&self) -> std::result::Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Validate and decode one received line.
///
/// The version is checked before the payload so a newer operator's unknown
/// event types surface as a version mismatch rather than a parse error.
pub fn decode_line(line: &str) -> Result<Envelope> {
    let value: serde_json::Value = serde_json::from_str(line.trim())?;

    let found = value.get("v").and_then(|v| v.as_u64()).unwrap_or(0);
    if found != u64::from(WIRE_VERSION) {
        return Err(BroadcasterError::UnsupportedVersion {
            found,
            expected: WIRE_VERSION,
        });
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_update_serialization() {
        let mut item = ContentItem::scripture("John 3:16", "For God so loved the world");
        item.id = "verse-1".to_string();
        let envelope = Envelope::new(
            7,
            OutputEvent::ContentUpdate {
                item,
                transition: None,
            },
        );
        let json = envelope.to_json_line().unwrap();
        assert!(json.contains("\"type\":\"content-update\""));
        assert!(json.contains("\"seq\":7"));
        assert!(json.contains("\"reference\":\"John 3:16\""));
        assert!(!json.contains("\"transition\""));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_unit_events_serialization() {
        let json = Envelope::new(1, OutputEvent::ShowBlack).to_json_line().unwrap();
        assert!(json.contains("\"type\":\"show-black\""));
        let json = Envelope::new(2, OutputEvent::ContentClear).to_json_line().unwrap();
        assert!(json.contains("\"type\":\"content-clear\""));
    }

    #[test]
    fn test_decode_roundtrip_keeps_transition() {
        let envelope = Envelope::new(
            3,
            OutputEvent::ContentUpdate {
                item: ContentItem::song("Amazing Grace", "Amazing grace, how sweet the sound"),
                transition: Some(TransitionSpec::zoom(300)),
            },
        );
        let line = envelope.to_json_line().unwrap();
        assert_eq!(decode_line(&line).unwrap(), envelope);
    }

    #[test]
    fn test_decode_rejects_other_versions() {
        let err = decode_line(r#"{"v":99,"seq":1,"type":"show-logo"}"#).unwrap_err();
        assert!(matches!(
            err,
            BroadcasterError::UnsupportedVersion { found: 99, .. }
        ));

        let err = decode_line(r#"{"seq":1,"type":"show-logo"}"#).unwrap_err();
        assert!(matches!(err, BroadcasterError::UnsupportedVersion { found: 0, .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        let err = decode_line(r#"{"v":1,"seq":1,"type":"self-destruct"}"#).unwrap_err();
        assert!(matches!(err, BroadcasterError::Serialization(_)));
    }
}
