//! Shared data types and small time helpers.

use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Payload stored alongside each point in the vector store.
///
/// Field names are camelCase on the wire — they double as the indexed
/// payload keys (`contentType`, `appName`, `tags`, `isFavorite`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub content: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Creation time, seconds since epoch.
    pub timestamp: f64,
    /// Entity values extracted at creation time, never updated.
    #[serde(default)]
    pub entities: Vec<String>,
}

fn default_content_type() -> String {
    "text".into()
}

fn default_app_name() -> String {
    "Unknown".into()
}

/// Current time as fractional seconds since the Unix epoch.
pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Elapsed milliseconds since `since`, rounded to one decimal.
pub fn elapsed_ms(since: Instant) -> f64 {
    (since.elapsed().as_secs_f64() * 10_000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_defaults_on_deserialize() {
        let p: ItemPayload =
            serde_json::from_str(r#"{"content": "hello", "timestamp": 1700000000.0}"#).unwrap();
        assert_eq!(p.content_type, "text");
        assert_eq!(p.app_name, "Unknown");
        assert!(!p.is_favorite);
        assert!(p.tags.is_empty());
    }

    #[test]
    fn test_payload_wire_keys() {
        let p = ItemPayload {
            content: "hello".into(),
            content_type: "text".into(),
            app_name: "Mail".into(),
            title: String::new(),
            tags: vec![],
            is_favorite: true,
            timestamp: epoch_secs(),
            entities: vec![],
        };
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("contentType").is_some());
        assert!(json.get("appName").is_some());
        assert_eq!(json["isFavorite"], true);
        assert!(json.get("content_type").is_none());
    }

    #[test]
    fn test_elapsed_ms_is_non_negative() {
        let t = Instant::now();
        assert!(elapsed_ms(t) >= 0.0);
    }
}
