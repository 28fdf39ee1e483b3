//! Read helpers for scored points and group ids.
//!
//! Payload values come back as prost `Value`s; these helpers pull out the
//! handful of shapes the gateway exposes without dragging the whole prost
//! type tree through the upper layers.

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{GroupId, ScoredPoint, group_id};

/// Stringified point id — uuid or numeric.
pub fn point_id_str(point: &ScoredPoint) -> String {
    match point.id.as_ref().and_then(|id| id.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

/// String payload field, empty when missing or differently typed.
pub fn payload_str(point: &ScoredPoint, key: &str) -> String {
    match point.payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

/// String-list payload field; non-string elements are skipped.
pub fn payload_str_list(point: &ScoredPoint, key: &str) -> Vec<String> {
    match point.payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::ListValue(list)) => list
            .values
            .iter()
            .filter_map(|v| match v.kind.as_ref() {
                Some(Kind::StringValue(s)) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Bool payload field, false when missing.
pub fn payload_bool(point: &ScoredPoint, key: &str) -> bool {
    matches!(
        point.payload.get(key).and_then(|v| v.kind.as_ref()),
        Some(Kind::BoolValue(true))
    )
}

/// Stringified group key for grouped query responses.
pub fn group_id_str(id: GroupId) -> String {
    match id.kind {
        Some(group_id::Kind::StringValue(s)) => s,
        Some(group_id::Kind::IntegerValue(i)) => i.to_string(),
        Some(group_id::Kind::UnsignedValue(u)) => u.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::{ListValue, PointId, Value};
    use std::collections::HashMap;

    fn string_value(s: &str) -> Value {
        Value {
            kind: Some(Kind::StringValue(s.to_string())),
        }
    }

    fn test_point() -> ScoredPoint {
        let mut payload = HashMap::new();
        payload.insert("content".to_string(), string_value("hello world"));
        payload.insert(
            "tags".to_string(),
            Value {
                kind: Some(Kind::ListValue(ListValue {
                    values: vec![string_value("a"), string_value("b")],
                })),
            },
        );
        payload.insert(
            "isFavorite".to_string(),
            Value {
                kind: Some(Kind::BoolValue(true)),
            },
        );
        ScoredPoint {
            id: Some(PointId::from("1c6f6c85-49d9-41f4-9a00-3a82a3c6d2f1".to_string())),
            score: 0.87,
            payload,
            ..Default::default()
        }
    }

    #[test]
    fn test_point_id_str() {
        assert_eq!(
            point_id_str(&test_point()),
            "1c6f6c85-49d9-41f4-9a00-3a82a3c6d2f1"
        );
        assert_eq!(
            point_id_str(&ScoredPoint {
                id: Some(PointId::from(42u64)),
                ..Default::default()
            }),
            "42"
        );
    }

    #[test]
    fn test_payload_getters() {
        let point = test_point();
        assert_eq!(payload_str(&point, "content"), "hello world");
        assert_eq!(payload_str(&point, "missing"), "");
        assert_eq!(payload_str_list(&point, "tags"), vec!["a", "b"]);
        assert!(payload_str_list(&point, "content").is_empty());
        assert!(payload_bool(&point, "isFavorite"));
        assert!(!payload_bool(&point, "missing"));
    }

    #[test]
    fn test_group_id_str() {
        assert_eq!(
            group_id_str(GroupId {
                kind: Some(group_id::Kind::StringValue("text".into()))
            }),
            "text"
        );
        assert_eq!(
            group_id_str(GroupId {
                kind: Some(group_id::Kind::IntegerValue(-3))
            }),
            "-3"
        );
    }
}
