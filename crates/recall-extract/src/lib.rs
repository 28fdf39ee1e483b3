//! # Recall Extract
//!
//! Stateless entity extraction over free text. A fixed, ordered list of
//! typed patterns is scanned in sequence; matches are deduplicated on
//! `(type, value)` with first-seen order preserved, so output is fully
//! deterministic for a given input.
//!
//! Matches from different patterns may overlap in the source text (a URL
//! path also looks like a file path); that overlap is accepted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// A typed entity found in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// Pattern priority is part of the contract: earlier patterns claim their
/// position in the output first.
static ENTITY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("url", r#"https?://[^\s<>"{}|\\^`\[\]]+"#),
        ("email", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
        ("phone", r"(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}"),
        ("ip_address", r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"),
        (
            "money",
            r"(?i)\$[\d,]+(?:\.\d{2})?|\b(?:USD|EUR|GBP)\s*[\d,]+(?:\.\d{2})?",
        ),
        (
            "date",
            r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b|\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b",
        ),
        ("file_path", r"(?:/[\w.-]+){2,}|[A-Z]:\\(?:[\w.-]+\\?)+"),
        (
            "code_keyword",
            r"(?i)\b(?:function|class|def|import|export|const|let|var|struct|enum|protocol)\s+\w+",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("entity pattern")))
    .collect()
});

/// Extract all entities from `text`, deduplicated, in pattern-priority then
/// left-to-right order. Pure function: same input, same output.
pub fn extract(text: &str) -> Vec<Entity> {
    let mut seen: HashSet<(&'static str, String)> = HashSet::new();
    let mut out = Vec::new();
    for (kind, pattern) in ENTITY_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let value = clean_value(kind, m.as_str());
            if value.is_empty() {
                continue;
            }
            if seen.insert((*kind, value.clone())) {
                out.push(Entity {
                    kind: (*kind).to_string(),
                    value,
                });
            }
        }
    }
    out
}

/// Sentence punctuation glued to the end of a URL is not part of it.
fn clean_value(kind: &str, raw: &str) -> String {
    let trimmed = raw.trim();
    if kind == "url" {
        trimmed.trim_end_matches(['.', ',', ';', ':']).to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.kind.as_str()).collect()
    }

    #[test]
    fn test_mixed_content_scenario() {
        let text = "Contact me at alice@example.com or https://example.com, paid $42.50 on 2024-01-05";
        let entities = extract(text);
        assert_eq!(entities.len(), 4);
        assert_eq!(kinds(&entities), vec!["url", "email", "money", "date"]);
        assert_eq!(entities[0].value, "https://example.com");
        assert_eq!(entities[1].value, "alice@example.com");
        assert_eq!(entities[2].value, "$42.50");
        assert_eq!(entities[3].value, "2024-01-05");
    }

    #[test]
    fn test_no_duplicates() {
        let text = "ping alice@example.com and alice@example.com again";
        let entities = extract(text);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].value, "alice@example.com");
    }

    #[test]
    fn test_idempotent() {
        let text = "10.0.0.1 served https://recall.sh/docs at $1,200.00";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn test_left_to_right_within_pattern() {
        let entities = extract("first bob@a.com then carol@b.org");
        assert_eq!(entities[0].value, "bob@a.com");
        assert_eq!(entities[1].value, "carol@b.org");
    }

    #[test]
    fn test_phone_and_ip() {
        let entities = extract("call (555) 867-5309 from 192.168.1.10");
        assert!(entities.iter().any(|e| e.kind == "phone"));
        assert!(
            entities
                .iter()
                .any(|e| e.kind == "ip_address" && e.value == "192.168.1.10")
        );
    }

    #[test]
    fn test_code_keyword_and_path() {
        let entities = extract("see fn in /usr/local/bin/tool and struct Config");
        assert!(
            entities
                .iter()
                .any(|e| e.kind == "file_path" && e.value == "/usr/local/bin/tool")
        );
        assert!(
            entities
                .iter()
                .any(|e| e.kind == "code_keyword" && e.value == "struct Config")
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(extract("").is_empty());
        assert!(extract("plain words only").is_empty());
    }

    #[test]
    fn test_wire_shape() {
        let entities = extract("mail root@host.example");
        let json = serde_json::to_value(&entities).unwrap();
        assert_eq!(json[0]["type"], "email");
        assert_eq!(json[0]["value"], "root@host.example");
    }
}
