//! Metadata fallback transcript.
//!
//! Built only from what is already known about the item, so this stage
//! cannot fail.

use serde_json::Value;

use crate::models::ContentItem;

pub const FALLBACK_NOTICE: &str = "Transcript is unavailable for this content";

/// Metadata keys that describe processing, not the content itself.
const SKIPPED_KEYS: [&str; 1] = ["transcript_source"];

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

/// Transcript-shaped text for an item with no obtainable transcript.
pub fn metadata_transcript(item: &ContentItem) -> String {
    let mut lines = vec![
        format!("{}.", FALLBACK_NOTICE),
        String::new(),
        format!("Title: {}", item.title),
    ];

    if let Some(url) = item.source_url.as_deref().or(item.file_path.as_deref()) {
        lines.push(format!("Source: {}", url));
    }

    if let Value::Object(map) = &item.metadata {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            if SKIPPED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(text) = map.get(key).and_then(scalar_text) {
                lines.push(format!("{}: {}", key, text));
            }
        }
    }

    lines.push(String::new());
    lines.push(
        "Only the details above are known. Any content inferred beyond them must be \
explicitly marked as an assumption."
            .to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_uses_title_url_and_metadata() {
        let mut item = ContentItem::youtube("c1", "u1", "Intro to Optics", "https://youtu.be/abcdefghijk");
        item.metadata = serde_json::json!({
            "channel": "Physics Dept",
            "tags": ["light", "lenses"],
            "transcript_source": "fallback",
            "nested": {"ignored": true}
        });

        let text = metadata_transcript(&item);
        assert!(text.starts_with(FALLBACK_NOTICE));
        assert!(text.contains("Title: Intro to Optics"));
        assert!(text.contains("Source: https://youtu.be/abcdefghijk"));
        assert!(text.contains("channel: Physics Dept"));
        assert!(text.contains("tags: light, lenses"));
        assert!(!text.contains("transcript_source"));
        assert!(!text.contains("ignored"));
        assert!(text.contains("assumption"));
    }
}
