//! Result merge layer
//!
//! Adds or overwrites exactly one key of an item's metadata map. Keys written
//! by other subsystems are never dropped.

use serde_json::Value;

use crate::models::ItemMetadata;

/// Message metadata key owned by avatar animation
pub const ANIMATED_VIDEO_URL_KEY: &str = "animatedVideoUrl";

/// Merge `key = value` into a copy of `existing`
///
/// An absent map is treated as empty. The input is not modified, and applying
/// the same merge twice gives the same map as applying it once.
pub fn merge(existing: Option<&ItemMetadata>, key: &str, value: Value) -> ItemMetadata {
    let mut merged = existing.cloned().unwrap_or_default();
    merged.insert(key.to_string(), value);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ItemMetadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_adds_key_keeps_others() {
        let existing = map(json!({"a": 1, "b": 2}));
        let merged = merge(Some(&existing), "c", json!(3));
        assert_eq!(merged, map(json!({"a": 1, "b": 2, "c": 3})));
    }

    #[test]
    fn test_merge_overwrites_only_its_key() {
        let existing = map(json!({"a": 1, "b": 2}));
        let merged = merge(Some(&existing), "a", json!(9));
        assert_eq!(merged, map(json!({"a": 9, "b": 2})));
        // Caller's map is untouched
        assert_eq!(existing, map(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_merge_absent_map() {
        let merged = merge(None, ANIMATED_VIDEO_URL_KEY, json!("https://out/v.mp4"));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[ANIMATED_VIDEO_URL_KEY], json!("https://out/v.mp4"));
    }

    #[test]
    fn test_merge_idempotent() {
        let existing = map(json!({"speakerId": "s1"}));
        let once = merge(Some(&existing), "k", json!("v"));
        let twice = merge(Some(&once), "k", json!("v"));
        assert_eq!(once, twice);
    }
}
