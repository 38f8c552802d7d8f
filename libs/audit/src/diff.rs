//! Top-level field diffing between two JSON snapshots.

use std::collections::BTreeSet;

use serde_json::Value;

/// Returns the sorted names of top-level fields that differ between two
/// object snapshots.
///
/// A field present on one side only counts as changed. Non-object inputs are
/// compared as a whole and reported under the empty field name.
pub fn changed_fields(before: &Value, after: &Value) -> Vec<String> {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let keys: BTreeSet<&String> = b.keys().chain(a.keys()).collect();
            keys.into_iter()
                .filter(|k| b.get(*k) != a.get(*k))
                .cloned()
                .collect()
        }
        (b, a) if b == a => Vec::new(),
        _ => vec![String::new()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_changes() {
        let doc = json!({"name": "cloud1", "podLoadTolerance": 20});
        assert!(changed_fields(&doc, &doc).is_empty());
    }

    #[test]
    fn test_changed_added_and_removed_fields() {
        let before = json!({"name": "cloud1", "podLoadTolerance": 20, "old": true});
        let after = json!({"name": "cloud1", "podLoadTolerance": 0, "new": 1});
        assert_eq!(
            changed_fields(&before, &after),
            vec!["new".to_string(), "old".to_string(), "podLoadTolerance".to_string()]
        );
    }

    #[test]
    fn test_nested_change_reports_top_level_field() {
        let before = json!({"products": [{"name": "vENM", "loadValue": 15}]});
        let after = json!({"products": [{"name": "vENM", "loadValue": 10}]});
        assert_eq!(changed_fields(&before, &after), vec!["products".to_string()]);
    }
}
