//! Label storage discipline (spec.md §4.3.2): on write, the label column is
//! always a JSON array; on read, label membership is an `EXISTS (SELECT 1
//! FROM json_each(...))` per label, conjoined for multi-label filters.

use serde_json::Value as Json;

/// Encode a label list for a write (`CREATE`, `MERGE`, `SET n:Foo`). A single
/// label becomes `["Foo"]`.
pub fn encode_labels(labels: &[String]) -> Json {
    Json::Array(labels.iter().cloned().map(Json::String).collect())
}

/// Build one `EXISTS` fragment per label, to be AND-joined by the caller.
pub fn label_exists_fragments(alias: &str, labels: &[String]) -> Vec<(String, String)> {
    labels
        .iter()
        .map(|label| {
            (
                format!(
                    "EXISTS (SELECT 1 FROM json_each({alias}.label) WHERE value = ?)",
                    alias = alias
                ),
                label.clone(),
            )
        })
        .collect()
}

/// Normalize a label array for result formatting: a single-element array
/// collapses to the bare string, multi-element arrays pass through.
pub fn normalize_label_value(value: Json) -> Json {
    match value {
        Json::Array(items) if items.len() == 1 => items.into_iter().next().unwrap(),
        other => other,
    }
}

/// Union an existing label array with newly added labels, deduplicated,
/// preserving insertion order (spec.md §4.4.2, `SET v:L1:L2`).
pub fn union_labels(existing: &Json, new_labels: &[String]) -> Json {
    let mut out: Vec<String> = match existing {
        Json::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => Vec::new(),
    };
    for label in new_labels {
        if !out.contains(label) {
            out.push(label.clone());
        }
    }
    encode_labels(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_label_round_trips() {
        let encoded = encode_labels(&["Person".to_string()]);
        assert_eq!(encoded, Json::Array(vec![Json::String("Person".to_string())]));
        assert_eq!(
            normalize_label_value(encoded),
            Json::String("Person".to_string())
        );
    }

    #[test]
    fn multi_label_passes_through() {
        let encoded = encode_labels(&["A".to_string(), "B".to_string()]);
        assert_eq!(normalize_label_value(encoded.clone()), encoded);
    }

    #[test]
    fn union_dedupes_preserving_order() {
        let existing = encode_labels(&["A".to_string()]);
        let merged = union_labels(&existing, &["B".to_string(), "A".to_string()]);
        assert_eq!(
            merged,
            Json::Array(vec![Json::String("A".to_string()), Json::String("B".to_string())])
        );
    }
}
