//! Result formatting (spec.md §4.5): every cell that is a JSON-encoded
//! string gets recursively parsed, and any value found under the key
//! `"label"` collapses from a single-element array to its bare element.
//! Non-string scalars pass through unchanged.

use crate::storage::OrderedRow;
use crate::translator::label;
use serde_json::{Map, Value as Json};

pub fn format_rows(rows: Vec<OrderedRow>) -> Vec<Map<String, Json>> {
    rows.into_iter().map(format_row).collect()
}

fn format_row(row: OrderedRow) -> Map<String, Json> {
    let mut out = Map::new();
    for (key, value) in row {
        out.insert(key.clone(), format_cell(&key, value));
    }
    out
}

fn format_cell(key: &str, value: Json) -> Json {
    let value = match value {
        Json::String(s) => match serde_json::from_str::<Json>(&s) {
            Ok(parsed) if parsed.is_object() || parsed.is_array() => format_cell(key, parsed),
            _ => Json::String(s),
        },
        Json::Array(items) => Json::Array(
            items
                .into_iter()
                .map(|item| format_cell(key, item))
                .collect(),
        ),
        Json::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), format_cell(&k, v));
            }
            Json::Object(out)
        }
        other => other,
    };
    if key == "label" {
        label::normalize_label_value(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_json_strings() {
        let mut row = Map::new();
        row.insert(
            "n".to_string(),
            Json::String(r#"{"id":"x","label":["Person"],"properties":{"name":"A"}}"#.to_string()),
        );
        let formatted = format_row(row);
        let n = &formatted["n"];
        assert_eq!(n["label"], Json::String("Person".to_string()));
        assert_eq!(n["properties"]["name"], Json::String("A".to_string()));
    }

    #[test]
    fn scalars_pass_through() {
        let mut row = Map::new();
        row.insert("n_age".to_string(), Json::Number(42.into()));
        let formatted = format_row(row);
        assert_eq!(formatted["n_age"], Json::Number(42.into()));
    }

    #[test]
    fn multi_label_array_untouched() {
        let mut row = Map::new();
        row.insert(
            "label".to_string(),
            Json::Array(vec![Json::String("A".to_string()), Json::String("B".to_string())]),
        );
        let formatted = format_row(row);
        assert_eq!(
            formatted["label"],
            Json::Array(vec![Json::String("A".to_string()), Json::String("B".to_string())])
        );
    }
}
