//! Normalising raw search results into flat product records.

use aisle_memory::{Metadata, MetadataValue};
use serde_json::{Map, Value};

/// Search-result fields that carry no product knowledge.
pub const DROPPED_FIELDS: [&str; 5] = [
    "position",
    "thumbnails",
    "serpapi_link",
    "collection",
    "variants",
];

/// Stand-in for values the store cannot hold. Lossy: a real `"none"` string
/// and a missing value become indistinguishable.
pub const NONE_VALUE: &str = "none";

const LIST_SEPARATOR: &str = "-";
const KEY_SEPARATOR: &str = ".";

/// One search hit, flattened for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// Display name, used as the indexed text
    pub title: String,

    /// Every remaining field, `title` included
    pub metadata: Metadata,
}

impl ProductRecord {
    /// Flatten a raw product object. Returns `None` when it has no usable title.
    pub fn from_json(product: &Map<String, Value>) -> Option<Self> {
        let mut metadata = Metadata::new();
        for (key, value) in product {
            if DROPPED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            flatten_into(&mut metadata, key.clone(), value);
        }

        let title = match metadata.get("title")? {
            MetadataValue::Text(t) if t.trim().is_empty() => return None,
            MetadataValue::Text(t) if t == NONE_VALUE => return None,
            other => other.to_string(),
        };

        Some(Self { title, metadata })
    }
}

fn flatten_into(out: &mut Metadata, key: String, value: &Value) {
    match value {
        Value::Object(fields) if !fields.is_empty() => {
            for (child, v) in fields {
                flatten_into(out, format!("{key}{KEY_SEPARATOR}{child}"), v);
            }
        }
        other => {
            out.insert(key, scalar(other));
        }
    }
}

fn scalar(value: &Value) -> MetadataValue {
    match value {
        Value::String(s) => MetadataValue::Text(s.clone()),
        Value::Bool(b) => MetadataValue::Text(b.to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => MetadataValue::Integer(i),
            None => MetadataValue::Float(n.as_f64().unwrap_or_default()),
        },
        Value::Array(items) => MetadataValue::Text(
            items
                .iter()
                .map(list_element)
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
        ),
        Value::Null | Value::Object(_) => MetadataValue::Text(NONE_VALUE.to_string()),
    }
}

fn list_element(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => NONE_VALUE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Option<ProductRecord> {
        match value {
            Value::Object(map) => ProductRecord::from_json(&map),
            _ => None,
        }
    }

    #[test]
    fn flattens_a_search_hit() {
        let r = record(json!({
            "position": 1,
            "product_id": 312345678,
            "title": "20V MAX Cordless Drill",
            "thumbnails": [["a.jpg"]],
            "link": "https://www.homedepot.com/p/312345678",
            "brand": "DEWALT",
            "rating": 4.7,
            "badges": ["Best Seller", "Exclusive"],
            "pickup": {"free_ship_to_store": true, "quantity": 12},
            "delivery": {"free": false},
            "model_number": null,
            "serpapi_link": "https://serpapi.com/...",
        }))
        .unwrap();

        assert_eq!(r.title, "20V MAX Cordless Drill");
        let m = &r.metadata;
        assert!(!m.contains_key("position"));
        assert!(!m.contains_key("thumbnails"));
        assert!(!m.contains_key("serpapi_link"));
        assert_eq!(m["product_id"], MetadataValue::Integer(312345678));
        assert_eq!(m["rating"], MetadataValue::Float(4.7));
        assert_eq!(m["badges"].to_string(), "Best Seller-Exclusive");
        assert_eq!(m["pickup.free_ship_to_store"].to_string(), "true");
        assert_eq!(m["pickup.quantity"], MetadataValue::Integer(12));
        assert_eq!(m["delivery.free"].to_string(), "false");
        assert_eq!(m["model_number"].to_string(), "none");
        assert_eq!(m["title"].to_string(), "20V MAX Cordless Drill");
    }

    #[test]
    fn deeply_nested_objects_use_dotted_keys() {
        let r = record(json!({"title": "Hammer", "a": {"b": {"c": 1}}})).unwrap();
        assert_eq!(r.metadata["a.b.c"], MetadataValue::Integer(1));
    }

    #[test]
    fn mixed_lists_stringify_elements() {
        let r =
            record(json!({"title": "Saw", "sizes": [7, "8 in", true, null, {"x": 1}]})).unwrap();
        assert_eq!(r.metadata["sizes"].to_string(), "7-8 in-true-none-none");
    }

    #[test]
    fn empty_object_becomes_none() {
        let r = record(json!({"title": "Level", "extras": {}})).unwrap();
        assert_eq!(r.metadata["extras"].to_string(), "none");
    }

    #[test]
    fn missing_or_null_title_is_rejected() {
        assert!(record(json!({"brand": "RYOBI"})).is_none());
        assert!(record(json!({"title": null})).is_none());
        assert!(record(json!({"title": "  "})).is_none());
    }
}
