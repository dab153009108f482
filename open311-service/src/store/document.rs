//! Document representation and field access helpers

use std::cmp::Ordering;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::ids::new_document_id;

/// A stored record: a JSON object keyed by field name
pub type Document = Map<String, Value>;

/// Unique identifier field carried by every document
pub const ID_FIELD: &str = "_id";

/// Timestamp stamped by the store on first insert
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Timestamp stamped by the store on every write
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Fields the store maintains itself; clients never write them directly
pub const MANAGED_FIELDS: &[&str] = &[ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// Returns the document's `_id` when it is a string
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

/// Resolve a dotted path (`reporter.phone`) against a document
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Whether a value counts as present for required-field checks
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Rank used to order values of different JSON types
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over optional JSON values
///
/// Missing values sort with `null`, below everything else. Values of
/// different types are ordered by type; numbers compare numerically and
/// strings lexicographically.
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.unwrap_or(&Value::Null);
    let right = right.unwrap_or(&Value::Null);

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_values(Some(x), Some(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            // Stable but shallow: compare serialized forms
            Value::Object(a.clone())
                .to_string()
                .cmp(&Value::Object(b.clone()).to_string())
        }
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

/// Equality used by filters: numbers compare by value (1 == 1.0)
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => {
            compare_values(Some(left), Some(right)) == Ordering::Equal
        }
        _ => left == right,
    }
}

/// Current time as the RFC 3339 string stored in timestamp fields
pub fn timestamp_now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Assign an `_id` if missing and stamp both timestamps for a new document
pub(crate) fn prepare_insert(mut document: Document) -> Document {
    if document_id(&document).is_none() {
        document.insert(ID_FIELD.to_string(), Value::String(new_document_id()));
    }
    let now = timestamp_now();
    document
        .entry(CREATED_AT_FIELD.to_string())
        .or_insert_with(|| now.clone());
    document.insert(UPDATED_AT_FIELD.to_string(), now);
    document
}

/// Carry `createdAt` over from the stored version and refresh `updatedAt`
pub(crate) fn prepare_save(mut document: Document, stored: &Document) -> Document {
    match stored.get(CREATED_AT_FIELD) {
        Some(created) => {
            document.insert(CREATED_AT_FIELD.to_string(), created.clone());
        }
        None => {
            document.remove(CREATED_AT_FIELD);
        }
    }
    document.insert(UPDATED_AT_FIELD.to_string(), timestamp_now());
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lookup_nested_paths() {
        let d = doc(json!({
            "_id": "r1",
            "reporter": { "name": "Asha", "phone": "255714000000" },
            "attachments": [{ "name": "photo.png" }]
        }));
        assert_eq!(lookup(&d, "reporter.phone"), Some(&json!("255714000000")));
        assert_eq!(lookup(&d, "attachments.0.name"), Some(&json!("photo.png")));
        assert_eq!(lookup(&d, "reporter.email"), None);
        assert_eq!(lookup(&d, "_id.x"), None);
        assert_eq!(document_id(&d), Some("r1"));
    }

    #[test]
    fn test_is_present() {
        assert!(!is_present(None));
        assert!(!is_present(Some(&Value::Null)));
        assert!(!is_present(Some(&json!("  "))));
        assert!(is_present(Some(&json!(0))));
        assert!(is_present(Some(&json!("Open"))));
    }

    #[test]
    fn test_compare_values_mixed_types() {
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!("1"))), Ordering::Less);
    }

    #[test]
    fn test_prepare_insert_assigns_id_and_timestamps() {
        let prepared = prepare_insert(doc(json!({ "name": "Open" })));
        assert!(document_id(&prepared).is_some());
        assert!(prepared.contains_key(CREATED_AT_FIELD));
        assert_eq!(prepared.get(CREATED_AT_FIELD), prepared.get(UPDATED_AT_FIELD));

        let kept = prepare_insert(doc(json!({ "_id": "fixed" })));
        assert_eq!(document_id(&kept), Some("fixed"));
    }

    #[test]
    fn test_prepare_save_preserves_created_at() {
        let stored = doc(json!({ "_id": "a", "createdAt": "2019-01-01T00:00:00.000Z" }));
        let saved = prepare_save(
            doc(json!({ "_id": "a", "createdAt": "1970-01-01T00:00:00.000Z" })),
            &stored,
        );
        assert_eq!(saved.get(CREATED_AT_FIELD), Some(&json!("2019-01-01T00:00:00.000Z")));
        assert!(saved.contains_key(UPDATED_AT_FIELD));
    }

    #[test]
    fn test_values_equal_numeric() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!("1")));
    }
}
