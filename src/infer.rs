use crate::types::{classify, Type};
use serde_json::{json, Map, Value};

/// Guesses a structural schema from sample data.
///
/// For an object, every key gets a `{ "type": ... }` entry; arrays and
/// objects additionally get a nested `"schema"`. Arrays are assumed to be
/// homogeneous, so only their first element is inspected. A scalar yields
/// a bare `{ "type": ... }`, which is the shape used for single-column
/// arrays; an array sample yields `{ "type": "array", "schema": ... }` so
/// lists of lists keep their element shape at every depth.
///
/// ```
/// use serde_json::json;
///
/// assert_eq!(
///     json!({
///         "age": { "type": "number" },
///         "hobbies": { "type": "array", "schema": { "type": "string" } },
///     }),
///     json_edit::infer(&json!({ "age": 19, "hobbies": ["piano", "blogging"] })),
/// );
/// ```
pub fn infer(sample: &Value) -> Value {
    match sample {
        Value::Object(obj) => {
            let mut schema = Map::new();
            infer_into(obj, &mut schema, "");
            Value::Object(schema)
        }
        Value::Array(items) => json!({
            "schema": infer_element(items.first()),
            "type": Type::Array,
        }),
        _ => json!({ "type": classify(Some(sample)) }),
    }
}

/// Infers the entries of `obj` into `schema`, storing each under
/// `prefix + key`.
pub fn infer_into(obj: &Map<String, Value>, schema: &mut Map<String, Value>, prefix: &str) {
    for (k, v) in obj {
        let type_ = classify(Some(v));
        let entry = match (type_, v) {
            (Type::Array, Value::Array(items)) => json!({
                "schema": infer_element(items.first()),
                "type": type_,
            }),
            (Type::Object, _) => json!({
                "schema": infer(v),
                "type": type_,
            }),
            _ => json!({ "type": type_ }),
        };

        schema.insert(format!("{}{}", prefix, k), entry);
    }
}

// An empty array declares no element shape yet.
fn infer_element(first: Option<&Value>) -> Value {
    match first {
        Some(value) => infer(value),
        None => Value::Object(Map::new()),
    }
}
