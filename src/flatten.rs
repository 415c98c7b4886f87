//! Conversions between nested JSON and flat `dotted.path -> value` maps.

use crate::path::{is_canonical_index, SEPARATOR};
use serde_json::{Map, Value};

/// Flattens nested objects into a map of dotted paths to leaf values.
///
/// Only objects are descended into; arrays and scalars are leaves. Empty
/// objects are kept as leaves too, so that they survive [`unflatten`].
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut flat = Map::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut flat);
    }

    flat
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, flat: &mut Map<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, SEPARATOR, key)
        };

        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &path, flat),
            _ => {
                flat.insert(path, value.clone());
            }
        }
    }
}

/// Rebuilds nested objects from a flat map produced by [`flatten`] (or
/// collected from form fields).
///
/// When a key's intermediate path runs into a scalar written by an earlier
/// key, the scalar is replaced: the last write wins.
pub fn unflatten(flat: &Map<String, Value>) -> Value {
    let mut root = Map::new();

    for (key, value) in flat {
        let mut segments: Vec<&str> = key.split(SEPARATOR).collect();
        let last = match segments.pop() {
            Some(last) => last,
            None => continue,
        };

        let mut parent = &mut root;
        for segment in segments {
            let slot = parent
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }

            parent = match slot {
                Value::Object(inner) => inner,
                _ => unreachable!("slot was just made an object"),
            };
        }

        parent.insert(last.to_owned(), value.clone());
    }

    Value::Object(root)
}

/// Turns every non-empty object whose keys are all non-negative integers
/// written without leading zeros into an array ordered by numeric key, recursing into nested objects and
/// arrays. Empty objects stay objects.
pub fn arrayify(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if !map.is_empty() && map.keys().all(|key| is_index(key)) {
                let mut rows: Vec<(u64, Value)> = map
                    .into_iter()
                    .filter_map(|(key, value)| key.parse().ok().map(|i| (i, value)))
                    .collect();
                rows.sort_by_key(|(i, _)| *i);

                Value::Array(rows.into_iter().map(|(_, value)| arrayify(value)).collect())
            } else {
                Value::Object(
                    map.into_iter()
                        .map(|(key, value)| (key, arrayify(value)))
                        .collect(),
                )
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(arrayify).collect()),
        value => value,
    }
}

fn is_index(key: &str) -> bool {
    is_canonical_index(key) && key.parse::<u64>().is_ok()
}
