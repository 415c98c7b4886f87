use serde_json::{Map, Value};

/// Deep-merges `overrides` into `inferred` and returns it.
///
/// Objects are merged key by key, creating empty entries in `inferred` where
/// needed. Anything else in `overrides` (scalars, arrays such as `possible`
/// or an order list) replaces the inferred value outright.
pub fn merge(inferred: &mut Value, overrides: Value) -> &mut Value {
    let overrides = match overrides {
        Value::Object(map) => map,
        other => {
            *inferred = other;
            return inferred;
        }
    };

    if !inferred.is_object() {
        *inferred = Value::Object(Map::new());
    }

    if let Value::Object(target) = inferred {
        for (k, v) in overrides {
            if v.is_object() {
                merge(target.entry(k).or_insert(Value::Null), v);
            } else {
                target.insert(k, v);
            }
        }
    }

    inferred
}
