//! Reading and writing values inside a JSON tree by [`Path`].
//!
//! Lookups never fail: a missing intermediate simply yields `None`. Writes
//! create whatever intermediate objects they need.

use crate::path::{Path, Segment};
use serde_json::{Map, Value};

/// Returns the value at `path`, or `None` as soon as an intermediate is
/// missing. The root path returns `root` itself.
pub fn find<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step(current, segment)?;
    }

    Some(current)
}

pub fn find_mut<'a>(root: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step_mut(current, segment)?;
    }

    Some(current)
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Array(items), Segment::Index(i)) => items.get(*i),
        (Value::Object(map), _) => map.get(segment.as_key().as_ref()),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (value, segment) {
        (Value::Array(items), Segment::Index(i)) => items.get_mut(*i),
        (Value::Object(map), _) => map.get_mut(segment.as_key().as_ref()),
        _ => None,
    }
}

/// Writes `value` at `path`.
///
/// When the parent does not exist yet, it is synthesized as `{ name: value }`
/// and that object is written at the parent path in turn, so intermediate
/// containers are built lazily on first write. Index segments under a
/// synthesized parent produce objects with integer keys, which
/// [`arrayify`][`crate::flatten::arrayify`] later turns into arrays.
pub fn put(root: &mut Value, path: &Path, value: Value) {
    let (parent_path, segment) = match (path.parent(), path.last()) {
        (Some(parent), Some(segment)) => (parent, segment.clone()),
        _ => {
            *root = value;
            return;
        }
    };

    match find_mut(root, &parent_path) {
        Some(parent) if parent.is_object() || parent.is_array() => {
            insert(parent, &segment, value)
        }
        Some(parent) => {
            // A scalar is in the way; the write wins.
            let mut map = Map::new();
            map.insert(segment.as_key().into_owned(), value);
            *parent = Value::Object(map);
        }
        None => {
            let mut map = Map::new();
            map.insert(segment.as_key().into_owned(), value);
            put(root, &parent_path, Value::Object(map));
        }
    }
}

fn insert(parent: &mut Value, segment: &Segment, value: Value) {
    if let (Value::Array(items), Segment::Index(i)) = (&mut *parent, segment) {
        if *i < items.len() {
            items[*i] = value;
            return;
        }
        if *i == items.len() {
            items.push(value);
            return;
        }
    }

    if let Value::Array(items) = parent {
        // Naming a property of an array, or an index past its end, turns it
        // into an object keyed by the row indices.
        let map: Map<String, Value> = std::mem::take(items)
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect();
        *parent = Value::Object(map);
    }

    if let Value::Object(map) = parent {
        map.insert(segment.as_key().into_owned(), value);
    }
}

/// Removes and returns the value at `path`. Removing something that is not
/// there is not an error.
pub fn delete(root: &mut Value, path: &Path) -> Option<Value> {
    let parent_path = path.parent()?;
    let segment = path.last()?;

    match (find_mut(root, &parent_path)?, segment) {
        (Value::Array(items), Segment::Index(i)) if *i < items.len() => Some(items.remove(*i)),
        (Value::Object(map), _) => map.remove(segment.as_key().as_ref()),
        _ => None,
    }
}

/// Moves the value at `path` to the sibling key `new_name` and returns the
/// new path. The value is moved, not copied, so nested content is kept as
/// is. Returns `None` when nothing lives at `path`.
pub fn rename(root: &mut Value, path: &Path, new_name: &str) -> Option<Path> {
    let new_path = path.with_name(new_name);
    if new_path == *path {
        return find(root, path).map(|_| new_path);
    }

    let value = delete(root, path)?;
    put(root, &new_path, value);
    Some(new_path)
}

/// Expands a schema path (no row segments) into the concrete paths of every
/// value in `root` it describes, descending into each array element.
pub fn instances(root: &Value, schema_path: &Path) -> Vec<Path> {
    let mut found = Vec::new();
    collect_instances(root, Path::root(), schema_path.segments(), &mut found);
    found
}

fn collect_instances(value: &Value, at: Path, rest: &[Segment], found: &mut Vec<Path>) {
    if let Value::Array(items) = value {
        if !rest.is_empty() {
            for (i, item) in items.iter().enumerate() {
                collect_instances(item, at.join(Segment::Index(i)), rest, found);
            }
            return;
        }
    }

    let (segment, rest) = match rest.split_first() {
        Some(split) => split,
        None => {
            found.push(at);
            return;
        }
    };

    if let Some(next) = step(value, segment) {
        collect_instances(next, at.join(segment.clone()), rest, found);
    }
}
