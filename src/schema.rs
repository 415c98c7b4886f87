//! The normalized field-definition tree.
//!
//! Definitions live in an arena and are addressed by [`NodeId`]. Containers
//! keep their children in a name map plus an explicit order list; every
//! structural edit goes through [`Schema::insert_child`],
//! [`Schema::remove_child`] or [`Schema::rename_child`], which keep the two
//! in step.

use crate::options::Options;
use crate::path::{Path, Segment};
use crate::types::{classify, Type};
use jtd::{Schema as JtdSchema, Type as JtdType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Keys of a raw schema entry that map onto [`FieldDefinition`] attributes.
/// Anything else is carried along in [`FieldDefinition::extra`].
const KNOWN_KEYS: &[&str] = &[
    "type",
    "name",
    "path",
    "label",
    "schema",
    "possible",
    "data",
    "deletable",
    "editable",
    "addField",
    "addFields",
    "deletableFields",
    "editableFields",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Describes one addressable field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub type_: Type,

    /// Key in the parent container; empty for the root.
    pub name: String,

    /// Path through the schema from the root. Row segments are never part of
    /// it; rendered instances add them.
    pub path: Path,

    pub label: String,

    /// Closed set of allowed values.
    pub possible: Option<Vec<Value>>,

    pub deletable: Option<bool>,
    pub editable: Option<bool>,
    pub add_field: Option<bool>,

    /// Capabilities this container hands down to its children.
    pub add_fields: Option<bool>,
    pub deletable_fields: Option<bool>,
    pub editable_fields: Option<bool>,

    /// Inline value that takes precedence over the one found in data.
    pub data: Option<Value>,

    pub extra: Map<String, Value>,
}

impl FieldDefinition {
    fn from_raw(name: &str, path: Path, raw: &Map<String, Value>) -> Self {
        let possible = raw.get("possible").and_then(Value::as_array).cloned();

        let declared = raw.get("type").and_then(Value::as_str).and_then(|tag| {
            tag.parse::<Type>()
                .map_err(|err| warn!(%path, %err, "ignoring field type"))
                .ok()
        });

        let type_ = declared
            .or_else(|| {
                possible
                    .as_ref()
                    .and_then(|values| values.first())
                    .map(|first| classify(Some(first)))
            })
            .unwrap_or(Type::Undefined);

        let label = raw
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_owned();

        let extra = raw
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        FieldDefinition {
            type_,
            name: name.to_owned(),
            path,
            label,
            possible,
            deletable: flag(raw, "deletable"),
            editable: flag(raw, "editable"),
            add_field: flag(raw, "addField"),
            add_fields: flag(raw, "addFields"),
            deletable_fields: flag(raw, "deletableFields"),
            editable_fields: flag(raw, "editableFields"),
            data: raw.get("data").cloned(),
            extra,
        }
    }

    fn inherit(&mut self, from: Capabilities) {
        self.deletable = self.deletable.or(from.delete);
        self.editable = self.editable.or(from.edit);
        self.add_field = self.add_field.or(from.add);
        self.deletable_fields = self.deletable_fields.or(from.delete);
        self.editable_fields = self.editable_fields.or(from.edit);
        self.add_fields = self.add_fields.or(from.add);
    }

    fn to_json(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("type".to_owned(), Value::from(self.type_.as_str()));
        out.insert("name".to_owned(), Value::from(self.name.as_str()));
        out.insert("path".to_owned(), Value::from(self.path.to_string()));
        out.insert("label".to_owned(), Value::from(self.label.as_str()));

        if let Some(possible) = &self.possible {
            out.insert("possible".to_owned(), Value::Array(possible.clone()));
        }

        let flags = [
            ("deletable", self.deletable),
            ("editable", self.editable),
            ("addField", self.add_field),
            ("addFields", self.add_fields),
            ("deletableFields", self.deletable_fields),
            ("editableFields", self.editable_fields),
        ];
        for (key, value) in flags.iter() {
            if let Some(value) = value {
                out.insert((*key).to_owned(), Value::Bool(*value));
            }
        }

        if let Some(data) = &self.data {
            out.insert("data".to_owned(), data.clone());
        }

        for (k, v) in &self.extra {
            out.insert(k.clone(), v.clone());
        }

        out
    }
}

fn flag(raw: &Map<String, Value>, key: &str) -> Option<bool> {
    raw.get(key).and_then(Value::as_bool)
}

/// What a container lets its children do, unless they say otherwise.
#[derive(Debug, Clone, Copy, Default)]
struct Capabilities {
    add: Option<bool>,
    delete: Option<bool>,
    edit: Option<bool>,
}

impl Capabilities {
    fn of(def: &FieldDefinition) -> Self {
        Capabilities {
            add: def.add_fields,
            delete: def.deletable_fields,
            edit: def.editable_fields,
        }
    }
}

/// How a definition holds other definitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// An elementary field.
    Leaf,

    /// An object, or an array of records. `order` is a permutation of the
    /// keys of `children`.
    Fields {
        children: BTreeMap<String, NodeId>,
        order: Vec<String>,
    },

    /// A homogeneous single-column array. The element shares the array's
    /// path: it does not consume a path segment.
    Single(NodeId),
}

#[derive(Debug, Clone)]
struct Node {
    definition: FieldDefinition,
    parent: Option<NodeId>,
    shape: Shape,
}

#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    order_property: String,
    default_array_field_name: String,
    default_array_field_label: String,
}

impl Schema {
    /// Normalizes a merged schema map: every entry gets its `name`, `path` and
    /// `label`, containers get an order list, and capability flags flow from
    /// containers to their children.
    pub fn build(map: &Value, options: &Options) -> Self {
        let root_definition = FieldDefinition::from_raw("", Path::root(), &Map::new());
        let mut schema = Schema {
            nodes: vec![Some(Node {
                definition: FieldDefinition {
                    type_: Type::Object,
                    ..root_definition
                },
                parent: None,
                shape: Shape::Leaf,
            })],
            root: NodeId(0),
            order_property: options.order_property.clone(),
            default_array_field_name: options.default_array_field_name.clone(),
            default_array_field_label: options.default_array_field_label.clone(),
        };

        let empty = Map::new();
        let entries = map.as_object().unwrap_or(&empty);
        let shape = schema.build_fields(schema.root, entries, &Path::root(), Capabilities::default());
        schema.set_shape(schema.root, shape);
        schema
    }

    fn build_fields(
        &mut self,
        parent: NodeId,
        entries: &Map<String, Value>,
        prefix: &Path,
        inherited: Capabilities,
    ) -> Shape {
        let mut children = BTreeMap::new();
        let mut declared = Vec::new();

        for (k, raw) in entries {
            if *k == self.order_property {
                continue;
            }

            let raw = match raw.as_object() {
                Some(raw) => raw,
                None => {
                    warn!(path = %prefix.child(k), "skipping schema entry that is not an object");
                    continue;
                }
            };

            let id = self.build_node(Some(parent), k, raw, prefix.child(k), inherited);
            children.insert(k.clone(), id);
            declared.push(k.clone());
        }

        let order = reconcile_order(entries.get(&self.order_property), declared);
        Shape::Fields { children, order }
    }

    fn build_node(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        raw: &Map<String, Value>,
        path: Path,
        inherited: Capabilities,
    ) -> NodeId {
        let mut definition = FieldDefinition::from_raw(name, path.clone(), raw);
        definition.inherit(inherited);
        let capabilities = Capabilities::of(&definition);
        let type_ = definition.type_;

        let id = self.alloc(Node {
            definition,
            parent,
            shape: Shape::Leaf,
        });

        let empty = Map::new();
        let nested = raw.get("schema").and_then(Value::as_object).unwrap_or(&empty);

        let shape = match type_ {
            Type::Object => self.build_fields(id, nested, &path, capabilities),
            Type::Array if is_single_shape(nested) => {
                let element_name = nested
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(self.default_array_field_name.as_str())
                    .to_owned();

                let mut element_raw = nested.clone();
                element_raw
                    .entry("label")
                    .or_insert_with(|| Value::from(self.default_array_field_label.as_str()));

                let element =
                    self.build_node(Some(id), &element_name, &element_raw, path, capabilities);
                Shape::Single(element)
            }
            Type::Array => self.build_fields(id, nested, &path, capabilities),
            _ => Shape::Leaf,
        };

        self.set_shape(id, shape);
        id
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn set_shape(&mut self, id: NodeId, shape: Shape) {
        if let Some(node) = self.node_mut(id) {
            node.shape = shape;
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn order_property(&self) -> &str {
        &self.order_property
    }

    pub fn get(&self, id: NodeId) -> Option<&FieldDefinition> {
        self.node(id).map(|node| &node.definition)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut FieldDefinition> {
        self.node_mut(id).map(|node| &mut node.definition)
    }

    pub fn shape(&self, id: NodeId) -> Option<&Shape> {
        self.node(id).map(|node| &node.shape)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Number of live definitions, the root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// The children of a container in display order. Single-column arrays
    /// and leaves have none.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.shape(id) {
            Some(Shape::Fields { children, order }) => order
                .iter()
                .filter_map(|name| children.get(name).copied())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn order(&self, id: NodeId) -> Option<&[String]> {
        match self.shape(id) {
            Some(Shape::Fields { order, .. }) => Some(order),
            _ => None,
        }
    }

    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match self.shape(id) {
            Some(Shape::Fields { children, .. }) => children.get(name).copied(),
            _ => None,
        }
    }

    /// The element definition of a single-column array.
    pub fn element(&self, id: NodeId) -> Option<NodeId> {
        match self.shape(id) {
            Some(Shape::Single(element)) => Some(*element),
            _ => None,
        }
    }

    /// Finds the definition describing whatever lives at `path`.
    ///
    /// Row segments (indices and `+`) are ignored, and single-column array
    /// shorthand is stepped through without consuming a segment, so
    /// `a.b.0.c` and `a.b.c` resolve to the same definition. A path that
    /// does not exist resolves to `None`.
    pub fn resolve(&self, path: &Path) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path.schema_path().segments() {
            while let Some(element) = self.element(current) {
                current = element;
            }

            current = match segment {
                Segment::Name(name) => self.child(current, name)?,
                _ => return None,
            };
        }

        trace!(%path, found = ?current, "resolved definition");
        Some(current)
    }

    pub fn definition_at(&self, path: &Path) -> Option<&FieldDefinition> {
        self.resolve(path).and_then(|id| self.get(id))
    }

    /// Normalizes `raw` as a new child `name` of `parent` and splices it into
    /// the order list at `position` (or at the end).
    ///
    /// Returns `None`, changing nothing, when `parent` does not hold named
    /// fields or already has a child called `name`.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: &str,
        raw: &Value,
        position: Option<usize>,
    ) -> Option<NodeId> {
        if self.child(parent, name).is_some() || name == self.order_property {
            return None;
        }
        if !matches!(self.shape(parent), Some(Shape::Fields { .. })) {
            return None;
        }

        let parent_definition = self.get(parent)?;
        let path = parent_definition.path.child(name);
        let capabilities = Capabilities::of(parent_definition);

        let empty = Map::new();
        let raw = raw.as_object().unwrap_or(&empty);
        let id = self.build_node(Some(parent), name, raw, path, capabilities);

        if let Some(Shape::Fields { children, order }) = self.node_mut(parent).map(|n| &mut n.shape) {
            children.insert(name.to_owned(), id);
            let at = position.unwrap_or(order.len()).min(order.len());
            order.insert(at, name.to_owned());
        }

        Some(id)
    }

    /// Removes the child `name` of `parent` together with its subtree.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> Option<FieldDefinition> {
        let id = match self.node_mut(parent).map(|n| &mut n.shape) {
            Some(Shape::Fields { children, order }) => {
                let id = children.remove(name)?;
                order.retain(|entry| entry != name);
                id
            }
            _ => return None,
        };

        self.free(id)
    }

    fn free(&mut self, id: NodeId) -> Option<FieldDefinition> {
        let node = self.nodes.get_mut(id.0)?.take()?;
        match &node.shape {
            Shape::Fields { children, .. } => {
                for child in children.values() {
                    self.free(*child);
                }
            }
            Shape::Single(element) => {
                self.free(*element);
            }
            Shape::Leaf => {}
        }

        Some(node.definition)
    }

    /// Renames the child `old` of `parent` to `new`, keeping its place in the
    /// order list and rewriting the paths of its whole subtree.
    ///
    /// Returns `false`, changing nothing, when `old` is missing or `new` is
    /// taken.
    pub fn rename_child(&mut self, parent: NodeId, old: &str, new: &str) -> bool {
        if old == new {
            return self.child(parent, old).is_some();
        }
        if self.child(parent, new).is_some() || new == self.order_property {
            return false;
        }

        let id = match self.node_mut(parent).map(|n| &mut n.shape) {
            Some(Shape::Fields { children, order }) => {
                let id = match children.remove(old) {
                    Some(id) => id,
                    None => return false,
                };
                children.insert(new.to_owned(), id);
                for entry in order.iter_mut().filter(|entry| entry.as_str() == old) {
                    *entry = new.to_owned();
                }
                id
            }
            _ => return false,
        };

        let new_path = match self.get_mut(id) {
            Some(definition) => {
                definition.name = new.to_owned();
                if definition.label == old {
                    definition.label = new.to_owned();
                }
                definition.path.with_name(new)
            }
            None => return false,
        };

        self.repath(id, new_path);
        true
    }

    fn repath(&mut self, id: NodeId, path: Path) {
        let shape = match self.node_mut(id) {
            Some(node) => {
                node.definition.path = path.clone();
                node.shape.clone()
            }
            None => return,
        };

        match shape {
            Shape::Fields { children, .. } => {
                for (name, child) in children {
                    self.repath(child, path.child(&name));
                }
            }
            Shape::Single(element) => self.repath(element, path),
            Shape::Leaf => {}
        }
    }

    /// Serializes the normalized schema back into the schema-map shape, with
    /// order lists under the order property.
    pub fn to_json(&self) -> Value {
        self.fields_to_json(self.root)
    }

    fn fields_to_json(&self, id: NodeId) -> Value {
        let mut out = Map::new();
        for child in self.children(id) {
            if let Some(definition) = self.get(child) {
                out.insert(definition.name.clone(), self.node_to_json(child));
            }
        }

        let order = self.order(id).unwrap_or_default();
        out.insert(
            self.order_property.clone(),
            Value::Array(order.iter().map(|name| Value::from(name.as_str())).collect()),
        );

        Value::Object(out)
    }

    fn node_to_json(&self, id: NodeId) -> Value {
        let mut out = match self.get(id) {
            Some(definition) => definition.to_json(),
            None => return Value::Null,
        };

        match self.shape(id) {
            Some(Shape::Fields { .. }) => {
                out.insert("schema".to_owned(), self.fields_to_json(id));
            }
            Some(Shape::Single(element)) => {
                out.insert("schema".to_owned(), self.node_to_json(*element));
            }
            _ => {}
        }

        Value::Object(out)
    }

    /// Exports the schema as a JSON Type Definition. Every field becomes a
    /// required property, since collected form data always carries it;
    /// labels travel in `metadata.label`.
    pub fn to_jtd(&self) -> JtdSchema {
        self.properties_to_jtd(self.root, BTreeMap::new())
    }

    fn properties_to_jtd(&self, id: NodeId, metadata: BTreeMap<String, Value>) -> JtdSchema {
        JtdSchema::Properties {
            definitions: Default::default(),
            metadata,
            nullable: false,
            properties: self
                .children(id)
                .into_iter()
                .filter_map(|child| {
                    self.get(child)
                        .map(|definition| (definition.name.clone(), self.node_to_jtd(child)))
                })
                .collect(),
            optional_properties: Default::default(),
            properties_is_present: true,
            additional_properties: false,
        }
    }

    fn node_to_jtd(&self, id: NodeId) -> JtdSchema {
        let definition = match self.get(id) {
            Some(definition) => definition,
            None => {
                return JtdSchema::Empty {
                    definitions: Default::default(),
                    metadata: Default::default(),
                }
            }
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("label".to_owned(), Value::from(definition.label.as_str()));

        if let Some(values) = definition.possible.as_ref().filter(|values| !values.is_empty()) {
            let strings: Option<_> = values
                .iter()
                .map(|value| value.as_str().map(str::to_owned))
                .collect();
            if let Some(enum_) = strings {
                return JtdSchema::Enum {
                    definitions: Default::default(),
                    metadata,
                    nullable: false,
                    enum_,
                };
            }
        }

        let type_ = match definition.type_ {
            Type::Boolean => JtdType::Boolean,
            Type::Number => JtdType::Float64,
            Type::String | Type::Regexp => JtdType::String,
            Type::Date => JtdType::Timestamp,
            Type::Object => return self.properties_to_jtd(id, metadata),
            Type::Array => {
                let elements = match self.shape(id) {
                    Some(Shape::Single(element)) => self.node_to_jtd(*element),
                    _ => self.properties_to_jtd(id, BTreeMap::new()),
                };

                return JtdSchema::Elements {
                    definitions: Default::default(),
                    metadata,
                    nullable: false,
                    elements: Box::new(elements),
                };
            }
            Type::Undefined | Type::Null | Type::Function | Type::Error => {
                return JtdSchema::Empty {
                    definitions: Default::default(),
                    metadata,
                }
            }
        };

        JtdSchema::Type {
            definitions: Default::default(),
            metadata,
            nullable: false,
            type_,
        }
    }
}

// A nested schema with a string `type` describes the single element of a
// homogeneous array rather than a set of columns.
fn is_single_shape(nested: &Map<String, Value>) -> bool {
    matches!(nested.get("type"), Some(Value::String(_)))
}

// Keeps the explicitly ordered names that exist, drops duplicates, and
// appends whatever the explicit list forgot in declaration order.
fn reconcile_order(explicit: Option<&Value>, declared: Vec<String>) -> Vec<String> {
    let explicit = match explicit.and_then(Value::as_array) {
        Some(explicit) => explicit,
        None => return declared,
    };

    let mut order: Vec<String> = Vec::with_capacity(declared.len());
    for name in explicit.iter().filter_map(Value::as_str) {
        if declared.iter().any(|d| d == name) && !order.iter().any(|o| o == name) {
            order.push(name.to_owned());
        }
    }

    for name in declared {
        if !order.contains(&name) {
            order.push(name);
        }
    }

    order
}
