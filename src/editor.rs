//! The editor: one schema, one data snapshot, and the fields rendered for
//! them.
//!
//! Rendered fields are addressed by concrete [`Path`]s, which carry row
//! indices and the `+` segment of new row editors. The schema is addressed by
//! the same paths with row segments dropped (see [`Schema::resolve`]).

use crate::error::{Error, Result};
use crate::flatten::{arrayify, unflatten};
use crate::infer::infer;
use crate::merge::merge;
use crate::options::{Messages, Options};
use crate::path::{Path, Segment};
use crate::render::Renderer;
use crate::rendered::{FieldId, Rendered, Row};
use crate::schema::{FieldDefinition, NodeId, Schema, Shape};
use crate::types::{classify, Type};
use crate::value;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// What [`Editor::get_data`] collects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataQuery {
    /// Only fields at or below this path are collected, and the result is
    /// relative to it.
    pub path: Path,

    /// Also collect the uncommitted input of new row editors.
    pub include_new_rows: bool,

    /// Also collect fields whose definition is currently being edited.
    pub include_fields_being_edited: bool,
}

impl DataQuery {
    pub fn at(path: Path) -> Self {
        DataQuery {
            path,
            ..Default::default()
        }
    }

    pub fn with_new_rows(mut self) -> Self {
        self.include_new_rows = true;
        self
    }
}

/// Changes to an existing field's definition. `None` leaves that attribute
/// alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldEdit {
    pub name: Option<String>,
    pub label: Option<String>,
    pub type_: Option<Type>,
}

pub struct Editor<R: Renderer> {
    options: Options,
    schema: Schema,
    data: Value,
    renderer: R,
    rendered: Rendered<R::Handle>,

    /// Schema paths of fields whose definition is open for editing.
    editing: Vec<Path>,

    initialized: bool,
}

impl<R: Renderer> Editor<R> {
    /// Builds an editor over `data`.
    ///
    /// The schema is inferred from `data`, `overrides` is merged over the
    /// inferred schema, and the result is normalized. Fields are rendered
    /// right away unless `options.auto_init` is off, in which case nothing
    /// is rendered until [`Editor::init_ui`].
    pub fn new(data: Value, overrides: Value, options: Options, renderer: R) -> Self {
        let mut map = infer(&data);
        merge(&mut map, overrides);
        let schema = Schema::build(&map, &options);
        debug!(fields = schema.len(), "built schema");

        let mut editor = Editor {
            options,
            schema,
            data,
            renderer,
            rendered: Rendered::default(),
            editing: Vec::new(),
            initialized: false,
        };

        if editor.options.auto_init {
            editor.init_ui();
        }

        editor
    }

    /// Like [`Editor::new`], with the data and the overrides given as JSON
    /// text.
    pub fn from_json(data: &str, overrides: &str, options: Options, renderer: R) -> Result<Self> {
        let data = serde_json::from_str(data)?;
        let overrides = serde_json::from_str(overrides)?;
        Ok(Self::new(data, overrides, options, renderer))
    }

    /// Renders every top-level field in order. Does nothing the second time.
    pub fn init_ui(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let root = self.schema.root();
        self.rendered.push_group(Path::root());
        let data = self.data.clone();
        self.render_fields(root, &Path::root(), Some(&data), false);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The data snapshot: the data the editor was built with, as changed by
    /// [`Editor::set_data`] and structural edits. What the user types lives in
    /// the rendered fields and is read with [`Editor::get_data`].
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn rendered(&self) -> &Rendered<R::Handle> {
        &self.rendered
    }

    /// The handle of the field rendered at `path`.
    pub fn field_handle(&self, path: &Path) -> Option<&R::Handle> {
        self.rendered
            .field_at(path)
            .and_then(|id| self.rendered.field(id))
            .map(|field| &field.handle)
    }

    pub fn get_value(&self, path: &Path) -> Option<&Value> {
        let found = value::find(&self.data, path);
        trace!(%path, found = found.is_some(), "looked up value");
        found
    }

    pub fn definition_at(&self, path: &Path) -> Option<&FieldDefinition> {
        self.schema.definition_at(path)
    }

    fn render_fields(&mut self, id: NodeId, path: &Path, value: Option<&Value>, explicit: bool) {
        for child in self.schema.children(id) {
            let name = match self.schema.get(child) {
                Some(definition) => definition.name.clone(),
                None => continue,
            };

            let child_value = value.and_then(|value| value.get(name.as_str())).cloned();
            self.render_node(child, &path.child(&name), child_value, explicit);
        }
    }

    // `explicit` is set while rendering row data handed to `add_row`, which
    // wins over inline `data` in the schema.
    fn render_node(&mut self, id: NodeId, path: &Path, value: Option<Value>, explicit: bool) {
        let (type_, inline) = match self.schema.get(id) {
            Some(definition) => (definition.type_, definition.data.clone()),
            None => return,
        };

        let value = if explicit { value } else { inline.or(value) };

        match type_ {
            Type::Object => {
                self.rendered.push_group(path.clone());
                self.render_fields(id, path, value.as_ref(), explicit);
            }
            Type::Array => {
                self.rendered.push_table(path.clone());
                self.render_row_cells(id, &path.join(Segment::NewRow), None, false);

                if let Some(Value::Array(items)) = value {
                    for item in items {
                        self.append_row(id, path, Some(item), explicit);
                    }
                }
            }
            _ => self.render_leaf(id, path, value),
        }
    }

    fn render_leaf(&mut self, id: NodeId, path: &Path, value: Option<Value>) {
        let definition = match self.schema.get(id) {
            Some(definition) => definition,
            None => return,
        };

        // Undeclared element types of single-column arrays follow the data.
        let type_ = match definition.type_ {
            Type::Undefined => classify(value.as_ref()),
            type_ => type_,
        };

        let value = value
            .or_else(|| type_.default_value())
            .unwrap_or(Value::Null);

        let handle = self.renderer.render_field(definition, path, &value);
        self.rendered.push_field(path.clone(), type_, handle);
    }

    fn render_row_cells(&mut self, id: NodeId, row_path: &Path, item: Option<Value>, explicit: bool) {
        match self.schema.shape(id).cloned() {
            Some(Shape::Single(element)) => self.render_node(element, row_path, item, explicit),
            Some(Shape::Fields { .. }) => self.render_fields(id, row_path, item.as_ref(), explicit),
            _ => {}
        }
    }

    fn append_row(&mut self, id: NodeId, table_path: &Path, item: Option<Value>, explicit: bool) -> Option<Path> {
        let index = self.rendered.table(table_path)?.rows.len();
        let row_path = table_path.join(Segment::Index(index));

        let start = self.rendered.next_field_id();
        self.render_row_cells(id, &row_path, item, explicit);
        let fields = self.rendered.field_ids_since(start);

        self.rendered.push_row(table_path, Row {
            path: row_path.clone(),
            fields,
        })?;

        Some(row_path)
    }

    fn remove_row_fields(&mut self, table_path: &Path, row_path: &Path) {
        let handles = self.rendered.remove_where(|path| path.starts_with(row_path));
        for handle in handles {
            self.renderer.remove_field(handle);
        }

        let moved = self.rendered.renumber(table_path);
        debug!(%row_path, renumbered = moved.len(), "removed row");
        self.notify_moved(&moved);
    }

    fn notify_moved(&mut self, moved: &[FieldId]) {
        for id in moved {
            if let Some(field) = self.rendered.field(*id) {
                self.renderer.move_field(&field.handle, &field.path);
            }
        }
    }

    fn table_node(&self, table_path: &Path) -> Result<NodeId> {
        let not_a_table = || Error::NotATable {
            path: table_path.to_string(),
        };

        if self.rendered.table(table_path).is_none() {
            return Err(not_a_table());
        }

        // A list nested in a list is addressed by its row in the outer one.
        let depth = table_path
            .segments()
            .iter()
            .rev()
            .take_while(|segment| segment.is_row())
            .count();

        let mut id = self.schema.resolve(table_path).ok_or_else(not_a_table)?;
        for _ in 0..depth {
            id = self.schema.element(id).ok_or_else(not_a_table)?;
        }

        match self.schema.get(id) {
            Some(definition) if definition.type_ == Type::Array => Ok(id),
            _ => Err(not_a_table()),
        }
    }

    /// Appends a row rendered from `row` to the list at `table_path` and
    /// returns the new row's path.
    pub fn add_row(&mut self, table_path: &Path, row: Value) -> Result<Path> {
        let id = self.table_node(table_path)?;
        let row_path = self
            .append_row(id, table_path, Some(row.clone()), true)
            .ok_or_else(|| Error::NotATable {
                path: table_path.to_string(),
            })?;

        if !table_path.is_new_row() {
            if !value::find(&self.data, table_path).map_or(false, Value::is_array) {
                value::put(&mut self.data, table_path, Value::Array(Vec::new()));
            }
            value::put(&mut self.data, &row_path, row);
        }

        debug!(%row_path, "added row");
        Ok(row_path)
    }

    /// Removes the row at `row_path` and renumbers the rows after it.
    pub fn delete_row(&mut self, row_path: &Path) -> Result<()> {
        let no_such_row = || Error::NoSuchRow {
            path: row_path.to_string(),
        };

        let table_path = match (row_path.parent(), row_path.last()) {
            (Some(parent), Some(Segment::Index(_))) => parent,
            _ => return Err(no_such_row()),
        };

        let exists = self
            .rendered
            .table(&table_path)
            .map_or(false, |table| table.rows.iter().any(|row| row.path == *row_path));
        if !exists {
            return Err(no_such_row());
        }

        self.remove_row_fields(&table_path, row_path);
        if !table_path.is_new_row() {
            value::delete(&mut self.data, row_path);
        }

        Ok(())
    }

    /// Makes the list at `table_path` show exactly `rows`, deleting trailing
    /// rows or adding missing ones as needed.
    pub fn set_rows(&mut self, table_path: &Path, rows: &[Value]) -> Result<()> {
        self.table_node(table_path)?;
        self.set_data(table_path, &Value::Array(rows.to_vec()));
        Ok(())
    }

    fn resize_rows(&mut self, id: NodeId, table_path: &Path, items: &[Value]) {
        let current = self.rendered.table(table_path).map_or(0, |table| table.rows.len());

        for i in (items.len()..current).rev() {
            self.remove_row_fields(table_path, &table_path.join(Segment::Index(i)));
        }

        for item in items.iter().skip(current) {
            self.append_row(id, table_path, Some(item.clone()), true);
        }
    }

    /// Moves what the new row editor of `table_path` holds into a new row,
    /// then resets the editor.
    pub fn commit_new_row(&mut self, table_path: &Path) -> Result<Path> {
        self.table_node(table_path)?;

        let new_row = table_path.join(Segment::NewRow);
        let row = self.get_data(&DataQuery::at(new_row.clone()).with_new_rows());
        let row_path = self.add_row(table_path, row)?;

        for (_, field) in self.rendered.fields() {
            if field.path.starts_with(&new_row) {
                let reset = field.type_.default_value().unwrap_or(Value::Null);
                self.renderer.write_field_value(&field.handle, &reset);
            }
        }

        Ok(row_path)
    }

    /// Pushes `value` into the rendered fields at or below `path`.
    ///
    /// The data snapshot is updated first. Lists below `path` then get as
    /// many rows as the new data has elements (none when it has no array
    /// there), outermost lists first, and finally every field shows what the
    /// data holds for it, or its type's default. New row editors are left
    /// alone unless `path` itself points into one, in which case only those
    /// fields are written and the snapshot is untouched.
    pub fn set_data(&mut self, path: &Path, data: &Value) {
        if path.is_new_row() {
            for (_, field) in self.rendered.fields() {
                if let Some(relative) = field.path.strip_prefix(path) {
                    let shown = shown_value(field.type_, value::find(data, &relative));
                    self.renderer.write_field_value(&field.handle, &shown);
                }
            }
            return;
        }

        value::put(&mut self.data, path, data.clone());

        let mut tables: Vec<Path> = self
            .rendered
            .tables()
            .iter()
            .map(|table| table.path.clone())
            .filter(|table| table.starts_with(path) && !table.is_new_row())
            .collect();
        tables.sort_by_key(Path::len);

        for table_path in tables {
            let id = match self.table_node(&table_path) {
                Ok(id) => id,
                Err(_) => continue,
            };

            let items = match value::find(&self.data, &table_path) {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            self.resize_rows(id, &table_path, &items);
        }

        for (_, field) in self.rendered.fields() {
            if !field.path.starts_with(path) || field.path.is_new_row() {
                continue;
            }

            let shown = shown_value(field.type_, value::find(&self.data, &field.path));
            self.renderer.write_field_value(&field.handle, &shown);
        }

        debug!(%path, "set data");
    }

    /// Collects the values of the rendered fields at or below `query.path`,
    /// coerced by type, and rebuilds them into JSON.
    ///
    /// When `query.path` addresses a single field, its value is returned
    /// directly. Lists without rows come back as `[]` and objects without
    /// fields as `{}`.
    pub fn get_data(&self, query: &DataQuery) -> Value {
        let mut flat = Map::new();

        for (_, field) in self.rendered.fields() {
            let relative = match self.collected(&field.path, query) {
                Some(relative) => relative,
                None => continue,
            };

            let raw = self.renderer.read_field_value(&field.handle);
            let value = self.options.converters.convert(field.type_, &raw);
            if relative.is_root() {
                return value;
            }

            flat.insert(relative.to_string(), value);
        }

        if flat.is_empty() {
            if let Some(table) = self.rendered.table(&query.path) {
                if table.rows.is_empty() {
                    return Value::Array(Vec::new());
                }
            }
        }

        for table in self.rendered.tables() {
            let relative = match self.collected(&table.path, query) {
                Some(relative) => relative,
                None => continue,
            };

            if table.rows.is_empty() && !relative.is_root() {
                flat.insert(relative.to_string(), Value::Array(Vec::new()));
            }
            for row in table.rows.iter().filter(|row| row.fields.is_empty()) {
                if let Some(relative) = self.collected(&row.path, query) {
                    flat.insert(relative.to_string(), Value::Object(Map::new()));
                }
            }
        }

        for group in self.rendered.groups() {
            let relative = match self.collected(group, query) {
                Some(relative) => relative,
                None => continue,
            };

            let has_content = self.rendered.fields().any(|(_, field)| field.path.starts_with(group))
                || self.rendered.tables().iter().any(|table| table.path.starts_with(group))
                || self
                    .rendered
                    .groups()
                    .iter()
                    .any(|other| other != group && other.starts_with(group));
            if !relative.is_root() && !has_content {
                flat.insert(relative.to_string(), Value::Object(Map::new()));
            }
        }

        arrayify(unflatten(&flat))
    }

    // The path of `path` relative to the query, if the query collects it.
    fn collected(&self, path: &Path, query: &DataQuery) -> Option<Path> {
        let relative = path.strip_prefix(&query.path)?;
        if !query.include_new_rows && relative.is_new_row() {
            return None;
        }

        if !query.include_fields_being_edited {
            let schema_path = path.schema_path();
            if self.editing.iter().any(|editing| schema_path.starts_with(editing)) {
                return None;
            }
        }

        Some(relative)
    }

    /// Opens the definition of the field at `path` for editing. Until the
    /// edit is saved or cancelled, [`Editor::get_data`] skips the field
    /// unless asked to include it.
    pub fn begin_field_edit(&mut self, path: &Path) -> Result<()> {
        let definition = self.schema.definition_at(path).ok_or_else(|| Error::NoSuchField {
            path: path.to_string(),
        })?;

        if !self.editing.contains(&definition.path) {
            self.editing.push(definition.path.clone());
        }

        Ok(())
    }

    pub fn cancel_field_edit(&mut self, path: &Path) {
        let schema_path = path.schema_path();
        self.editing.retain(|editing| *editing != schema_path);
    }

    fn invalid_name(&self, template: &str, path: &Path) -> Error {
        Error::InvalidFieldName {
            path: path.to_string(),
            message: Messages::format(template, &path.to_string()),
        }
    }

    fn validate_name(&self, parent: NodeId, parent_path: &Path, name: &str) -> Result<()> {
        let path = parent_path.child(name);
        let malformed = name.is_empty()
            || name.contains(crate::path::SEPARATOR)
            || name == self.schema.order_property()
            || Segment::parse(name).is_row();

        if malformed {
            return Err(self.invalid_name(&self.options.messages.invalid_field_name, &path));
        }

        if self.schema.child(parent, name).is_some() {
            return Err(self.invalid_name(&self.options.messages.duplicate_field_name, &path));
        }

        Ok(())
    }

    fn not_permitted(&self, path: &Path) -> Error {
        Error::NotPermitted {
            path: path.to_string(),
            message: Messages::format(&self.options.messages.not_permitted, &path.to_string()),
        }
    }

    fn unsupported(&self, path: &Path) -> Error {
        Error::Unsupported {
            path: path.to_string(),
            message: Messages::format(&self.options.messages.unsupported_edit, &path.to_string()),
        }
    }

    // The node holding the named fields of the container at `path`: the
    // container itself, or the element of a list of objects.
    fn fields_node(&self, path: &Path) -> Result<NodeId> {
        let id = self.schema.resolve(path).ok_or_else(|| Error::NoSuchField {
            path: path.to_string(),
        })?;

        let id = match self.schema.element(id) {
            Some(element) if self.schema.get(element).map(|d| d.type_) == Some(Type::Object) => element,
            _ => id,
        };

        match self.schema.shape(id) {
            Some(Shape::Fields { .. }) => Ok(id),
            _ => Err(self.unsupported(path)),
        }
    }

    /// Adds a field called `name` to the container at `parent_path`, built
    /// from the raw definition `raw` (as found in an override schema), and
    /// renders it wherever the container is rendered. Returns the new
    /// field's schema path.
    pub fn add_field(&mut self, parent_path: &Path, name: &str, raw: Value) -> Result<Path> {
        let parent = self.fields_node(parent_path)?;
        let parent_definition = self.schema.get(parent).ok_or_else(|| Error::NoSuchField {
            path: parent_path.to_string(),
        })?;
        let parent_schema_path = parent_definition.path.clone();
        let parent_is_list = parent_definition.type_ == Type::Array;

        if parent_definition.add_field == Some(false) {
            return Err(self.not_permitted(parent_path));
        }
        self.validate_name(parent, &parent_schema_path, name)?;

        let id = self
            .schema
            .insert_child(parent, name, &raw, None)
            .ok_or_else(|| self.invalid_name(&self.options.messages.duplicate_field_name, &parent_schema_path.child(name)))?;
        let schema_path = parent_schema_path.child(name);

        if self.initialized {
            // Every rendered instance of the container gets the field: object
            // groups, the rows of a list, and its new row editor.
            let mut containers: Vec<Path> = self
                .rendered
                .groups()
                .iter()
                .filter(|group| group.schema_path() == parent_schema_path)
                .cloned()
                .collect();

            for table in self.rendered.tables() {
                if parent_is_list && table.path.schema_path() == parent_schema_path {
                    containers.extend(table.rows.iter().map(|row| row.path.clone()));
                    containers.push(table.path.join(Segment::NewRow));
                }
            }

            for container in containers {
                let path = container.child(name);
                let value = value::find(&self.data, &path).cloned();

                let start = self.rendered.next_field_id();
                self.render_node(id, &path, value, false);
                let fields = self.rendered.field_ids_since(start);
                self.attach_to_rows(&path, fields);
            }
        }

        debug!(path = %schema_path, "added field");
        Ok(schema_path)
    }

    fn attach_to_rows(&mut self, path: &Path, fields: Vec<FieldId>) {
        if fields.is_empty() {
            return;
        }

        let rows: Vec<Path> = self
            .rendered
            .tables()
            .iter()
            .flat_map(|table| table.rows.iter())
            .filter(|row| path.starts_with(&row.path))
            .map(|row| row.path.clone())
            .collect();

        for row in rows {
            self.rendered.extend_row(&row, fields.clone());
        }
    }

    fn editable_node(&self, path: &Path) -> Result<(NodeId, NodeId, FieldDefinition)> {
        let id = self.schema.resolve(path).ok_or_else(|| Error::NoSuchField {
            path: path.to_string(),
        })?;
        let parent = self.schema.parent(id).ok_or_else(|| self.unsupported(path))?;
        let definition = self.schema.get(id).cloned().ok_or_else(|| Error::NoSuchField {
            path: path.to_string(),
        })?;

        Ok((id, parent, definition))
    }

    /// Renames, retypes or relabels the field at `path` and returns its
    /// (possibly new) schema path.
    ///
    /// Everything is validated before anything changes. Turning an existing
    /// field into a container, or a container into anything else, is
    /// rejected with [`Error::Unsupported`].
    pub fn edit_field(&mut self, path: &Path, edit: FieldEdit) -> Result<Path> {
        let (id, parent, definition) = self.editable_node(path)?;
        let is_element = self.schema.element(parent) == Some(id);

        if definition.editable == Some(false) {
            return Err(self.not_permitted(path));
        }

        let rename = edit.name.as_deref().filter(|name| *name != definition.name);
        if let Some(name) = rename {
            if is_element {
                return Err(self.unsupported(path));
            }
            let parent_path = definition.path.parent().unwrap_or_default();
            self.validate_name(parent, &parent_path, name)?;
        }

        let retype = edit.type_.filter(|type_| *type_ != definition.type_);
        if let Some(type_) = retype {
            if type_.is_container() || definition.type_.is_container() {
                return Err(self.unsupported(path));
            }
        }

        let mut schema_path = definition.path.clone();

        if let Some(type_) = retype {
            if let Some(target) = self.schema.get_mut(id) {
                target.type_ = type_;
            }

            let instances: Vec<FieldId> = self
                .rendered
                .fields()
                .filter(|(_, field)| field.path.schema_path() == definition.path)
                .map(|(id, _)| id)
                .collect();
            for instance in instances {
                if let Some(field) = self.rendered.field_mut(instance) {
                    field.type_ = type_;
                }
            }
            debug!(path = %schema_path, %type_, "retyped field");
        }

        if let Some(name) = rename {
            self.schema.rename_child(parent, &definition.name, name);

            let moved = self.rendered.rename(&definition.path, name);
            for instance in value::instances(&self.data, &definition.path) {
                value::rename(&mut self.data, &instance, name);
            }
            self.notify_moved(&moved);

            schema_path = definition.path.with_name(name);
            for editing in &mut self.editing {
                if let Some(rest) = editing.strip_prefix(&definition.path) {
                    *editing = Path::from([schema_path.segments(), rest.segments()].concat());
                }
            }
            debug!(from = %definition.path, to = %schema_path, "renamed field");
        }

        if let Some(label) = edit.label {
            if let Some(target) = self.schema.get_mut(id) {
                target.label = label;
            }
        }

        self.editing.retain(|editing| *editing != schema_path);
        Ok(schema_path)
    }

    /// Removes the field at `path` from the schema, from every rendered
    /// instance, and from the data snapshot.
    pub fn delete_field(&mut self, path: &Path) -> Result<()> {
        let (id, parent, definition) = self.editable_node(path)?;

        if definition.deletable == Some(false) {
            return Err(self.not_permitted(path));
        }
        if self.schema.element(parent) == Some(id) {
            return Err(self.unsupported(path));
        }

        let handles = self
            .rendered
            .remove_where(|rendered| rendered.schema_path().starts_with(&definition.path));
        for handle in handles {
            self.renderer.remove_field(handle);
        }

        self.schema.remove_child(parent, &definition.name);
        for instance in value::instances(&self.data, &definition.path) {
            value::delete(&mut self.data, &instance);
        }
        self.editing.retain(|editing| !editing.starts_with(&definition.path));

        debug!(path = %definition.path, "deleted field");
        Ok(())
    }
}

fn shown_value(type_: Type, found: Option<&Value>) -> Value {
    found
        .cloned()
        .or_else(|| type_.default_value())
        .unwrap_or(Value::Null)
}
