//! The seam between the editor and whatever draws fields.
//!
//! The editor never deals with presentation. It asks a [`Renderer`] to create
//! a field for a resolved definition, reads and writes the field's raw value
//! through the returned handle, and drops the handle when the field goes
//! away.

use crate::path::Path;
use crate::schema::FieldDefinition;
use serde_json::Value;

pub trait Renderer {
    type Handle;

    /// Creates a field for `definition` living at `path` (which may carry row
    /// segments), showing `value`.
    fn render_field(&mut self, definition: &FieldDefinition, path: &Path, value: &Value) -> Self::Handle;

    /// The raw value currently shown by the field, before type coercion.
    fn read_field_value(&self, handle: &Self::Handle) -> Value;

    fn write_field_value(&mut self, handle: &Self::Handle, value: &Value);

    fn remove_field(&mut self, handle: Self::Handle);

    /// Tells the renderer a field now lives at `path`, after row renumbering
    /// or a rename.
    fn move_field(&mut self, _handle: &Self::Handle, _path: &Path) {}
}

/// A field kept in memory by [`MemoryRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryField {
    pub label: String,
    pub path: Path,
    pub value: Value,
}

/// A renderer without any presentation: fields are plain values in memory.
///
/// Useful for headless use and for tests, where [`MemoryRenderer::input`]
/// stands in for a user typing into a field.
#[derive(Debug, Default)]
pub struct MemoryRenderer {
    fields: Vec<Option<MemoryField>>,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces what the field shows, as if the user had typed `value`.
    pub fn input(&mut self, handle: usize, value: Value) {
        if let Some(Some(field)) = self.fields.get_mut(handle) {
            field.value = value;
        }
    }

    pub fn field(&self, handle: usize) -> Option<&MemoryField> {
        self.fields.get(handle).and_then(Option::as_ref)
    }

    /// Number of fields currently rendered.
    pub fn len(&self) -> usize {
        self.fields.iter().filter(|field| field.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Renderer for MemoryRenderer {
    type Handle = usize;

    fn render_field(&mut self, definition: &FieldDefinition, path: &Path, value: &Value) -> usize {
        self.fields.push(Some(MemoryField {
            label: definition.label.clone(),
            path: path.clone(),
            value: value.clone(),
        }));
        self.fields.len() - 1
    }

    fn read_field_value(&self, handle: &usize) -> Value {
        self.field(*handle)
            .map(|field| field.value.clone())
            .unwrap_or(Value::Null)
    }

    fn write_field_value(&mut self, handle: &usize, value: &Value) {
        self.input(*handle, value.clone());
    }

    fn remove_field(&mut self, handle: usize) {
        if let Some(slot) = self.fields.get_mut(handle) {
            *slot = None;
        }
    }

    fn move_field(&mut self, handle: &usize, path: &Path) {
        if let Some(Some(field)) = self.fields.get_mut(*handle) {
            field.path = path.clone();
        }
    }
}
