//! Bookkeeping for what is currently rendered: leaf fields, lists (tables)
//! with their rows, and object groups, each tagged with the concrete path it
//! lives at.
//!
//! Paths are the join key between rendered fields and data, so every
//! structural change has to keep them unique and contiguous. Removing a row
//! is followed by [`Rendered::renumber`].

use crate::path::{Path, Segment};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

#[derive(Debug)]
pub struct RenderedField<H> {
    pub path: Path,
    pub type_: Type,
    pub handle: H,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub path: Path,

    /// The cells rendered for this row, in column order.
    pub fields: Vec<FieldId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub path: Path,
    pub rows: Vec<Row>,
}

#[derive(Debug)]
pub struct Rendered<H> {
    fields: Vec<Option<RenderedField<H>>>,
    tables: Vec<Table>,
    groups: Vec<Path>,
}

impl<H> Default for Rendered<H> {
    fn default() -> Self {
        Rendered {
            fields: Vec::new(),
            tables: Vec::new(),
            groups: Vec::new(),
        }
    }
}

impl<H> Rendered<H> {
    pub fn push_field(&mut self, path: Path, type_: Type, handle: H) -> FieldId {
        self.fields.push(Some(RenderedField {
            path,
            type_,
            handle,
        }));
        FieldId(self.fields.len() - 1)
    }

    pub fn push_table(&mut self, path: Path) {
        self.tables.push(Table {
            path,
            rows: Vec::new(),
        });
    }

    pub fn push_group(&mut self, path: Path) {
        self.groups.push(path);
    }

    /// Appends a row to the table at `table_path` and returns its index.
    pub fn push_row(&mut self, table_path: &Path, row: Row) -> Option<usize> {
        let table = self.table_mut(table_path)?;
        table.rows.push(row);
        Some(table.rows.len() - 1)
    }

    pub fn field(&self, id: FieldId) -> Option<&RenderedField<H>> {
        self.fields.get(id.0).and_then(Option::as_ref)
    }

    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut RenderedField<H>> {
        self.fields.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live fields in render order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &RenderedField<H>)> {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(i, field)| field.as_ref().map(|field| (FieldId(i), field)))
    }

    pub fn field_at(&self, path: &Path) -> Option<FieldId> {
        self.fields()
            .find(|(_, field)| field.path == *path)
            .map(|(id, _)| id)
    }

    /// The id the next pushed field will get.
    pub fn next_field_id(&self) -> FieldId {
        FieldId(self.fields.len())
    }

    /// Live fields pushed at or after `start`.
    pub fn field_ids_since(&self, start: FieldId) -> Vec<FieldId> {
        (start.0..self.fields.len())
            .map(FieldId)
            .filter(|id| self.field(*id).is_some())
            .collect()
    }

    pub fn table(&self, path: &Path) -> Option<&Table> {
        self.tables.iter().find(|table| table.path == *path)
    }

    fn table_mut(&mut self, path: &Path) -> Option<&mut Table> {
        self.tables.iter_mut().find(|table| table.path == *path)
    }

    /// Adds cells to the row at `row_path`, for a column added after the row
    /// was rendered.
    pub fn extend_row(&mut self, row_path: &Path, fields: Vec<FieldId>) {
        let table_path = match row_path.parent() {
            Some(parent) => parent,
            None => return,
        };

        if let Some(table) = self.table_mut(&table_path) {
            if let Some(row) = table.rows.iter_mut().find(|row| row.path == *row_path) {
                row.fields.extend(fields);
            }
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn groups(&self) -> &[Path] {
        &self.groups
    }

    /// Forgets every rendered item whose path satisfies `pred`, including rows
    /// of surviving tables, and hands back the removed field handles.
    pub fn remove_where(&mut self, pred: impl Fn(&Path) -> bool) -> Vec<H> {
        let mut handles = Vec::new();
        let mut removed = Vec::new();
        for (i, slot) in self.fields.iter_mut().enumerate() {
            if slot.as_ref().map_or(false, |field| pred(&field.path)) {
                if let Some(field) = slot.take() {
                    handles.push(field.handle);
                    removed.push(FieldId(i));
                }
            }
        }

        self.tables.retain(|table| !pred(&table.path));
        for table in &mut self.tables {
            table.rows.retain(|row| !pred(&row.path));
            for row in &mut table.rows {
                row.fields.retain(|id| !removed.contains(id));
            }
        }
        self.groups.retain(|group| !pred(group));

        handles
    }

    /// Applies `rewrite` to every rendered path and returns the fields whose
    /// path changed.
    pub fn rewrite_paths(&mut self, mut rewrite: impl FnMut(&mut Path) -> bool) -> Vec<FieldId> {
        let mut moved = Vec::new();
        for (i, slot) in self.fields.iter_mut().enumerate() {
            if let Some(field) = slot {
                if rewrite(&mut field.path) {
                    moved.push(FieldId(i));
                }
            }
        }

        for table in &mut self.tables {
            rewrite(&mut table.path);
            for row in &mut table.rows {
                rewrite(&mut row.path);
            }
        }
        for group in &mut self.groups {
            rewrite(group);
        }

        moved
    }

    /// Makes the row indices of the table at `table_path` contiguous again.
    ///
    /// Rows are visited in order. Each row's current index is read from its
    /// first cell (or from the row's own path when it has no cells); when it
    /// differs from the row's position, every path below
    /// `table_path.old_index` is moved to `table_path.position`. Matching is
    /// by whole segments, so `list.1` never touches `list.10`.
    pub fn renumber(&mut self, table_path: &Path) -> Vec<FieldId> {
        let at = table_path.len();
        let rows = match self.table(table_path) {
            Some(table) => table.rows.clone(),
            None => return Vec::new(),
        };

        let mut moved = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let current = row
                .fields
                .first()
                .and_then(|id| self.field(*id))
                .and_then(|field| field.path.index_at(at))
                .or_else(|| row.path.index_at(at));

            let old = match current {
                Some(old) if old != i => old,
                _ => continue,
            };

            let old_prefix = table_path.join(Segment::Index(old));
            moved.extend(self.rewrite_paths(|path| {
                if path.starts_with(&old_prefix) {
                    path.set_index_at(at, i);
                    true
                } else {
                    false
                }
            }));
        }

        moved
    }

    /// Renames the field whose schema path is `schema_path` in every rendered
    /// instance, whatever rows those instances sit in.
    pub fn rename(&mut self, schema_path: &Path, new_name: &str) -> Vec<FieldId> {
        let n = match schema_path.len().checked_sub(1) {
            Some(n) => n,
            None => return Vec::new(),
        };

        self.rewrite_paths(|path| {
            if !path.schema_path().starts_with(schema_path) {
                return false;
            }

            match path.name_position(n) {
                Some(position) => {
                    path.set_segment(position, Segment::Name(new_name.to_owned()));
                    true
                }
                None => false,
            }
        })
    }
}
