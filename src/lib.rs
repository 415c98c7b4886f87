//! Builds editable forms over JSON data.
//!
//! Given some sample data and, optionally, a schema that overrides parts of
//! what can be guessed from it, this crate infers a tree of field
//! definitions, renders one field per value through a [`Renderer`], and
//! turns whatever the fields hold back into JSON. Lists get one row per
//! element plus a "new row" editor; fields can be added, renamed, retyped
//! and deleted while the form is live.
//!
//! Drawing fields is left to the [`Renderer`] implementation. The
//! [`MemoryRenderer`] keeps fields in memory, which is enough for headless
//! use and tests.
//!
//! # Quick start
//!
//! ```
//! use json_edit::{DataQuery, Editor, MemoryRenderer, Options, Path};
//! use serde_json::json;
//!
//! let data = json!({ "age": 19, "hobbies": ["piano", "blogging"] });
//! let mut editor = Editor::new(
//!     data.clone(),
//!     json!({ "age": { "label": "Age" } }),
//!     Options::default(),
//!     MemoryRenderer::new(),
//! );
//!
//! assert_eq!("Age", editor.definition_at(&Path::parse("age")).unwrap().label);
//! assert_eq!(data, editor.get_data(&DataQuery::default()));
//!
//! editor.add_row(&Path::parse("hobbies"), json!("chess")).unwrap();
//! editor.delete_row(&Path::parse("hobbies.0")).unwrap();
//!
//! assert_eq!(
//!     json!({ "age": 19, "hobbies": ["blogging", "chess"] }),
//!     editor.get_data(&DataQuery::default()),
//! );
//! ```
//!
//! The building blocks are usable on their own: [`infer`] guesses a schema
//! map, [`merge`] applies overrides to it, [`Schema::build`] normalizes it,
//! and [`flatten`]/[`unflatten`]/[`arrayify`] convert between nested JSON and
//! flat `dotted.path` maps.

mod convert;
mod editor;
mod error;
mod flatten;
mod infer;
mod merge;
mod options;
mod path;
mod render;
mod rendered;
mod schema;
mod types;

pub mod value;

pub use crate::convert::{to_boolean, to_date, to_number, to_regexp, to_string, Converter, Converters};
pub use crate::editor::{DataQuery, Editor, FieldEdit};
pub use crate::error::{Error, Result};
pub use crate::flatten::{arrayify, flatten, unflatten};
pub use crate::infer::{infer, infer_into};
pub use crate::merge::merge;
pub use crate::options::{Messages, Options};
pub use crate::path::{name_from_path, set_name_in_path, Path, Segment, NEW_ROW, SEPARATOR};
pub use crate::render::{MemoryField, MemoryRenderer, Renderer};
pub use crate::rendered::{FieldId, RenderedField, Rendered, Row, Table};
pub use crate::schema::{FieldDefinition, NodeId, Schema, Shape};
pub use crate::types::{classify, Type, UnknownType};
