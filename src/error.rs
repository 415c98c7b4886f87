//! Errors reported by structural edits.
//!
//! Lookups never produce an error: a missing path is `None`. Only edits that
//! are rejected up front, before anything is mutated, return one of these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The name is empty, contains the path separator, is reserved, or
    /// collides with a sibling. `message` is the configured user-facing text.
    #[error("{message}")]
    InvalidFieldName { path: String, message: String },

    #[error("no field at '{path}'")]
    NoSuchField { path: String },

    #[error("'{path}' is not a list")]
    NotATable { path: String },

    #[error("no row at '{path}'")]
    NoSuchRow { path: String },

    /// A capability flag (`deletable`, `editable`, `addFields`) forbids the
    /// edit.
    #[error("{message}")]
    NotPermitted { path: String, message: String },

    /// The edit is a transition the editor does not implement, such as
    /// retyping an existing field to or from a container.
    #[error("{message}")]
    Unsupported { path: String, message: String },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
