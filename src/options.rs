use crate::convert::Converters;
use serde::Deserialize;

/// Settings for an [`Editor`][`crate::Editor`].
///
/// Every field has a default, so a partial JSON document is a valid set of
/// options:
///
/// ```
/// use json_edit::Options;
///
/// let options: Options = serde_json::from_str(r#"{ "order_property": "__order" }"#).unwrap();
/// assert_eq!("__order", options.order_property);
/// assert_eq!("values", options.default_array_field_name);
/// assert!(options.auto_init);
/// ```
///
/// Converters cannot be described in JSON; attach them with
/// [`Options::with_converters`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Render every field as soon as the editor is built.
    pub auto_init: bool,

    /// Name given to the element of a single-column array.
    pub default_array_field_name: String,

    /// Label given to the element of a single-column array.
    pub default_array_field_label: String,

    /// The reserved schema key holding a container's order list.
    pub order_property: String,

    pub messages: Messages,

    #[serde(skip)]
    pub converters: Converters,
}

impl Options {
    pub fn with_converters(mut self, converters: Converters) -> Self {
        self.converters = converters;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            auto_init: true,
            default_array_field_name: "values".to_owned(),
            default_array_field_label: "Values".to_owned(),
            order_property: "_order".to_owned(),
            messages: Messages::default(),
            converters: Converters::default(),
        }
    }
}

/// User-facing messages. `{0}` is replaced with the path of the field in
/// question.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub invalid_field_name: String,
    pub duplicate_field_name: String,
    pub unsupported_edit: String,
    pub not_permitted: String,
}

impl Messages {
    pub(crate) fn format(template: &str, path: &str) -> String {
        template.replace("{0}", path)
    }
}

impl Default for Messages {
    fn default() -> Self {
        Messages {
            invalid_field_name: "Invalid field name: {0}".to_owned(),
            duplicate_field_name: "A field named {0} already exists".to_owned(),
            unsupported_edit: "Changing {0} to or from a container type is not supported".to_owned(),
            not_permitted: "The field {0} cannot be changed".to_owned(),
        }
    }
}
