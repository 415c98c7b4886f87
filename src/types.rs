use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The closed set of type tags a field or a value can have.
///
/// JSON data only ever classifies as one of `number`, `boolean`, `string`,
/// `date`, `array`, `object`, `null` or `undefined`. The remaining tags
/// (`regexp`, `function`, `error`) exist so that schemas can name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Number,
    Boolean,
    String,
    Regexp,
    Date,
    Array,
    Object,
    Undefined,
    Null,
    Function,
    Error,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Regexp => "regexp",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Function => "function",
            Self::Error => "error",
        }
    }

    /// Whether fields of this type hold other fields.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }

    /// The value a freshly rendered field of this type starts with when
    /// there is no data for it. `None` means "leave it undefined".
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Number => Some(Value::from(0)),
            Self::Boolean => Some(Value::Bool(false)),
            Self::String | Self::Regexp => Some(Value::String(String::new())),
            Self::Date => Some(Value::String(
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            )),
            Self::Object => Some(Value::Object(Map::new())),
            Self::Array => Some(Value::Array(Vec::new())),
            Self::Undefined | Self::Null | Self::Function | Self::Error => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownType(pub String);

impl fmt::Display for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown type tag {:?}", self.0)
    }
}

impl std::error::Error for UnknownType {}

impl FromStr for Type {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "string" => Self::String,
            "regexp" => Self::Regexp,
            "date" => Self::Date,
            "array" => Self::Array,
            "object" => Self::Object,
            "undefined" => Self::Undefined,
            "null" => Self::Null,
            "function" => Self::Function,
            "error" => Self::Error,
            _ => return Err(UnknownType(s.to_owned())),
        })
    }
}

/// Classifies a value. Absent values are `undefined`.
///
/// Strings holding an RFC 3339 timestamp classify as `date`; every other
/// string is a `string`. This never fails.
pub fn classify(value: Option<&Value>) -> Type {
    match value {
        None => Type::Undefined,
        Some(Value::Array(_)) => Type::Array,
        Some(Value::Number(_)) => Type::Number,
        Some(Value::Bool(_)) => Type::Boolean,
        Some(Value::String(s)) => {
            if DateTime::parse_from_rfc3339(s).is_ok() {
                Type::Date
            } else {
                Type::String
            }
        }
        Some(Value::Object(_)) => Type::Object,
        Some(Value::Null) => Type::Null,
    }
}
