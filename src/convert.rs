use crate::types::Type;
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;

/// Coerces the raw value read from a field into the value stored in data.
pub type Converter = fn(&Value) -> Value;

/// One converter per convertible type.
///
/// The defaults are fixed; an editor gets its own copy, optionally with some
/// entries replaced through [`Converters::with`], so no two editors share
/// mutable state.
#[derive(Clone, Copy)]
pub struct Converters {
    number: Converter,
    boolean: Converter,
    string: Converter,
    regexp: Converter,
    date: Converter,
}

impl Converters {
    /// Replaces the converter for `type_`. Types without a converter slot
    /// (containers, `null`, ...) are left alone.
    pub fn with(mut self, type_: Type, converter: Converter) -> Self {
        match type_ {
            Type::Number => self.number = converter,
            Type::Boolean => self.boolean = converter,
            Type::String => self.string = converter,
            Type::Regexp => self.regexp = converter,
            Type::Date => self.date = converter,
            Type::Array
            | Type::Object
            | Type::Undefined
            | Type::Null
            | Type::Function
            | Type::Error => {}
        }

        self
    }

    pub fn get(&self, type_: Type) -> Option<Converter> {
        match type_ {
            Type::Number => Some(self.number),
            Type::Boolean => Some(self.boolean),
            Type::String => Some(self.string),
            Type::Regexp => Some(self.regexp),
            Type::Date => Some(self.date),
            Type::Array
            | Type::Object
            | Type::Undefined
            | Type::Null
            | Type::Function
            | Type::Error => None,
        }
    }

    pub fn convert(&self, type_: Type, raw: &Value) -> Value {
        match self.get(type_) {
            Some(converter) => converter(raw),
            None => raw.clone(),
        }
    }
}

impl Default for Converters {
    fn default() -> Self {
        Converters {
            number: to_number,
            boolean: to_boolean,
            string: to_string,
            regexp: to_regexp,
            date: to_date,
        }
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters").finish()
    }
}

pub fn to_boolean(raw: &Value) -> Value {
    Value::Bool(match raw {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "on" || s == "1",
        Value::Number(n) => n.as_f64().map_or(false, |n| n > 0.0),
        _ => false,
    })
}

/// Numeric text becomes a number and blank text is zero. Text that is not a
/// number becomes `null`, JSON having no NaN.
pub fn to_number(raw: &Value) -> Value {
    match raw {
        Value::Number(_) => raw.clone(),
        Value::Bool(b) => Value::from(*b as u8),
        Value::Null => Value::from(0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Value::from(0)
            } else if let Ok(i) = s.parse::<i64>() {
                Value::from(i)
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        _ => Value::Null,
    }
}

pub fn to_string(raw: &Value) -> Value {
    Value::String(match raw {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

/// Keeps the pattern when it compiles.
pub fn to_regexp(raw: &Value) -> Value {
    match to_string(raw) {
        Value::String(pattern) if Regex::new(&pattern).is_ok() => Value::String(pattern),
        _ => Value::Null,
    }
}

/// Keeps RFC 3339 timestamps and widens bare `YYYY-MM-DD` dates (what date
/// inputs produce) to midnight UTC.
pub fn to_date(raw: &Value) -> Value {
    let s = match raw {
        Value::String(s) => s.trim(),
        _ => return Value::Null,
    };

    if DateTime::parse_from_rfc3339(s).is_ok() {
        return Value::String(s.to_owned());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| {
            Value::String(
                Utc.from_utc_datetime(&midnight)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            )
        })
        .unwrap_or(Value::Null)
}
