//! Attribute values and the closed set of value types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The closed set of attribute value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Long,
    Double,
    String,
    DateTime,
}

impl ValueType {
    pub const ALL: [ValueType; 5] = [
        ValueType::Boolean,
        ValueType::Long,
        ValueType::Double,
        ValueType::String,
        ValueType::DateTime,
    ];

    /// Parse a value type name, case-insensitively. Returns `None` for any
    /// name outside the closed set.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(ValueType::Boolean),
            "long" | "i64" => Some(ValueType::Long),
            "double" | "f64" => Some(ValueType::Double),
            "string" => Some(ValueType::String),
            "datetime" => Some(ValueType::DateTime),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::DateTime => "datetime",
        }
    }

    /// Whether attributes of this value type may be owned as keys.
    pub fn is_keyable(self) -> bool {
        matches!(self, ValueType::Long | ValueType::String | ValueType::DateTime)
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    /// Timezone-naive date and time.
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
        }
    }

    pub(crate) fn key(&self) -> ValueKey {
        match self {
            Value::Boolean(b) => ValueKey::Boolean(*b),
            Value::Long(l) => ValueKey::Long(*l),
            // -0.0 and 0.0 are the same attribute.
            Value::Double(d) if *d == 0.0 => ValueKey::Double(0f64.to_bits()),
            Value::Double(d) => ValueKey::Double(d.to_bits()),
            Value::String(s) => ValueKey::String(s.clone()),
            Value::DateTime(dt) => ValueKey::DateTime(*dt),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

/// Hashable identity of a value, used to keep attribute vertices unique per
/// `(type, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Boolean(bool),
    Long(i64),
    Double(u64),
    String(String),
    DateTime(NaiveDateTime),
}
