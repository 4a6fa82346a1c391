//! Declared-type vocabulary: value kinds, declared types and nullability.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::class::ClassId;
use crate::converter::Converter;

/// The JSON primitive kinds a property can be declared with.
///
/// `Any` bypasses kind checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Any,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    /// Returns true if the runtime value is of this kind.
    ///
    /// `Object` accepts objects and arrays; `null` only matches `Any`.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object() || value.is_array(),
        }
    }

    /// The kind a value would be inferred as, if any.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(Self::String),
            Value::Number(_) => Some(Self::Number),
            Value::Bool(_) => Some(Self::Boolean),
            Value::Object(_) | Value::Array(_) => Some(Self::Object),
            Value::Null => None,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short name of a runtime value's shape, used in error messages.
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The type a property is declared with.
#[derive(Debug, Clone)]
pub enum DeserializeType {
    /// A scalar kind.
    Kind(ValueKind),
    /// An array of scalars. Only single-element declarations are supported;
    /// longer ones are rejected at verification time.
    KindArray(Vec<ValueKind>),
    /// A nested object of a registered class.
    Class(ClassId),
    /// An array of nested objects of a registered class.
    ClassArray(ClassId),
    /// A custom bidirectional transform.
    Converter(Converter),
    /// Resolved from the blank instance's default value at conversion time.
    Infer,
}

impl DeserializeType {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::KindArray(_) | Self::ClassArray(_))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Class(_) | Self::ClassArray(_))
    }

    /// The referenced class for nested declarations.
    pub fn class(&self) -> Option<ClassId> {
        match self {
            Self::Class(id) | Self::ClassArray(id) => Some(*id),
            _ => None,
        }
    }

    pub fn converter(&self) -> Option<&Converter> {
        match self {
            Self::Converter(c) => Some(c),
            _ => None,
        }
    }

    /// Human-readable name for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Kind(kind) => kind.to_string(),
            Self::KindArray(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                format!("[{}]", names.join(", "))
            }
            Self::Class(id) => format!("object of {id}"),
            Self::ClassArray(id) => format!("[object of {id}]"),
            Self::Converter(c) => format!("converter {}", c.name()),
            Self::Infer => "inferred".to_string(),
        }
    }
}

impl From<ValueKind> for DeserializeType {
    fn from(kind: ValueKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<[ValueKind; 1]> for DeserializeType {
    fn from(kinds: [ValueKind; 1]) -> Self {
        Self::KindArray(kinds.to_vec())
    }
}

impl From<Vec<ValueKind>> for DeserializeType {
    fn from(kinds: Vec<ValueKind>) -> Self {
        Self::KindArray(kinds)
    }
}

impl From<ClassId> for DeserializeType {
    fn from(id: ClassId) -> Self {
        Self::Class(id)
    }
}

impl From<[ClassId; 1]> for DeserializeType {
    fn from(ids: [ClassId; 1]) -> Self {
        Self::ClassArray(ids[0])
    }
}

impl From<Converter> for DeserializeType {
    fn from(converter: Converter) -> Self {
        Self::Converter(converter)
    }
}

/// Per-property rule for null or absent source values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullabilityPolicy {
    /// Absent key or null value is an error.
    #[default]
    Map,
    /// Absent key or null value leaves the instance untouched.
    Ignore,
    /// Absent key or null value is forwarded without validation.
    Pass,
}
