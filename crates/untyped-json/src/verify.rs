//! Source-value checks run before a property is deserialized.

use serde_json::Value;

use crate::error::MapError;
use crate::kind::{describe, DeserializeType, NullabilityPolicy, ValueKind};

/// Outcome of [`check_nullability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullCheck {
    /// The value is present and not null; type-check and map it.
    Present,
    /// `Ignore` policy on a null or absent value: leave the instance as is.
    Skip,
    /// `Pass` policy on a null or absent value: forward it unchecked.
    Forward,
}

/// Applies the property's nullability policy to the source value under `key`.
pub fn check_nullability(
    key: &str,
    policy: NullabilityPolicy,
    declared: &DeserializeType,
    value: Option<&Value>,
) -> Result<NullCheck, MapError> {
    let missing = matches!(value, None | Some(Value::Null));
    match policy {
        NullabilityPolicy::Ignore if missing => Ok(NullCheck::Skip),
        NullabilityPolicy::Pass if missing => Ok(NullCheck::Forward),
        _ => match value {
            Some(Value::Null) => Err(MapError::NullViolation {
                key: key.to_string(),
                expected: declared.describe(),
            }),
            None => Err(MapError::MissingProperty {
                key: key.to_string(),
            }),
            Some(_) => Ok(NullCheck::Present),
        },
    }
}

/// Checks a present, non-null source value against the declared type.
///
/// `property` names the instance-side property for converter errors.
pub fn check_type(
    key: &str,
    property: &str,
    declared: &DeserializeType,
    value: &Value,
) -> Result<(), MapError> {
    match declared {
        DeserializeType::KindArray(kinds) => {
            let items = expect_array(key, value)?;
            let [kind] = kinds.as_slice() else {
                return Err(MapError::MultiKindArray {
                    key: key.to_string(),
                });
            };
            if *kind == ValueKind::Any {
                return Ok(());
            }
            match items.iter().find(|item| !kind.matches(item)) {
                Some(item) => Err(mismatch(
                    key,
                    format!("an array of {kind}"),
                    format!("an array containing {}", with_article(describe(item))),
                )),
                None => Ok(()),
            }
        }
        DeserializeType::ClassArray(_) => {
            let items = expect_array(key, value)?;
            match items.iter().find(|item| !item.is_object()) {
                Some(item) => Err(mismatch(
                    key,
                    "an array of objects".to_string(),
                    format!("an array containing {}", with_article(describe(item))),
                )),
                None => Ok(()),
            }
        }
        DeserializeType::Converter(converter) => match converter.missing_operation() {
            Some(missing) => Err(MapError::IncompleteConverter {
                property: property.to_string(),
                converter: converter.name().to_string(),
                missing,
            }),
            None => Ok(()),
        },
        DeserializeType::Class(_) => {
            if value.is_object() {
                Ok(())
            } else {
                Err(mismatch(key, "an object".to_string(), with_article(describe(value))))
            }
        }
        DeserializeType::Kind(kind) => {
            if kind.matches(value) {
                Ok(())
            } else {
                Err(mismatch(key, with_article(kind.as_str()), with_article(describe(value))))
            }
        }
        DeserializeType::Infer => Ok(()),
    }
}

fn expect_array<'v>(key: &str, value: &'v Value) -> Result<&'v Vec<Value>, MapError> {
    value
        .as_array()
        .ok_or_else(|| mismatch(key, "an array".to_string(), with_article(describe(value))))
}

fn mismatch(key: &str, expected: String, found: String) -> MapError {
    MapError::TypeMismatch {
        key: key.to_string(),
        expected,
        found,
    }
}

fn with_article(word: &str) -> String {
    match word {
        "null" | "any" => word.to_string(),
        w if w.starts_with(['a', 'e', 'i', 'o', 'u']) => format!("an {w}"),
        w => format!("a {w}"),
    }
}
