//! Custom bidirectional converters.
//!
//! A converter is detected by shape: it is any value carrying both a
//! serialize and a deserialize operation. [`Converter`] can be assembled from
//! loose closures, so an incomplete converter is representable and is only
//! rejected when a property declared with it is verified.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::instance::{CustomValue, FieldValue};

/// Failure reported by a converter operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConverterError {
    message: String,
}

impl ConverterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Instance-side value to JSON.
pub type SerializeFn = Arc<dyn Fn(&FieldValue) -> Result<Value, ConverterError> + Send + Sync>;

/// JSON to instance-side value.
pub type DeserializeFn = Arc<dyn Fn(&Value) -> Result<FieldValue, ConverterError> + Send + Sync>;

/// Typed converter between a Rust value and its JSON form.
///
/// Values produced by [`deserialize`](JsonConverter::deserialize) are stored
/// on instances as [`FieldValue::Custom`] slots.
///
/// ```
/// use serde_json::{json, Value};
/// use untyped_json::{ConverterError, JsonConverter};
///
/// struct Millis;
///
/// impl JsonConverter for Millis {
///     type Target = std::time::Duration;
///
///     fn serialize(&self, value: &Self::Target) -> Result<Value, ConverterError> {
///         Ok(json!(value.as_millis() as u64))
///     }
///
///     fn deserialize(&self, value: &Value) -> Result<Self::Target, ConverterError> {
///         value
///             .as_u64()
///             .map(std::time::Duration::from_millis)
///             .ok_or_else(|| ConverterError::new("expected milliseconds"))
///     }
/// }
/// ```
pub trait JsonConverter: Send + Sync + 'static {
    type Target: Send + Sync + 'static;

    fn serialize(&self, value: &Self::Target) -> Result<Value, ConverterError>;

    fn deserialize(&self, value: &Value) -> Result<Self::Target, ConverterError>;
}

/// A named pair of optional transform operations.
#[derive(Clone)]
pub struct Converter {
    name: Arc<str>,
    serialize: Option<SerializeFn>,
    deserialize: Option<DeserializeFn>,
}

impl Converter {
    /// An empty converter; attach operations with the `with_*` methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            serialize: None,
            deserialize: None,
        }
    }

    pub fn with_serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<Value, ConverterError> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    pub fn with_deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<FieldValue, ConverterError> + Send + Sync + 'static,
    {
        self.deserialize = Some(Arc::new(f));
        self
    }

    /// Wraps a typed converter. The result always carries both operations.
    pub fn typed<C: JsonConverter>(converter: C) -> Self {
        let converter = Arc::new(converter);
        let ser = Arc::clone(&converter);
        let name = type_name::<C>();
        Self::new(name.rsplit("::").next().unwrap_or(name))
            .with_serialize(move |value| match value {
                FieldValue::Custom(custom) => match custom.downcast_ref::<C::Target>() {
                    Some(target) => ser.serialize(target),
                    None => Err(ConverterError::new(format!(
                        "expected a value of type {}",
                        type_name::<C::Target>()
                    ))),
                },
                _ => Err(ConverterError::new(format!(
                    "expected a custom slot holding {}",
                    type_name::<C::Target>()
                ))),
            })
            .with_deserialize(move |value| {
                converter
                    .deserialize(value)
                    .map(|target| FieldValue::Custom(CustomValue::new(target)))
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the first missing operation, if the converter is incomplete.
    pub fn missing_operation(&self) -> Option<&'static str> {
        if self.serialize.is_none() {
            Some("serialize")
        } else if self.deserialize.is_none() {
            Some("deserialize")
        } else {
            None
        }
    }

    pub(crate) fn serializer(&self) -> Option<&SerializeFn> {
        self.serialize.as_ref()
    }

    pub(crate) fn deserializer(&self) -> Option<&DeserializeFn> {
        self.deserialize.as_ref()
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Celsius;

    impl JsonConverter for Celsius {
        type Target = f64;

        fn serialize(&self, value: &f64) -> Result<Value, ConverterError> {
            Ok(json!(format!("{value}C")))
        }

        fn deserialize(&self, value: &Value) -> Result<f64, ConverterError> {
            value
                .as_str()
                .and_then(|s| s.strip_suffix('C'))
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ConverterError::new("expected a celsius string"))
        }
    }

    #[test]
    fn missing_operations_are_reported() {
        let c = Converter::new("half");
        assert_eq!(c.missing_operation(), Some("serialize"));
        let c = c.with_serialize(|_| Ok(Value::Null));
        assert_eq!(c.missing_operation(), Some("deserialize"));
        let c = c.with_deserialize(|v| Ok(FieldValue::Json(v.clone())));
        assert_eq!(c.missing_operation(), None);
    }

    #[test]
    fn typed_converter_round_trips() {
        let c = Converter::typed(Celsius);
        assert_eq!(c.name(), "Celsius");
        let slot = (c.deserializer().unwrap())(&json!("21.5C")).unwrap();
        assert_eq!(slot.downcast_ref::<f64>(), Some(&21.5));
        let back = (c.serializer().unwrap())(&slot).unwrap();
        assert_eq!(back, json!("21.5C"));
    }

    #[test]
    fn typed_converter_rejects_foreign_slots() {
        let c = Converter::typed(Celsius);
        let err = (c.serializer().unwrap())(&FieldValue::Json(json!(1))).unwrap_err();
        assert!(err.to_string().contains("f64"));
    }
}
