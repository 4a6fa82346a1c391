//! Recursive conversion between JSON values and instances.
//!
//! Both directions walk the target class's lineage, most-derived first. At
//! every level the level's mixins are applied before its own properties, so
//! own properties win over mixin values. When deserializing, an ancestor's
//! property whose name a more-derived level already mapped is still verified
//! against the source but does not overwrite the derived value. When
//! serializing, such a property (or an already written external key) is
//! skipped.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::class::ClassId;
use crate::error::MapError;
use crate::instance::{FieldValue, Instance};
use crate::kind::{describe, DeserializeType, NullabilityPolicy, ValueKind};
use crate::metadata::PropertyDescriptor;
use crate::mixin;
use crate::options::{DeserializeOptions, SerializeOptions};
use crate::registry::Registry;
use crate::verify::{check_nullability, check_type, NullCheck};

/// Input accepted by [`ObjectMapper::deserialize`].
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// JSON text, parsed before mapping.
    Text(&'a str),
    /// An already parsed value.
    Value(&'a Value),
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for Source<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a Value> for Source<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Value(value)
    }
}

/// Property names and external keys handled so far in one walk.
#[derive(Debug, Default)]
pub(crate) struct Walk {
    pub(crate) names: HashSet<String>,
    pub(crate) keys: HashSet<String>,
}

impl Walk {
    pub(crate) fn absorb(&mut self, other: Walk) {
        self.names.extend(other.names);
        self.keys.extend(other.keys);
    }
}

/// Converts between JSON values and instances of classes in a [`Registry`].
#[derive(Debug, Clone, Copy)]
pub struct ObjectMapper<'r> {
    registry: &'r Registry,
}

impl<'r> ObjectMapper<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Builds an instance of `class` from a JSON object or JSON text.
    pub fn deserialize<'a>(
        &self,
        source: impl Into<Source<'a>>,
        class: ClassId,
        options: DeserializeOptions,
    ) -> Result<Instance, MapError> {
        let parsed;
        let value = match source.into() {
            Source::Text(text) => {
                parsed = serde_json::from_str::<Value>(text)?;
                &parsed
            }
            Source::Value(value) => value,
        };
        let Value::Object(object) = value else {
            return Err(MapError::NotAnObject {
                found: describe(value),
            });
        };
        debug!(
            class = %self.registry.class(class)?.name(),
            keys = object.len(),
            pass_unknown = options.pass_unknown_properties,
            "deserializing"
        );
        self.deserialize_object(object, class, options)
    }

    /// Writes an instance out as a JSON object.
    pub fn serialize(&self, instance: &Instance, options: SerializeOptions) -> Result<Value, MapError> {
        debug!(
            class = %instance.class_name(),
            pass_unknown = options.pass_unknown_properties,
            "serializing"
        );
        self.serialize_instance(instance, options)
    }

    fn deserialize_object(
        &self,
        source: &Map<String, Value>,
        class: ClassId,
        options: DeserializeOptions,
    ) -> Result<Instance, MapError> {
        let mut instance = self.registry.instantiate(class)?;
        let mut walk = Walk::default();
        self.apply_class(&mut instance, source, class, options, &mut walk)?;
        if options.pass_unknown_properties {
            for (key, value) in source {
                if walk.keys.contains(key) || walk.names.contains(key) {
                    continue;
                }
                trace!(key = %key, "passing unknown property");
                instance.set(key.clone(), value.clone());
            }
        }
        Ok(instance)
    }

    /// Maps `source` onto `instance` following `class`'s lineage.
    pub(crate) fn apply_class(
        &self,
        instance: &mut Instance,
        source: &Map<String, Value>,
        class: ClassId,
        options: DeserializeOptions,
        walk: &mut Walk,
    ) -> Result<(), MapError> {
        for level in self.registry.class(class)?.lineage() {
            let descriptor = self.registry.descriptor(*level);
            let mut handled = Walk::default();
            mixin::deserialize_mixins(
                self,
                instance,
                source,
                descriptor.mixins(),
                options,
                walk,
                &mut handled,
            )?;
            for (name, property) in descriptor.properties() {
                handled.names.insert(name.to_string());
                handled.keys.insert(property.external_key.clone());
                if walk.names.contains(name) {
                    check_property(instance, source, name, property)?;
                    trace!(property = %name, level = %level, "verified shadowed property");
                    continue;
                }
                self.deserialize_property(instance, source, name, property, options)?;
            }
            if descriptor.options().map_unknown_properties_by_name || options.map_class_properties {
                for field in self.registry.class(*level)?.field_names() {
                    if walk.names.contains(field) || handled.names.contains(field) || handled.keys.contains(field) {
                        continue;
                    }
                    if let Some(value) = source.get(field) {
                        trace!(field = %field, "mapping plain field by name");
                        instance.set(field, value.clone());
                        handled.keys.insert(field.to_string());
                    }
                }
            }
            walk.absorb(handled);
        }
        Ok(())
    }

    fn deserialize_property(
        &self,
        instance: &mut Instance,
        source: &Map<String, Value>,
        name: &str,
        property: &PropertyDescriptor,
        options: DeserializeOptions,
    ) -> Result<(), MapError> {
        let key = property.external_key.as_str();
        match check_property(instance, source, name, property)? {
            Checked::Skip => {
                trace!(property = %name, key = %key, "ignoring null or absent value");
            }
            Checked::Forward(raw) => {
                trace!(property = %name, key = %key, "forwarding null or absent value");
                match raw {
                    Some(value) => instance.set(name, value.clone()),
                    None => instance.remove(name),
                };
            }
            Checked::Map(declared, raw) => {
                let value = self.read_value(name, key, &declared, raw, options)?;
                trace!(property = %name, key = %key, "mapped property");
                instance.set(name, value);
            }
        }
        Ok(())
    }

    fn read_value(
        &self,
        property: &str,
        key: &str,
        declared: &DeserializeType,
        raw: &Value,
        options: DeserializeOptions,
    ) -> Result<FieldValue, MapError> {
        match declared {
            DeserializeType::Converter(converter) => {
                let deserialize = converter
                    .deserializer()
                    .ok_or_else(|| MapError::IncompleteConverter {
                        property: property.to_string(),
                        converter: converter.name().to_string(),
                        missing: "deserialize",
                    })?;
                deserialize(raw).map_err(|source| MapError::Conversion {
                    key: key.to_string(),
                    source,
                })
            }
            DeserializeType::Class(class) => {
                let object = expect_object(key, raw)?;
                Ok(self.deserialize_object(object, *class, options)?.into())
            }
            DeserializeType::ClassArray(class) => {
                let items = raw.as_array().map(Vec::as_slice).unwrap_or_default();
                let objects = items
                    .iter()
                    .map(|item| self.deserialize_object(expect_object(key, item)?, *class, options))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FieldValue::Objects(objects))
            }
            DeserializeType::Kind(_) | DeserializeType::KindArray(_) | DeserializeType::Infer => {
                Ok(FieldValue::Json(raw.clone()))
            }
        }
    }

    fn serialize_instance(&self, instance: &Instance, options: SerializeOptions) -> Result<Value, MapError> {
        let mut out = Map::new();
        let mut walk = Walk::default();
        self.write_class(instance, instance.class(), &mut out, options, &mut walk)?;
        if options.pass_unknown_properties {
            for (name, slot) in instance.fields() {
                if walk.names.contains(name) || out.contains_key(name) {
                    continue;
                }
                match self.slot_to_json(slot, options)? {
                    Some(value) => {
                        trace!(field = %name, "passing unknown field");
                        out.insert(name.to_string(), value);
                    }
                    None => debug!(field = %name, "skipping custom slot without a converter"),
                }
            }
        }
        Ok(Value::Object(out))
    }

    /// Writes `instance` into `out` following `class`'s lineage.
    pub(crate) fn write_class(
        &self,
        instance: &Instance,
        class: ClassId,
        out: &mut Map<String, Value>,
        options: SerializeOptions,
        walk: &mut Walk,
    ) -> Result<(), MapError> {
        for level in self.registry.class(class)?.lineage() {
            let descriptor = self.registry.descriptor(*level);
            let mut handled = Walk::default();
            mixin::serialize_mixins(self, instance, descriptor.mixins(), out, options, walk, &mut handled)?;
            for (name, property) in descriptor.properties() {
                handled.names.insert(name.to_string());
                handled.keys.insert(property.external_key.clone());
                if walk.names.contains(name) || walk.keys.contains(&property.external_key) {
                    continue;
                }
                self.serialize_property(instance, name, property, out, options)?;
            }
            if descriptor.options().map_unknown_properties_by_name {
                for field in self.registry.class(*level)?.field_names() {
                    if walk.names.contains(field)
                        || handled.names.contains(field)
                        || walk.keys.contains(field)
                        || out.contains_key(field)
                    {
                        continue;
                    }
                    if let Some(value) = instance.get(field) {
                        if let Some(value) = self.slot_to_json(value, options)? {
                            out.insert(field.to_string(), value);
                            handled.keys.insert(field.to_string());
                        }
                    }
                }
            }
            walk.absorb(handled);
        }
        Ok(())
    }

    fn serialize_property(
        &self,
        instance: &Instance,
        name: &str,
        property: &PropertyDescriptor,
        out: &mut Map<String, Value>,
        options: SerializeOptions,
    ) -> Result<(), MapError> {
        let key = &property.external_key;
        let Some(slot) = instance.get(name) else {
            trace!(property = %name, "omitting absent property");
            return Ok(());
        };
        if slot.is_null() {
            if property.nullability != NullabilityPolicy::Ignore {
                out.insert(key.clone(), Value::Null);
            }
            return Ok(());
        }
        let declared = resolve_declared(name, property, Some(slot))?;
        let value = match &*declared {
            DeserializeType::Converter(converter) => {
                let serialize = converter
                    .serializer()
                    .ok_or_else(|| MapError::IncompleteConverter {
                        property: name.to_string(),
                        converter: converter.name().to_string(),
                        missing: "serialize",
                    })?;
                serialize(slot).map_err(|source| MapError::Conversion {
                    key: key.clone(),
                    source,
                })?
            }
            other => self
                .slot_to_json(slot, options)?
                .ok_or_else(|| MapError::TypeMismatch {
                    key: key.clone(),
                    expected: other.describe(),
                    found: "a custom value".to_string(),
                })?,
        };
        trace!(property = %name, key = %key, "wrote property");
        out.insert(key.clone(), value);
        Ok(())
    }

    /// JSON form of a slot, or `None` for custom slots.
    fn slot_to_json(&self, slot: &FieldValue, options: SerializeOptions) -> Result<Option<Value>, MapError> {
        match slot {
            FieldValue::Json(value) => Ok(Some(value.clone())),
            FieldValue::Object(instance) => self.serialize_instance(instance, options).map(Some),
            FieldValue::Objects(instances) => instances
                .iter()
                .map(|instance| self.serialize_instance(instance, options))
                .collect::<Result<Vec<_>, _>>()
                .map(|items| Some(Value::Array(items))),
            FieldValue::Custom(_) => Ok(None),
        }
    }
}

/// What to do with one property after its source value passed verification.
enum Checked<'p, 's> {
    /// Leave the instance as is.
    Skip,
    /// Copy the null (or absence) through unchecked.
    Forward(Option<&'s Value>),
    /// Map the value according to the resolved declared type.
    Map(Cow<'p, DeserializeType>, &'s Value),
}

/// Runs the nullability gate, then the type check on present values.
///
/// The declared type is only resolved once the value is known to be present,
/// so an `Ignore` or `Pass` property that cannot be inferred is still skipped.
fn check_property<'p, 's>(
    instance: &Instance,
    source: &'s Map<String, Value>,
    name: &str,
    property: &'p PropertyDescriptor,
) -> Result<Checked<'p, 's>, MapError> {
    let key = property.external_key.as_str();
    let raw = source.get(key);
    let resolved = resolve_declared(name, property, instance.get(name));
    let described = resolved.as_ref().map(|d| &**d).unwrap_or(&property.declared_type);
    match (check_nullability(key, property.nullability, described, raw)?, raw) {
        (NullCheck::Skip, _) | (NullCheck::Present, None) => Ok(Checked::Skip),
        (NullCheck::Forward, _) => Ok(Checked::Forward(raw)),
        (NullCheck::Present, Some(value)) => {
            let declared = resolved?;
            check_type(key, name, &declared, value)?;
            Ok(Checked::Map(declared, value))
        }
    }
}

/// The declared type, inferring it from the current slot when not given.
fn resolve_declared<'p>(
    name: &str,
    property: &'p PropertyDescriptor,
    current: Option<&FieldValue>,
) -> Result<Cow<'p, DeserializeType>, MapError> {
    if !matches!(property.declared_type, DeserializeType::Infer) {
        return Ok(Cow::Borrowed(&property.declared_type));
    }
    let inferred = match current {
        Some(FieldValue::Json(Value::Array(_))) => Some(DeserializeType::KindArray(vec![ValueKind::Any])),
        Some(FieldValue::Json(value)) => ValueKind::of(value).map(DeserializeType::Kind),
        Some(FieldValue::Object(instance)) => Some(DeserializeType::Class(instance.class())),
        Some(FieldValue::Objects(instances)) => instances
            .first()
            .map(|instance| DeserializeType::ClassArray(instance.class())),
        Some(FieldValue::Custom(_)) | None => None,
    };
    inferred
        .map(Cow::Owned)
        .ok_or_else(|| MapError::UninferableType {
            property: name.to_string(),
        })
}

fn expect_object<'v>(key: &str, value: &'v Value) -> Result<&'v Map<String, Value>, MapError> {
    value.as_object().ok_or_else(|| MapError::TypeMismatch {
        key: key.to_string(),
        expected: "an object".to_string(),
        found: describe(value).to_string(),
    })
}
