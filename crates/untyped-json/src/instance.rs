//! Runtime instances of defined classes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::class::{ClassId, Member};

/// An opaque value produced by a converter.
///
/// Two custom values are equal only if they share the same allocation.
#[derive(Clone)]
pub struct CustomValue(Arc<dyn Any + Send + Sync>);

impl CustomValue {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomValue(..)")
    }
}

/// The value held in one instance slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    Object(Box<Instance>),
    Objects(Vec<Instance>),
    Custom(CustomValue),
}

impl FieldValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Self::Object(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&[Instance]> {
        match self {
            Self::Objects(list) => Some(list),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Custom(custom) => custom.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<Instance> for FieldValue {
    fn from(value: Instance) -> Self {
        Self::Object(Box::new(value))
    }
}

impl From<Vec<Instance>> for FieldValue {
    fn from(value: Vec<Instance>) -> Self {
        Self::Objects(value)
    }
}

/// An object of a defined class: ordered field slots plus a member table.
///
/// Create blank instances with [`Registry::instantiate`](crate::Registry::instantiate).
#[derive(Clone)]
pub struct Instance {
    class: ClassId,
    class_name: Arc<str>,
    fields: IndexMap<String, FieldValue>,
    members: IndexMap<String, Member>,
}

impl Instance {
    pub(crate) fn new(
        class: ClassId,
        class_name: Arc<str>,
        fields: IndexMap<String, FieldValue>,
        members: IndexMap<String, Member>,
    ) -> Self {
        Self {
            class,
            class_name,
            fields,
            members,
        }
    }

    /// The class this instance was constructed as.
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_json(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(FieldValue::as_json)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get_json(name).and_then(Value::as_str)
    }

    pub fn get_object(&self, name: &str) -> Option<&Instance> {
        self.get(name).and_then(FieldValue::as_object)
    }

    pub fn get_objects(&self, name: &str) -> Option<&[Instance]> {
        self.get(name).and_then(FieldValue::as_objects)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Sets a slot, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.shift_remove(name)
    }

    /// Slots in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Invokes a method member. Returns `None` if no such method exists.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        match self.members.get(name)? {
            Member::Method(f) => Some(f(self, args)),
            Member::Getter(_) => None,
        }
    }

    /// Evaluates a getter member. Returns `None` if no such getter exists.
    pub fn getter(&self, name: &str) -> Option<Value> {
        match self.members.get(name)? {
            Member::Getter(f) => Some(f(self)),
            Member::Method(_) => None,
        }
    }

    pub(crate) fn into_parts(self) -> (IndexMap<String, FieldValue>, IndexMap<String, Member>) {
        (self.fields, self.members)
    }

    /// Installs a member, replacing any member of the same name.
    pub(crate) fn insert_member(&mut self, name: &str, member: &Member) {
        self.members.insert(name.to_string(), member.clone());
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.fields == other.fields
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(&self.class_name)
            .field("fields", &self.fields)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}
