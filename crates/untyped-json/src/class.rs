//! Class definitions: identity, ancestry, plain fields and runtime members.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::instance::{FieldValue, Instance};

/// Member name that is never copied between classes.
pub(crate) const CONSTRUCTOR: &str = "constructor";

/// Identity handle of a class defined in a [`Registry`](crate::Registry).
///
/// Handles are only meaningful for the registry that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId {
    pub(crate) registry: u32,
    pub(crate) index: u32,
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}.{}", self.registry, self.index)
    }
}

/// A method callable on an instance.
pub type MethodFn = Arc<dyn Fn(&Instance, &[Value]) -> Value + Send + Sync>;

/// A computed, read-only accessor.
pub type GetterFn = Arc<dyn Fn(&Instance) -> Value + Send + Sync>;

/// A runtime member attached to a class and copied onto its instances.
#[derive(Clone)]
pub enum Member {
    Method(MethodFn),
    Getter(GetterFn),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method"),
            Self::Getter(_) => f.write_str("Getter"),
        }
    }
}

/// A defined class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub(crate) id: ClassId,
    pub(crate) name: Arc<str>,
    pub(crate) parent: Option<ClassId>,
    /// This class followed by its ancestors, most-derived first.
    pub(crate) lineage: Vec<ClassId>,
    /// Plain fields, with the default each blank instance starts with.
    pub(crate) fields: IndexMap<String, Option<FieldValue>>,
    pub(crate) members: IndexMap<String, Member>,
}

impl ClassDef {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    pub fn lineage(&self) -> &[ClassId] {
        &self.lineage
    }

    /// Names of plain fields declared directly on this class.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn declares_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }
}
