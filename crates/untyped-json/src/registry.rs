//! Class table and metadata registration.
//!
//! All writes go through `&mut Registry`; conversions borrow it shared. Once
//! every class is defined and annotated, the registry can be shared freely
//! (for example behind an `Arc`) and read from any thread.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::class::{ClassDef, ClassId, Member};
use crate::error::RegistryError;
use crate::instance::{FieldValue, Instance};
use crate::kind::{DeserializeType, NullabilityPolicy};
use crate::mapper::ObjectMapper;
use crate::metadata::{MetadataStore, PropertyDescriptor, TypeDescriptor, TypeOptions};

static NEXT_REGISTRY: AtomicU32 = AtomicU32::new(0);

/// Owns every defined class and its mapping metadata.
#[derive(Debug)]
pub struct Registry {
    serial: u32,
    classes: Vec<ClassDef>,
    metadata: MetadataStore,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            serial: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            classes: Vec::new(),
            metadata: MetadataStore::new(),
        }
    }

    /// Starts defining a new class.
    pub fn define_class(&mut self, name: impl Into<String>) -> ClassBuilder<'_> {
        ClassBuilder {
            registry: self,
            name: name.into(),
            parent: None,
            fields: IndexMap::new(),
            members: IndexMap::new(),
        }
    }

    pub fn class(&self, id: ClassId) -> Result<&ClassDef, RegistryError> {
        if id.registry != self.serial {
            return Err(RegistryError::UnknownClass(id));
        }
        self.classes
            .get(id.index as usize)
            .ok_or(RegistryError::UnknownClass(id))
    }

    /// Looks up a class by name. Later definitions shadow earlier ones.
    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .rev()
            .find(|class| &*class.name == name)
            .map(|class| class.id)
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// The class's own descriptor, synthesized empty if none was declared.
    pub fn descriptor(&self, id: ClassId) -> Cow<'_, TypeDescriptor> {
        self.metadata.get_or_create(id)
    }

    /// Builds a blank instance: defaults and members are applied from the
    /// root ancestor down, so subclasses override.
    pub fn instantiate(&self, id: ClassId) -> Result<Instance, RegistryError> {
        let class = self.class(id)?;
        let mut fields = IndexMap::new();
        let mut members = IndexMap::new();
        for ancestor in class.lineage.iter().rev() {
            let ancestor = self.class(*ancestor)?;
            for (name, default) in &ancestor.fields {
                match default {
                    Some(value) => {
                        fields.insert(name.clone(), value.clone());
                    }
                    None => {
                        fields.shift_remove(name);
                    }
                }
            }
            for (name, member) in &ancestor.members {
                members.insert(name.clone(), member.clone());
            }
        }
        Ok(Instance::new(id, Arc::clone(&class.name), fields, members))
    }

    /// Declares how property `property` of `class` maps to `external_key`.
    ///
    /// Without an explicit `nullability`, the class's own default applies.
    pub fn attach_property(
        &mut self,
        class: ClassId,
        property: impl Into<String>,
        external_key: impl Into<String>,
        declared_type: impl Into<DeserializeType>,
        nullability: Option<NullabilityPolicy>,
    ) -> Result<(), RegistryError> {
        let class_name = self.class(class)?.name.to_string();
        let property = property.into();
        let mut descriptor = PropertyDescriptor::new(external_key, declared_type);
        if let Some(nested) = descriptor.declared_type.class() {
            self.class(nested)?;
        }
        if let Some(policy) = nullability {
            descriptor = descriptor.with_nullability(policy);
        }
        if let Some(own) = self.metadata.get(class) {
            if let Some((existing, _)) = own.property_by_key(&descriptor.external_key) {
                if existing != property {
                    return Err(RegistryError::DuplicateExternalKey {
                        class: class_name,
                        key: descriptor.external_key,
                        existing: existing.to_string(),
                    });
                }
            }
        }
        debug!(
            class = %class_name,
            property = %property,
            key = %descriptor.external_key,
            declared = %descriptor.declared_type.describe(),
            "attached property"
        );
        self.metadata.register_property(class, property, descriptor);
        Ok(())
    }

    /// Replaces the mixin list of `class`.
    pub fn attach_mixins(&mut self, class: ClassId, donors: &[ClassId]) -> Result<(), RegistryError> {
        let class_name = self.class(class)?.name.to_string();
        for donor in donors {
            let donor_def = self.class(*donor)?;
            if self.reaches(*donor, class) {
                return Err(RegistryError::MixinCycle {
                    class: class_name,
                    donor: donor_def.name.to_string(),
                });
            }
        }
        debug!(class = %class_name, mixins = donors.len(), "attached mixins");
        self.metadata.register_mixins(class, donors.to_vec());
        Ok(())
    }

    pub fn attach_options(&mut self, class: ClassId, options: TypeOptions) -> Result<(), RegistryError> {
        let class_name = self.class(class)?.name.to_string();
        debug!(class = %class_name, ?options, "attached options");
        self.metadata.register_options(class, options);
        Ok(())
    }

    /// A mapper reading from this registry.
    pub fn mapper(&self) -> ObjectMapper<'_> {
        ObjectMapper::new(self)
    }

    /// True if converting `from` can end up converting `target`, following
    /// both ancestor and mixin edges.
    fn reaches(&self, from: ClassId, target: ClassId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            let Ok(class) = self.class(next) else {
                continue;
            };
            for ancestor in &class.lineage {
                if *ancestor == target {
                    return true;
                }
                if let Some(descriptor) = self.metadata.get(*ancestor) {
                    stack.extend(descriptor.mixins().iter().copied());
                }
            }
        }
        false
    }
}

/// Builder returned by [`Registry::define_class`].
pub struct ClassBuilder<'r> {
    registry: &'r mut Registry,
    name: String,
    parent: Option<ClassId>,
    fields: IndexMap<String, Option<FieldValue>>,
    members: IndexMap<String, Member>,
}

impl ClassBuilder<'_> {
    pub fn extends(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declares a plain field with a default value.
    pub fn field(mut self, name: impl Into<String>, default: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), Some(default.into()));
        self
    }

    /// Declares a plain field that starts out unset.
    pub fn field_unset(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), None);
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.members.insert(name.into(), Member::Method(Arc::new(f)));
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Instance) -> Value + Send + Sync + 'static,
    {
        self.members.insert(name.into(), Member::Getter(Arc::new(f)));
        self
    }

    pub fn build(self) -> Result<ClassId, RegistryError> {
        let registry = self.registry;
        let id = ClassId {
            registry: registry.serial,
            index: registry.classes.len() as u32,
        };
        let mut lineage = vec![id];
        if let Some(parent) = self.parent {
            lineage.extend_from_slice(&registry.class(parent)?.lineage);
        }
        debug!(class = %self.name, %id, depth = lineage.len(), "defined class");
        registry.classes.push(ClassDef {
            id,
            name: Arc::from(self.name),
            parent: self.parent,
            lineage,
            fields: self.fields,
            members: self.members,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ValueKind;
    use serde_json::json;

    #[test]
    fn lineage_is_most_derived_first() {
        let mut registry = Registry::new();
        let base = registry.define_class("Base").build().unwrap();
        let mid = registry.define_class("Mid").extends(base).build().unwrap();
        let leaf = registry.define_class("Leaf").extends(mid).build().unwrap();
        assert_eq!(registry.class(leaf).unwrap().lineage(), &[leaf, mid, base]);
        assert_eq!(registry.class(leaf).unwrap().parent(), Some(mid));
        assert_eq!(registry.find_class("Mid"), Some(mid));
    }

    #[test]
    fn instantiate_applies_defaults_root_first() {
        let mut registry = Registry::new();
        let base = registry
            .define_class("Base")
            .field("a", "base")
            .field("b", "base")
            .field("c", "base")
            .build()
            .unwrap();
        let child = registry
            .define_class("Child")
            .extends(base)
            .field("b", "child")
            .field_unset("c")
            .build()
            .unwrap();
        let instance = registry.instantiate(child).unwrap();
        assert_eq!(instance.get_str("a"), Some("base"));
        assert_eq!(instance.get_str("b"), Some("child"));
        assert!(!instance.contains("c"));
        assert_eq!(instance.class_name(), "Child");
    }

    #[test]
    fn instantiate_installs_members() {
        let mut registry = Registry::new();
        let class = registry
            .define_class("Greeter")
            .field("name", "bob")
            .method("greet", |this, _| json!(format!("hi {}", this.get_str("name").unwrap_or(""))))
            .getter("upper", |this| json!(this.get_str("name").unwrap_or("").to_uppercase()))
            .build()
            .unwrap();
        let instance = registry.instantiate(class).unwrap();
        assert_eq!(instance.call("greet", &[]), Some(json!("hi bob")));
        assert_eq!(instance.getter("upper"), Some(json!("BOB")));
        assert_eq!(instance.call("upper", &[]), None);
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut other = Registry::new();
        let foreign = other.define_class("Foreign").build().unwrap();
        let registry = Registry::new();
        assert_eq!(
            registry.class(foreign).unwrap_err(),
            RegistryError::UnknownClass(foreign)
        );
    }

    #[test]
    fn duplicate_external_key_is_rejected() {
        let mut registry = Registry::new();
        let class = registry.define_class("Dup").build().unwrap();
        registry
            .attach_property(class, "a", "k", ValueKind::String, None)
            .unwrap();
        registry
            .attach_property(class, "a", "k", ValueKind::Number, None)
            .unwrap();
        let err = registry
            .attach_property(class, "b", "k", ValueKind::String, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateExternalKey { ref existing, .. } if existing == "a"));
    }

    #[test]
    fn same_key_on_parent_and_child_is_allowed() {
        let mut registry = Registry::new();
        let base = registry.define_class("Base").build().unwrap();
        let child = registry.define_class("Child").extends(base).build().unwrap();
        registry
            .attach_property(base, "a", "k", ValueKind::String, None)
            .unwrap();
        registry
            .attach_property(child, "b", "k", ValueKind::String, None)
            .unwrap();
    }

    #[test]
    fn mixin_cycles_are_rejected() {
        let mut registry = Registry::new();
        let a = registry.define_class("A").build().unwrap();
        let b = registry.define_class("B").build().unwrap();
        let c = registry.define_class("C").extends(a).build().unwrap();

        assert!(matches!(
            registry.attach_mixins(a, &[a]),
            Err(RegistryError::MixinCycle { .. })
        ));
        registry.attach_mixins(a, &[b]).unwrap();
        assert!(matches!(
            registry.attach_mixins(b, &[a]),
            Err(RegistryError::MixinCycle { .. })
        ));
        // C's ancestor A already mixes in B.
        assert!(matches!(
            registry.attach_mixins(b, &[c]),
            Err(RegistryError::MixinCycle { .. })
        ));
        registry.attach_mixins(c, &[b]).unwrap();
    }

    #[test]
    fn nested_class_must_exist() {
        let mut other = Registry::new();
        let foreign = other.define_class("Foreign").build().unwrap();
        let mut registry = Registry::new();
        let class = registry.define_class("Holder").build().unwrap();
        assert_eq!(
            registry.attach_property(class, "x", "x", foreign, None),
            Err(RegistryError::UnknownClass(foreign))
        );
    }
}
