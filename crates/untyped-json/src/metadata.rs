//! Per-class mapping metadata.
//!
//! Each class owns at most one [`TypeDescriptor`], created lazily the first
//! time metadata is written for it. Descriptors hold only what was declared on
//! that class; ancestors are never merged in at registration time.

use std::borrow::Cow;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::class::ClassId;
use crate::kind::{DeserializeType, NullabilityPolicy};

/// How one property maps to the JSON side.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub external_key: String,
    pub declared_type: DeserializeType,
    pub is_array: bool,
    pub is_nested: bool,
    pub nullability: NullabilityPolicy,
    explicit_nullability: bool,
}

impl PropertyDescriptor {
    /// A descriptor whose nullability resolves from the owning class's
    /// options when registered.
    pub fn new(external_key: impl Into<String>, declared_type: impl Into<DeserializeType>) -> Self {
        let declared_type = declared_type.into();
        Self {
            external_key: external_key.into(),
            is_array: declared_type.is_array(),
            is_nested: declared_type.is_nested(),
            declared_type,
            nullability: NullabilityPolicy::default(),
            explicit_nullability: false,
        }
    }

    pub fn with_nullability(mut self, nullability: NullabilityPolicy) -> Self {
        self.nullability = nullability;
        self.explicit_nullability = true;
        self
    }

    /// True if the policy was given at declaration rather than defaulted.
    pub fn has_explicit_nullability(&self) -> bool {
        self.explicit_nullability
    }

    fn resolve_nullability(&mut self, options: &TypeOptions) {
        if !self.explicit_nullability {
            self.nullability = options.default_nullability_mode.unwrap_or_default();
        }
    }
}

/// Options declared on one class. They do not apply to subclasses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeOptions {
    /// Policy for properties declared without one.
    pub default_nullability_mode: Option<NullabilityPolicy>,
    /// Fill plain fields from source keys of the same name.
    #[serde(alias = "mapClassProperties")]
    pub map_unknown_properties_by_name: bool,
}

/// Metadata declared directly on one class.
#[derive(Debug, Clone, Default)]
pub struct TypeDescriptor {
    properties: IndexMap<String, PropertyDescriptor>,
    mixins: Vec<ClassId>,
    options: TypeOptions,
}

impl TypeDescriptor {
    /// Properties in declaration order, keyed by instance property name.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyDescriptor)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// The property mapped to `key` on the JSON side.
    pub fn property_by_key(&self, key: &str) -> Option<(&str, &PropertyDescriptor)> {
        self.properties()
            .find(|(_, descriptor)| descriptor.external_key == key)
    }

    pub fn external_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.values().map(|p| p.external_key.as_str())
    }

    pub fn mixins(&self) -> &[ClassId] {
        &self.mixins
    }

    pub fn options(&self) -> &TypeOptions {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.mixins.is_empty()
    }
}

/// Registry of class descriptors keyed by class identity.
#[derive(Debug, Default)]
pub struct MetadataStore {
    descriptors: HashMap<ClassId, TypeDescriptor>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The class's own descriptor, or an empty one if nothing was declared.
    ///
    /// Ancestors are not consulted.
    pub fn get_or_create(&self, class: ClassId) -> Cow<'_, TypeDescriptor> {
        match self.descriptors.get(&class) {
            Some(descriptor) => Cow::Borrowed(descriptor),
            None => Cow::Owned(TypeDescriptor::default()),
        }
    }

    pub fn get(&self, class: ClassId) -> Option<&TypeDescriptor> {
        self.descriptors.get(&class)
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.descriptors.contains_key(&class)
    }

    fn entry(&mut self, class: ClassId) -> &mut TypeDescriptor {
        self.descriptors.entry(class).or_default()
    }

    /// Inserts or replaces a property on the class's own descriptor,
    /// returning the replaced one.
    pub fn register_property(
        &mut self,
        class: ClassId,
        name: impl Into<String>,
        mut descriptor: PropertyDescriptor,
    ) -> Option<PropertyDescriptor> {
        let entry = self.entry(class);
        descriptor.resolve_nullability(&entry.options);
        entry.properties.insert(name.into(), descriptor)
    }

    /// Replaces the class's mixin list.
    pub fn register_mixins(&mut self, class: ClassId, donors: Vec<ClassId>) {
        self.entry(class).mixins = donors;
    }

    /// Replaces the class's options and re-resolves defaulted policies.
    pub fn register_options(&mut self, class: ClassId, options: TypeOptions) {
        let entry = self.entry(class);
        for property in entry.properties.values_mut() {
            property.resolve_nullability(&options);
        }
        entry.options = options;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ValueKind;

    fn class(index: u32) -> ClassId {
        ClassId { registry: 0, index }
    }

    #[test]
    fn get_or_create_synthesizes_empty() {
        let store = MetadataStore::new();
        let descriptor = store.get_or_create(class(0));
        assert!(descriptor.is_empty());
        assert_eq!(descriptor.options(), &TypeOptions::default());
        assert!(!store.contains(class(0)));
    }

    #[test]
    fn properties_keep_declaration_order() {
        let mut store = MetadataStore::new();
        store.register_property(class(0), "b", PropertyDescriptor::new("b", ValueKind::String));
        store.register_property(class(0), "a", PropertyDescriptor::new("a", ValueKind::Number));
        let names: Vec<&str> = store
            .get(class(0))
            .unwrap()
            .properties()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn register_property_overwrites() {
        let mut store = MetadataStore::new();
        store.register_property(class(0), "a", PropertyDescriptor::new("x", ValueKind::String));
        let old = store.register_property(class(0), "a", PropertyDescriptor::new("y", ValueKind::String));
        assert_eq!(old.unwrap().external_key, "x");
        let descriptor = store.get(class(0)).unwrap();
        assert_eq!(descriptor.property("a").unwrap().external_key, "y");
        assert_eq!(descriptor.property_by_key("y").unwrap().0, "a");
    }

    #[test]
    fn mixins_are_replaced() {
        let mut store = MetadataStore::new();
        store.register_mixins(class(0), vec![class(1)]);
        store.register_mixins(class(0), vec![class(2), class(3)]);
        assert_eq!(store.get(class(0)).unwrap().mixins(), &[class(2), class(3)]);
    }

    #[test]
    fn options_resolve_defaulted_nullability_in_any_order() {
        let mut store = MetadataStore::new();
        let ignore = TypeOptions {
            default_nullability_mode: Some(NullabilityPolicy::Ignore),
            ..Default::default()
        };
        store.register_property(class(0), "before", PropertyDescriptor::new("b", ValueKind::String));
        store.register_property(
            class(0),
            "explicit",
            PropertyDescriptor::new("e", ValueKind::String).with_nullability(NullabilityPolicy::Pass),
        );
        store.register_options(class(0), ignore);
        store.register_property(class(0), "after", PropertyDescriptor::new("a", ValueKind::String));

        let descriptor = store.get(class(0)).unwrap();
        assert_eq!(descriptor.property("before").unwrap().nullability, NullabilityPolicy::Ignore);
        assert_eq!(descriptor.property("after").unwrap().nullability, NullabilityPolicy::Ignore);
        assert_eq!(descriptor.property("explicit").unwrap().nullability, NullabilityPolicy::Pass);
    }

    #[test]
    fn options_are_not_shared_between_classes() {
        let mut store = MetadataStore::new();
        store.register_options(
            class(0),
            TypeOptions {
                default_nullability_mode: Some(NullabilityPolicy::Ignore),
                ..Default::default()
            },
        );
        store.register_property(class(1), "t", PropertyDescriptor::new("t", ValueKind::String));
        assert_eq!(
            store.get(class(1)).unwrap().property("t").unwrap().nullability,
            NullabilityPolicy::Map
        );
    }

    #[test]
    fn type_options_from_json() {
        let options: TypeOptions = serde_json::from_value(serde_json::json!({
            "defaultNullabilityMode": "ignore",
            "mapUnknownPropertiesByName": true
        }))
        .unwrap();
        assert_eq!(options.default_nullability_mode, Some(NullabilityPolicy::Ignore));
        assert!(options.map_unknown_properties_by_name);

        let options: TypeOptions =
            serde_json::from_value(serde_json::json!({ "mapClassProperties": true })).unwrap();
        assert!(options.map_unknown_properties_by_name);
    }
}
