//! untyped-json - declarative mapping between JSON values and object types.
//!
//! Classes are defined in a [`Registry`] and annotated with per-property
//! mapping metadata (external key, declared type, nullability policy),
//! mixins and per-class options. An [`ObjectMapper`] then walks that metadata
//! to deserialize JSON objects into validated [`Instance`]s and to serialize
//! instances back.
//!
//! ```
//! use serde_json::json;
//! use untyped_json::{DeserializeOptions, Registry, SerializeOptions, ValueKind};
//!
//! let mut registry = Registry::new();
//! let point = registry.define_class("Point").build()?;
//! registry.attach_property(point, "x", "x", ValueKind::Number, None)?;
//! registry.attach_property(point, "label", "name", ValueKind::String, None)?;
//!
//! let mapper = registry.mapper();
//! let instance = mapper.deserialize(
//!     &json!({ "x": 1, "name": "origin" }),
//!     point,
//!     DeserializeOptions::default(),
//! )?;
//! assert_eq!(instance.get_str("label"), Some("origin"));
//!
//! let out = mapper.serialize(&instance, SerializeOptions::default())?;
//! assert_eq!(out, json!({ "x": 1, "name": "origin" }));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod class;
pub mod converter;
pub mod error;
pub mod instance;
pub mod kind;
pub mod mapper;
pub mod metadata;
mod mixin;
pub mod options;
pub mod registry;
pub mod verify;

pub use class::{ClassDef, ClassId, GetterFn, Member, MethodFn};
pub use converter::{Converter, ConverterError, JsonConverter};
pub use error::{ErrorKind, MapError, RegistryError};
pub use instance::{CustomValue, FieldValue, Instance};
pub use kind::{DeserializeType, NullabilityPolicy, ValueKind};
pub use mapper::{ObjectMapper, Source};
pub use metadata::{MetadataStore, PropertyDescriptor, TypeDescriptor, TypeOptions};
pub use options::{DeserializeOptions, SerializeOptions};
pub use registry::{ClassBuilder, Registry};
