//! Serialization of instances back into JSON objects.

use serde_json::json;
use untyped_json::{
    DeserializeOptions, FieldValue, NullabilityPolicy, Registry, SerializeOptions, ValueKind,
};

fn opts() -> SerializeOptions {
    SerializeOptions::default()
}

#[test]
fn scalar_properties_use_external_keys() {
    let mut registry = Registry::new();
    let class = registry.define_class("TestClass").build().unwrap();
    registry
        .attach_property(class, "int", "i", ValueKind::Number, None)
        .unwrap();
    registry
        .attach_property(class, "test", "t", ValueKind::String, None)
        .unwrap();

    let mut instance = registry.instantiate(class).unwrap();
    instance.set("int", json!(1));
    instance.set("test", "test");
    let out = registry.mapper().serialize(&instance, opts()).unwrap();
    assert_eq!(serde_json::to_string(&out).unwrap(), r#"{"i":1,"t":"test"}"#);
}

#[test]
fn scalar_arrays() {
    let mut registry = Registry::new();
    let class = registry.define_class("TestClass").build().unwrap();
    registry
        .attach_property(class, "tags", "t", [ValueKind::String], None)
        .unwrap();
    let mut instance = registry.instantiate(class).unwrap();
    instance.set("tags", json!(["a", "b"]));
    let out = registry.mapper().serialize(&instance, opts()).unwrap();
    assert_eq!(out, json!({ "t": ["a", "b"] }));
}

#[test]
fn nested_and_nested_arrays() {
    let mut registry = Registry::new();
    let child = registry.define_class("Child").build().unwrap();
    registry
        .attach_property(child, "name", "n", ValueKind::String, None)
        .unwrap();
    let parent = registry.define_class("Parent").build().unwrap();
    registry
        .attach_property(parent, "first", "f", child, None)
        .unwrap();
    registry
        .attach_property(parent, "rest", "r", [child], None)
        .unwrap();

    let make = |name: &str| {
        let mut c = registry.instantiate(child).unwrap();
        c.set("name", name);
        c
    };
    let mut instance = registry.instantiate(parent).unwrap();
    instance.set("first", make("a"));
    instance.set("rest", vec![make("b"), make("c")]);

    let out = registry.mapper().serialize(&instance, opts()).unwrap();
    assert_eq!(
        out,
        json!({ "f": { "n": "a" }, "r": [{ "n": "b" }, { "n": "c" }] })
    );
}

#[test]
fn subclass_writes_derived_keys_first() {
    let mut registry = Registry::new();
    let base = registry.define_class("Base").build().unwrap();
    registry
        .attach_property(base, "id", "id", ValueKind::Number, None)
        .unwrap();
    let child = registry.define_class("Child").extends(base).build().unwrap();
    registry
        .attach_property(child, "name", "name", ValueKind::String, None)
        .unwrap();

    let mut instance = registry.instantiate(child).unwrap();
    instance.set("id", json!(1));
    instance.set("name", "x");
    let out = registry.mapper().serialize(&instance, opts()).unwrap();
    assert_eq!(serde_json::to_string(&out).unwrap(), r#"{"name":"x","id":1}"#);
}

#[test]
fn absent_slots_are_omitted_and_null_ignore_is_dropped() {
    let mut registry = Registry::new();
    let class = registry.define_class("TestClass").build().unwrap();
    registry
        .attach_property(class, "mapped", "m", ValueKind::String, None)
        .unwrap();
    registry
        .attach_property(class, "passed", "p", ValueKind::String, Some(NullabilityPolicy::Pass))
        .unwrap();
    registry
        .attach_property(class, "ignored", "i", ValueKind::String, Some(NullabilityPolicy::Ignore))
        .unwrap();

    let mut instance = registry.instantiate(class).unwrap();
    instance.set("passed", json!(null));
    instance.set("ignored", json!(null));
    let out = registry.mapper().serialize(&instance, opts()).unwrap();
    assert_eq!(out, json!({ "p": null }));

    instance.set("mapped", json!(null));
    let out = registry.mapper().serialize(&instance, opts()).unwrap();
    assert_eq!(out, json!({ "m": null, "p": null }));
}

#[test]
fn custom_slot_without_converter_is_a_type_mismatch() {
    let mut registry = Registry::new();
    let class = registry.define_class("TestClass").build().unwrap();
    registry
        .attach_property(class, "when", "w", ValueKind::String, None)
        .unwrap();
    let mut instance = registry.instantiate(class).unwrap();
    instance.set("when", FieldValue::Custom(untyped_json::CustomValue::new(5_u8)));
    let err = registry.mapper().serialize(&instance, opts()).unwrap_err();
    assert_eq!(err.kind(), untyped_json::ErrorKind::TypeMismatch);
}

#[test]
fn concrete_round_trip() {
    let mut registry = Registry::new();
    let class = registry.define_class("TestClass").build().unwrap();
    registry
        .attach_property(class, "field", "t", ValueKind::String, None)
        .unwrap();
    let mapper = registry.mapper();
    let source = json!({ "t": "hi" });
    let instance = mapper
        .deserialize(&source, class, DeserializeOptions::default())
        .unwrap();
    assert_eq!(instance.get_str("field"), Some("hi"));
    assert_eq!(mapper.serialize(&instance, opts()).unwrap(), source);
}

#[test]
fn nested_round_trip_at_depth() {
    let mut registry = Registry::new();
    let node = registry.define_class("Node").build().unwrap();
    registry
        .attach_property(node, "value", "v", ValueKind::Number, None)
        .unwrap();
    let branch = registry.define_class("Branch").build().unwrap();
    registry
        .attach_property(branch, "nodes", "n", [node], None)
        .unwrap();
    let tree = registry.define_class("Tree").build().unwrap();
    registry
        .attach_property(tree, "left", "l", branch, None)
        .unwrap();
    registry
        .attach_property(tree, "right", "r", branch, None)
        .unwrap();

    let mapper = registry.mapper();
    let source = json!({
        "l": { "n": [{ "v": 1 }, { "v": 2 }] },
        "r": { "n": [] }
    });
    let instance = mapper
        .deserialize(&source, tree, DeserializeOptions::default())
        .unwrap();
    let out = mapper.serialize(&instance, opts()).unwrap();
    assert_eq!(out, source);
    let again = mapper
        .deserialize(&out, tree, DeserializeOptions::default())
        .unwrap();
    assert_eq!(again, instance);
}
