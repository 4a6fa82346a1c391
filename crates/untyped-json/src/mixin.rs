//! Mixin composition.
//!
//! A mixin donor is converted against the same source (or the same instance)
//! as if it were the target class, and the result is merged in. Donors are
//! applied in declaration order, so a later donor wins on a name collision.
//! Names already handled by a more-derived level are left alone. Runtime
//! members of donors, except `constructor`, are copied onto the instance and
//! replace members of the same name.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

use crate::class::{ClassId, Member, CONSTRUCTOR};
use crate::error::MapError;
use crate::instance::{FieldValue, Instance};
use crate::mapper::{ObjectMapper, Walk};
use crate::options::{DeserializeOptions, SerializeOptions};

pub(crate) fn deserialize_mixins(
    mapper: &ObjectMapper<'_>,
    instance: &mut Instance,
    source: &Map<String, Value>,
    donors: &[ClassId],
    options: DeserializeOptions,
    walk: &Walk,
    handled: &mut Walk,
) -> Result<(), MapError> {
    if donors.is_empty() {
        return Ok(());
    }
    let mut fields: IndexMap<String, FieldValue> = IndexMap::new();
    let mut members: IndexMap<String, Member> = IndexMap::new();
    for donor in donors {
        let mut composed = mapper.registry().instantiate(*donor)?;
        let mut donor_walk = Walk::default();
        mapper.apply_class(&mut composed, source, *donor, options, &mut donor_walk)?;
        trace!(mixin = %composed.class_name(), "deserialized mixin");
        handled.absorb(donor_walk);
        let (donor_fields, donor_members) = composed.into_parts();
        fields.extend(donor_fields);
        members.extend(
            donor_members
                .into_iter()
                .filter(|(name, _)| name != CONSTRUCTOR),
        );
    }
    for (name, value) in fields {
        if walk.names.contains(&name) {
            continue;
        }
        instance.set(name, value);
    }
    for (name, member) in &members {
        instance.insert_member(name, member);
    }
    Ok(())
}

pub(crate) fn serialize_mixins(
    mapper: &ObjectMapper<'_>,
    instance: &Instance,
    donors: &[ClassId],
    out: &mut Map<String, Value>,
    options: SerializeOptions,
    walk: &Walk,
    handled: &mut Walk,
) -> Result<(), MapError> {
    let mut merged = Map::new();
    for donor in donors {
        let mut donor_walk = Walk::default();
        mapper.write_class(instance, *donor, &mut merged, options, &mut donor_walk)?;
        handled.absorb(donor_walk);
    }
    for (key, value) in merged {
        if walk.keys.contains(&key) {
            continue;
        }
        out.insert(key, value);
    }
    Ok(())
}
