//! Per-call conversion options.

use serde::{Deserialize, Serialize};

/// Options for [`ObjectMapper::deserialize`](crate::ObjectMapper::deserialize).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeserializeOptions {
    /// Copy source keys no declared property maps onto the instance verbatim.
    pub pass_unknown_properties: bool,
    /// Fill plain fields of every class in the call from source keys of the
    /// same name, as if each class had `mapUnknownPropertiesByName` set.
    pub map_class_properties: bool,
}

impl DeserializeOptions {
    pub fn passing_unknown() -> Self {
        Self {
            pass_unknown_properties: true,
            ..Self::default()
        }
    }

    pub fn mapping_class_properties() -> Self {
        Self {
            map_class_properties: true,
            ..Self::default()
        }
    }
}

/// Options for [`ObjectMapper::serialize`](crate::ObjectMapper::serialize).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializeOptions {
    /// Write instance slots no declared property covers into the output.
    pub pass_unknown_properties: bool,
}

impl SerializeOptions {
    pub fn passing_unknown() -> Self {
        Self {
            pass_unknown_properties: true,
        }
    }
}
