//! Serializable inventory of a store's labels, types, and properties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{PropertyState, ValueType};

/// Type and origin of one property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Stored value type.
    pub value_type: ValueType,
    /// Whether the property was loaded or added later.
    pub state: PropertyState,
}

/// Shape of one relationship type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    /// Stored relationships, counted once per direction.
    pub relationship_count: u64,
    /// Whether relationships are stored in both directions.
    pub undirected: bool,
    /// Properties keyed by name.
    pub properties: BTreeMap<String, PropertySchema>,
}

/// Labels, types, and properties of a store at one generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStoreSchema {
    /// Number of loaded nodes.
    pub node_count: u64,
    /// Node properties keyed by label, then property name.
    pub nodes: BTreeMap<String, BTreeMap<String, PropertySchema>>,
    /// Relationship types keyed by name.
    pub relationships: BTreeMap<String, RelationshipSchema>,
}

impl GraphStoreSchema {
    /// Whether any label carries `key`.
    pub fn has_node_property(&self, key: &str) -> bool {
        self.nodes.values().any(|props| props.contains_key(key))
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
