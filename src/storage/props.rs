//! Columnar node property values and the views composed over them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use roaring::RoaringBitmap;

use crate::types::{GraphError, NodeId, NodeLabel, PropertyState, Result, ValueType};

use super::id_map::FilteredIdMap;
use super::topology::PropertyCsr;

/// Read access to one node property, indexed by node id.
pub trait NodePropertyValues: Send + Sync + fmt::Debug {
    /// Type of the stored values.
    fn value_type(&self) -> ValueType;

    /// Size of the id space the values are indexed by.
    fn node_count(&self) -> u64;

    /// Integer value of `node`; `None` when absent or not integral.
    fn long_value(&self, node: NodeId) -> Option<i64>;

    /// Floating point value of `node`; integers are widened.
    fn double_value(&self, node: NodeId) -> Option<f64>;
}

/// Dense column with one value per node of the root id space.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyColumn {
    /// Integer values.
    Long(Vec<i64>),
    /// Floating point values.
    Double(Vec<f64>),
}

impl PropertyColumn {
    /// Number of values held.
    pub fn len(&self) -> usize {
        match self {
            PropertyColumn::Long(values) => values.len(),
            PropertyColumn::Double(values) => values.len(),
        }
    }

    /// Whether the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodePropertyValues for PropertyColumn {
    fn value_type(&self) -> ValueType {
        match self {
            PropertyColumn::Long(_) => ValueType::Long,
            PropertyColumn::Double(_) => ValueType::Double,
        }
    }

    fn node_count(&self) -> u64 {
        self.len() as u64
    }

    fn long_value(&self, node: NodeId) -> Option<i64> {
        match self {
            PropertyColumn::Long(values) => values.get(node as usize).copied(),
            PropertyColumn::Double(_) => None,
        }
    }

    fn double_value(&self, node: NodeId) -> Option<f64> {
        match self {
            PropertyColumn::Long(values) => values.get(node as usize).map(|&v| v as f64),
            PropertyColumn::Double(values) => values.get(node as usize).copied(),
        }
    }
}

/// A node property published in a store.
#[derive(Clone, Debug)]
pub struct NodeProperty {
    key: String,
    state: PropertyState,
    values: Arc<dyn NodePropertyValues>,
}

impl NodeProperty {
    /// Wraps `values` under `key`.
    pub fn new(key: impl Into<String>, state: PropertyState, values: Arc<dyn NodePropertyValues>) -> Self {
        Self {
            key: key.into(),
            state,
            values,
        }
    }

    /// Property name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the property was loaded or added later.
    pub fn state(&self) -> PropertyState {
        self.state
    }

    /// Type of the values.
    pub fn value_type(&self) -> ValueType {
        self.values.value_type()
    }

    /// Shared values.
    pub fn values(&self) -> &Arc<dyn NodePropertyValues> {
        &self.values
    }
}

/// Immutable set of node properties for one label.
///
/// Updates return a new store; the original stays valid for its holders.
#[derive(Clone, Debug, Default)]
pub struct NodePropertyStore {
    properties: BTreeMap<String, NodeProperty>,
}

impl NodePropertyStore {
    /// Store holding no properties.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Property keys in name order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Property stored under `key`.
    pub fn get(&self, key: &str) -> Option<&NodeProperty> {
        self.properties.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no property is stored.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Copy with `property` added unless its key is already present.
    pub fn with_property_if_absent(&self, property: NodeProperty) -> Self {
        let mut properties = self.properties.clone();
        properties
            .entry(property.key.clone())
            .or_insert(property);
        Self { properties }
    }

    /// Copy without `key`.
    pub fn without(&self, key: &str) -> Self {
        let mut properties = self.properties.clone();
        properties.remove(key);
        Self { properties }
    }
}

/// A relationship property published in a store; always double valued.
#[derive(Clone, Debug)]
pub struct RelationshipProperty {
    key: String,
    state: PropertyState,
    values: Arc<PropertyCsr>,
}

impl RelationshipProperty {
    /// Wraps `values` under `key`.
    pub fn new(key: impl Into<String>, state: PropertyState, values: Arc<PropertyCsr>) -> Self {
        Self {
            key: key.into(),
            state,
            values,
        }
    }

    /// Property name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the property was loaded or added later.
    pub fn state(&self) -> PropertyState {
        self.state
    }

    /// Type of the values.
    pub fn value_type(&self) -> ValueType {
        ValueType::Double
    }

    /// Values laid out parallel to the topology.
    pub fn values(&self) -> &Arc<PropertyCsr> {
        &self.values
    }
}

/// Property spanning several labels, answering from the first label that
/// contains the node.
#[derive(Debug)]
pub struct UnionNodeProperties {
    value_type: ValueType,
    node_count: u64,
    parts: Vec<(NodeLabel, RoaringBitmap, Arc<dyn NodePropertyValues>)>,
}

impl UnionNodeProperties {
    /// Combines per-label values; all parts must share one value type.
    pub fn new(
        node_count: u64,
        parts: Vec<(NodeLabel, RoaringBitmap, Arc<dyn NodePropertyValues>)>,
    ) -> Result<Self> {
        let Some(value_type) = parts.first().map(|(_, _, values)| values.value_type()) else {
            return Err(GraphError::InvalidArgument(
                "a union property needs at least one label".into(),
            ));
        };
        if let Some((label, _, values)) = parts.iter().find(|(_, _, v)| v.value_type() != value_type) {
            return Err(GraphError::InvalidArgument(format!(
                "label '{}' stores the property as {} but other labels store {}",
                label,
                values.value_type(),
                value_type
            )));
        }
        Ok(Self {
            value_type,
            node_count,
            parts,
        })
    }

    fn part_for(&self, node: NodeId) -> Option<&Arc<dyn NodePropertyValues>> {
        let id = u32::try_from(node).ok()?;
        self.parts
            .iter()
            .find(|(_, members, _)| members.contains(id))
            .map(|(_, _, values)| values)
    }
}

impl NodePropertyValues for UnionNodeProperties {
    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn node_count(&self) -> u64 {
        self.node_count
    }

    fn long_value(&self, node: NodeId) -> Option<i64> {
        self.part_for(node)?.long_value(node)
    }

    fn double_value(&self, node: NodeId) -> Option<f64> {
        self.part_for(node)?.double_value(node)
    }
}

/// Root-indexed values read through a filtered id space.
#[derive(Debug)]
pub struct FilteredNodeProperties {
    inner: Arc<dyn NodePropertyValues>,
    id_map: Arc<FilteredIdMap>,
}

impl FilteredNodeProperties {
    /// Translates filtered ids to root ids before reading `inner`.
    pub fn new(inner: Arc<dyn NodePropertyValues>, id_map: Arc<FilteredIdMap>) -> Self {
        Self { inner, id_map }
    }
}

impl NodePropertyValues for FilteredNodeProperties {
    fn value_type(&self) -> ValueType {
        self.inner.value_type()
    }

    fn node_count(&self) -> u64 {
        self.id_map.node_count()
    }

    fn long_value(&self, node: NodeId) -> Option<i64> {
        self.inner.long_value(self.id_map.to_root(node))
    }

    fn double_value(&self, node: NodeId) -> Option<f64> {
        self.inner.double_value(self.id_map.to_root(node))
    }
}
