//! In-memory bulk loading into a [`GraphStore`].
//!
//! Nodes and relationships are collected in original ids, then frozen into
//! an id map, dense property columns, and one compressed topology per
//! relationship type.

pub mod csv;

use std::collections::BTreeMap;

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::storage::{
    GraphStore, IdMapBuilder, PropertyColumn, PropertyCsr, RelationshipsBuilder, StoreOptions,
    Topology, TopologyOptions,
};
use crate::types::{
    join_quoted, GraphError, NodeId, NodeLabel, OriginalId, RelationshipType, Result,
};

/// Stored for nodes that lack a value of an integer property.
pub const LONG_DEFAULT: i64 = i64::MIN;

/// Stored for nodes and relationships that lack a floating point value.
pub const DOUBLE_DEFAULT: f64 = f64::NAN;

/// A node property value as supplied to the loader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    /// Integer value.
    Long(i64),
    /// Floating point value.
    Double(f64),
}

impl PropertyValue {
    fn as_f64(self) -> f64 {
        match self {
            PropertyValue::Long(v) => v as f64,
            PropertyValue::Double(v) => v,
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

#[derive(Debug, Default)]
struct PendingColumn {
    any_double: bool,
    values: FxHashMap<NodeId, PropertyValue>,
}

impl PendingColumn {
    fn holders(&self) -> RoaringBitmap {
        self.values.keys().map(|&node| node as u32).collect()
    }

    fn freeze(self, node_count: u64) -> PropertyColumn {
        let n = node_count as usize;
        if self.any_double {
            let mut out = vec![DOUBLE_DEFAULT; n];
            for (node, value) in self.values {
                out[node as usize] = value.as_f64();
            }
            PropertyColumn::Double(out)
        } else {
            let mut out = vec![LONG_DEFAULT; n];
            for (node, value) in self.values {
                if let PropertyValue::Long(v) = value {
                    out[node as usize] = v;
                }
            }
            PropertyColumn::Long(out)
        }
    }
}

type EdgeValues = SmallVec<[(usize, f64); 2]>;

#[derive(Debug)]
struct PendingType {
    options: TopologyOptions,
    keys: Vec<String>,
    edges: Vec<(NodeId, NodeId, EdgeValues)>,
}

impl PendingType {
    fn new(options: TopologyOptions) -> Self {
        Self {
            options,
            keys: Vec::new(),
            edges: Vec::new(),
        }
    }

    fn key_index(&mut self, key: &str) -> usize {
        match self.keys.iter().position(|k| k == key) {
            Some(idx) => idx,
            None => {
                self.keys.push(key.to_owned());
                self.keys.len() - 1
            }
        }
    }
}

/// Collects nodes and relationships and assembles them into a [`GraphStore`].
///
/// Relationship types must be declared with
/// [`relationship_type`](Self::relationship_type) before relationships of
/// that type are added. Property keys are discovered as values arrive; a
/// node property that ever receives a `Double` is stored as a `Double`
/// column. Each node property is filed under every final label of the
/// nodes holding a value for it.
#[derive(Debug, Default)]
pub struct GraphStoreBuilder {
    implicit_nodes: bool,
    options: StoreOptions,
    ids: IdMapBuilder,
    node_properties: BTreeMap<String, PendingColumn>,
    types: BTreeMap<RelationshipType, PendingType>,
}

impl GraphStoreBuilder {
    /// Starts an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates unlabeled nodes for relationship endpoints that were never
    /// added. Without it such relationships are rejected.
    pub fn implicit_nodes(mut self, enabled: bool) -> Self {
        self.implicit_nodes = enabled;
        self
    }

    /// Options handed to the built store.
    pub fn store_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Declares a relationship type; redeclaring replaces its options.
    pub fn relationship_type(mut self, name: impl Into<String>, options: TopologyOptions) -> Self {
        self.types
            .entry(RelationshipType::new(name))
            .and_modify(|pending| pending.options = options)
            .or_insert_with(|| PendingType::new(options));
        self
    }

    /// Adds a node, merging labels and properties when `original` was seen.
    pub fn add_node(
        &mut self,
        original: OriginalId,
        labels: &[NodeLabel],
        properties: &[(&str, PropertyValue)],
    ) -> Result<NodeId> {
        let node = self.ids.add_node(original, labels)?;
        for (key, value) in properties {
            let column = self.node_properties.entry((*key).to_owned()).or_default();
            column.any_double |= matches!(value, PropertyValue::Double(_));
            column.values.insert(node, *value);
        }
        Ok(node)
    }

    /// Adds a relationship of a declared type between two original ids.
    pub fn add_relationship(
        &mut self,
        relationship_type: &str,
        source: OriginalId,
        target: OriginalId,
        properties: &[(&str, f64)],
    ) -> Result<()> {
        let key = RelationshipType::new(relationship_type);
        if !self.types.contains_key(&key) {
            return Err(GraphError::InvalidArgument(format!(
                "Relationship type '{}' was not declared. Declared relationship types: [{}]",
                relationship_type,
                join_quoted(self.types.keys())
            )));
        }
        let source = self.endpoint(source)?;
        let target = self.endpoint(target)?;
        if let Some(pending) = self.types.get_mut(&key) {
            let values = properties
                .iter()
                .map(|(k, v)| (pending.key_index(k), *v))
                .collect();
            pending.edges.push((source, target, values));
        }
        Ok(())
    }

    fn endpoint(&mut self, original: OriginalId) -> Result<NodeId> {
        match self.ids.get(original) {
            Some(node) => Ok(node),
            None if self.implicit_nodes => self.ids.add_node(original, &[]),
            None => Err(GraphError::InvalidArgument(format!(
                "relationship endpoint {} was never added as a node",
                original
            ))),
        }
    }

    /// Number of nodes added so far, implicit ones included.
    pub fn node_count(&self) -> u64 {
        self.ids.node_count()
    }

    /// Freezes everything, compressing each type on up to `concurrency`
    /// workers.
    pub fn build(self, concurrency: usize) -> Result<GraphStore> {
        let nodes = self.ids.build();
        let node_count = nodes.node_count();

        let mut node_properties: BTreeMap<NodeLabel, BTreeMap<String, PropertyColumn>> =
            BTreeMap::new();
        for (key, column) in self.node_properties {
            let holders = column.holders();
            let owners: Vec<NodeLabel> = nodes
                .available_labels()
                .filter(|label| {
                    nodes
                        .label_bitmap(label)
                        .is_some_and(|members| !members.is_disjoint(&holders))
                })
                .cloned()
                .collect();
            let frozen = column.freeze(node_count);
            for label in owners {
                node_properties
                    .entry(label)
                    .or_default()
                    .insert(key.clone(), frozen.clone());
            }
        }

        let mut topologies: BTreeMap<RelationshipType, Topology> = BTreeMap::new();
        let mut relationship_properties: BTreeMap<RelationshipType, BTreeMap<String, PropertyCsr>> =
            BTreeMap::new();
        let mut relationships = 0u64;
        for (relationship_type, pending) in self.types {
            let mut builder = RelationshipsBuilder::new(node_count, pending.options);
            for key in &pending.keys {
                builder = builder.property(key.clone(), DOUBLE_DEFAULT);
            }
            let mut row = vec![DOUBLE_DEFAULT; pending.keys.len()];
            for (source, target, values) in &pending.edges {
                row.fill(DOUBLE_DEFAULT);
                for &(idx, value) in values {
                    row[idx] = value;
                }
                builder.add_with_properties(*source, *target, &row)?;
            }
            let built = builder.build_with_concurrency(concurrency)?;
            debug!(
                relationship_type = relationship_type.name(),
                relationships = built.topology.relationship_count(),
                "loader.type.compressed"
            );
            relationships += built.topology.relationship_count();
            if !built.properties.is_empty() {
                relationship_properties.insert(relationship_type.clone(), built.properties);
            }
            topologies.insert(relationship_type, built.topology);
        }

        info!(nodes = node_count, relationships, "loader.build.completed");
        GraphStore::of(
            nodes,
            node_properties,
            topologies,
            relationship_properties,
            self.options,
        )
    }
}
