//! Read-only graph views handed to algorithms.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{GraphError, NodeId, NodeLabel, OriginalId, RelationshipType, Result};

use super::id_map::IdMap;
use super::intersect::GraphIntersect;
use super::props::NodePropertyValues;
use super::topology::{PropertyCsr, Relationships, Topology};

mod filtered;
mod union;

pub use filtered::NodeFilteredGraph;
pub use union::UnionGraph;

/// Adjacency interface algorithms traverse.
///
/// Node ids are dense in `[0, node_count)` of the view. Relationship
/// consumers return `false` to stop the iteration early.
pub trait Graph: Send + Sync + fmt::Debug {
    /// Number of nodes in the view.
    fn node_count(&self) -> u64;

    /// Number of relationships in the view.
    fn relationship_count(&self) -> u64;

    /// Whether every relationship is visible from both endpoints.
    fn is_undirected(&self) -> bool;

    /// Whether a relationship property was selected.
    fn has_relationship_property(&self) -> bool;

    /// Relationship types the view exposes.
    fn relationship_types(&self) -> Vec<RelationshipType>;

    /// Number of relationships leaving `node`.
    fn degree(&self, node: NodeId) -> u64;

    /// Visits `(node, target)` for every relationship of `node` in target order.
    fn for_each_relationship(&self, node: NodeId, consumer: &mut dyn FnMut(NodeId, NodeId) -> bool);

    /// Like [`Graph::for_each_relationship`], also passing the selected property
    /// value or `fallback` when none was selected.
    fn for_each_relationship_with_property(
        &self,
        node: NodeId,
        fallback: f64,
        consumer: &mut dyn FnMut(NodeId, NodeId, f64) -> bool,
    );

    /// Whether a relationship `source -> target` exists.
    fn exists(&self, source: NodeId, target: NodeId) -> bool;

    /// Property of the first `source -> target` relationship, or `fallback`.
    fn relationship_property(&self, source: NodeId, target: NodeId, fallback: f64) -> f64;

    /// Original id of `node`.
    fn to_original_node_id(&self, node: NodeId) -> OriginalId;

    /// View id of `original`, if the node is part of the view.
    fn to_mapped_node_id(&self, original: OriginalId) -> Option<NodeId>;

    /// Labels carried by `node`.
    fn node_labels(&self, node: NodeId) -> Vec<NodeLabel>;

    /// Node property `key` indexed by view ids.
    fn node_properties(&self, key: &str) -> Option<Arc<dyn NodePropertyValues>>;

    /// Node property keys available in the view.
    fn available_node_properties(&self) -> Vec<String>;

    /// Intersection engine over the view's single topology.
    fn relationship_intersect(&self, max_degree: u64) -> Result<GraphIntersect<'_>>;
}

/// Whether a view may hand its topology back when released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// The view built its topology and is its only holder.
    Owned,
    /// The topology belongs to a store; the view is an alias.
    Borrowed,
}

/// View over one topology in the root id space.
pub struct CsrGraph {
    id_map: Arc<IdMap>,
    relationship_type: RelationshipType,
    topology: Arc<Topology>,
    property: Option<Arc<PropertyCsr>>,
    node_properties: BTreeMap<String, Arc<dyn NodePropertyValues>>,
    ownership: Ownership,
}

impl CsrGraph {
    /// View that owns freshly built relationships.
    ///
    /// `property` selects one of the built property columns.
    pub fn owned(
        id_map: Arc<IdMap>,
        relationship_type: RelationshipType,
        relationships: Relationships,
        property: Option<&str>,
    ) -> Result<Self> {
        let Relationships {
            topology,
            mut properties,
        } = relationships;
        let property = match property {
            None => None,
            Some(key) => Some(Arc::new(properties.remove(key).ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "Property '{}' does not exist for relationships with type '{}'.",
                    key, relationship_type
                ))
            })?)),
        };
        Ok(Self {
            id_map,
            relationship_type,
            topology: Arc::new(topology),
            property,
            node_properties: BTreeMap::new(),
            ownership: Ownership::Owned,
        })
    }

    pub(crate) fn borrowed(
        id_map: Arc<IdMap>,
        relationship_type: RelationshipType,
        topology: Arc<Topology>,
        property: Option<Arc<PropertyCsr>>,
        node_properties: BTreeMap<String, Arc<dyn NodePropertyValues>>,
    ) -> Self {
        Self {
            id_map,
            relationship_type,
            topology,
            property,
            node_properties,
            ownership: Ownership::Borrowed,
        }
    }

    /// Whether the view owns its topology.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Topology the view reads.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub(crate) fn id_map(&self) -> &Arc<IdMap> {
        &self.id_map
    }

    pub(crate) fn node_property_map(&self) -> &BTreeMap<String, Arc<dyn NodePropertyValues>> {
        &self.node_properties
    }

    /// Hands the topology back to an owning caller.
    ///
    /// Borrowed views, and owned views whose topology is still shared, return
    /// `None` and leave the topology untouched.
    pub fn release(self) -> Option<Topology> {
        match self.ownership {
            Ownership::Borrowed => None,
            Ownership::Owned => Arc::try_unwrap(self.topology).ok(),
        }
    }
}

impl fmt::Debug for CsrGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrGraph")
            .field("relationship_type", &self.relationship_type)
            .field("nodes", &self.topology.node_count())
            .field("relationships", &self.topology.relationship_count())
            .field("property", &self.property.is_some())
            .field("ownership", &self.ownership)
            .finish()
    }
}

impl Graph for CsrGraph {
    fn node_count(&self) -> u64 {
        self.id_map.node_count()
    }

    fn relationship_count(&self) -> u64 {
        self.topology.relationship_count()
    }

    fn is_undirected(&self) -> bool {
        self.topology.is_undirected()
    }

    fn has_relationship_property(&self) -> bool {
        self.property.is_some()
    }

    fn relationship_types(&self) -> Vec<RelationshipType> {
        vec![self.relationship_type.clone()]
    }

    fn degree(&self, node: NodeId) -> u64 {
        self.topology.degree(node)
    }

    fn for_each_relationship(&self, node: NodeId, consumer: &mut dyn FnMut(NodeId, NodeId) -> bool) {
        for target in self.topology.cursor(node) {
            if !consumer(node, target) {
                return;
            }
        }
    }

    fn for_each_relationship_with_property(
        &self,
        node: NodeId,
        fallback: f64,
        consumer: &mut dyn FnMut(NodeId, NodeId, f64) -> bool,
    ) {
        let values = self.property.as_ref().map(|p| p.values_of(node));
        for (idx, target) in self.topology.cursor(node).enumerate() {
            let value = values.and_then(|v| v.get(idx).copied()).unwrap_or(fallback);
            if !consumer(node, target, value) {
                return;
            }
        }
    }

    fn exists(&self, source: NodeId, target: NodeId) -> bool {
        self.topology.cursor(source).advance(target) == target
    }

    fn relationship_property(&self, source: NodeId, target: NodeId, fallback: f64) -> f64 {
        let Some(property) = &self.property else {
            return fallback;
        };
        self.topology
            .cursor(source)
            .position(|t| t == target)
            .and_then(|idx| property.values_of(source).get(idx).copied())
            .unwrap_or(fallback)
    }

    fn to_original_node_id(&self, node: NodeId) -> OriginalId {
        self.id_map.to_original(node)
    }

    fn to_mapped_node_id(&self, original: OriginalId) -> Option<NodeId> {
        self.id_map.to_mapped(original)
    }

    fn node_labels(&self, node: NodeId) -> Vec<NodeLabel> {
        self.id_map.labels_of(node)
    }

    fn node_properties(&self, key: &str) -> Option<Arc<dyn NodePropertyValues>> {
        self.node_properties.get(key).cloned()
    }

    fn available_node_properties(&self) -> Vec<String> {
        self.node_properties.keys().cloned().collect()
    }

    fn relationship_intersect(&self, max_degree: u64) -> Result<GraphIntersect<'_>> {
        Ok(GraphIntersect::unfiltered(&self.topology, max_degree))
    }
}
