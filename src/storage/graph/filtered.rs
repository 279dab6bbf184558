use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::storage::id_map::FilteredIdMap;
use crate::storage::intersect::GraphIntersect;
use crate::storage::props::{FilteredNodeProperties, NodePropertyValues};
use crate::types::{NodeId, NodeLabel, OriginalId, RelationshipType, Result};

use super::{CsrGraph, Graph};

/// Restricts a [`CsrGraph`] to a label subset of its nodes.
///
/// Node ids are re-densified through a [`FilteredIdMap`]; relationships with
/// an endpoint outside the subset are hidden.
pub struct NodeFilteredGraph {
    inner: CsrGraph,
    id_map: Arc<FilteredIdMap>,
    relationship_count: OnceLock<u64>,
}

impl NodeFilteredGraph {
    /// Wraps `inner`; `id_map` must be derived from `inner`'s id map.
    pub fn new(inner: CsrGraph, id_map: Arc<FilteredIdMap>) -> Self {
        debug_assert!(Arc::ptr_eq(inner.id_map(), id_map.root()));
        Self {
            inner,
            id_map,
            relationship_count: OnceLock::new(),
        }
    }

    /// Filtered id map of the view.
    pub fn id_map(&self) -> &Arc<FilteredIdMap> {
        &self.id_map
    }
}

impl fmt::Debug for NodeFilteredGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeFilteredGraph")
            .field("nodes", &self.id_map.node_count())
            .field("inner", &self.inner)
            .finish()
    }
}

impl Graph for NodeFilteredGraph {
    fn node_count(&self) -> u64 {
        self.id_map.node_count()
    }

    fn relationship_count(&self) -> u64 {
        *self
            .relationship_count
            .get_or_init(|| (0..self.node_count()).map(|node| self.degree(node)).sum())
    }

    fn is_undirected(&self) -> bool {
        self.inner.is_undirected()
    }

    fn has_relationship_property(&self) -> bool {
        self.inner.has_relationship_property()
    }

    fn relationship_types(&self) -> Vec<RelationshipType> {
        self.inner.relationship_types()
    }

    fn degree(&self, node: NodeId) -> u64 {
        let mut degree = 0;
        self.for_each_relationship(node, &mut |_, _| {
            degree += 1;
            true
        });
        degree
    }

    fn for_each_relationship(&self, node: NodeId, consumer: &mut dyn FnMut(NodeId, NodeId) -> bool) {
        let id_map = &self.id_map;
        self.inner
            .for_each_relationship(id_map.to_root(node), &mut |_, target| {
                match id_map.to_filtered(target) {
                    Some(target) => consumer(node, target),
                    None => true,
                }
            });
    }

    fn for_each_relationship_with_property(
        &self,
        node: NodeId,
        fallback: f64,
        consumer: &mut dyn FnMut(NodeId, NodeId, f64) -> bool,
    ) {
        let id_map = &self.id_map;
        self.inner.for_each_relationship_with_property(
            id_map.to_root(node),
            fallback,
            &mut |_, target, value| match id_map.to_filtered(target) {
                Some(target) => consumer(node, target, value),
                None => true,
            },
        );
    }

    fn exists(&self, source: NodeId, target: NodeId) -> bool {
        self.inner
            .exists(self.id_map.to_root(source), self.id_map.to_root(target))
    }

    fn relationship_property(&self, source: NodeId, target: NodeId, fallback: f64) -> f64 {
        self.inner.relationship_property(
            self.id_map.to_root(source),
            self.id_map.to_root(target),
            fallback,
        )
    }

    fn to_original_node_id(&self, node: NodeId) -> OriginalId {
        self.id_map.to_original(node)
    }

    fn to_mapped_node_id(&self, original: OriginalId) -> Option<NodeId> {
        self.id_map.to_mapped(original)
    }

    fn node_labels(&self, node: NodeId) -> Vec<NodeLabel> {
        self.inner.node_labels(self.id_map.to_root(node))
    }

    fn node_properties(&self, key: &str) -> Option<Arc<dyn NodePropertyValues>> {
        let values = self.inner.node_property_map().get(key)?;
        Some(Arc::new(FilteredNodeProperties::new(
            Arc::clone(values),
            Arc::clone(&self.id_map),
        )))
    }

    fn available_node_properties(&self) -> Vec<String> {
        self.inner.available_node_properties()
    }

    fn relationship_intersect(&self, max_degree: u64) -> Result<GraphIntersect<'_>> {
        Ok(GraphIntersect::filtered(
            self.inner.topology(),
            max_degree,
            &self.id_map,
        ))
    }
}
