use std::fmt;
use std::sync::Arc;

use crate::storage::intersect::GraphIntersect;
use crate::storage::props::NodePropertyValues;
use crate::types::{join_quoted, GraphError, NodeId, NodeLabel, OriginalId, RelationshipType, Result};

use super::Graph;

/// Several views over the same node set, read as one multigraph.
///
/// Relationships of the parts are visited part by part, so targets are sorted
/// within each part only.
pub struct UnionGraph {
    parts: Vec<Arc<dyn Graph>>,
}

impl UnionGraph {
    /// Combines `parts`; a single part is returned unchanged.
    pub fn of(mut parts: Vec<Arc<dyn Graph>>) -> Result<Arc<dyn Graph>> {
        match parts.len() {
            0 => Err(GraphError::InvalidArgument(
                "a union graph needs at least one part".into(),
            )),
            1 => Ok(parts.remove(0)),
            _ => {
                let node_count = parts[0].node_count();
                if let Some(odd) = parts.iter().find(|p| p.node_count() != node_count) {
                    return Err(GraphError::InvalidArgument(format!(
                        "union parts disagree on node count: {} vs {}",
                        node_count,
                        odd.node_count()
                    )));
                }
                Ok(Arc::new(Self { parts }))
            }
        }
    }

    fn first(&self) -> &Arc<dyn Graph> {
        &self.parts[0]
    }
}

impl fmt::Debug for UnionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionGraph").field("parts", &self.parts).finish()
    }
}

impl Graph for UnionGraph {
    fn node_count(&self) -> u64 {
        self.first().node_count()
    }

    fn relationship_count(&self) -> u64 {
        self.parts.iter().map(|p| p.relationship_count()).sum()
    }

    fn is_undirected(&self) -> bool {
        self.parts.iter().all(|p| p.is_undirected())
    }

    fn has_relationship_property(&self) -> bool {
        self.parts.iter().all(|p| p.has_relationship_property())
    }

    fn relationship_types(&self) -> Vec<RelationshipType> {
        self.parts.iter().flat_map(|p| p.relationship_types()).collect()
    }

    fn degree(&self, node: NodeId) -> u64 {
        self.parts.iter().map(|p| p.degree(node)).sum()
    }

    fn for_each_relationship(&self, node: NodeId, consumer: &mut dyn FnMut(NodeId, NodeId) -> bool) {
        let mut running = true;
        for part in &self.parts {
            part.for_each_relationship(node, &mut |s, t| {
                running = consumer(s, t);
                running
            });
            if !running {
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
        let mut running = true;
        for part in &self.parts {
            part.for_each_relationship_with_property(node, fallback, &mut |s, t, v| {
                running = consumer(s, t, v);
                running
            });
            if !running {
                return;
            }
        }
    }

    fn exists(&self, source: NodeId, target: NodeId) -> bool {
        self.parts.iter().any(|p| p.exists(source, target))
    }

    fn relationship_property(&self, source: NodeId, target: NodeId, fallback: f64) -> f64 {
        self.parts
            .iter()
            .find(|p| p.exists(source, target))
            .map_or(fallback, |p| p.relationship_property(source, target, fallback))
    }

    fn to_original_node_id(&self, node: NodeId) -> OriginalId {
        self.first().to_original_node_id(node)
    }

    fn to_mapped_node_id(&self, original: OriginalId) -> Option<NodeId> {
        self.first().to_mapped_node_id(original)
    }

    fn node_labels(&self, node: NodeId) -> Vec<NodeLabel> {
        self.first().node_labels(node)
    }

    fn node_properties(&self, key: &str) -> Option<Arc<dyn NodePropertyValues>> {
        self.first().node_properties(key)
    }

    fn available_node_properties(&self) -> Vec<String> {
        self.first().available_node_properties()
    }

    fn relationship_intersect(&self, _max_degree: u64) -> Result<GraphIntersect<'_>> {
        Err(GraphError::InvalidArgument(format!(
            "relationship intersection needs a single relationship type, the graph unions {}",
            join_quoted(self.relationship_types())
        )))
    }
}
