use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Kind of structural change applied to a [`super::GraphStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// A node property was added for one or more labels.
    AddNodeProperty,
    /// A node property was removed from one label.
    RemoveNodeProperty,
    /// A new relationship type was published.
    AddRelationshipType,
    /// A relationship type and its properties were dropped.
    DeleteRelationships,
}

impl MutationKind {
    /// Stable name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::AddNodeProperty => "add_node_property",
            MutationKind::RemoveNodeProperty => "remove_node_property",
            MutationKind::AddRelationshipType => "add_relationship_type",
            MutationKind::DeleteRelationships => "delete_relationships",
        }
    }
}

/// Trait for tracking graph store lifecycle events.
///
/// Implementations receive a callback for every materialized graph view,
/// every committed mutation, and every release of the store's data. The
/// information can be used for monitoring and capacity planning.
pub trait StoreMetrics: Send + Sync {
    /// Records the materialization of a graph view.
    ///
    /// # Parameters
    /// * `types` - Number of relationship types unioned into the view.
    /// * `node_filtered` - Whether the view restricts the node set by label.
    fn graph_materialized(&self, types: usize, node_filtered: bool);

    /// Records a committed structural mutation.
    fn store_mutated(&self, kind: MutationKind);

    /// Records that the store dropped its data.
    fn store_released(&self);
}

/// A no-op implementation of [`StoreMetrics`] that discards all recorded metrics.
#[derive(Default)]
pub struct NoopMetrics;

impl StoreMetrics for NoopMetrics {
    fn graph_materialized(&self, _types: usize, _node_filtered: bool) {}
    fn store_mutated(&self, _kind: MutationKind) {}
    fn store_released(&self) {}
}

/// A thread-safe counter-based implementation of [`StoreMetrics`].
///
/// All counters are atomics and can be read while the store is in use.
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of graph views materialized.
    pub graphs_materialized: AtomicU64,

    /// Number of materialized views restricted by node label.
    pub filtered_graphs: AtomicU64,

    /// Number of relationship types across all materialized views.
    pub types_materialized: AtomicU64,

    /// Number of node property additions.
    pub node_properties_added: AtomicU64,

    /// Number of node property removals.
    pub node_properties_removed: AtomicU64,

    /// Number of relationship types added after load.
    pub relationship_types_added: AtomicU64,

    /// Number of relationship type deletions.
    pub relationship_types_deleted: AtomicU64,

    /// Number of releases.
    pub releases: AtomicU64,
}

impl StoreMetrics for CounterMetrics {
    fn graph_materialized(&self, types: usize, node_filtered: bool) {
        self.graphs_materialized.fetch_add(1, Ordering::Relaxed);
        self.types_materialized
            .fetch_add(types as u64, Ordering::Relaxed);
        if node_filtered {
            self.filtered_graphs.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn store_mutated(&self, kind: MutationKind) {
        let counter = match kind {
            MutationKind::AddNodeProperty => &self.node_properties_added,
            MutationKind::RemoveNodeProperty => &self.node_properties_removed,
            MutationKind::AddRelationshipType => &self.relationship_types_added,
            MutationKind::DeleteRelationships => &self.relationship_types_deleted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn store_released(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation wrapped in an [`Arc`].
///
/// The default implementation is [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn StoreMetrics> {
    Arc::new(NoopMetrics)
}
