//! In-memory graph storage: id maps, property columns, compressed topologies,
//! the store aggregate, and the views algorithms traverse.

/// Compressed adjacency arena and decompressing cursor.
pub mod adjacency;

/// Read-only graph views.
pub mod graph;

/// Original to internal node id mapping.
pub mod id_map;

/// Triangle enumeration over adjacency runs.
pub mod intersect;

mod metrics;
mod options;

/// Node and relationship property columns.
pub mod props;

mod schema;
mod store;

/// Compressed sparse row topology and its builder.
pub mod topology;

pub use adjacency::{AdjacencyList, AdjacencyListBuilder, DecompressingCursor};
pub use graph::{CsrGraph, Graph, NodeFilteredGraph, Ownership, UnionGraph};
pub use id_map::{FilteredIdMap, IdMap, IdMapBuilder};
pub use intersect::{CursorPool, GraphIntersect, IntersectionConsumer, RelationshipIntersect};
pub use metrics::{default_metrics, CounterMetrics, MutationKind, NoopMetrics, StoreMetrics};
pub use options::{Aggregation, Orientation, StoreOptions, TopologyOptions};
pub use props::{NodePropertyValues, PropertyColumn};
pub use schema::{GraphStoreSchema, PropertySchema, RelationshipSchema};
pub use store::{DeletionResult, GraphStore};
pub use topology::{PropertyCsr, Relationships, RelationshipsBuilder, Topology};
