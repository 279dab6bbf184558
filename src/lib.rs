//! In-memory compressed graph store.
//!
//! Nodes are mapped to dense ids, relationships of each type are compressed
//! into a delta-encoded CSR arena, and a [`GraphStore`] hands out read-only
//! [`Graph`] views over any label and type selection. The intersection engine
//! in [`storage::intersect`] walks pairs of sorted adjacency runs to enumerate
//! triangles without materializing neighbor sets.

#![warn(missing_docs)]

pub mod algo;
pub mod loader;
pub mod primitives;
pub mod storage;
pub mod types;

pub use algo::{count_triangles, stream_triangles, TriangleCountConfig, TriangleCountResult};
pub use loader::{GraphStoreBuilder, PropertyValue};
pub use primitives::concurrency::TerminationFlag;
pub use storage::{Graph, GraphStore, StoreOptions, TopologyOptions};
pub use types::{GraphError, NodeId, NodeLabel, OriginalId, RelationshipType, Result, NOT_FOUND};
