//! Compressed sparse row layout for one relationship type.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::primitives::concurrency::{
    effective_concurrency, run_chunked, TerminationFlag, DEFAULT_CHUNK_SIZE,
};
use crate::types::{GraphError, NodeId, Result};

use super::adjacency::{encode_run, AdjacencyList, AdjacencyListBuilder, DecompressingCursor};
use super::options::{Orientation, TopologyOptions};

const EMPTY_RUN: u64 = u64::MAX;

/// Offsets table plus compressed arena for one relationship type.
///
/// Immutable after construction; any number of cursors may read it
/// concurrently.
#[derive(Debug)]
pub struct Topology {
    offsets: Vec<u64>,
    adjacency: AdjacencyList,
    relationship_count: u64,
    orientation: Orientation,
}

impl Topology {
    /// Topology over `node_count` nodes with no relationships.
    pub fn empty(node_count: u64, orientation: Orientation) -> Self {
        Self {
            offsets: vec![0; node_count as usize],
            adjacency: AdjacencyList::empty(),
            relationship_count: 0,
            orientation,
        }
    }

    /// Number of nodes covered by the offsets table.
    pub fn node_count(&self) -> u64 {
        self.offsets.len() as u64
    }

    /// Number of stored relationships; undirected ones count once per direction.
    pub fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    /// Direction the relationships were stored in.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Whether every relationship is stored in both directions.
    pub fn is_undirected(&self) -> bool {
        self.orientation == Orientation::Undirected
    }

    /// Arena offset of `node`'s run, `0` when it has none.
    ///
    /// # Panics
    ///
    /// When `node` is outside `[0, node_count)`.
    #[inline]
    pub fn offset(&self, node: NodeId) -> u64 {
        match self.offsets.get(node as usize) {
            Some(&offset) => offset,
            None => panic!(
                "node id {} out of range for topology of {} nodes",
                node,
                self.offsets.len()
            ),
        }
    }

    /// Number of relationships stored for `node`.
    #[inline]
    pub fn degree(&self, node: NodeId) -> u64 {
        u64::from(self.adjacency.degree(self.offset(node)))
    }

    /// Cursor over `node`'s sorted targets.
    #[inline]
    pub fn cursor(&self, node: NodeId) -> DecompressingCursor<'_> {
        self.adjacency.cursor(self.offset(node))
    }

    /// Shared compressed arena.
    pub fn adjacency(&self) -> &AdjacencyList {
        &self.adjacency
    }

    /// Bytes held by the offsets table and arena.
    pub fn size_in_bytes(&self) -> usize {
        self.offsets.len() * std::mem::size_of::<u64>() + self.adjacency.size_in_bytes()
    }
}

/// Relationship property values laid out parallel to a [`Topology`].
///
/// The values of node `n` occupy `values[starts[n]..starts[n + 1]]`, in the
/// same order as the targets of `n`'s adjacency run.
#[derive(Clone, Debug)]
pub struct PropertyCsr {
    starts: Arc<[u64]>,
    values: Vec<f64>,
    default_value: f64,
}

impl PropertyCsr {
    /// Wraps a prepared layout, validating that `starts` indexes `values`.
    pub fn new(starts: Arc<[u64]>, values: Vec<f64>, default_value: f64) -> Result<Self> {
        let monotone = starts.windows(2).all(|w| w[0] <= w[1]);
        let covers = starts.first().copied().unwrap_or(0) == 0
            && starts.last().copied().unwrap_or(0) == values.len() as u64;
        if starts.is_empty() || !monotone || !covers {
            return Err(GraphError::InvalidArgument(format!(
                "property layout with {} starts does not index {} values",
                starts.len(),
                values.len()
            )));
        }
        Ok(Self {
            starts,
            values,
            default_value,
        })
    }

    /// Number of nodes the layout covers.
    pub fn node_count(&self) -> u64 {
        self.starts.len() as u64 - 1
    }

    /// Total number of stored values.
    pub fn element_count(&self) -> u64 {
        self.values.len() as u64
    }

    /// Value reported for relationships that carry no explicit value.
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Values of `node`'s relationships in target order.
    pub fn values_of(&self, node: NodeId) -> &[f64] {
        let n = node as usize;
        let start = self.starts[n] as usize;
        let end = self.starts[n + 1] as usize;
        &self.values[start..end]
    }
}

/// A built relationship type: topology and its property columns.
#[derive(Debug)]
pub struct Relationships {
    /// Compressed adjacency.
    pub topology: Topology,
    /// Property columns keyed by property name.
    pub properties: BTreeMap<String, PropertyCsr>,
}

/// Collects raw relationships and compresses them into a [`Topology`].
///
/// Relationships are bucketed by source with a counting sort, each bucket is
/// stably sorted by target, parallel relationships are merged according to the
/// aggregation policy, and every bucket is delta-encoded into the arena.
#[derive(Debug)]
pub struct RelationshipsBuilder {
    node_count: u64,
    options: TopologyOptions,
    property_keys: Vec<String>,
    defaults: Vec<f64>,
    sources: Vec<NodeId>,
    targets: Vec<NodeId>,
    values: Vec<f64>,
}

struct CompressedChunk {
    first: u64,
    bytes: Vec<u8>,
    run_starts: Vec<u64>,
    degrees: Vec<u64>,
    values: Vec<Vec<f64>>,
}

#[derive(Default)]
struct CompressWorker {
    chunks: Vec<CompressedChunk>,
    bucket: Vec<usize>,
    targets: Vec<NodeId>,
}

impl RelationshipsBuilder {
    /// Starts a builder for relationships between nodes in `[0, node_count)`.
    pub fn new(node_count: u64, options: TopologyOptions) -> Self {
        Self {
            node_count,
            options,
            property_keys: Vec::new(),
            defaults: Vec::new(),
            sources: Vec::new(),
            targets: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Declares a property column. Must precede the first added relationship.
    pub fn property(mut self, key: impl Into<String>, default_value: f64) -> Self {
        debug_assert!(
            self.sources.is_empty(),
            "properties must be declared before relationships are added"
        );
        self.property_keys.push(key.into());
        self.defaults.push(default_value);
        self
    }

    /// Declared property keys in column order.
    pub fn property_keys(&self) -> &[String] {
        &self.property_keys
    }

    /// Adds a relationship whose properties take their default values.
    pub fn add(&mut self, source: NodeId, target: NodeId) -> Result<()> {
        let defaults = std::mem::take(&mut self.defaults);
        let result = self.add_with_properties(source, target, &defaults);
        self.defaults = defaults;
        result
    }

    /// Adds a relationship with one value per declared property, in column order.
    pub fn add_with_properties(
        &mut self,
        source: NodeId,
        target: NodeId,
        values: &[f64],
    ) -> Result<()> {
        for endpoint in [source, target] {
            if endpoint >= self.node_count {
                return Err(GraphError::InvalidArgument(format!(
                    "relationship endpoint {} outside node id space of {} nodes",
                    endpoint, self.node_count
                )));
            }
        }
        if values.len() != self.property_keys.len() {
            return Err(GraphError::InvalidArgument(format!(
                "expected {} property values, got {}",
                self.property_keys.len(),
                values.len()
            )));
        }
        match self.options.orientation {
            Orientation::Natural => self.push(source, target, values),
            Orientation::Reverse => self.push(target, source, values),
            Orientation::Undirected => {
                self.push(source, target, values);
                self.push(target, source, values);
            }
        }
        Ok(())
    }

    fn push(&mut self, source: NodeId, target: NodeId, values: &[f64]) {
        self.sources.push(source);
        self.targets.push(target);
        self.values.extend_from_slice(values);
    }

    /// Compresses on the calling thread.
    pub fn build(self) -> Result<Relationships> {
        self.build_with_concurrency(1)
    }

    /// Compresses disjoint node ranges on up to `concurrency` workers.
    pub fn build_with_concurrency(self, concurrency: usize) -> Result<Relationships> {
        let n = self.node_count as usize;
        let mut starts = vec![0usize; n + 1];
        for &source in &self.sources {
            starts[source as usize + 1] += 1;
        }
        for i in 0..n {
            starts[i + 1] += starts[i];
        }
        let mut fill = starts.clone();
        let mut order = vec![0usize; self.sources.len()];
        for (idx, &source) in self.sources.iter().enumerate() {
            let slot = &mut fill[source as usize];
            order[*slot] = idx;
            *slot += 1;
        }

        let termination = TerminationFlag::new();
        let workers = run_chunked(
            self.node_count,
            effective_concurrency(concurrency),
            DEFAULT_CHUNK_SIZE,
            &termination,
            CompressWorker::default,
            |worker, range| self.compress_range(range, &starts, &order, worker),
        )?;

        let mut chunks: Vec<CompressedChunk> =
            workers.into_iter().flat_map(|w| w.chunks).collect();
        chunks.sort_unstable_by_key(|chunk| chunk.first);

        let arena_len = chunks.iter().map(|c| c.bytes.len()).sum();
        let mut adjacency = AdjacencyListBuilder::with_capacity(arena_len);
        let mut offsets = Vec::with_capacity(n);
        let mut value_starts = Vec::with_capacity(n + 1);
        value_starts.push(0u64);
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); self.property_keys.len()];
        let mut relationship_count = 0u64;
        for chunk in chunks {
            let base = adjacency.append_encoded(&chunk.bytes);
            for (&local, &degree) in chunk.run_starts.iter().zip(&chunk.degrees) {
                offsets.push(if local == EMPTY_RUN { 0 } else { base + local });
                relationship_count += degree;
                value_starts.push(relationship_count);
            }
            for (column, part) in columns.iter_mut().zip(chunk.values) {
                column.extend(part);
            }
        }
        debug_assert_eq!(offsets.len(), n);

        let value_starts: Arc<[u64]> = value_starts.into();
        let mut properties = BTreeMap::new();
        for ((key, default_value), column) in self
            .property_keys
            .into_iter()
            .zip(self.defaults)
            .zip(columns)
        {
            let csr = PropertyCsr::new(Arc::clone(&value_starts), column, default_value)?;
            properties.insert(key, csr);
        }

        let topology = Topology {
            offsets,
            adjacency: adjacency.build(),
            relationship_count,
            orientation: self.options.orientation,
        };
        debug!(
            nodes = self.node_count,
            relationships = relationship_count,
            bytes = topology.size_in_bytes(),
            "topology.build.completed"
        );
        Ok(Relationships {
            topology,
            properties,
        })
    }

    fn compress_range(
        &self,
        range: Range<u64>,
        starts: &[usize],
        order: &[usize],
        worker: &mut CompressWorker,
    ) -> Result<()> {
        let stride = self.property_keys.len();
        let aggregation = self.options.aggregation;
        let width = (range.end - range.start) as usize;
        let mut chunk = CompressedChunk {
            first: range.start,
            bytes: Vec::new(),
            run_starts: Vec::with_capacity(width),
            degrees: Vec::with_capacity(width),
            values: vec![Vec::new(); stride],
        };

        for node in range {
            let v = node as usize;
            worker.bucket.clear();
            worker
                .bucket
                .extend_from_slice(&order[starts[v]..starts[v + 1]]);
            worker.bucket.sort_by_key(|&idx| self.targets[idx]);
            worker.targets.clear();

            let mut i = 0;
            while i < worker.bucket.len() {
                let first = worker.bucket[i];
                let target = self.targets[first];
                worker.targets.push(target);
                for (k, column) in chunk.values.iter_mut().enumerate() {
                    column.push(aggregation.seed(self.values[first * stride + k]));
                }
                i += 1;
                if aggregation.merges() {
                    while i < worker.bucket.len() && self.targets[worker.bucket[i]] == target {
                        let idx = worker.bucket[i];
                        for (k, column) in chunk.values.iter_mut().enumerate() {
                            if let Some(acc) = column.last_mut() {
                                *acc = aggregation.combine(*acc, self.values[idx * stride + k]);
                            }
                        }
                        i += 1;
                    }
                }
            }

            if worker.targets.is_empty() {
                chunk.run_starts.push(EMPTY_RUN);
            } else {
                let local = encode_run(&worker.targets, &mut chunk.bytes)?;
                chunk.run_starts.push(local as u64);
            }
            chunk.degrees.push(worker.targets.len() as u64);
        }
        worker.chunks.push(chunk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::options::Aggregation;

    fn targets(topology: &Topology, node: NodeId) -> Vec<NodeId> {
        topology.cursor(node).collect()
    }

    #[test]
    fn runs_are_sorted_and_keep_parallel_edges() -> Result<()> {
        let mut builder = RelationshipsBuilder::new(4, TopologyOptions::new());
        for (s, t) in [(0, 3), (0, 1), (0, 3), (2, 2), (0, 0)] {
            builder.add(s, t)?;
        }
        let rels = builder.build()?;
        let topology = &rels.topology;
        assert_eq!(targets(topology, 0), vec![0, 1, 3, 3]);
        assert_eq!(targets(topology, 2), vec![2]);
        assert_eq!(topology.degree(1), 0);
        assert_eq!(topology.offset(1), 0);
        assert_eq!(topology.relationship_count(), 5);
        Ok(())
    }

    #[test]
    fn undirected_stores_both_directions() -> Result<()> {
        let mut builder = RelationshipsBuilder::new(3, TopologyOptions::undirected());
        builder.add(0, 2)?;
        builder.add(1, 2)?;
        let rels = builder.build()?;
        assert!(rels.topology.is_undirected());
        assert_eq!(rels.topology.relationship_count(), 4);
        assert_eq!(targets(&rels.topology, 2), vec![0, 1]);
        Ok(())
    }

    #[test]
    fn reverse_orientation_swaps_endpoints() -> Result<()> {
        let options = TopologyOptions::new().orientation(Orientation::Reverse);
        let mut builder = RelationshipsBuilder::new(2, options);
        builder.add(0, 1)?;
        let rels = builder.build()?;
        assert_eq!(targets(&rels.topology, 1), vec![0]);
        assert_eq!(rels.topology.degree(0), 0);
        Ok(())
    }

    #[test]
    fn properties_follow_target_order_and_aggregate() -> Result<()> {
        let options = TopologyOptions::new().aggregation(Aggregation::Sum);
        let mut builder = RelationshipsBuilder::new(3, options).property("w", 1.5);
        builder.add_with_properties(0, 2, &[2.0])?;
        builder.add_with_properties(0, 1, &[7.0])?;
        builder.add_with_properties(0, 2, &[3.0])?;
        builder.add(1, 0)?;
        let rels = builder.build()?;
        assert_eq!(targets(&rels.topology, 0), vec![1, 2]);
        let weights = &rels.properties["w"];
        assert_eq!(weights.values_of(0), &[7.0, 5.0]);
        assert_eq!(weights.values_of(1), &[1.5]);
        assert!(weights.values_of(2).is_empty());
        assert_eq!(weights.element_count(), rels.topology.relationship_count());
        Ok(())
    }

    #[test]
    fn parallel_build_matches_sequential() -> Result<()> {
        let edges: Vec<(u64, u64)> = (0..500u64)
            .map(|i| ((i * 7919) % 211, (i * 104_729) % 211))
            .collect();
        let build = |concurrency| -> Result<Relationships> {
            let mut builder = RelationshipsBuilder::new(211, TopologyOptions::new()).property("w", 0.0);
            for (i, &(s, t)) in edges.iter().enumerate() {
                builder.add_with_properties(s, t, &[i as f64])?;
            }
            builder.build_with_concurrency(concurrency)
        };
        let sequential = build(1)?;
        let parallel = build(4)?;
        for node in 0..211 {
            assert_eq!(
                targets(&sequential.topology, node),
                targets(&parallel.topology, node)
            );
            assert_eq!(
                sequential.properties["w"].values_of(node),
                parallel.properties["w"].values_of(node)
            );
        }
        Ok(())
    }

    #[test]
    fn endpoint_outside_id_space_is_rejected() {
        let mut builder = RelationshipsBuilder::new(2, TopologyOptions::new());
        let err = builder.add(0, 2).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn degree_of_unknown_node_panics() {
        let topology = Topology::empty(2, Orientation::Natural);
        topology.degree(5);
    }
}
