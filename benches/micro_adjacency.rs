#![forbid(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use graphstore::algo::{count_triangles, TriangleCountConfig};
use graphstore::primitives::concurrency::TerminationFlag;
use graphstore::storage::{Graph, RelationshipsBuilder, Topology, TopologyOptions};
use graphstore::types::{NodeId, NodeLabel, RelationshipType};
use graphstore::GraphStoreBuilder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const NODE_COUNT: u64 = 8_192;
const EDGE_COUNT: u64 = 65_536;

fn micro_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/adjacency");
    group.sample_size(40);
    group.throughput(Throughput::Elements(1));

    let mut harness = TopologyHarness::new(NODE_COUNT, EDGE_COUNT);
    group.bench_function("degree", |b| {
        b.iter(|| {
            let node = harness.next_node();
            black_box(harness.topology.degree(node))
        });
    });
    group.bench_function("decode_run", |b| {
        b.iter(|| {
            let node = harness.next_node();
            black_box(harness.topology.cursor(node).sum::<u64>())
        });
    });
    group.bench_function("skip_until_median", |b| {
        b.iter(|| {
            let node = harness.next_node();
            black_box(harness.topology.cursor(node).skip_until(NODE_COUNT / 2))
        });
    });
    group.finish();
}

fn micro_triangles(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/triangles");
    group.sample_size(10);

    for workers in [1usize, 4] {
        let graph = undirected_graph(NODE_COUNT, EDGE_COUNT);
        let config = TriangleCountConfig {
            concurrency: workers,
            ..TriangleCountConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("count", workers), &config, |b, config| {
            b.iter(|| {
                let result = count_triangles(graph.as_ref(), config, &TerminationFlag::new())
                    .expect("count");
                black_box(result.global_triangle_count)
            });
        });
    }
    group.finish();
}

struct TopologyHarness {
    topology: Topology,
    cursor: u64,
}

impl TopologyHarness {
    fn new(node_count: u64, edge_count: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(0xA11CE);
        let mut builder = RelationshipsBuilder::new(node_count, TopologyOptions::new());
        for _ in 0..edge_count {
            let source = rng.gen_range(0..node_count);
            let target = rng.gen_range(0..node_count);
            builder.add(source, target).expect("edge");
        }
        let relationships = builder.build_with_concurrency(4).expect("build");
        Self {
            topology: relationships.topology,
            cursor: 0,
        }
    }

    fn next_node(&mut self) -> NodeId {
        let node = self.cursor;
        self.cursor = (self.cursor + 1) % self.topology.node_count();
        node
    }
}

fn undirected_graph(node_count: u64, edge_count: u64) -> std::sync::Arc<dyn Graph> {
    let mut rng = ChaCha8Rng::seed_from_u64(0xBEEF);
    let mut builder = GraphStoreBuilder::new()
        .implicit_nodes(true)
        .relationship_type("R", TopologyOptions::undirected());
    for node in 0..node_count {
        builder.add_node(node, &[], &[]).expect("node");
    }
    for _ in 0..edge_count {
        let source = rng.gen_range(0..node_count);
        let target = rng.gen_range(0..node_count);
        builder
            .add_relationship("R", source, target, &[])
            .expect("edge");
    }
    builder
        .build(4)
        .expect("store")
        .get_graph(&[NodeLabel::all_nodes()], &[RelationshipType::new("R")], None, 4)
        .expect("graph")
}

criterion_group!(benches, micro_adjacency, micro_triangles);
criterion_main!(benches);
