use std::collections::BTreeSet;
use std::sync::Arc;

use graphstore::algo::{count_triangles, stream_triangles, Triangle, TriangleCountConfig};
use graphstore::primitives::concurrency::TerminationFlag;
use graphstore::storage::{Graph, RelationshipIntersect, RelationshipsBuilder, TopologyOptions};
use graphstore::types::{NodeId, NodeLabel, RelationshipType, Result};
use graphstore::{GraphStore, GraphStoreBuilder};
use proptest::prelude::*;

/// Nodes `0..node_count` are added in order, so internal ids equal original ids.
/// Even nodes carry `Even`, odd nodes `Odd`.
fn store_of(node_count: u64, edges: &[(u64, u64)]) -> Result<GraphStore> {
    let mut builder =
        GraphStoreBuilder::new().relationship_type("R", TopologyOptions::undirected());
    for node in 0..node_count {
        let label = if node % 2 == 0 { "Even" } else { "Odd" };
        builder.add_node(node, &[NodeLabel::new(label)], &[])?;
    }
    for &(s, t) in edges {
        builder.add_relationship("R", s, t, &[])?;
    }
    builder.build(2)
}

fn graph_of(store: &GraphStore, labels: &[NodeLabel]) -> Result<Arc<dyn Graph>> {
    store.get_graph(labels, &[RelationshipType::new("R")], None, 2)
}

fn all_labels() -> Vec<NodeLabel> {
    vec![NodeLabel::new("Even"), NodeLabel::new("Odd")]
}

/// Every distinct triple of pairwise adjacent nodes accepted by `keep`.
fn brute_force(
    node_count: u64,
    edges: &[(u64, u64)],
    keep: impl Fn(NodeId) -> bool,
) -> BTreeSet<(NodeId, NodeId, NodeId)> {
    let adjacent: BTreeSet<(u64, u64)> = edges
        .iter()
        .flat_map(|&(s, t)| [(s, t), (t, s)])
        .collect();
    let mut found = BTreeSet::new();
    for a in (0..node_count).filter(|&n| keep(n)) {
        for b in (a + 1..node_count).filter(|&n| keep(n)) {
            if !adjacent.contains(&(a, b)) {
                continue;
            }
            for c in (b + 1..node_count).filter(|&n| keep(n)) {
                if adjacent.contains(&(a, c)) && adjacent.contains(&(b, c)) {
                    found.insert((a, b, c));
                }
            }
        }
    }
    found
}

fn enumerate(graph: &dyn Graph, max_degree: u64) -> Result<Vec<(NodeId, NodeId, NodeId)>> {
    let intersect = graph.relationship_intersect(max_degree)?;
    let mut pool = intersect.cursor_pool();
    let mut found = Vec::new();
    for a in 0..intersect.node_count() {
        intersect.intersect_all(a, &mut pool, &mut |a: NodeId, b: NodeId, c: NodeId| {
            found.push((
                graph.to_original_node_id(a),
                graph.to_original_node_id(b),
                graph.to_original_node_id(c),
            ))
        });
    }
    Ok(found)
}

fn edges_strategy() -> impl Strategy<Value = (u64, Vec<(u64, u64)>)> {
    (3u64..24).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..80)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_matches_brute_force_exactly_once((n, edges) in edges_strategy()) {
        let store = store_of(n, &edges).unwrap();
        let graph = graph_of(&store, &all_labels()).unwrap();
        let found = enumerate(graph.as_ref(), u64::MAX).unwrap();
        let distinct: BTreeSet<_> = found.iter().copied().collect();
        prop_assert_eq!(found.len(), distinct.len(), "duplicate triangle in {:?}", found);
        prop_assert!(found.iter().all(|&(a, b, c)| a < b && b < c));
        prop_assert_eq!(distinct, brute_force(n, &edges, |_| true));
    }

    #[test]
    fn prop_degree_filter_drops_every_heavy_corner((n, edges) in edges_strategy(), max_degree in 0u64..12) {
        let store = store_of(n, &edges).unwrap();
        let graph = graph_of(&store, &all_labels()).unwrap();
        let light: Vec<bool> = (0..n).map(|node| graph.degree(node) <= max_degree).collect();
        let found: BTreeSet<_> = enumerate(graph.as_ref(), max_degree).unwrap().into_iter().collect();
        prop_assert_eq!(found, brute_force(n, &edges, |node| light[node as usize]));
    }

    #[test]
    fn prop_label_filtered_view_sees_member_triangles_only((n, edges) in edges_strategy()) {
        let store = store_of(n, &edges).unwrap();
        let graph = graph_of(&store, &[NodeLabel::new("Even")]).unwrap();
        let found: BTreeSet<_> = enumerate(graph.as_ref(), u64::MAX).unwrap().into_iter().collect();
        prop_assert_eq!(found, brute_force(n, &edges, |node| node % 2 == 0));
    }

    #[test]
    fn prop_parallel_count_matches_sequential((n, edges) in edges_strategy(), workers in 1usize..5) {
        let store = store_of(n, &edges).unwrap();
        let graph = graph_of(&store, &all_labels()).unwrap();
        let config = TriangleCountConfig { concurrency: workers, chunk_size: 2, ..TriangleCountConfig::default() };
        let result = count_triangles(graph.as_ref(), &config, &TerminationFlag::new()).unwrap();
        let expected = brute_force(n, &edges, |_| true);
        prop_assert_eq!(result.global_triangle_count, expected.len() as u64);
        let mut local = vec![0u64; n as usize];
        for (a, b, c) in expected {
            for corner in [a, b, c] {
                local[corner as usize] += 1;
            }
        }
        prop_assert_eq!(result.local_triangle_counts, local);
    }
}

#[test]
fn parallel_relationships_and_self_loops_do_not_duplicate() -> Result<()> {
    let edges = [(0, 1), (0, 1), (1, 0), (1, 2), (2, 2), (2, 0), (0, 2), (1, 1)];
    let store = store_of(3, &edges)?;
    let graph = graph_of(&store, &all_labels())?;
    assert_eq!(enumerate(graph.as_ref(), u64::MAX)?, vec![(0, 1, 2)]);
    Ok(())
}

#[test]
fn engine_runs_over_a_raw_topology() -> Result<()> {
    // K4 has four triangles.
    let mut builder = RelationshipsBuilder::new(4, TopologyOptions::undirected());
    for s in 0..4u64 {
        for t in (s + 1)..4 {
            builder.add(s, t)?;
        }
    }
    let topology = builder.build()?.topology;
    let engine = RelationshipIntersect::new(&topology, u64::MAX);
    let mut pool = engine.cursor_pool();
    let mut count = 0;
    for a in 0..4 {
        engine.intersect_all(a, &mut pool, &mut |_: NodeId, _: NodeId, _: NodeId| count += 1);
    }
    assert_eq!(count, 4);
    Ok(())
}

#[test]
fn degree_cap_excludes_hub() -> Result<()> {
    // The hub 3 closes three extra triangles and has degree 5.
    let edges = [(0, 1), (1, 2), (2, 0), (3, 0), (3, 1), (3, 2), (3, 4), (3, 5)];
    let store = store_of(6, &edges)?;
    let graph = graph_of(&store, &all_labels())?;
    assert_eq!(enumerate(graph.as_ref(), u64::MAX)?.len(), 4);
    assert_eq!(enumerate(graph.as_ref(), 3)?, vec![(0, 1, 2)]);
    Ok(())
}

#[test]
fn stream_and_count_agree() -> Result<()> {
    let edges = [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2), (4, 5)];
    let store = store_of(6, &edges)?;
    let graph = graph_of(&store, &all_labels())?;
    let config = TriangleCountConfig {
        concurrency: 2,
        chunk_size: 1,
        queue_capacity: 1,
        ..TriangleCountConfig::default()
    };
    let counted = count_triangles(graph.as_ref(), &config, &TerminationFlag::new())?;
    let mut streamed = stream_triangles(Arc::clone(&graph), config, TerminationFlag::new())?
        .collect::<Result<Vec<Triangle>>>()?;
    streamed.sort();
    assert_eq!(counted.global_triangle_count, streamed.len() as u64);
    assert_eq!(
        streamed,
        vec![Triangle { a: 0, b: 1, c: 2 }, Triangle { a: 2, b: 3, c: 4 }]
    );
    Ok(())
}
