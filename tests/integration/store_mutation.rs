use std::sync::Arc;
use std::thread;

use graphstore::storage::{
    GraphStore, PropertyColumn, RelationshipsBuilder, StoreOptions, TopologyOptions,
};
use graphstore::types::{GraphError, NodeLabel, PropertyState, RelationshipType, Result, ValueType};
use graphstore::{GraphStoreBuilder, PropertyValue};

fn person() -> NodeLabel {
    NodeLabel::new("Person")
}

fn knows() -> RelationshipType {
    RelationshipType::new("KNOWS")
}

/// Four people in a directed cycle with a weight on every relationship.
fn social_store() -> Result<GraphStore> {
    let mut builder = GraphStoreBuilder::new()
        .store_options(StoreOptions::new().default_concurrency(2))
        .relationship_type("KNOWS", TopologyOptions::new());
    for id in 100..104u64 {
        builder.add_node(id, &[person()], &[("age", PropertyValue::Long(id as i64 - 80))])?;
    }
    for (s, t) in [(100, 101), (101, 102), (102, 103), (103, 100)] {
        builder.add_relationship("KNOWS", s, t, &[("weight", (s - 99) as f64)])?;
    }
    builder.build(2)
}

#[test]
fn views_keep_relationships_after_deletion() -> Result<()> {
    let store = social_store()?;
    let before = store.get_graph(&[person()], &[knows()], Some("weight"), 1)?;
    let generation = store.generation();

    let result = store.delete_relationships(&knows())?;
    assert_eq!(result.deleted_relationships, 4);
    assert_eq!(result.deleted_properties.get("weight"), Some(&4));
    assert_eq!(store.generation(), generation + 1);

    assert_eq!(before.relationship_count(), 4);
    assert!(before.exists(0, 1));
    assert_eq!(before.relationship_property(3, 0, 0.0), 4.0);
    let err = store.get_graph(&[person()], &[knows()], None, 1).unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
    Ok(())
}

#[test]
fn deleting_unknown_type_changes_nothing() -> Result<()> {
    let store = social_store()?;
    let stamp = store.modification_time();
    let err = store
        .delete_relationships(&RelationshipType::new("LIKES"))
        .unwrap_err();
    assert!(err.to_string().contains("'KNOWS'"), "{err}");
    assert_eq!(store.generation(), 0);
    assert_eq!(store.modification_time(), stamp);
    assert_eq!(store.relationship_count(), 4);
    Ok(())
}

#[test]
fn removed_node_property_stays_visible_to_earlier_views() -> Result<()> {
    let store = social_store()?;
    let view = store.get_graph(&[person()], &[knows()], None, 1)?;
    assert!(store.remove_node_property(&person(), "age")?);
    assert!(!store.has_node_property(&[person()], "age"));
    let ages = view.node_properties("age").expect("captured before removal");
    assert_eq!(ages.long_value(2), Some(22));
    let fresh = store.get_graph(&[person()], &[knows()], None, 1)?;
    assert!(fresh.node_properties("age").is_none());
    Ok(())
}

#[test]
fn added_relationship_type_is_published_once() -> Result<()> {
    let store = social_store()?;
    let mut builder = RelationshipsBuilder::new(store.node_count(), TopologyOptions::undirected())
        .property("since", 2000.0);
    builder.add_with_properties(0, 2, &[2015.0])?;
    let likes = RelationshipType::new("LIKES");
    assert!(store.add_relationship_type(likes.clone(), builder.build()?)?);

    let graph = store.get_graph(&[person()], &[likes.clone()], Some("since"), 1)?;
    assert!(graph.is_undirected());
    assert!(graph.exists(2, 0));
    assert_eq!(graph.relationship_property(2, 0, 0.0), 2015.0);
    assert_eq!(
        store.schema().relationships["LIKES"].properties["since"].state,
        PropertyState::Transient
    );

    let generation = store.generation();
    let duplicate = RelationshipsBuilder::new(store.node_count(), TopologyOptions::new()).build()?;
    assert!(!store.add_relationship_type(likes.clone(), duplicate)?);
    assert_eq!(store.relationship_count_of(&likes)?, 2);
    assert_eq!(store.generation(), generation);
    Ok(())
}

#[test]
fn concurrent_mutations_are_serialized() -> Result<()> {
    let store = Arc::new(social_store()?);
    let node_count = store.node_count() as usize;
    let writers: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let values = PropertyColumn::Double(vec![i as f64; node_count]);
                store.add_node_property(&[person()], &format!("score{i}"), Arc::new(values))
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || -> Result<()> {
                for _ in 0..50 {
                    let graph = store.get_graph(&[person()], &[knows()], None, 1)?;
                    assert_eq!(graph.relationship_count(), 4);
                }
                Ok(())
            })
        })
        .collect();
    for handle in writers {
        handle.join().expect("writer panicked")?;
    }
    for handle in readers {
        handle.join().expect("reader panicked")?;
    }

    assert_eq!(store.generation(), 8);
    assert_eq!(store.node_property_keys(&person()).len(), 9);
    assert_eq!(store.node_property_type("score3"), Some(ValueType::Double));
    Ok(())
}

#[test]
fn mismatched_property_type_is_rejected() -> Result<()> {
    let store = social_store()?;
    let err = store
        .add_node_property(
            &[person()],
            "age",
            Arc::new(PropertyColumn::Double(vec![0.0; 4])),
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
    assert_eq!(store.generation(), 0);
    Ok(())
}

#[test]
fn schema_serializes_to_json() -> Result<()> {
    let store = social_store()?;
    let json = store.schema().to_json().expect("schema serializes");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["node_count"], 4);
    assert_eq!(value["nodes"]["Person"]["age"]["value_type"], "Long");
    assert_eq!(value["relationships"]["KNOWS"]["relationship_count"], 4);
    Ok(())
}

#[test]
fn repeated_relationship_types_do_not_double_count() -> Result<()> {
    let store = social_store()?;
    let graph = store.get_graph(&[person()], &[knows(), knows(), knows()], Some("weight"), 1)?;
    assert_eq!(graph.relationship_count(), store.relationship_count());
    assert_eq!(graph.degree(0), 1);
    let mut targets = Vec::new();
    graph.for_each_relationship(0, &mut |_, t| {
        targets.push(t);
        true
    });
    assert_eq!(targets, vec![1]);
    Ok(())
}

#[test]
fn union_view_serves_relationship_properties() -> Result<()> {
    let store = social_store()?;
    let union = store.get_union()?;
    assert_eq!(union.relationship_count(), 4);
    assert_eq!(union.relationship_property(1, 2, 0.0), 2.0);
    Ok(())
}

#[test]
fn node_property_removal_keeps_other_labels() -> Result<()> {
    let mut builder = GraphStoreBuilder::new();
    builder.add_node(1, &[person()], &[("rank", PropertyValue::Long(1))])?;
    builder.add_node(2, &[NodeLabel::new("City")], &[("rank", PropertyValue::Long(2))])?;
    let store = builder.build(1)?;
    assert!(store.remove_node_property(&person(), "rank")?);
    assert!(!store.remove_node_property(&person(), "rank")?);
    assert_eq!(store.generation(), 1);
    assert!(store.has_node_property(&[NodeLabel::new("City")], "rank"));
    assert_eq!(store.node_property("rank")?.long_value(1), Some(2));
    Ok(())
}
