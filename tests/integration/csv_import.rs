use std::fs;
use std::path::PathBuf;

use graphstore::algo::{count_triangles, TriangleCountConfig};
use graphstore::loader::csv::{
    import_nodes, import_relationships, EdgeImportConfig, ImportSummary, NodeImportConfig,
};
use graphstore::storage::TopologyOptions;
use graphstore::types::{GraphError, NodeLabel, RelationshipType, Result, ValueType};
use graphstore::{GraphStoreBuilder, TerminationFlag};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write csv");
    path
}

#[test]
fn imports_labeled_nodes_and_typed_relationships() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let nodes = write(
        &dir,
        "nodes.csv",
        "id,labels,age,score\n\
         1,Person|Admin,31,0.5\n\
         2,Person,,1.5\n\
         3,City,,\n",
    );
    let edges = write(
        &dir,
        "edges.csv",
        "src,dst,type,weight\n\
         1,2,KNOWS,2\n\
         2,3,LIVES_IN,\n\
         1,3,LIVES_IN,0.25\n",
    );

    let mut builder = GraphStoreBuilder::new()
        .relationship_type("KNOWS", TopologyOptions::undirected())
        .relationship_type("LIVES_IN", TopologyOptions::new());
    let node_summary = import_nodes(
        &mut builder,
        &NodeImportConfig {
            label_column: Some("labels".into()),
            ..NodeImportConfig::new(&nodes)
        },
    )?;
    let edge_summary = import_relationships(
        &mut builder,
        &EdgeImportConfig {
            type_column: Some("TYPE".into()),
            ..EdgeImportConfig::new(&edges)
        },
    )?;
    assert_eq!(node_summary, ImportSummary { nodes: 3, relationships: 0 });
    assert_eq!(edge_summary.relationships, 3);

    let store = builder.build(2)?;
    assert_eq!(store.node_count(), 3);
    assert_eq!(store.id_map().node_count_for_label(&NodeLabel::new("Person")), 2);
    assert_eq!(store.id_map().node_count_for_label(&NodeLabel::new("Admin")), 1);
    assert_eq!(store.node_property_type("age"), Some(ValueType::Long));
    assert_eq!(store.node_property_type("score"), Some(ValueType::Double));
    assert_eq!(store.relationship_count_of(&RelationshipType::new("KNOWS"))?, 2);

    let lives_in = store.get_graph(
        &store.node_labels(),
        &[RelationshipType::new("LIVES_IN")],
        Some("weight"),
        1,
    )?;
    let one = lives_in.to_mapped_node_id(1).expect("node 1");
    let three = lives_in.to_mapped_node_id(3).expect("node 3");
    assert_eq!(lives_in.relationship_property(one, three, 0.0), 0.25);
    Ok(())
}

#[test]
fn static_type_and_explicit_columns() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let edges = write(&dir, "edges.csv", "from,to,cost,note\n10,11,3,x\n11,12,4,y\n");
    let mut builder = GraphStoreBuilder::new()
        .implicit_nodes(true)
        .relationship_type("ROAD", TopologyOptions::new());
    import_relationships(
        &mut builder,
        &EdgeImportConfig {
            src_column: "from".into(),
            dst_column: "to".into(),
            static_type: Some("ROAD".into()),
            prop_columns: Some(vec!["cost".into()]),
            ..EdgeImportConfig::new(&edges)
        },
    )?;
    let store = builder.build(1)?;
    assert_eq!(store.node_count(), 3);
    assert_eq!(
        store.relationship_property_keys_of(&RelationshipType::new("ROAD")),
        vec!["cost".to_owned()]
    );
    Ok(())
}

#[test]
fn non_numeric_cell_names_row_and_column() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let nodes = write(&dir, "nodes.csv", "id,age\n1,40\n2,forty\n");
    let mut builder = GraphStoreBuilder::new();
    let err = import_nodes(&mut builder, &NodeImportConfig::new(&nodes)).unwrap_err();
    match err {
        GraphError::Parse(message) => {
            assert_eq!(message, "row 2: value 'forty' of column 'age' is not numeric")
        }
        other => panic!("unexpected error {other}"),
    }
    Ok(())
}

#[test]
fn missing_type_source_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let edges = write(&dir, "edges.csv", "src,dst\n1,2\n");
    let mut builder = GraphStoreBuilder::new().implicit_nodes(true);
    let err = import_relationships(&mut builder, &EdgeImportConfig::new(&edges)).unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
    Ok(())
}

#[test]
fn missing_file_surfaces_csv_error() {
    let mut builder = GraphStoreBuilder::new();
    let err = import_nodes(&mut builder, &NodeImportConfig::new("/nonexistent/nodes.csv"))
        .unwrap_err();
    assert!(matches!(err, GraphError::Csv(_)));
}

#[test]
fn labeled_nodes_project_through_store_labels() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let nodes = write(&dir, "nodes.csv", "id,label\n1,Person\n2,Person\n3,Person\n");
    let edges = write(&dir, "edges.csv", "src,dst\n1,2\n2,3\n3,1\n");
    let mut builder = GraphStoreBuilder::new()
        .implicit_nodes(true)
        .relationship_type("REL", TopologyOptions::undirected());
    import_nodes(
        &mut builder,
        &NodeImportConfig {
            label_column: Some("label".into()),
            ..NodeImportConfig::new(&nodes)
        },
    )?;
    import_relationships(
        &mut builder,
        &EdgeImportConfig {
            static_type: Some("REL".into()),
            prop_columns: Some(Vec::new()),
            ..EdgeImportConfig::new(&edges)
        },
    )?;
    let store = builder.build(1)?;
    assert_eq!(store.node_labels(), vec![NodeLabel::new("Person")]);

    let graph = store.get_graph(&store.node_labels(), &[RelationshipType::new("REL")], None, 0)?;
    let result = count_triangles(
        graph.as_ref(),
        &TriangleCountConfig::default(),
        &TerminationFlag::new(),
    )?;
    assert_eq!(result.global_triangle_count, 1);
    Ok(())
}
