//! The graph store aggregate: id map, property stores, and per-type topologies.
//!
//! Readers take an `Arc` snapshot of the current catalog and never lock
//! again. Structural mutations run one at a time under the writer mutex: they
//! clone the catalog, edit the copy, stamp it, and publish it with a single
//! pointer swap. Views materialized earlier keep the topologies and columns
//! they captured.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::primitives::concurrency::effective_concurrency;
use crate::types::{
    join_quoted, GraphError, NodeLabel, PropertyState, RelationshipType, Result, ValueType,
};

use super::graph::{CsrGraph, Graph, NodeFilteredGraph, UnionGraph};
use super::id_map::{FilteredIdMap, IdMap};
use super::metrics::{default_metrics, MutationKind, StoreMetrics};
use super::options::StoreOptions;
use super::props::{
    NodeProperty, NodePropertyStore, NodePropertyValues, PropertyColumn, RelationshipProperty,
    UnionNodeProperties,
};
use super::schema::{GraphStoreSchema, PropertySchema, RelationshipSchema};
use super::topology::{PropertyCsr, Relationships, Topology};

/// Outcome of [`GraphStore::delete_relationships`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionResult {
    /// Relationships removed with the type.
    pub deleted_relationships: u64,
    /// Values removed per relationship property.
    pub deleted_properties: BTreeMap<String, u64>,
}

#[derive(Clone)]
struct Catalog {
    node_properties: BTreeMap<NodeLabel, NodePropertyStore>,
    relationships: BTreeMap<RelationshipType, Arc<Topology>>,
    relationship_properties: BTreeMap<RelationshipType, BTreeMap<String, RelationshipProperty>>,
    modified_at: OffsetDateTime,
    generation: u64,
}

impl Catalog {
    fn topology(&self, relationship_type: &RelationshipType) -> Result<&Arc<Topology>> {
        self.relationships.get(relationship_type).ok_or_else(|| {
            GraphError::InvalidArgument(format!(
                "No relationships have been loaded for relationship type '{}'. Available relationship types: [{}]",
                relationship_type,
                join_quoted(self.relationships.keys())
            ))
        })
    }

    fn relationship_property(
        &self,
        relationship_type: &RelationshipType,
        key: &str,
    ) -> Option<&RelationshipProperty> {
        self.relationship_properties
            .get(relationship_type)
            .and_then(|props| props.get(key))
    }
}

/// Outcome of a mutation closure; unchanged catalogs are not published.
enum Change<T> {
    Committed(T),
    Unchanged(T),
}

/// In-memory graph assembled from bulk-loaded columns.
pub struct GraphStore {
    nodes: Arc<IdMap>,
    catalog: RwLock<Arc<Catalog>>,
    writer: Mutex<()>,
    options: StoreOptions,
    metrics: Arc<dyn StoreMetrics>,
    releasable: AtomicBool,
    views: Mutex<Vec<Weak<dyn Graph>>>,
}

impl GraphStore {
    /// Assembles a store, checking that every column fits the id map and
    /// every relationship property belongs to a loaded type.
    pub fn of(
        nodes: IdMap,
        node_properties: BTreeMap<NodeLabel, BTreeMap<String, PropertyColumn>>,
        relationships: BTreeMap<RelationshipType, Topology>,
        relationship_properties: BTreeMap<RelationshipType, BTreeMap<String, PropertyCsr>>,
        options: StoreOptions,
    ) -> Result<Self> {
        let node_count = nodes.node_count();

        let mut label_stores = BTreeMap::new();
        for (label, columns) in node_properties {
            if !nodes.has_label(&label) {
                return Err(GraphError::InvalidArgument(format!(
                    "Node label '{}' of the loaded properties does not exist in the id map. Available node labels: [{}]",
                    label,
                    join_quoted(nodes.available_labels())
                )));
            }
            let mut store = NodePropertyStore::empty();
            for (key, column) in columns {
                if column.node_count() != node_count {
                    return Err(GraphError::InvalidArgument(format!(
                        "Node property '{}.{}' has {} values for {} nodes.",
                        label,
                        key,
                        column.node_count(),
                        node_count
                    )));
                }
                store = store.with_property_if_absent(NodeProperty::new(
                    key,
                    PropertyState::Persistent,
                    Arc::new(column),
                ));
            }
            if !store.is_empty() {
                label_stores.insert(label, store);
            }
        }

        let mut topologies = BTreeMap::new();
        for (relationship_type, topology) in relationships {
            if topology.node_count() != node_count {
                return Err(GraphError::InvalidArgument(format!(
                    "Topology of relationship type '{}' covers {} nodes, the id map has {}.",
                    relationship_type,
                    topology.node_count(),
                    node_count
                )));
            }
            topologies.insert(relationship_type, Arc::new(topology));
        }

        let mut rel_props = BTreeMap::new();
        for (relationship_type, columns) in relationship_properties {
            let topology = topologies.get(&relationship_type).ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "Relationship properties were loaded for type '{}' which has no topology. Available relationship types: [{}]",
                    relationship_type,
                    join_quoted(topologies.keys())
                ))
            })?;
            let props = Self::relationship_columns(
                &relationship_type,
                topology,
                columns,
                PropertyState::Persistent,
            )?;
            rel_props.insert(relationship_type, props);
        }

        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        let catalog = Catalog {
            node_properties: label_stores,
            relationships: topologies,
            relationship_properties: rel_props,
            modified_at: OffsetDateTime::now_utc(),
            generation: 0,
        };
        info!(
            nodes = node_count,
            relationship_types = catalog.relationships.len(),
            "store.created"
        );
        Ok(Self {
            nodes: Arc::new(nodes),
            catalog: RwLock::new(Arc::new(catalog)),
            writer: Mutex::new(()),
            options,
            metrics,
            releasable: AtomicBool::new(true),
            views: Mutex::new(Vec::new()),
        })
    }

    fn relationship_columns(
        relationship_type: &RelationshipType,
        topology: &Topology,
        columns: BTreeMap<String, PropertyCsr>,
        state: PropertyState,
    ) -> Result<BTreeMap<String, RelationshipProperty>> {
        let mut props = BTreeMap::new();
        for (key, column) in columns {
            if column.node_count() != topology.node_count()
                || column.element_count() != topology.relationship_count()
            {
                return Err(GraphError::InvalidArgument(format!(
                    "Relationship property '{}' of type '{}' holds {} values for {} relationships.",
                    key,
                    relationship_type,
                    column.element_count(),
                    topology.relationship_count()
                )));
            }
            props.insert(
                key.clone(),
                RelationshipProperty::new(key, state, Arc::new(column)),
            );
        }
        Ok(props)
    }

    fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog.read())
    }

    fn update<T>(
        &self,
        kind: MutationKind,
        f: impl FnOnce(&mut Catalog) -> Result<Change<T>>,
    ) -> Result<T> {
        let _writer = self.writer.lock();
        let mut next = Catalog::clone(&self.snapshot());
        let out = match f(&mut next)? {
            Change::Committed(out) => out,
            Change::Unchanged(out) => {
                debug!(kind = kind.as_str(), "store.mutation.skipped");
                return Ok(out);
            }
        };
        next.modified_at = OffsetDateTime::now_utc();
        next.generation += 1;
        let generation = next.generation;
        *self.catalog.write() = Arc::new(next);
        self.metrics.store_mutated(kind);
        debug!(kind = kind.as_str(), generation, "store.mutation.committed");
        Ok(out)
    }

    /// Shared id map.
    pub fn id_map(&self) -> &Arc<IdMap> {
        &self.nodes
    }

    /// Options the store was assembled with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Number of loaded nodes.
    pub fn node_count(&self) -> u64 {
        self.nodes.node_count()
    }

    /// Labels of the id map.
    pub fn node_labels(&self) -> Vec<NodeLabel> {
        self.nodes.available_labels().cloned().collect()
    }

    /// Property keys stored for `label`.
    pub fn node_property_keys(&self, label: &NodeLabel) -> Vec<String> {
        self.snapshot()
            .node_properties
            .get(label)
            .map(|store| store.keys().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Property keys of every label, including labels without properties.
    pub fn node_property_keys_by_label(&self) -> BTreeMap<NodeLabel, Vec<String>> {
        self.nodes
            .available_labels()
            .map(|label| (label.clone(), self.node_property_keys(label)))
            .collect()
    }

    /// Whether every one of `labels` stores `key`.
    pub fn has_node_property(&self, labels: &[NodeLabel], key: &str) -> bool {
        let catalog = self.snapshot();
        !labels.is_empty()
            && labels.iter().all(|label| {
                catalog
                    .node_properties
                    .get(label)
                    .is_some_and(|store| store.contains_key(key))
            })
    }

    /// Property `key` read across every label storing it.
    pub fn node_property(&self, key: &str) -> Result<Arc<dyn NodePropertyValues>> {
        let catalog = self.snapshot();
        let labels: Vec<NodeLabel> = catalog
            .node_properties
            .iter()
            .filter(|(_, store)| store.contains_key(key))
            .map(|(label, _)| label.clone())
            .collect();
        self.resolve_node_property(&catalog, &labels, key)?
            .ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "Node property '{}' does not exist in the graph store.",
                    key
                ))
            })
    }

    /// Property `key` of `label` as stored.
    pub fn node_property_for_label(&self, label: &NodeLabel, key: &str) -> Option<NodeProperty> {
        self.snapshot()
            .node_properties
            .get(label)
            .and_then(|store| store.get(key).cloned())
    }

    /// Value type of node property `key`, if any label stores it.
    pub fn node_property_type(&self, key: &str) -> Option<ValueType> {
        self.snapshot()
            .node_properties
            .values()
            .find_map(|store| store.get(key).map(NodeProperty::value_type))
    }

    /// Number of distinct node property keys.
    pub fn node_property_count(&self) -> usize {
        self.snapshot()
            .node_properties
            .values()
            .flat_map(|store| store.keys().map(str::to_owned))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Loaded relationship types.
    pub fn relationship_types(&self) -> Vec<RelationshipType> {
        self.snapshot().relationships.keys().cloned().collect()
    }

    /// Whether `relationship_type` is loaded.
    pub fn has_relationship_type(&self, relationship_type: &RelationshipType) -> bool {
        self.snapshot().relationships.contains_key(relationship_type)
    }

    /// Relationships across all types.
    pub fn relationship_count(&self) -> u64 {
        self.snapshot()
            .relationships
            .values()
            .map(|t| t.relationship_count())
            .sum()
    }

    /// Relationships of one type.
    pub fn relationship_count_of(&self, relationship_type: &RelationshipType) -> Result<u64> {
        Ok(self
            .snapshot()
            .topology(relationship_type)?
            .relationship_count())
    }

    /// Whether every one of `types` stores property `key`.
    pub fn has_relationship_property(&self, types: &[RelationshipType], key: &str) -> bool {
        let catalog = self.snapshot();
        !types.is_empty()
            && types
                .iter()
                .all(|t| catalog.relationship_property(t, key).is_some())
    }

    /// Value type of relationship property `key`, if any type stores it.
    pub fn relationship_property_type(&self, key: &str) -> Option<ValueType> {
        self.snapshot()
            .relationship_properties
            .values()
            .find_map(|props| props.get(key).map(RelationshipProperty::value_type))
    }

    /// Relationship property keys across all types.
    pub fn relationship_property_keys(&self) -> BTreeSet<String> {
        self.snapshot()
            .relationship_properties
            .values()
            .flat_map(|props| props.keys().cloned())
            .collect()
    }

    /// Relationship property keys of one type.
    pub fn relationship_property_keys_of(&self, relationship_type: &RelationshipType) -> Vec<String> {
        self.snapshot()
            .relationship_properties
            .get(relationship_type)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of distinct relationship property keys.
    pub fn relationship_property_count(&self) -> usize {
        self.relationship_property_keys().len()
    }

    /// Time of the last committed mutation, or of assembly.
    pub fn modification_time(&self) -> OffsetDateTime {
        self.snapshot().modified_at
    }

    /// Number of committed mutations.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Inventory of labels, types, and properties.
    pub fn schema(&self) -> GraphStoreSchema {
        let catalog = self.snapshot();
        let nodes = self
            .nodes
            .available_labels()
            .map(|label| {
                let props = catalog
                    .node_properties
                    .get(label)
                    .map(|store| {
                        store
                            .keys()
                            .filter_map(|key| store.get(key))
                            .map(|p| {
                                (
                                    p.key().to_owned(),
                                    PropertySchema {
                                        value_type: p.value_type(),
                                        state: p.state(),
                                    },
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (label.name().to_owned(), props)
            })
            .collect();
        let relationships = catalog
            .relationships
            .iter()
            .map(|(relationship_type, topology)| {
                let properties = catalog
                    .relationship_properties
                    .get(relationship_type)
                    .map(|props| {
                        props
                            .values()
                            .map(|p| {
                                (
                                    p.key().to_owned(),
                                    PropertySchema {
                                        value_type: p.value_type(),
                                        state: p.state(),
                                    },
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (
                    relationship_type.name().to_owned(),
                    RelationshipSchema {
                        relationship_count: topology.relationship_count(),
                        undirected: topology.is_undirected(),
                        properties,
                    },
                )
            })
            .collect();
        GraphStoreSchema {
            node_count: self.node_count(),
            nodes,
            relationships,
        }
    }

    /// Materializes a view over `types` restricted to nodes carrying any of
    /// `labels`, optionally selecting relationship property `property`.
    ///
    /// Repeated types are projected once. A `concurrency` of `0` falls back
    /// to the store's default.
    pub fn get_graph(
        &self,
        labels: &[NodeLabel],
        types: &[RelationshipType],
        property: Option<&str>,
        concurrency: usize,
    ) -> Result<Arc<dyn Graph>> {
        let catalog = self.snapshot();
        let mut seen = BTreeSet::new();
        let mut selection = Vec::with_capacity(types.len());
        for relationship_type in types.iter().filter(|t| seen.insert(*t)) {
            catalog.topology(relationship_type)?;
            if let Some(key) = property {
                if catalog.relationship_property(relationship_type, key).is_none() {
                    return Err(GraphError::InvalidArgument(format!(
                        "Property '{}' does not exist for relationships with type '{}'.",
                        key, relationship_type
                    )));
                }
            }
            selection.push((relationship_type, property));
        }
        self.materialize(&catalog, labels, &selection, concurrency)
    }

    /// View over every node and every relationship type.
    ///
    /// Each type carries its first relationship property in key order, if it
    /// has any.
    pub fn get_union(&self) -> Result<Arc<dyn Graph>> {
        let catalog = self.snapshot();
        let labels = self.node_labels();
        let selection: Vec<(&RelationshipType, Option<&str>)> = catalog
            .relationships
            .keys()
            .map(|relationship_type| {
                let key = catalog
                    .relationship_properties
                    .get(relationship_type)
                    .and_then(|props| props.keys().next())
                    .map(String::as_str);
                (relationship_type, key)
            })
            .collect();
        self.materialize(&catalog, &labels, &selection, 0)
    }

    fn materialize(
        &self,
        catalog: &Catalog,
        labels: &[NodeLabel],
        selection: &[(&RelationshipType, Option<&str>)],
        concurrency: usize,
    ) -> Result<Arc<dyn Graph>> {
        if labels.is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "The set of node labels must not be empty. Available node labels: [{}]",
                join_quoted(self.nodes.available_labels())
            )));
        }
        if selection.is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "The set of relationship types must not be empty. Available relationship types: [{}]",
                join_quoted(catalog.relationships.keys())
            )));
        }

        let filtered = !self.nodes.covers_all(labels)?;
        let node_properties = self.node_property_views(catalog, labels)?;
        let id_map = if filtered {
            let workers = effective_concurrency(if concurrency == 0 {
                self.options.default_concurrency
            } else {
                concurrency
            });
            Some(Arc::new(FilteredIdMap::new(
                Arc::clone(&self.nodes),
                labels,
                workers,
                self.options.filter_chunk_size,
            )?))
        } else {
            None
        };

        let mut parts: Vec<Arc<dyn Graph>> = Vec::with_capacity(selection.len());
        for &(relationship_type, property) in selection {
            let topology = Arc::clone(catalog.topology(relationship_type)?);
            let values = property
                .and_then(|key| catalog.relationship_property(relationship_type, key))
                .map(|p| Arc::clone(p.values()));
            let view = CsrGraph::borrowed(
                Arc::clone(&self.nodes),
                relationship_type.clone(),
                topology,
                values,
                node_properties.clone(),
            );
            let part: Arc<dyn Graph> = match &id_map {
                Some(id_map) => Arc::new(NodeFilteredGraph::new(view, Arc::clone(id_map))),
                None => Arc::new(view),
            };
            parts.push(part);
        }
        let graph = UnionGraph::of(parts)?;

        {
            let mut views = self.views.lock();
            views.retain(|view| view.strong_count() > 0);
            views.push(Arc::downgrade(&graph));
        }
        self.metrics.graph_materialized(selection.len(), filtered);
        debug!(
            types = selection.len(),
            filtered,
            nodes = graph.node_count(),
            generation = catalog.generation,
            "store.graph.materialized"
        );
        Ok(graph)
    }

    fn node_property_views(
        &self,
        catalog: &Catalog,
        labels: &[NodeLabel],
    ) -> Result<BTreeMap<String, Arc<dyn NodePropertyValues>>> {
        let keys: BTreeSet<&str> = labels
            .iter()
            .filter_map(|label| catalog.node_properties.get(label))
            .flat_map(|store| store.keys())
            .collect();
        let mut views = BTreeMap::new();
        for key in keys {
            if let Some(values) = self.resolve_node_property(catalog, labels, key)? {
                views.insert(key.to_owned(), values);
            }
        }
        Ok(views)
    }

    fn resolve_node_property(
        &self,
        catalog: &Catalog,
        labels: &[NodeLabel],
        key: &str,
    ) -> Result<Option<Arc<dyn NodePropertyValues>>> {
        let mut parts = Vec::new();
        for label in labels {
            let Some(property) = catalog.node_properties.get(label).and_then(|s| s.get(key)) else {
                continue;
            };
            let members = self
                .nodes
                .label_bitmap(label)
                .cloned()
                .unwrap_or_default();
            parts.push((label.clone(), members, Arc::clone(property.values())));
        }
        match parts.len() {
            0 => Ok(None),
            1 => Ok(parts.pop().map(|(_, _, values)| values)),
            _ => Ok(Some(Arc::new(UnionNodeProperties::new(
                self.node_count(),
                parts,
            )?))),
        }
    }

    /// Publishes `values` as property `key` of every one of `labels`.
    ///
    /// Labels already storing `key` keep their existing values.
    pub fn add_node_property(
        &self,
        labels: &[NodeLabel],
        key: &str,
        values: Arc<dyn NodePropertyValues>,
    ) -> Result<()> {
        let label_list = labels.iter().map(NodeLabel::name).collect::<Vec<_>>().join(", ");
        for label in labels {
            if !self.nodes.has_label(label) {
                return Err(GraphError::InvalidArgument(format!(
                    "Adding '{}.{}' to the graph store failed. Node label '{}' does not exist in the store. Available node labels: [{}]",
                    label_list,
                    key,
                    label,
                    join_quoted(self.nodes.available_labels())
                )));
            }
        }
        if values.node_count() != self.node_count() {
            return Err(GraphError::InvalidArgument(format!(
                "Adding '{}.{}' to the graph store failed. The values cover {} nodes, the store has {}.",
                label_list,
                key,
                values.node_count(),
                self.node_count()
            )));
        }
        self.update(MutationKind::AddNodeProperty, |catalog| {
            let existing = catalog
                .node_properties
                .values()
                .find_map(|store| store.get(key).map(NodeProperty::value_type));
            if let Some(existing) = existing.filter(|t| *t != values.value_type()) {
                return Err(GraphError::InvalidArgument(format!(
                    "Adding '{}.{}' to the graph store failed. The property is stored as {} but the new values are {}.",
                    label_list,
                    key,
                    existing,
                    values.value_type()
                )));
            }
            let mut added = false;
            for label in labels {
                let store = catalog.node_properties.entry(label.clone()).or_default();
                if store.contains_key(key) {
                    continue;
                }
                *store = store.with_property_if_absent(NodeProperty::new(
                    key,
                    PropertyState::Transient,
                    Arc::clone(&values),
                ));
                added = true;
            }
            Ok(if added {
                Change::Committed(())
            } else {
                Change::Unchanged(())
            })
        })
    }

    /// Removes node property `key` from `label`; other labels keep theirs.
    ///
    /// Returns whether `label` stored the property.
    pub fn remove_node_property(&self, label: &NodeLabel, key: &str) -> Result<bool> {
        if !self.nodes.has_label(label) {
            return Err(GraphError::InvalidArgument(format!(
                "Removing '{}.{}' from the graph store failed. Node label '{}' does not exist in the store. Available node labels: [{}]",
                label,
                key,
                label,
                join_quoted(self.nodes.available_labels())
            )));
        }
        self.update(MutationKind::RemoveNodeProperty, |catalog| {
            let Some(store) = catalog.node_properties.get(label) else {
                return Ok(Change::Unchanged(false));
            };
            if !store.contains_key(key) {
                return Ok(Change::Unchanged(false));
            }
            let store = store.without(key);
            if store.is_empty() {
                catalog.node_properties.remove(label);
            } else {
                catalog.node_properties.insert(label.clone(), store);
            }
            Ok(Change::Committed(true))
        })
    }

    /// Publishes a new relationship type.
    ///
    /// Returns `false` without replacing anything when the type already exists.
    pub fn add_relationship_type(
        &self,
        relationship_type: RelationshipType,
        relationships: Relationships,
    ) -> Result<bool> {
        let Relationships {
            topology,
            properties,
        } = relationships;
        if topology.node_count() != self.node_count() {
            return Err(GraphError::InvalidArgument(format!(
                "Topology of relationship type '{}' covers {} nodes, the store has {}.",
                relationship_type,
                topology.node_count(),
                self.node_count()
            )));
        }
        let props = Self::relationship_columns(
            &relationship_type,
            &topology,
            properties,
            PropertyState::Transient,
        )?;
        self.update(MutationKind::AddRelationshipType, |catalog| {
            if catalog.relationships.contains_key(&relationship_type) {
                return Ok(Change::Unchanged(false));
            }
            if !props.is_empty() {
                catalog
                    .relationship_properties
                    .insert(relationship_type.clone(), props);
            }
            catalog
                .relationships
                .insert(relationship_type, Arc::new(topology));
            Ok(Change::Committed(true))
        })
    }

    /// Drops `relationship_type` and its properties.
    pub fn delete_relationships(&self, relationship_type: &RelationshipType) -> Result<DeletionResult> {
        self.update(MutationKind::DeleteRelationships, |catalog| {
            catalog.topology(relationship_type)?;
            let deleted_relationships = catalog
                .relationships
                .remove(relationship_type)
                .map(|t| t.relationship_count())
                .unwrap_or_default();
            let deleted_properties = catalog
                .relationship_properties
                .remove(relationship_type)
                .unwrap_or_default()
                .into_iter()
                .map(|(key, p)| (key, p.values().element_count()))
                .collect();
            Ok(Change::Committed(DeletionResult {
                deleted_relationships,
                deleted_properties,
            }))
        })
    }

    /// Allows or forbids [`GraphStore::release`].
    pub fn can_release(&self, releasable: bool) {
        self.releasable.store(releasable, Ordering::Release);
    }

    /// Whether [`GraphStore::release`] is currently allowed.
    pub fn is_releasable(&self) -> bool {
        self.releasable.load(Ordering::Acquire)
    }

    /// Drops the store's properties and topologies.
    ///
    /// Views materialized earlier keep what they captured. Returns `false`
    /// without changing anything while release is forbidden.
    pub fn release(&self) -> bool {
        if !self.is_releasable() {
            warn!(live_views = self.live_views(), "store.release.refused");
            return false;
        }
        let _writer = self.writer.lock();
        let current = self.snapshot();
        let next = Catalog {
            node_properties: BTreeMap::new(),
            relationships: BTreeMap::new(),
            relationship_properties: BTreeMap::new(),
            modified_at: OffsetDateTime::now_utc(),
            generation: current.generation + 1,
        };
        *self.catalog.write() = Arc::new(next);
        self.metrics.store_released();
        info!(
            relationship_types = current.relationships.len(),
            live_views = self.live_views(),
            "store.released"
        );
        true
    }

    /// Number of materialized views still held by callers.
    pub fn live_views(&self) -> usize {
        let mut views = self.views.lock();
        views.retain(|view| view.strong_count() > 0);
        views.len()
    }
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.snapshot();
        f.debug_struct("GraphStore")
            .field("nodes", &self.nodes.node_count())
            .field("relationship_types", &catalog.relationships.len())
            .field("generation", &catalog.generation)
            .finish()
    }
}
