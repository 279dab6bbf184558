//! Mapping between original node ids and dense internal ids.

use std::collections::BTreeMap;
use std::sync::Arc;

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::primitives::concurrency::{run_chunked, TerminationFlag};
use crate::types::{join_quoted, GraphError, NodeId, NodeLabel, OriginalId, Result};

/// Largest node count the 32-bit label bitmaps can address.
pub const MAX_NODE_COUNT: u64 = 1 << 32;

/// Bijection between original ids and `[0, node_count)`, with label membership.
///
/// Internal ids follow insertion order. Every node belongs to at least one
/// label; graphs loaded without labels put all nodes under
/// [`NodeLabel::all_nodes`].
#[derive(Debug)]
pub struct IdMap {
    original_ids: Vec<OriginalId>,
    to_mapped: FxHashMap<OriginalId, NodeId>,
    labels: BTreeMap<NodeLabel, RoaringBitmap>,
}

impl IdMap {
    /// Number of loaded nodes.
    pub fn node_count(&self) -> u64 {
        self.original_ids.len() as u64
    }

    /// Original id of internal node `node`.
    ///
    /// # Panics
    ///
    /// When `node` is outside `[0, node_count)`.
    pub fn to_original(&self, node: NodeId) -> OriginalId {
        match self.original_ids.get(node as usize) {
            Some(&original) => original,
            None => panic!(
                "node id {} out of range for id map of {} nodes",
                node,
                self.original_ids.len()
            ),
        }
    }

    /// Internal id of `original`, if it was loaded.
    pub fn to_mapped(&self, original: OriginalId) -> Option<NodeId> {
        self.to_mapped.get(&original).copied()
    }

    /// Labels known to the map, in name order.
    pub fn available_labels(&self) -> impl Iterator<Item = &NodeLabel> {
        self.labels.keys()
    }

    /// Whether `label` is known.
    pub fn has_label(&self, label: &NodeLabel) -> bool {
        self.labels.contains_key(label)
    }

    /// Whether the nodes were loaded with real labels.
    pub fn has_label_information(&self) -> bool {
        !(self.labels.len() == 1 && self.labels.contains_key(&NodeLabel::all_nodes()))
    }

    /// Members of `label`.
    pub fn label_bitmap(&self, label: &NodeLabel) -> Option<&RoaringBitmap> {
        self.labels.get(label)
    }

    /// Labels carried by `node`.
    pub fn labels_of(&self, node: NodeId) -> Vec<NodeLabel> {
        let Ok(id) = u32::try_from(node) else {
            return Vec::new();
        };
        self.labels
            .iter()
            .filter(|(_, members)| members.contains(id))
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Number of nodes carrying `label`.
    pub fn node_count_for_label(&self, label: &NodeLabel) -> u64 {
        self.labels.get(label).map_or(0, RoaringBitmap::len)
    }

    /// Union of the members of `labels`.
    ///
    /// Fails when a label is unknown, listing the available labels.
    pub fn union_of(&self, labels: &[NodeLabel]) -> Result<RoaringBitmap> {
        let mut union = RoaringBitmap::new();
        for label in labels {
            let members = self.labels.get(label).ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "Specified labels [{}] do not correspond to any of the node projections [{}].",
                    join_quoted(labels),
                    join_quoted(self.labels.keys())
                ))
            })?;
            union |= members;
        }
        Ok(union)
    }

    /// Whether `labels` together cover every node.
    pub fn covers_all(&self, labels: &[NodeLabel]) -> Result<bool> {
        Ok(self.union_of(labels)?.len() == self.node_count())
    }
}

/// Accumulates nodes in insertion order.
#[derive(Debug, Default)]
pub struct IdMapBuilder {
    original_ids: Vec<OriginalId>,
    to_mapped: FxHashMap<OriginalId, NodeId>,
    labels: BTreeMap<NodeLabel, RoaringBitmap>,
    unlabeled: RoaringBitmap,
}

impl IdMapBuilder {
    /// Starts an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `original` with `labels`, returning its internal id.
    ///
    /// Adding a known id again merges the labels and keeps the first id.
    pub fn add_node(&mut self, original: OriginalId, labels: &[NodeLabel]) -> Result<NodeId> {
        let node = match self.to_mapped.get(&original) {
            Some(&node) => node,
            None => {
                let node = self.original_ids.len() as u64;
                if node >= MAX_NODE_COUNT {
                    return Err(GraphError::Capacity(format!(
                        "cannot load more than {} nodes",
                        MAX_NODE_COUNT
                    )));
                }
                self.original_ids.push(original);
                self.to_mapped.insert(original, node);
                if labels.is_empty() {
                    self.unlabeled.insert(node as u32);
                }
                node
            }
        };
        if !labels.is_empty() {
            self.unlabeled.remove(node as u32);
            for label in labels {
                self.labels
                    .entry(label.clone())
                    .or_default()
                    .insert(node as u32);
            }
        }
        Ok(node)
    }

    /// Internal id already assigned to `original`.
    pub fn get(&self, original: OriginalId) -> Option<NodeId> {
        self.to_mapped.get(&original).copied()
    }

    /// Number of nodes added so far.
    pub fn node_count(&self) -> u64 {
        self.original_ids.len() as u64
    }

    /// Freezes the map, assigning unlabeled nodes to the all-nodes label.
    pub fn build(self) -> IdMap {
        let mut labels = self.labels;
        if labels.is_empty() {
            let mut all = RoaringBitmap::new();
            let count = self.original_ids.len() as u64;
            if count > 0 {
                all.insert_range(0..=((count - 1) as u32));
            }
            labels.insert(NodeLabel::all_nodes(), all);
        } else if !self.unlabeled.is_empty() {
            *labels.entry(NodeLabel::all_nodes()).or_default() |= self.unlabeled;
        }
        IdMap {
            original_ids: self.original_ids,
            to_mapped: self.to_mapped,
            labels,
        }
    }
}

/// Re-densified subset of a root [`IdMap`].
///
/// Filtered id `i` is the `i`-th smallest root id among the members.
#[derive(Debug)]
pub struct FilteredIdMap {
    root: Arc<IdMap>,
    filtered_to_root: Vec<NodeId>,
    members: RoaringBitmap,
}

impl FilteredIdMap {
    /// Derives the subset carrying any of `labels`.
    ///
    /// The root id space is scanned in parallel chunks; each worker keeps the
    /// members of the chunks it claimed and the results are stitched back in
    /// chunk order.
    pub fn new(
        root: Arc<IdMap>,
        labels: &[NodeLabel],
        concurrency: usize,
        chunk_size: u64,
    ) -> Result<Self> {
        let members = root.union_of(labels)?;
        let termination = TerminationFlag::new();
        let parts = run_chunked(
            root.node_count(),
            concurrency,
            chunk_size,
            &termination,
            Vec::new,
            |found: &mut Vec<(u64, Vec<NodeId>)>, range| {
                let start = range.start;
                let ids = range.filter(|&id| members.contains(id as u32)).collect();
                found.push((start, ids));
                Ok(())
            },
        )?;
        let mut parts: Vec<(u64, Vec<NodeId>)> = parts.into_iter().flatten().collect();
        parts.sort_unstable_by_key(|(start, _)| *start);
        let filtered_to_root: Vec<NodeId> = parts.into_iter().flat_map(|(_, ids)| ids).collect();
        debug_assert_eq!(filtered_to_root.len() as u64, members.len());
        debug!(
            root_nodes = root.node_count(),
            filtered_nodes = filtered_to_root.len(),
            "id_map.filter.completed"
        );
        Ok(Self {
            root,
            filtered_to_root,
            members,
        })
    }

    /// Number of nodes in the subset.
    pub fn node_count(&self) -> u64 {
        self.filtered_to_root.len() as u64
    }

    /// Root id of filtered node `node`.
    ///
    /// # Panics
    ///
    /// When `node` is outside `[0, node_count)`.
    pub fn to_root(&self, node: NodeId) -> NodeId {
        match self.filtered_to_root.get(node as usize) {
            Some(&root) => root,
            None => panic!(
                "node id {} out of range for filtered id map of {} nodes",
                node,
                self.filtered_to_root.len()
            ),
        }
    }

    /// Filtered id of root node `root`, if it is a member.
    #[inline]
    pub fn to_filtered(&self, root: NodeId) -> Option<NodeId> {
        let id = u32::try_from(root).ok()?;
        self.members.contains(id).then(|| self.members.rank(id) - 1)
    }

    /// Whether root node `root` is a member.
    #[inline]
    pub fn contains_root(&self, root: NodeId) -> bool {
        u32::try_from(root).is_ok_and(|id| self.members.contains(id))
    }

    /// Member set in root ids.
    pub fn members(&self) -> &RoaringBitmap {
        &self.members
    }

    /// Unfiltered map.
    pub fn root(&self) -> &Arc<IdMap> {
        &self.root
    }

    /// Original id of filtered node `node`.
    pub fn to_original(&self, node: NodeId) -> OriginalId {
        self.root.to_original(self.to_root(node))
    }

    /// Filtered id of `original`, if it is loaded and a member.
    pub fn to_mapped(&self, original: OriginalId) -> Option<NodeId> {
        self.root
            .to_mapped(original)
            .and_then(|root| self.to_filtered(root))
    }
}
