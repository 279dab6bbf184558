//! Nodes regrouped so that each color occupies a contiguous slice.

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

use crate::types::{GraphError, NodeId, Result};

/// Node ids ordered by color, with the start coordinate of every color.
///
/// Colors are numbered in ascending order of their value in `used_colors`;
/// within a color, nodes keep ascending id order.
#[derive(Clone, Debug)]
pub struct ColorArray {
    sorted_nodes: Vec<NodeId>,
    boundaries: Vec<u64>,
}

impl ColorArray {
    /// Buckets node `i` under `colors[i]`.
    ///
    /// Fails when a node carries a color missing from `used_colors`.
    pub fn new(colors: &[u64], used_colors: &RoaringBitmap) -> Result<Self> {
        let node_count = colors.len() as u64;
        let color_ids: FxHashMap<u64, usize> = used_colors
            .iter()
            .enumerate()
            .map(|(id, color)| (u64::from(color), id))
            .collect();

        let mut counts = vec![0u64; color_ids.len()];
        for (node, color) in colors.iter().enumerate() {
            let id = *color_ids.get(color).ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "node {} has color {} which is not among the used colors",
                    node, color
                ))
            })?;
            counts[id] += 1;
        }

        // ends[c] is one past the last slot of color c; filling backwards
        // from it keeps ascending node order inside each color.
        let mut ends = Vec::with_capacity(counts.len());
        let mut sum = 0u64;
        for count in &counts {
            sum += count;
            ends.push(sum);
        }
        let mut boundaries = Vec::with_capacity(counts.len() + 1);
        boundaries.push(0);
        boundaries.extend(ends.iter().copied());
        boundaries.dedup();
        if boundaries.last() != Some(&node_count) {
            boundaries.push(node_count);
        }

        let mut sorted_nodes = vec![0; colors.len()];
        for (node, color) in colors.iter().enumerate().rev() {
            let id = color_ids[color];
            ends[id] -= 1;
            sorted_nodes[ends[id] as usize] = node as NodeId;
        }

        Ok(Self {
            sorted_nodes,
            boundaries,
        })
    }

    /// Number of colors carried by at least one node.
    pub fn number_of_colors(&self) -> u64 {
        self.boundaries.len() as u64 - 1
    }

    /// Start of the color after the one starting at `current`; the node
    /// count once `current` is in the last color.
    pub fn next_starting_coordinate(&self, current: u64) -> u64 {
        let idx = self.boundaries.partition_point(|&b| b <= current);
        self.boundaries
            .get(idx)
            .copied()
            .unwrap_or(self.sorted_nodes.len() as u64)
    }

    /// Node at `coordinate` of the color-sorted order.
    pub fn get(&self, coordinate: u64) -> NodeId {
        self.sorted_nodes[coordinate as usize]
    }

    /// Size of the color starting at `current`.
    pub fn count(&self, current: u64) -> u64 {
        self.next_starting_coordinate(current) - current
    }
}
