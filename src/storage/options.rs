use std::sync::Arc;

use crate::primitives::concurrency::DEFAULT_CHUNK_SIZE;

use super::metrics::StoreMetrics;

/// Configuration options supplied when assembling a [`super::GraphStore`].
#[derive(Clone)]
pub struct StoreOptions {
    /// Optional metrics collection implementation
    pub metrics: Option<Arc<dyn StoreMetrics>>,
    /// Worker count used when a caller passes `0` as concurrency
    pub default_concurrency: usize,
    /// Node ids per chunk when deriving label-filtered id maps
    pub filter_chunk_size: u64,
}

impl StoreOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self {
            metrics: None,
            default_concurrency: 0,
            filter_chunk_size: DEFAULT_CHUNK_SIZE * 64,
        }
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn StoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the worker count substituted for a requested concurrency of `0`.
    ///
    /// `0` here means the machine's available parallelism.
    pub fn default_concurrency(mut self, workers: usize) -> Self {
        self.default_concurrency = workers;
        self
    }

    /// Sets how many node ids a worker claims at once while filtering.
    pub fn filter_chunk_size(mut self, nodes: u64) -> Self {
        self.filter_chunk_size = nodes.max(1);
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("metrics", &self.metrics.is_some())
            .field("default_concurrency", &self.default_concurrency)
            .field("filter_chunk_size", &self.filter_chunk_size)
            .finish()
    }
}

/// Direction in which loaded relationships are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Source to target, as loaded.
    #[default]
    Natural,
    /// Target to source.
    Reverse,
    /// Both directions; every loaded relationship is stored twice.
    Undirected,
}

/// Policy for parallel relationships between the same pair of nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Keep every parallel relationship.
    #[default]
    None,
    /// Keep one relationship and its first property values.
    Single,
    /// Keep one relationship whose properties are the sum of the group.
    Sum,
    /// Keep one relationship with the smallest property values of the group.
    Min,
    /// Keep one relationship with the largest property values of the group.
    Max,
    /// Keep one relationship whose properties count the group.
    Count,
}

impl Aggregation {
    /// Whether parallel relationships collapse into one.
    pub fn merges(self) -> bool {
        !matches!(self, Aggregation::None)
    }

    pub(crate) fn seed(self, value: f64) -> f64 {
        match self {
            Aggregation::Count => 1.0,
            _ => value,
        }
    }

    pub(crate) fn combine(self, acc: f64, value: f64) -> f64 {
        match self {
            Aggregation::None | Aggregation::Single => acc,
            Aggregation::Sum => acc + value,
            Aggregation::Min => acc.min(value),
            Aggregation::Max => acc.max(value),
            Aggregation::Count => acc + 1.0,
        }
    }
}

/// Build-time layout of one relationship type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopologyOptions {
    /// Stored direction.
    pub orientation: Orientation,
    /// Parallel relationship policy.
    pub aggregation: Aggregation,
}

impl TopologyOptions {
    /// Natural orientation without aggregation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Undirected orientation without aggregation.
    pub fn undirected() -> Self {
        Self::new().orientation(Orientation::Undirected)
    }

    /// Sets the stored direction.
    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Sets the parallel relationship policy.
    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }
}
