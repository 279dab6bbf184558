#![forbid(unsafe_code)]
//! Identifiers, names, value types, and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dense internal node identifier in `[0, node_count)`.
pub type NodeId = u64;

/// Identifier a node carried in the source data before it was loaded.
pub type OriginalId = u64;

/// Sentinel returned by cursor probes once a run is exhausted.
///
/// No loaded node can carry this id because the label bitmaps cap the id
/// space at `u32::MAX + 1` nodes.
pub const NOT_FOUND: NodeId = u64::MAX;

const ALL_NODES_NAME: &str = "__ALL__";

/// Name of a node label projection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeLabel(String);

impl NodeLabel {
    /// Creates a label with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Implicit label carried by every node of a graph loaded without label information.
    pub fn all_nodes() -> Self {
        Self(ALL_NODES_NAME.to_owned())
    }

    /// Returns the label name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is the implicit all-nodes label.
    pub fn is_all_nodes(&self) -> bool {
        self.0 == ALL_NODES_NAME
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeLabel {
    fn from(value: &str) -> Self {
        NodeLabel::new(value)
    }
}

/// Name of a relationship type projection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipType(String);

impl RelationshipType {
    /// Creates a relationship type with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelationshipType {
    fn from(value: &str) -> Self {
        RelationshipType::new(value)
    }
}

/// Numeric type of a property column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// 64-bit signed integers.
    Long,
    /// 64-bit floating point values.
    Double,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Long => f.write_str("LONG"),
            ValueType::Double => f.write_str("DOUBLE"),
        }
    }
}

/// Whether a property came from the bulk load or was added afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyState {
    /// Loaded together with the graph.
    Persistent,
    /// Added by a mutation after the load.
    Transient,
}

/// Errors surfaced by the graph store and its loaders.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The caller asked for something the store does not contain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The input exceeds a fixed capacity of the storage layout.
    #[error("capacity exceeded: {0}")]
    Capacity(String),
    /// A queued handoff between threads was cut short.
    #[error("interrupted: {0}")]
    Interrupted(String),
    /// A value in the input could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV reader failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Joins displayable items as `'a', 'b'` for validation messages.
pub(crate) fn join_quoted<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    items
        .into_iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
