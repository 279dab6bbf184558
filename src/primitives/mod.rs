//! Low-level primitives for building the graph store.
//!
//! Includes the byte codecs behind the adjacency arena and the work
//! partitioning used by every parallel pass.

/// Byte-level utilities and encoding/decoding.
///
/// Fixed-width fields, variable-byte integers, and delta runs.
pub mod bytes;

/// Concurrency primitives and work partitioning.
///
/// Chunked fetch-and-add scheduling and cooperative termination.
pub mod concurrency;
