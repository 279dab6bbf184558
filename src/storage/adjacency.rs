//! Compressed adjacency arena and its decompressing cursor.
//!
//! Every node with at least one relationship owns one run in a shared byte
//! arena:
//!
//! ```text
//! offset ─► [degree: u32 LE][varint gap_0][varint gap_1] ... [varint gap_{d-1}]
//! ```
//!
//! Gaps are the differences between consecutive sorted target ids, the first
//! gap being relative to zero. Byte 0 of the arena is padding so that offset
//! `0` can mean "no relationships" in the offsets table.

use std::fmt;

use crate::primitives::bytes::{delta, fixed, var};
use crate::types::{GraphError, NodeId, Result, NOT_FOUND};

const ARENA_PADDING: usize = 1;

/// Immutable arena of delta-compressed target runs.
pub struct AdjacencyList {
    arena: Vec<u8>,
}

impl AdjacencyList {
    /// Arena containing no runs.
    pub fn empty() -> Self {
        AdjacencyListBuilder::new().build()
    }

    /// Reads the degree prefix of the run at `offset`. Offset `0` has degree 0.
    #[inline]
    pub fn degree(&self, offset: u64) -> u32 {
        if offset == 0 {
            return 0;
        }
        fixed::get_u32_le(&self.arena, offset as usize)
    }

    /// Opens a cursor positioned before the first target of the run at `offset`.
    pub fn cursor(&self, offset: u64) -> DecompressingCursor<'_> {
        let mut cursor = self.empty_cursor();
        cursor.reset(offset);
        cursor
    }

    /// Cursor over no targets, to be repositioned with [`DecompressingCursor::reset`].
    pub fn empty_cursor(&self) -> DecompressingCursor<'_> {
        DecompressingCursor {
            arena: &self.arena,
            pos: 0,
            remaining: 0,
            last: 0,
            live: false,
        }
    }

    /// Size of the arena in bytes, padding included.
    pub fn size_in_bytes(&self) -> usize {
        self.arena.len()
    }

    pub(crate) fn arena_ptr(&self) -> *const u8 {
        self.arena.as_ptr()
    }
}

impl fmt::Debug for AdjacencyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdjacencyList")
            .field("bytes", &self.arena.len())
            .finish()
    }
}

/// Appends runs to a growing arena.
#[derive(Debug)]
pub struct AdjacencyListBuilder {
    arena: Vec<u8>,
}

impl AdjacencyListBuilder {
    /// Starts an arena holding only the padding byte.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Starts an arena with room for `bytes` of runs.
    pub fn with_capacity(bytes: usize) -> Self {
        let mut arena = Vec::with_capacity(bytes + ARENA_PADDING);
        arena.resize(ARENA_PADDING, 0);
        Self { arena }
    }

    /// Appends one node's sorted targets and returns the run offset.
    ///
    /// An empty slice writes nothing and returns offset `0`.
    pub fn append_run(&mut self, sorted_targets: &[NodeId]) -> Result<u64> {
        if sorted_targets.is_empty() {
            return Ok(0);
        }
        let degree = u32::try_from(sorted_targets.len()).map_err(|_| {
            GraphError::Capacity(format!(
                "adjacency run of {} targets exceeds {}",
                sorted_targets.len(),
                u32::MAX
            ))
        })?;
        let offset = self.arena.len() as u64;
        fixed::put_u32_le(&mut self.arena, degree);
        delta::encode_sorted(sorted_targets, &mut self.arena);
        Ok(offset)
    }

    /// Appends runs that were encoded elsewhere by [`encode_run`].
    ///
    /// Returns the arena offset at which `encoded` starts.
    pub fn append_encoded(&mut self, encoded: &[u8]) -> u64 {
        let base = self.arena.len() as u64;
        self.arena.extend_from_slice(encoded);
        base
    }

    /// Current arena length; the offset the next run would receive.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether only padding has been written.
    pub fn is_empty(&self) -> bool {
        self.arena.len() == ARENA_PADDING
    }

    /// Freezes the arena.
    pub fn build(mut self) -> AdjacencyList {
        self.arena.shrink_to_fit();
        AdjacencyList { arena: self.arena }
    }
}

impl Default for AdjacencyListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes one run into a detached buffer, returning its start within `out`.
///
/// Used by parallel builders that compress node ranges separately and
/// concatenate the buffers afterwards.
pub fn encode_run(sorted_targets: &[NodeId], out: &mut Vec<u8>) -> Result<usize> {
    let degree = u32::try_from(sorted_targets.len()).map_err(|_| {
        GraphError::Capacity(format!(
            "adjacency run of {} targets exceeds {}",
            sorted_targets.len(),
            u32::MAX
        ))
    })?;
    let start = out.len();
    fixed::put_u32_le(out, degree);
    delta::encode_sorted(sorted_targets, out);
    Ok(start)
}

/// Reusable iteration state over one run.
///
/// Yields absolute target ids in the run's sorted order. The most recently
/// yielded id stays *current*: [`skip_until`](Self::skip_until) and
/// [`advance`](Self::advance) return it without consuming anything when it
/// already satisfies the probe, which makes repeated probes with a smaller or
/// equal bound idempotent. Both return [`NOT_FOUND`] once the run is exhausted.
///
/// A cursor must not be shared between concurrent iterations; use
/// [`copy_from`](Self::copy_from) to fork an independent position.
#[derive(Clone)]
pub struct DecompressingCursor<'a> {
    arena: &'a [u8],
    pos: usize,
    remaining: u32,
    last: u64,
    live: bool,
}

impl<'a> DecompressingCursor<'a> {
    /// Repositions the cursor at the start of the run at `offset`.
    #[inline]
    pub fn reset(&mut self, offset: u64) {
        self.last = 0;
        self.live = false;
        if offset == 0 {
            self.pos = 0;
            self.remaining = 0;
            return;
        }
        let start = offset as usize;
        self.remaining = fixed::get_u32_le(self.arena, start);
        self.pos = start + fixed::u32_len();
    }

    /// Whether undecoded targets remain after the current one.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.remaining > 0
    }

    /// Number of targets not yet decoded.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Most recently yielded target still held by the cursor.
    pub fn current(&self) -> Option<NodeId> {
        self.live.then_some(self.last)
    }

    /// Decodes and returns the next target.
    ///
    /// # Panics
    ///
    /// When called on an exhausted cursor.
    #[inline]
    pub fn next_target(&mut self) -> NodeId {
        assert!(
            self.remaining > 0,
            "cursor advanced past the end of its adjacency run"
        );
        let gap = var::decode_u64(self.arena, &mut self.pos);
        self.last += gap;
        self.remaining -= 1;
        self.live = true;
        self.last
    }

    /// Returns the first target strictly greater than `target`, or [`NOT_FOUND`].
    #[inline]
    pub fn skip_until(&mut self, target: NodeId) -> NodeId {
        if self.live && self.last > target {
            return self.last;
        }
        while self.remaining > 0 {
            let value = self.next_target();
            if value > target {
                return value;
            }
        }
        self.live = false;
        NOT_FOUND
    }

    /// Returns the first target greater than or equal to `target`, or [`NOT_FOUND`].
    #[inline]
    pub fn advance(&mut self, target: NodeId) -> NodeId {
        if self.live && self.last >= target {
            return self.last;
        }
        while self.remaining > 0 {
            let value = self.next_target();
            if value >= target {
                return value;
            }
        }
        self.live = false;
        NOT_FOUND
    }

    /// Copies the position of `other`, which must read the same arena.
    #[inline]
    pub fn copy_from(&mut self, other: &DecompressingCursor<'a>) {
        debug_assert!(
            std::ptr::eq(self.arena.as_ptr(), other.arena.as_ptr()),
            "cursors read different arenas"
        );
        self.pos = other.pos;
        self.remaining = other.remaining;
        self.last = other.last;
        self.live = other.live;
    }

    pub(crate) fn reads(&self, arena_ptr: *const u8) -> bool {
        std::ptr::eq(self.arena.as_ptr(), arena_ptr)
    }
}

impl Iterator for DecompressingCursor<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.has_next().then(|| self.next_target())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl fmt::Debug for DecompressingCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompressingCursor")
            .field("pos", &self.pos)
            .field("remaining", &self.remaining)
            .field("current", &self.current())
            .finish()
    }
}
