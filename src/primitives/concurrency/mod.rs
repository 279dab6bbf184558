//! Work partitioning and cooperative cancellation for parallel passes.
//!
//! Parallel passes split the node id space into fixed-size chunks. Workers
//! claim chunks from a shared atomic counter with fetch-and-add, so chunks are
//! handed out in increasing order while completion order across workers is
//! unspecified. A [`TerminationFlag`] is checked before every claim; a chunk
//! that was already claimed always runs to completion.

use std::ops::Range;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::debug;

use crate::types::{GraphError, Result};

/// Default number of nodes per claimed chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 64;

/// Shared flag that asks long-running passes to stop claiming work.
#[derive(Clone, Debug, Default)]
pub struct TerminationFlag {
    inner: Arc<AtomicBool>,
}

impl TerminationFlag {
    /// Creates a flag in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests termination. Idempotent.
    pub fn terminate(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Whether termination has been requested.
    pub fn is_terminated(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Fails with [`GraphError::Interrupted`] once termination was requested.
    pub fn assert_running(&self) -> Result<()> {
        if self.is_terminated() {
            Err(GraphError::Interrupted("pass was terminated".into()))
        } else {
            Ok(())
        }
    }
}

/// Monotonic chunk dispenser over `[0, upper)`.
#[derive(Debug)]
pub struct ChunkCursor {
    next: AtomicU64,
    upper: u64,
    chunk_size: u64,
}

impl ChunkCursor {
    /// Creates a dispenser handing out `chunk_size`-wide ranges below `upper`.
    pub fn new(upper: u64, chunk_size: u64) -> Self {
        Self {
            next: AtomicU64::new(0),
            upper,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Claims the next unclaimed range, or `None` once the space is exhausted.
    pub fn claim(&self) -> Option<Range<u64>> {
        let start = self.next.fetch_add(self.chunk_size, Ordering::AcqRel);
        if start >= self.upper {
            return None;
        }
        Some(start..start.saturating_add(self.chunk_size).min(self.upper))
    }
}

/// Runs `body` over `[0, upper)` on up to `concurrency` scoped workers.
///
/// Each worker builds its own state with `init`, then claims chunks until the
/// space is exhausted, termination is requested, or a chunk fails. The first
/// error is returned after all workers stop. Worker states are returned in
/// worker order. A worker panic is resumed on the calling thread.
pub fn run_chunked<S, I, F>(
    upper: u64,
    concurrency: usize,
    chunk_size: u64,
    termination: &TerminationFlag,
    init: I,
    body: F,
) -> Result<Vec<S>>
where
    S: Send,
    I: Fn() -> S + Sync,
    F: Fn(&mut S, Range<u64>) -> Result<()> + Sync,
{
    let cursor = ChunkCursor::new(upper, chunk_size);
    let chunk_count = upper.div_ceil(chunk_size.max(1));
    let workers = concurrency.max(1).min(chunk_count.max(1) as usize);
    let failure: Mutex<Option<GraphError>> = Mutex::new(None);
    let failed = AtomicBool::new(false);

    let work = |state: &mut S| {
        while !termination.is_terminated() && !failed.load(Ordering::Acquire) {
            let Some(range) = cursor.claim() else {
                break;
            };
            if let Err(err) = body(state, range) {
                failed.store(true, Ordering::Release);
                failure.lock().get_or_insert(err);
                break;
            }
        }
    };

    debug!(upper, workers, chunk_size, "concurrency.run_chunked.start");
    let states = if workers == 1 {
        let mut state = init();
        work(&mut state);
        vec![state]
    } else {
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut state = init();
                        work(&mut state);
                        state
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(state) => state,
                    Err(payload) => panic::resume_unwind(payload),
                })
                .collect::<Vec<_>>()
        })
    };

    match failure.into_inner() {
        Some(err) => Err(err),
        None => Ok(states),
    }
}

/// Resolves a requested worker count, mapping `0` to the machine's parallelism.
pub fn effective_concurrency(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
