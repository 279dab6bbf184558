//! Parallel triangle counting and streaming over the intersection engine.

use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::primitives::concurrency::{
    effective_concurrency, run_chunked, TerminationFlag, DEFAULT_CHUNK_SIZE,
};
use crate::storage::{Graph, GraphIntersect};
use crate::types::{GraphError, NodeId, OriginalId, Result};

/// Settings shared by [`count_triangles`] and [`stream_triangles`].
#[derive(Clone, Copy, Debug)]
pub struct TriangleCountConfig {
    /// Worker threads; `0` uses the machine's parallelism.
    pub concurrency: usize,
    /// Nodes with a higher degree are ignored; `u64::MAX` disables the filter.
    pub max_degree: u64,
    /// Anchors claimed per chunk.
    pub chunk_size: u64,
    /// Triangles buffered between producers and the stream consumer.
    pub queue_capacity: usize,
}

impl Default for TriangleCountConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            max_degree: u64::MAX,
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: 1024,
        }
    }
}

/// Totals of a counting pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleCountResult {
    /// Distinct triangles in the graph.
    pub global_triangle_count: u64,
    /// Triangles each node takes part in, by view id. Nodes over the degree
    /// cap report zero.
    pub local_triangle_counts: Vec<u64>,
}

/// One triangle in original node ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triangle {
    /// Smallest corner by internal id.
    pub a: OriginalId,
    /// Middle corner.
    pub b: OriginalId,
    /// Largest corner.
    pub c: OriginalId,
}

fn intersect_for<'g>(graph: &'g dyn Graph, config: &TriangleCountConfig) -> Result<GraphIntersect<'g>> {
    if !graph.is_undirected() {
        return Err(GraphError::InvalidArgument(
            "triangle counting requires an undirected graph".into(),
        ));
    }
    graph.relationship_intersect(config.max_degree)
}

/// Counts triangles globally and per node.
///
/// Stops claiming anchors once `termination` is raised and then fails with
/// [`GraphError::Interrupted`].
pub fn count_triangles(
    graph: &dyn Graph,
    config: &TriangleCountConfig,
    termination: &TerminationFlag,
) -> Result<TriangleCountResult> {
    let intersect = intersect_for(graph, config)?;
    let local: Vec<AtomicU64> = (0..intersect.node_count()).map(|_| AtomicU64::new(0)).collect();
    let workers = effective_concurrency(config.concurrency);

    let states = run_chunked(
        intersect.node_count(),
        workers,
        config.chunk_size,
        termination,
        || (intersect.cursor_pool(), 0u64),
        |(pool, found), range| {
            for a in range {
                intersect.intersect_all(a, pool, &mut |a: NodeId, b: NodeId, c: NodeId| {
                    for corner in [a, b, c] {
                        local[corner as usize].fetch_add(1, Ordering::Relaxed);
                    }
                    *found += 1;
                });
            }
            Ok(())
        },
    )?;
    termination.assert_running()?;

    let global_triangle_count: u64 = states.iter().map(|(_, found)| found).sum();
    info!(
        nodes = intersect.node_count(),
        workers,
        triangles = global_triangle_count,
        "triangles.count.completed"
    );
    Ok(TriangleCountResult {
        global_triangle_count,
        local_triangle_counts: local.into_iter().map(AtomicU64::into_inner).collect(),
    })
}

/// Triangles handed out one by one while producers keep enumerating.
///
/// Producers block once `queue_capacity` triangles are waiting. Dropping the
/// stream raises the termination flag, disconnects the queue, and joins the
/// producers.
pub struct TriangleStream {
    receiver: Option<Receiver<Result<Triangle>>>,
    termination: TerminationFlag,
    producer: Option<JoinHandle<Result<()>>>,
}

/// Starts enumerating triangles of `graph` on background workers.
///
/// Validation errors are returned immediately; failures during enumeration
/// are yielded by the stream.
pub fn stream_triangles(
    graph: Arc<dyn Graph>,
    config: TriangleCountConfig,
    termination: TerminationFlag,
) -> Result<TriangleStream> {
    intersect_for(graph.as_ref(), &config)?;
    let (sender, receiver) = bounded(config.queue_capacity.max(1));
    let producer_flag = termination.clone();
    let producer = thread::Builder::new()
        .name("triangle-stream".into())
        .spawn(move || match produce(graph.as_ref(), &config, &producer_flag, &sender) {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(error = %err, "triangles.stream.failed");
                match sender.send(Err(err)) {
                    Ok(()) => Ok(()),
                    Err(SendError(undelivered)) => undelivered.map(|_| ()),
                }
            }
        })?;
    Ok(TriangleStream {
        receiver: Some(receiver),
        termination,
        producer: Some(producer),
    })
}

fn produce(
    graph: &dyn Graph,
    config: &TriangleCountConfig,
    termination: &TerminationFlag,
    sender: &Sender<Result<Triangle>>,
) -> Result<()> {
    let intersect = intersect_for(graph, config)?;
    run_chunked(
        intersect.node_count(),
        effective_concurrency(config.concurrency),
        config.chunk_size,
        termination,
        || intersect.cursor_pool(),
        |pool, range| {
            for a in range {
                let mut disconnected = false;
                intersect.intersect_all(a, pool, &mut |a: NodeId, b: NodeId, c: NodeId| {
                    if disconnected {
                        return;
                    }
                    let triangle = Triangle {
                        a: graph.to_original_node_id(a),
                        b: graph.to_original_node_id(b),
                        c: graph.to_original_node_id(c),
                    };
                    disconnected = sender.send(Ok(triangle)).is_err();
                });
                if disconnected {
                    return Err(GraphError::Interrupted(
                        "triangle consumer disconnected".into(),
                    ));
                }
            }
            Ok(())
        },
    )?;
    termination.assert_running()
}

impl TriangleStream {
    /// Stops the producers and reports how they ended.
    ///
    /// Cancelling before the stream is drained yields
    /// [`GraphError::Interrupted`].
    pub fn cancel(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.termination.terminate();
        self.receiver.take();
        let Some(handle) = self.producer.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(outcome) => outcome,
            Err(_) if thread::panicking() => Err(GraphError::Interrupted(
                "triangle producer panicked".into(),
            )),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl Iterator for TriangleStream {
    type Item = Result<Triangle>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl Drop for TriangleStream {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            debug!(error = %err, "triangles.stream.closed");
        }
    }
}

impl std::fmt::Debug for TriangleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriangleStream")
            .field("open", &self.receiver.is_some())
            .field("terminated", &self.termination.is_terminated())
            .finish()
    }
}
