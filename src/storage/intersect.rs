//! Triangle enumeration by sorted-merge intersection of adjacency runs.
//!
//! For an anchor `a` the engine walks the neighbors `b > a` of `a`. For each
//! `b` it merges `a`'s remaining neighbors with `b`'s neighbors greater than
//! `b`; every common id `c` closes a triangle `a < b < c`. Repeated ids from
//! parallel relationships are collapsed by always resuming with
//! [`DecompressingCursor::skip_until`], so each triangle is reported once.

use crate::types::{NodeId, NOT_FOUND};

use super::adjacency::DecompressingCursor;
use super::id_map::FilteredIdMap;
use super::topology::Topology;

/// Receives triangles `(a, b, c)` with `a < b < c`.
pub trait IntersectionConsumer {
    /// Called once per triangle.
    fn accept(&mut self, a: NodeId, b: NodeId, c: NodeId);
}

impl<F> IntersectionConsumer for F
where
    F: FnMut(NodeId, NodeId, NodeId),
{
    fn accept(&mut self, a: NodeId, b: NodeId, c: NodeId) {
        self(a, b, c)
    }
}

/// The three cursors one intersection pass needs.
///
/// Owned by a single worker and handed to every call; never shared between
/// threads.
#[derive(Debug)]
pub struct CursorPool<'a> {
    main: DecompressingCursor<'a>,
    cursor_a: DecompressingCursor<'a>,
    cursor_b: DecompressingCursor<'a>,
}

impl<'a> CursorPool<'a> {
    /// Allocates cursors over `topology`'s arena.
    pub fn new(topology: &'a Topology) -> Self {
        let adjacency = topology.adjacency();
        Self {
            main: adjacency.empty_cursor(),
            cursor_a: adjacency.empty_cursor(),
            cursor_b: adjacency.empty_cursor(),
        }
    }
}

/// Stateless intersection settings over one topology.
///
/// Cheap to copy; all mutable state lives in the caller's [`CursorPool`].
#[derive(Clone, Copy, Debug)]
pub struct RelationshipIntersect<'a> {
    topology: &'a Topology,
    max_degree: u64,
    members: Option<&'a FilteredIdMap>,
}

impl<'a> RelationshipIntersect<'a> {
    /// Engine over every node of `topology`.
    ///
    /// Nodes with a degree above `max_degree` neither anchor nor close a
    /// triangle; `u64::MAX` disables the filter.
    pub fn new(topology: &'a Topology, max_degree: u64) -> Self {
        Self {
            topology,
            max_degree,
            members: None,
        }
    }

    /// Restricts `b` and `c` to members of `members`, given in root ids.
    pub fn restricted_to(mut self, members: &'a FilteredIdMap) -> Self {
        self.members = Some(members);
        self
    }

    /// Topology the engine reads.
    pub fn topology(&self) -> &'a Topology {
        self.topology
    }

    /// Fresh cursor pool for one worker.
    pub fn cursor_pool(&self) -> CursorPool<'a> {
        CursorPool::new(self.topology)
    }

    #[inline]
    fn degree_ok(&self, node: NodeId) -> bool {
        self.max_degree == u64::MAX || self.topology.degree(node) <= self.max_degree
    }

    #[inline]
    fn included(&self, node: NodeId) -> bool {
        self.members.map_or(true, |m| m.contains_root(node))
    }

    /// Reports every triangle anchored at `a` whose other corners are larger.
    ///
    /// All ids are root ids of the topology.
    pub fn intersect_all<C>(&self, a: NodeId, pool: &mut CursorPool<'a>, consumer: &mut C)
    where
        C: IntersectionConsumer + ?Sized,
    {
        debug_assert!(
            pool.main.reads(self.topology.adjacency().arena_ptr()),
            "cursor pool belongs to another topology"
        );
        if !self.degree_ok(a) {
            return;
        }
        let CursorPool {
            main,
            cursor_a,
            cursor_b,
        } = pool;

        main.reset(self.topology.offset(a));
        let mut b = main.skip_until(a);
        while b != NOT_FOUND {
            if self.included(b) && self.degree_ok(b) {
                cursor_b.reset(self.topology.offset(b));
                let mut c_b = cursor_b.skip_until(b);
                let mut c_a = NOT_FOUND;
                if c_b != NOT_FOUND {
                    cursor_a.copy_from(main);
                    c_a = cursor_a.advance(c_b);
                }
                while c_a != NOT_FOUND && c_b != NOT_FOUND {
                    if c_a < c_b {
                        c_a = cursor_a.advance(c_b);
                    } else if c_b < c_a {
                        c_b = cursor_b.advance(c_a);
                    } else {
                        if self.included(c_a) && self.degree_ok(c_a) {
                            consumer.accept(a, b, c_a);
                        }
                        c_a = cursor_a.skip_until(c_a);
                        c_b = cursor_b.skip_until(c_b);
                    }
                }
            }
            b = main.skip_until(b);
        }
    }
}

/// Intersection engine addressed in a graph view's id space.
#[derive(Clone, Copy, Debug)]
pub struct GraphIntersect<'g> {
    engine: RelationshipIntersect<'g>,
    id_map: Option<&'g FilteredIdMap>,
    node_count: u64,
}

impl<'g> GraphIntersect<'g> {
    pub(crate) fn unfiltered(topology: &'g Topology, max_degree: u64) -> Self {
        Self {
            engine: RelationshipIntersect::new(topology, max_degree),
            id_map: None,
            node_count: topology.node_count(),
        }
    }

    pub(crate) fn filtered(
        topology: &'g Topology,
        max_degree: u64,
        id_map: &'g FilteredIdMap,
    ) -> Self {
        Self {
            engine: RelationshipIntersect::new(topology, max_degree).restricted_to(id_map),
            id_map: Some(id_map),
            node_count: id_map.node_count(),
        }
    }

    /// Number of anchors in the view.
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Fresh cursor pool for one worker.
    pub fn cursor_pool(&self) -> CursorPool<'g> {
        self.engine.cursor_pool()
    }

    /// Reports triangles anchored at view node `node`, in view ids.
    pub fn intersect_all<C>(&self, node: NodeId, pool: &mut CursorPool<'g>, consumer: &mut C)
    where
        C: IntersectionConsumer + ?Sized,
    {
        match self.id_map {
            None => self.engine.intersect_all(node, pool, consumer),
            Some(id_map) => {
                let mut translate = |a: NodeId, b: NodeId, c: NodeId| {
                    let (Some(b), Some(c)) = (id_map.to_filtered(b), id_map.to_filtered(c)) else {
                        return;
                    };
                    consumer.accept(a, b, c);
                };
                self.engine
                    .intersect_all(id_map.to_root(node), pool, &mut |_: NodeId, b: NodeId, c: NodeId| {
                        translate(node, b, c)
                    });
            }
        }
    }
}
