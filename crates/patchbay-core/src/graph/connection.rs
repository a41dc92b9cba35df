//! The connection table.
//!
//! Connections are kept in insertion order, which is the order
//! [`Graph::connection_info`](crate::Graph::connection_info) enumerates. Each
//! `(dest, dest_input)` pair is fed by at most one connection.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use super::node::NodeId;

/// Highest port index (exclusive) accepted on either end of a connection.
pub const MAX_PORTS: u32 = 64;

/// A directed edge from an output port to an input port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Node producing the signal.
    pub source: NodeId,
    /// Output port on `source`.
    pub source_output: u32,
    /// Node consuming the signal.
    pub dest: NodeId,
    /// Input port on `dest`.
    pub dest_input: u32,
}

impl Connection {
    /// Creates a connection `source:source_output -> dest:dest_input`.
    pub const fn new(source: NodeId, source_output: u32, dest: NodeId, dest_input: u32) -> Self {
        Self {
            source,
            source_output,
            dest,
            dest_input,
        }
    }

    /// True if either endpoint is `node`.
    #[inline]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.dest == node
    }
}

impl core::fmt::Display for Connection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source, self.source_output, self.dest, self.dest_input
        )
    }
}

/// Insertion-ordered set of connections.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConnectionTable {
    edges: Vec<Connection>,
}

impl ConnectionTable {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn get(&self, index: usize) -> Option<&Connection> {
        self.edges.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.edges.iter()
    }

    /// The connection feeding `(dest, dest_input)`, if any.
    pub fn occupant(&self, dest: NodeId, dest_input: u32) -> Option<&Connection> {
        self.edges
            .iter()
            .find(|c| c.dest == dest && c.dest_input == dest_input)
    }

    /// Appends `connection`. The caller has checked the input is free.
    pub fn insert(&mut self, connection: Connection) {
        debug_assert!(
            self.occupant(connection.dest, connection.dest_input)
                .is_none()
        );
        self.edges.push(connection);
    }

    pub fn remove_input(&mut self, dest: NodeId, dest_input: u32) -> Option<Connection> {
        let pos = self
            .edges
            .iter()
            .position(|c| c.dest == dest && c.dest_input == dest_input)?;
        Some(self.edges.remove(pos))
    }

    /// Removes every connection touching `node`. Returns how many were removed.
    pub fn remove_node(&mut self, node: NodeId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|c| !c.touches(node));
        before - self.edges.len()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.edges.len();
        self.edges.clear();
        removed
    }

    /// `node` and every node with a path into it.
    pub fn upstream_of(&self, node: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::from([node]);
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            for c in self.edges.iter().filter(|c| c.dest == current) {
                if seen.insert(c.source) {
                    stack.push(c.source);
                }
            }
        }
        seen
    }

    /// Topologically sorts `nodes` using only edges between members of the set.
    ///
    /// Ties are broken by ascending id, so the order is deterministic. Nodes left
    /// over because they sit on (or behind) a cycle are appended in id order and
    /// the returned flag is false.
    pub fn sort(&self, nodes: &BTreeSet<NodeId>) -> (Vec<NodeId>, bool) {
        let mut in_degree: BTreeMap<NodeId, usize> = nodes.iter().map(|&n| (n, 0)).collect();
        let mut outgoing: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for c in &self.edges {
            if nodes.contains(&c.source) && nodes.contains(&c.dest) {
                *in_degree.entry(c.dest).or_default() += 1;
                outgoing.entry(c.source).or_default().push(c.dest);
            }
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(&n, _)| Reverse(n))
            .collect();
        let mut sorted = Vec::with_capacity(nodes.len());

        while let Some(Reverse(node)) = ready.pop() {
            sorted.push(node);
            for next in outgoing.get(&node).into_iter().flatten() {
                if let Some(d) = in_degree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse(*next));
                    }
                }
            }
        }

        let acyclic = sorted.len() == nodes.len();
        if !acyclic {
            let placed: BTreeSet<NodeId> = sorted.iter().copied().collect();
            sorted.extend(nodes.iter().filter(|n| !placed.contains(n)));
        }
        (sorted, acyclic)
    }
}
