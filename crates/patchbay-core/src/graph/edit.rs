//! Pending topology edits.

use std::sync::Arc;

use crate::component::ComponentDescription;

use super::Graph;
use super::connection::Connection;
use super::node::NodeId;

/// A topology mutation waiting for [`Graph::update`](crate::Graph::update).
#[derive(Clone, Debug)]
pub enum PendingEdit {
    /// Add a component node with a pre-allocated id.
    AddNode {
        /// Id returned to the caller of `add_node`.
        id: NodeId,
        /// Component to instantiate.
        description: ComponentDescription,
        /// Opaque configuration blob.
        config: Arc<[u8]>,
    },
    /// Add a sub-graph node owning `graph`.
    AddSubGraph {
        /// Id returned to the caller of `add_subgraph_node`.
        id: NodeId,
        /// The nested graph.
        graph: Graph,
    },
    /// Remove a node and all of its connections.
    RemoveNode(NodeId),
    /// Add a connection.
    Connect(Connection),
    /// Remove the connection feeding an input.
    Disconnect {
        /// Destination node.
        dest: NodeId,
        /// Destination input port.
        dest_input: u32,
    },
    /// Remove every connection.
    ClearConnections,
}

impl PendingEdit {
    /// Node ids this edit refers to, other than one it creates.
    pub fn referenced_nodes(&self) -> impl Iterator<Item = NodeId> {
        let (a, b) = match self {
            Self::AddNode { .. } | Self::AddSubGraph { .. } | Self::ClearConnections => (None, None),
            Self::RemoveNode(id) => (Some(*id), None),
            Self::Connect(c) => (Some(c.source), Some(c.dest)),
            Self::Disconnect { dest, .. } => (Some(*dest), None),
        };
        a.into_iter().chain(b)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add-node",
            Self::AddSubGraph { .. } => "add-subgraph",
            Self::RemoveNode(_) => "remove-node",
            Self::Connect(_) => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::ClearConnections => "clear-connections",
        }
    }
}

/// Outcome of a topology edit call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum EditStatus {
    /// The committed topology already reflects the edit.
    Applied,
    /// The edit was queued and takes effect at the next successful `update`.
    Deferred,
}

impl EditStatus {
    /// True if the edit is waiting in the pending queue.
    pub fn is_deferred(self) -> bool {
        self == Self::Deferred
    }
}
