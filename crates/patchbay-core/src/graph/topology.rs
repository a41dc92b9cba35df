//! The committed topology guarded by the graph's topology lock.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::GraphError;

use super::connection::{Connection, ConnectionTable, MAX_PORTS};
use super::node::{NodeEntry, NodeId};
use super::plan::RenderPlan;

/// Nodes, connections and the plan hand-off slots.
#[derive(Debug, Default)]
pub(crate) struct Topology {
    pub nodes: BTreeMap<NodeId, NodeEntry>,
    pub connections: ConnectionTable,
    pub output_node: Option<NodeId>,
    /// Bumped on every commit.
    pub generation: u64,
    /// Newest compiled plan, waiting for the renderer to adopt it.
    pub next_plan: Option<Box<RenderPlan>>,
    /// Plan the renderer swapped out, waiting to be dropped on a control thread.
    pub retired: Option<Box<RenderPlan>>,
    /// Removed nodes tagged with the first generation that no longer uses them.
    pub graveyard: Vec<(u64, NodeEntry)>,
}

/// The committed topology as seen by queries, readable without the lock.
#[derive(Debug, Default)]
pub(crate) struct CommittedView {
    pub nodes: Vec<NodeId>,
    pub output_node: Option<NodeId>,
    pub connections: Vec<Connection>,
    pub render_order: Vec<NodeId>,
    /// Output and sub-graph node ids.
    pub protected: Vec<NodeId>,
}

impl Topology {
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeEntry, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Inserts a node that has already been brought to the graph's state.
    pub fn insert(&mut self, entry: NodeEntry) {
        if entry.description.is_output() {
            self.output_node = Some(entry.id);
        }
        self.nodes.insert(entry.id, entry);
    }

    /// Fails if adding a node of `is_output` type would create a second output.
    pub fn check_output_slot(&self, is_output: bool) -> Result<(), GraphError> {
        match self.output_node {
            Some(existing) if is_output => Err(GraphError::OutputNodeConflict(existing)),
            _ => Ok(()),
        }
    }

    /// Removes a node and every connection touching it.
    pub fn take_node(&mut self, id: NodeId) -> Result<NodeEntry, GraphError> {
        let entry = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        self.connections.remove_node(id);
        if self.output_node == Some(id) {
            self.output_node = None;
        }
        Ok(entry)
    }

    /// Read-only copy of what queries report, published at each commit.
    pub fn snapshot(&self) -> CommittedView {
        CommittedView {
            nodes: self.nodes.keys().copied().collect(),
            output_node: self.output_node,
            connections: self.connections.iter().copied().collect(),
            render_order: self.render_order(),
            protected: self.protected_nodes(),
        }
    }

    /// Ids that must not be removed from a render callback.
    pub fn protected_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|e| e.description.is_output() || e.sub_graph().is_some())
            .map(|e| e.id)
            .collect()
    }

    /// Checks `connection` against the committed topology without applying it.
    pub fn validate_connection(&self, connection: &Connection) -> Result<(), GraphError> {
        check_ports(connection)?;
        self.node(connection.source)?;
        self.node(connection.dest)?;
        if let Some(existing) = self
            .connections
            .occupant(connection.dest, connection.dest_input)
        {
            return Err(GraphError::InvalidConnection(format!(
                "input {}:{} is already fed by {}:{}",
                connection.dest, connection.dest_input, existing.source, existing.source_output
            )));
        }
        if let Some(output) = self.output_node {
            let mut candidate = self.connections.clone();
            candidate.insert(*connection);
            let upstream = candidate.upstream_of(output);
            if upstream.contains(&connection.dest) {
                let (_, acyclic) = candidate.sort(&upstream);
                if !acyclic {
                    return Err(GraphError::InvalidConnection(format!(
                        "{connection} would create a cycle feeding the output node"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn connect(&mut self, connection: Connection) -> Result<(), GraphError> {
        self.validate_connection(&connection)?;
        self.connections.insert(connection);
        Ok(())
    }

    pub fn disconnect(&mut self, dest: NodeId, dest_input: u32) -> Result<Connection, GraphError> {
        self.node(dest)?;
        self.connections
            .remove_input(dest, dest_input)
            .ok_or_else(|| {
                GraphError::InvalidConnection(format!(
                    "nothing is connected to input {dest}:{dest_input}"
                ))
            })
    }

    /// Nodes feeding the output node, sources first. Empty without an output node.
    pub fn render_order(&self) -> Vec<NodeId> {
        match self.output_node {
            Some(output) => {
                let upstream = self.connections.upstream_of(output);
                self.connections.sort(&upstream).0
            }
            None => Vec::new(),
        }
    }

    /// Every node, sources before sinks; nodes on cycles come last in id order.
    pub fn init_order(&self) -> Vec<NodeId> {
        let all: BTreeSet<NodeId> = self.nodes.keys().copied().collect();
        self.connections.sort(&all).0
    }

    pub fn compile_plan(&self, max_frames: usize) -> RenderPlan {
        RenderPlan::compile(
            self.generation,
            &self.render_order(),
            &self.nodes,
            &self.connections,
            self.output_node,
            max_frames,
        )
    }
}

/// Rejects port indices past [`MAX_PORTS`].
pub(crate) fn check_ports(connection: &Connection) -> Result<(), GraphError> {
    if connection.source_output >= MAX_PORTS || connection.dest_input >= MAX_PORTS {
        return Err(GraphError::InvalidConnection(format!(
            "{connection}: port index must be below {MAX_PORTS}"
        )));
    }
    Ok(())
}
