//! Graph lifecycle state machine and per-node transitions.
//!
//! ```text
//! Closed --open--> Open --initialize--> Initialized --start--> Running
//!        <-close--      <-uninitialize-              <-stop---
//! ```
//!
//! Whole-graph transitions are all-or-nothing: if any node fails, the nodes
//! already moved by that call are moved back before the error is returned.

use core::fmt;

use crate::component::ComponentDescription;
use crate::error::{GraphError, NodeStage, ProcessorError};
use crate::processor::{NodeProcessor, StreamFormat};
use crate::registry::ComponentRegistry;
use crate::subgraph::SubGraphProcessor;

use super::node::{NodeEntry, NodeKind, NodeState};
use super::topology::Topology;

/// Lifecycle state of a whole graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum GraphState {
    /// No processor instances exist.
    Closed = 0,
    /// Every node's processor is instantiated.
    Open = 1,
    /// Render resources are allocated.
    Initialized = 2,
    /// The output node is started and render calls produce audio.
    Running = 3,
}

impl GraphState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Open,
            2 => Self::Initialized,
            3 => Self::Running,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Initialized => "initialized",
            Self::Running => "running",
        })
    }
}

fn failure(entry: &NodeEntry, stage: NodeStage, source: ProcessorError) -> GraphError {
    GraphError::NodeFailure {
        node: entry.id,
        stage,
        source,
    }
}

fn instantiate(
    entry: &NodeEntry,
    registry: &ComponentRegistry,
) -> Result<Box<dyn NodeProcessor>, GraphError> {
    match &entry.kind {
        NodeKind::SubGraph(graph) => Ok(Box::new(SubGraphProcessor::new(graph.clone()))),
        NodeKind::Component => {
            let description: ComponentDescription = entry.description;
            let component =
                registry
                    .find(&description)
                    .ok_or(GraphError::InvalidAudioUnit {
                        node: entry.id,
                        description,
                    })?;
            component
                .instantiate(&description, &entry.config)
                .map_err(|e| failure(entry, NodeStage::Open, e))
        }
    }
}

/// Instantiates and opens one node. No-op if it is already open.
pub(crate) fn open_node(entry: &NodeEntry, registry: &ComponentRegistry) -> Result<(), GraphError> {
    let mut slot = entry.slot.lock();
    if slot.state() != NodeState::Closed {
        return Ok(());
    }
    let mut processor = instantiate(entry, registry)?;
    processor
        .open()
        .map_err(|e| failure(entry, NodeStage::Open, e))?;
    slot.install(processor);
    Ok(())
}

pub(crate) fn initialize_node(entry: &NodeEntry, format: &StreamFormat) -> Result<(), GraphError> {
    entry
        .slot
        .lock()
        .initialize(format)
        .map_err(|e| failure(entry, NodeStage::Initialize, e))
}

/// Stops, uninitializes and closes one node.
pub(crate) fn teardown(entry: &NodeEntry) {
    entry.slot.lock().close();
}

/// Brings a freshly added node to the graph's current state.
///
/// In a running graph only a new output node is started. On failure the node
/// is closed again.
pub(crate) fn bring_up(
    entry: &NodeEntry,
    state: GraphState,
    registry: &ComponentRegistry,
    format: &StreamFormat,
) -> Result<(), GraphError> {
    let result = advance(entry, state, registry, format);
    if result.is_err() {
        teardown(entry);
    }
    result
}

fn advance(
    entry: &NodeEntry,
    state: GraphState,
    registry: &ComponentRegistry,
    format: &StreamFormat,
) -> Result<(), GraphError> {
    if state >= GraphState::Open {
        open_node(entry, registry)?;
    }
    if state >= GraphState::Initialized {
        initialize_node(entry, format)?;
    }
    if state == GraphState::Running && entry.description.is_output() {
        entry
            .slot
            .lock()
            .start()
            .map_err(|e| failure(entry, NodeStage::Start, e))?;
    }
    Ok(())
}

/// Opens every node. On failure the nodes opened by this call are closed.
pub(crate) fn open_all(topo: &Topology, registry: &ComponentRegistry) -> Result<(), GraphError> {
    let mut opened = Vec::with_capacity(topo.nodes.len());
    for entry in topo.nodes.values() {
        let was_closed = entry.slot.state() == NodeState::Closed;
        if let Err(err) = open_node(entry, registry) {
            tracing::warn!(node = %entry.id, error = %err, rolled_back = opened.len(), "open failed, rolling back");
            for done in opened {
                teardown(done);
            }
            return Err(err);
        }
        if was_closed {
            opened.push(entry);
        }
    }
    Ok(())
}

/// Initializes every node, sources before sinks. Rolls back on failure.
pub(crate) fn initialize_all(topo: &Topology, format: &StreamFormat) -> Result<(), GraphError> {
    let order = topo.init_order();
    let mut initialized: Vec<&NodeEntry> = Vec::with_capacity(order.len());
    for id in order {
        let Some(entry) = topo.nodes.get(&id) else {
            continue;
        };
        let was_open = entry.slot.state() == NodeState::Open;
        if let Err(err) = initialize_node(entry, format) {
            tracing::warn!(node = %id, error = %err, rolled_back = initialized.len(), "initialize failed, rolling back");
            for done in initialized.into_iter().rev() {
                done.slot.lock().uninitialize();
            }
            return Err(err);
        }
        if was_open {
            initialized.push(entry);
        }
    }
    Ok(())
}

/// Uninitializes every node, sinks before sources.
pub(crate) fn uninitialize_all(topo: &Topology) {
    for id in topo.init_order().into_iter().rev() {
        if let Some(entry) = topo.nodes.get(&id) {
            entry.slot.lock().uninitialize();
        }
    }
}

pub(crate) fn close_all(topo: &Topology) {
    for entry in topo.nodes.values() {
        teardown(entry);
    }
}

/// Starts the output node's processor, if there is one.
pub(crate) fn start_output(topo: &Topology) -> Result<(), GraphError> {
    let Some(entry) = topo.output_node.and_then(|id| topo.nodes.get(&id)) else {
        return Ok(());
    };
    entry
        .slot
        .lock()
        .start()
        .map_err(|e| failure(entry, NodeStage::Start, e))
}

pub(crate) fn stop_output(topo: &Topology) {
    if let Some(entry) = topo.output_node.and_then(|id| topo.nodes.get(&id)) {
        entry.slot.lock().stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            GraphState::Closed,
            GraphState::Open,
            GraphState::Initialized,
            GraphState::Running,
        ] {
            assert_eq!(GraphState::from_u8(state as u8), state);
        }
        assert!(GraphState::Running > GraphState::Initialized);
        assert_eq!(GraphState::Initialized.to_string(), "initialized");
    }
}
