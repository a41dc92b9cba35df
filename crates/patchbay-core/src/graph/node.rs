//! Node identifiers, per-node state and the processor slot.
//!
//! Each node owns its processor through a [`ProcessorSlot`]. Control threads lock
//! the slot to drive the lifecycle; the render thread only ever `try_lock`s it,
//! so a slot that is mid-teardown is skipped for the cycle instead of stalling
//! the render thread.

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::component::ComponentDescription;
use crate::error::ProcessorError;
use crate::processor::{Inputs, NodeProcessor, Outputs, RenderContext, StreamFormat};
use crate::render::FailureKind;

use super::Graph;

/// Unique identifier for a node in a graph.
///
/// Ids are allocated sequentially from 1 and never reused within a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Wraps a raw id. The graph decides whether it refers to a node.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a single node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeState {
    /// No processor instance exists.
    Closed,
    /// The processor is instantiated and opened.
    Open,
    /// Render resources are allocated.
    Initialized,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Initialized => "initialized",
        })
    }
}

/// What a node is backed by.
#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    /// A processor resolved through the component registry.
    Component,
    /// A nested graph owned by this node.
    SubGraph(Graph),
}

/// Committed node record.
#[derive(Debug)]
pub(crate) struct NodeEntry {
    pub id: NodeId,
    pub description: ComponentDescription,
    pub config: Arc<[u8]>,
    pub kind: NodeKind,
    pub slot: Arc<ProcessorSlot>,
}

impl NodeEntry {
    pub fn new(
        id: NodeId,
        description: ComponentDescription,
        config: Arc<[u8]>,
        kind: NodeKind,
    ) -> Self {
        Self {
            id,
            description,
            config,
            kind,
            slot: Arc::new(ProcessorSlot::default()),
        }
    }

    pub fn sub_graph(&self) -> Option<&Graph> {
        match &self.kind {
            NodeKind::SubGraph(graph) => Some(graph),
            NodeKind::Component => None,
        }
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            id: self.id,
            description: self.description,
            config: self.config.to_vec(),
            state: self.slot.state(),
            sub_graph: self.sub_graph().cloned(),
        }
    }
}

/// Read-only snapshot of a node, returned by [`Graph::node_info`](crate::Graph::node_info).
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// The node's id.
    pub id: NodeId,
    /// Component the node was created with.
    pub description: ComponentDescription,
    /// Configuration blob the node was created with.
    pub config: Vec<u8>,
    /// Current node lifecycle state.
    pub state: NodeState,
    /// Handle to the nested graph for sub-graph nodes.
    pub sub_graph: Option<Graph>,
}

impl NodeInfo {
    /// True if the node's processor instance exists.
    pub fn is_open(&self) -> bool {
        self.state != NodeState::Closed
    }
}

pub(crate) struct SlotInner {
    processor: Option<Box<dyn NodeProcessor>>,
    state: NodeState,
    started: bool,
    output_count: usize,
}

impl SlotInner {
    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Installs an opened processor.
    pub fn install(&mut self, processor: Box<dyn NodeProcessor>) {
        debug_assert!(self.processor.is_none());
        self.output_count = processor.output_count();
        self.processor = Some(processor);
        self.state = NodeState::Open;
    }

    pub fn initialize(&mut self, format: &StreamFormat) -> Result<(), ProcessorError> {
        if self.state != NodeState::Open {
            return Ok(());
        }
        if let Some(processor) = self.processor.as_mut() {
            processor.initialize(format)?;
            self.output_count = processor.output_count();
            self.state = NodeState::Initialized;
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), ProcessorError> {
        if self.started || self.state != NodeState::Initialized {
            return Ok(());
        }
        if let Some(processor) = self.processor.as_mut() {
            processor.start()?;
            self.started = true;
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        if let Some(processor) = self.processor.as_mut() {
            processor.stop();
        }
        self.started = false;
    }

    pub fn uninitialize(&mut self) {
        self.stop();
        if self.state != NodeState::Initialized {
            return;
        }
        if let Some(processor) = self.processor.as_mut() {
            processor.uninitialize();
        }
        self.state = NodeState::Open;
    }

    pub fn close(&mut self) {
        self.uninitialize();
        if let Some(mut processor) = self.processor.take() {
            processor.close();
        }
        self.state = NodeState::Closed;
    }
}

/// Owner of a node's processor instance.
pub(crate) struct ProcessorSlot {
    inner: Mutex<SlotInner>,
}

impl Default for ProcessorSlot {
    fn default() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                processor: None,
                state: NodeState::Closed,
                started: false,
                output_count: 0,
            }),
        }
    }
}

impl ProcessorSlot {
    /// Locks the slot for a lifecycle step. Control threads only.
    pub fn lock(&self) -> parking_lot::MutexGuard<'_, SlotInner> {
        self.inner.lock()
    }

    pub fn state(&self) -> NodeState {
        self.inner.lock().state
    }

    /// Renders one cycle without blocking.
    pub fn try_render(
        &self,
        ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), FailureKind> {
        let Some(mut inner) = self.inner.try_lock() else {
            return Err(FailureKind::Busy);
        };
        if inner.state != NodeState::Initialized {
            return Err(FailureKind::NotReady);
        }
        let Some(processor) = inner.processor.as_mut() else {
            return Err(FailureKind::NotReady);
        };
        processor
            .render(ctx, inputs, outputs)
            .map_err(FailureKind::Processor)
    }
}

impl Drop for ProcessorSlot {
    fn drop(&mut self) {
        self.inner.get_mut().close();
    }
}

impl fmt::Debug for ProcessorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(inner) => f
                .debug_struct("ProcessorSlot")
                .field("state", &inner.state)
                .field("started", &inner.started)
                .finish_non_exhaustive(),
            None => f.write_str("ProcessorSlot { <locked> }"),
        }
    }
}
