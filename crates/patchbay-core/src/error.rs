//! Error types for graph and processor operations.

use core::fmt;

use thiserror::Error;

use crate::component::ComponentDescription;
use crate::graph::{GraphState, NodeId};

/// Errors returned by [`Graph`](crate::Graph) operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The node does not exist in the committed topology.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A connection index past the end of the connection table.
    #[error("connection index {index} out of range ({count} connections)")]
    ConnectionIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of connections at the time of the call.
        count: usize,
    },

    /// The connection is structurally invalid.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// The graph already has an output node.
    #[error("graph already has an output node ({0})")]
    OutputNodeConflict(NodeId),

    /// The operation cannot run now; retry later or from another thread.
    #[error("cannot {0} in the current context")]
    CannotDoInCurrentContext(&'static str),

    /// No registered component can serve the node.
    #[error("no processor is available for node {node} ({description})")]
    InvalidAudioUnit {
        /// Node that could not be instantiated.
        node: NodeId,
        /// Its component description.
        description: ComponentDescription,
    },

    /// The component description is malformed.
    #[error("malformed component description {0}")]
    InvalidDescriptor(ComponentDescription),

    /// A lifecycle call made from the wrong state.
    #[error("cannot {operation} while the graph is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the graph was in.
        state: GraphState,
    },

    /// A node's processor reported an error during a lifecycle step.
    #[error("node {node} failed to {stage}: {source}")]
    NodeFailure {
        /// Failing node.
        node: NodeId,
        /// Lifecycle step that failed.
        stage: NodeStage,
        /// Error reported by the processor.
        #[source]
        source: ProcessorError,
    },
}

/// Broad error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller mistakes. Never retried automatically.
    Structural,
    /// Transient contention. Retry on a later cycle or from another thread.
    Contention,
    /// A processor failed to acquire or prepare its resources.
    Resource,
}

impl GraphError {
    /// Returns the category of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NodeNotFound(_)
            | Self::ConnectionIndexOutOfRange { .. }
            | Self::InvalidConnection(_)
            | Self::OutputNodeConflict(_)
            | Self::InvalidDescriptor(_)
            | Self::InvalidState { .. } => ErrorClass::Structural,
            Self::CannotDoInCurrentContext(_) => ErrorClass::Contention,
            Self::InvalidAudioUnit { .. } | Self::NodeFailure { .. } => ErrorClass::Resource,
        }
    }

    /// True when the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Contention
    }
}

/// Lifecycle step a processor was performing when it failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStage {
    /// Instantiation and `open`.
    Open,
    /// `initialize`.
    Initialize,
    /// `start`.
    Start,
}

impl fmt::Display for NodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Initialize => "initialize",
            Self::Start => "start",
        })
    }
}

/// Errors reported by a [`NodeProcessor`](crate::NodeProcessor) outside the render path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    /// The configuration blob could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A resource the processor needs is unavailable.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
}

/// Error returned from [`NodeProcessor::render`](crate::NodeProcessor::render).
///
/// Carries only a static message so it can be reported from the render thread
/// without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RenderError(pub &'static str);
