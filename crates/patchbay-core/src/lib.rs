//! Patchbay Core - a processing-graph engine
//!
//! This crate provides a directed graph of processing nodes with typed ports,
//! a whole-graph lifecycle, a pending-edit queue for changes made while
//! rendering, and a render dispatcher that never blocks the render thread.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`Graph`] - Cloneable handle: nodes, connections, lifecycle, `update`
//! - [`GraphState`] - Closed → Open → Initialized → Running
//! - [`PendingEdit`] / [`EditStatus`] - Queued topology mutations
//! - [`Connection`] - `(source, output) → (dest, input)` edge
//!
//! ## Processors
//!
//! - [`NodeProcessor`] - Object-safe trait every node implements
//! - [`ComponentRegistry`] - Maps [`ComponentDescription`]s to processor factories
//! - [`Inputs`] / [`Outputs`] - Allocation-free port views for one cycle
//!
//! ## Rendering
//!
//! - [`Renderer`] - The single render-thread handle
//! - [`RenderNotify`] - Pre/post-render callbacks keyed by (callback, refcon)
//! - [`RenderFailure`] - Out-of-band report of a node that rendered silence
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use patchbay_core::{ComponentRegistry, Graph};
//!
//! let registry = Arc::new(ComponentRegistry::new());
//! patchbay_nodes::register_builtins(&registry);
//!
//! let graph = Graph::new(registry);
//! let source = graph.add_node(patchbay_nodes::SINE, &[])?;
//! let output = graph.add_node(patchbay_nodes::GENERIC_OUTPUT, &[])?;
//! graph.connect(source, 0, output, 0)?;
//! graph.open()?;
//! graph.initialize()?;
//! graph.start()?;
//!
//! // Render thread
//! let mut renderer = graph.renderer()?;
//! renderer.render(&[], &mut block);
//!
//! // Control thread, while running: edits queue until `update`
//! graph.remove_node(source)?;
//! graph.update(false)?;
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: the render path never blocks and never allocates
//! - **All-or-nothing lifecycle**: failed transitions roll back
//! - **Explicit registry**: no process-wide component tables

pub mod component;
pub mod error;
pub mod graph;
pub mod params;
pub mod processor;
pub mod registry;
pub mod render;
pub mod settings;
pub mod subgraph;

// Re-export main types at crate root
pub use component::{ComponentDescription, FourCc, MANUFACTURER, ParseFourCcError, types};
pub use error::{ErrorClass, GraphError, NodeStage, ProcessorError, RenderError};
pub use graph::{
    Connection, EditStatus, Graph, GraphState, MAX_PORTS, NodeId, NodeInfo, NodeState,
    PendingEdit,
};
pub use processor::{Inputs, NodeProcessor, Outputs, RenderContext, StreamFormat};
pub use registry::{ComponentRegistry, ProcessorFactory, RegistryEntry};
pub use render::{
    CycleReport, FailureKind, RefCon, RenderFailure, RenderNotification, RenderNotify,
    RenderPhase, Renderer, in_render_context,
};
pub use settings::GraphSettings;
pub use subgraph::MAX_SUB_GRAPH_INPUTS;
