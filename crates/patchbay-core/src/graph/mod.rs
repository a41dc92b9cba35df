//! The processing graph.
//!
//! A [`Graph`] owns a set of nodes (each backed by a [`NodeProcessor`](crate::NodeProcessor)),
//! the connections between their ports, a lifecycle state, and a queue of
//! pending edits.
//!
//! # Architecture
//!
//! Two kinds of threads touch a graph:
//!
//! - **Control threads** (any number) edit the topology and drive the lifecycle
//!   through cloned [`Graph`] handles. They take the topology lock with a
//!   blocking `lock()`.
//! - **The render thread** (exactly one) holds the [`Renderer`](crate::Renderer).
//!   It only ever `try_lock`s, and renders the previous plan when the lock is busy.
//!
//! While the graph is running, edits are not applied directly. They are
//! appended to a separate pending queue and applied in FIFO order by
//! [`Graph::update`]. Every commit compiles a [`RenderPlan`] on the control
//! thread and leaves it for the renderer to adopt on its next cycle. Plans the
//! renderer swaps out, and nodes removed while it might still be rendering them,
//! are handed back and torn down on a control thread.
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
//! let sine = graph.add_node(patchbay_nodes::SINE, &patchbay_core::params::encode(&[220.0]))?;
//! let out = graph.add_node(patchbay_nodes::GENERIC_OUTPUT, &[])?;
//! graph.connect(sine, 0, out, 0)?;
//!
//! graph.open()?;
//! graph.initialize()?;
//! graph.start()?;
//!
//! let mut renderer = graph.renderer()?;
//! let mut block = [0.0f32; 256];
//! renderer.render(&[], &mut block);
//! ```

mod connection;
mod edit;
mod engine;
mod lifecycle;
mod node;
mod plan;
mod topology;

pub use connection::{Connection, MAX_PORTS};
pub use edit::{EditStatus, PendingEdit};
pub use engine::Graph;
pub use lifecycle::GraphState;
pub use node::{NodeId, NodeInfo, NodeState};

pub(crate) use engine::GraphShared;
pub(crate) use plan::RenderPlan;
