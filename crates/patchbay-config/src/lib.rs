//! TOML graph documents for the patchbay engine.
//!
//! A [`GraphDocument`] describes nodes, connections and engine settings by
//! label. Documents can be validated on their own, with every problem
//! collected into one [`ValidationReport`], and built into a closed
//! [`Graph`](patchbay_core::Graph) against a component registry.
//!
//! # Features
//!
//! - **Documents**: load and save TOML, nested sub-graphs included
//! - **Validation**: structural checks that need no registry
//! - **Building**: labels resolved to node ids, nested labels as `outer/inner`
//! - **Bundled graphs**: example documents that always build
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use patchbay_config::{GraphDocument, build};
//! use patchbay_core::ComponentRegistry;
//!
//! let doc = GraphDocument::load("echo.toml").unwrap();
//!
//! let registry = Arc::new(ComponentRegistry::new());
//! patchbay_nodes::register_builtins(&registry);
//!
//! let built = build(&doc, registry).unwrap();
//! built.graph.open().unwrap();
//! ```

mod build;
mod document;
mod error;

/// Example documents bundled with the library.
pub mod bundled;

/// Structural validation of documents.
pub mod validation;

pub use build::{BuiltGraph, build};
pub use bundled::{bundled_graph, bundled_graph_names, bundled_graphs};
pub use document::{
    ConnectionConfig, EngineConfig, GraphDocument, NodeConfig, NodeSource, SubGraphConfig,
};
pub use error::ConfigError;
pub use validation::{ValidationIssue, ValidationReport, validate};
