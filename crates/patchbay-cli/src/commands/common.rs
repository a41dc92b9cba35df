//! Shared CLI helpers used across multiple commands.

use std::path::Path;
use std::sync::Arc;

use patchbay_config::{BuiltGraph, GraphDocument, build, bundled_graph};
use patchbay_core::ComponentRegistry;

/// Load a graph document by path or bundled name.
///
/// An existing file wins; otherwise the name is looked up among the bundled
/// graphs.
pub fn load_document(source: &str) -> anyhow::Result<GraphDocument> {
    let path = Path::new(source);
    if path.exists() {
        tracing::debug!(path = %path.display(), "loading graph document");
        return Ok(GraphDocument::load(path)?);
    }
    if let Some(doc) = bundled_graph(source) {
        tracing::debug!(name = source, "using bundled graph");
        return Ok(doc);
    }
    anyhow::bail!(
        "graph '{source}' not found: not a file and not one of the bundled graphs ({})",
        patchbay_config::bundled_graph_names().join(", ")
    )
}

/// A registry with every built-in processor.
pub fn registry() -> Arc<ComponentRegistry> {
    let registry = Arc::new(ComponentRegistry::new());
    patchbay_nodes::register_builtins(&registry);
    registry
}

/// Load and build a document.
pub fn load_graph(source: &str) -> anyhow::Result<(GraphDocument, BuiltGraph)> {
    let doc = load_document(source)?;
    let built = build(&doc, registry())?;
    Ok((doc, built))
}
