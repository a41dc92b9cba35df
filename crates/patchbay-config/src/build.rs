//! Building engine graphs from documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use patchbay_core::{ComponentRegistry, Graph, NodeId};

use crate::document::{ConnectionConfig, GraphDocument, NodeConfig, NodeSource};
use crate::error::ConfigError;
use crate::validation::{scoped, validate};

/// A graph built from a document, with its labels resolved to node ids.
///
/// The graph is left closed. Callers open, initialize and start it.
#[derive(Debug)]
pub struct BuiltGraph {
    /// The top-level graph.
    pub graph: Graph,
    /// Every node id by scoped label (`outer/inner` for nested nodes).
    pub labels: BTreeMap<String, NodeId>,
    /// Nested graphs by the scoped label of their sub-graph node.
    pub nested: BTreeMap<String, Graph>,
}

impl BuiltGraph {
    /// Resolves a scoped label to the graph that owns the node and its id.
    pub fn lookup(&self, path: &str) -> Option<(&Graph, NodeId)> {
        let id = *self.labels.get(path)?;
        let graph = match path.rsplit_once('/') {
            Some((scope, _)) => self.nested.get(scope)?,
            None => &self.graph,
        };
        Some((graph, id))
    }

    /// Local labels of the nodes directly inside `scope`, by id. The empty
    /// scope is the top-level graph.
    pub fn scope_labels(&self, scope: &str) -> BTreeMap<NodeId, &str> {
        self.labels
            .iter()
            .filter_map(|(path, &id)| {
                let local = if scope.is_empty() {
                    path.as_str()
                } else {
                    path.strip_prefix(scope)?.strip_prefix('/')?
                };
                (!local.contains('/')).then_some((id, local))
            })
            .collect()
    }
}

/// Validates a document and builds it into a closed graph.
///
/// Nodes are added in document order, then connections are made in
/// document order. Nested graphs share the parent's registry and settings.
///
/// # Errors
///
/// [`ConfigError::Validation`] if the document is invalid, or
/// [`ConfigError::Graph`] if the engine rejects a node or connection, such
/// as one closing a cycle that feeds the output node.
pub fn build(
    doc: &GraphDocument,
    registry: Arc<ComponentRegistry>,
) -> Result<BuiltGraph, ConfigError> {
    validate(doc)?;

    let mut built = BuiltGraph {
        graph: Graph::with_settings(registry, doc.engine.settings()),
        labels: BTreeMap::new(),
        nested: BTreeMap::new(),
    };
    let graph = built.graph.clone();
    populate(&graph, "", &doc.nodes, &doc.connections, &mut built)?;
    Ok(built)
}

fn populate(
    graph: &Graph,
    scope: &str,
    nodes: &[NodeConfig],
    connections: &[ConnectionConfig],
    built: &mut BuiltGraph,
) -> Result<(), ConfigError> {
    for node in nodes {
        let label = scoped(scope, &node.label);
        let id = match node.source() {
            Some(NodeSource::Component(description)) => graph
                .add_node(description, &node.config_blob())
                .map_err(|e| ConfigError::graph(format!("add node '{label}'"), e))?,
            Some(NodeSource::SubGraph(subgraph)) => {
                let (id, nested) = graph
                    .add_subgraph_node()
                    .map_err(|e| ConfigError::graph(format!("add sub-graph '{label}'"), e))?;
                populate(&nested, &label, &subgraph.nodes, &subgraph.connections, built)?;
                built.nested.insert(label.clone(), nested);
                id
            }
            // Validation rejects nodes that do not resolve.
            None => continue,
        };
        built.labels.insert(label, id);
    }

    for connection in connections {
        let from = scoped(scope, &connection.from);
        let to = scoped(scope, &connection.to);
        let context = format!(
            "connect {from}:{} -> {to}:{}",
            connection.output, connection.input
        );
        let (Some(&source), Some(&dest)) = (built.labels.get(&from), built.labels.get(&to)) else {
            continue;
        };
        let _status = graph
            .connect(source, connection.output, dest, connection.input)
            .map_err(|e| ConfigError::graph(context, e))?;
    }
    Ok(())
}
