//! Graph inspection command.

#![allow(clippy::print_literal)] // Table headers use literal strings

use std::collections::BTreeMap;

use clap::Args;
use patchbay_config::BuiltGraph;
use patchbay_core::{Graph, NodeId, params};
use serde_json::{Value, json};

use super::common::load_graph;

#[derive(Args)]
pub struct InspectArgs {
    /// Graph document (TOML path or bundled graph name)
    #[arg(value_name = "GRAPH")]
    graph: String,

    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,
}

/// One graph level: the top-level graph or a nested one.
struct Level<'a> {
    scope: String,
    graph: &'a Graph,
    labels: BTreeMap<NodeId, &'a str>,
}

fn levels(built: &BuiltGraph) -> Vec<Level<'_>> {
    std::iter::once(("", &built.graph))
        .chain(built.nested.iter().map(|(scope, g)| (scope.as_str(), g)))
        .map(|(scope, graph)| Level {
            scope: scope.to_string(),
            graph,
            labels: built.scope_labels(scope),
        })
        .collect()
}

fn label(level: &Level<'_>, id: NodeId) -> String {
    level
        .labels
        .get(&id)
        .map_or_else(|| id.to_string(), |l| (*l).to_string())
}

/// Kind column: builtin name, `sub-graph`, or the raw description.
fn kind(info: &patchbay_core::NodeInfo) -> String {
    if info.description.is_sub_graph() {
        return "sub-graph".to_string();
    }
    patchbay_nodes::find_builtin(&info.description)
        .map_or_else(|| info.description.to_string(), |b| b.name.to_string())
}

fn level_json(level: &Level<'_>) -> anyhow::Result<Value> {
    let mut nodes = Vec::new();
    for id in level.graph.node_ids() {
        let info = level.graph.node_info(id)?;
        nodes.push(json!({
            "id": id.index(),
            "label": label(level, id),
            "kind": kind(&info),
            "description": info.description.to_string(),
            "params": params::decode(&info.config).unwrap_or_default(),
        }));
    }
    let connections: Vec<Value> = level
        .graph
        .connections()
        .iter()
        .map(|c| {
            json!({
                "from": label(level, c.source),
                "output": c.source_output,
                "to": label(level, c.dest),
                "input": c.dest_input,
            })
        })
        .collect();
    let order: Vec<String> = level
        .graph
        .render_order()
        .into_iter()
        .map(|id| label(level, id))
        .collect();
    Ok(json!({
        "scope": level.scope,
        "nodes": nodes,
        "connections": connections,
        "render_order": order,
    }))
}

fn print_level(level: &Level<'_>) -> anyhow::Result<()> {
    let title = if level.scope.is_empty() {
        "Graph".to_string()
    } else {
        format!("Sub-graph '{}'", level.scope)
    };
    println!("{title}");
    println!("{}", "=".repeat(title.len()));
    println!();

    println!("  {:4}  {:12}  {:12}  {:16}  {}", "Id", "Label", "Kind", "Component", "Params");
    println!("  {:4}  {:12}  {:12}  {:16}  {}", "--", "-----", "----", "---------", "------");
    for id in level.graph.node_ids() {
        let info = level.graph.node_info(id)?;
        let values = params::decode(&info.config).unwrap_or_default();
        println!(
            "  {:4}  {:12}  {:12}  {:16}  {values:?}",
            id.index(),
            label(level, id),
            kind(&info),
            info.description.to_string(),
        );
    }
    println!();

    println!("Connections:");
    let connections = level.graph.connections();
    if connections.is_empty() {
        println!("  (none)");
    }
    for c in connections {
        println!(
            "  {}:{} -> {}:{}",
            label(level, c.source),
            c.source_output,
            label(level, c.dest),
            c.dest_input
        );
    }
    println!();

    let order: Vec<String> = level
        .graph
        .render_order()
        .into_iter()
        .map(|id| label(level, id))
        .collect();
    if order.is_empty() {
        println!("Render order: (no output node)");
    } else {
        println!("Render order: {}", order.join(" -> "));
    }
    println!();
    Ok(())
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let (doc, built) = load_graph(&args.graph)?;
    let levels = levels(&built);

    if args.json {
        let graphs = levels.iter().map(level_json).collect::<anyhow::Result<Vec<_>>>()?;
        let report = json!({
            "name": doc.name,
            "description": doc.description,
            "engine": {
                "sample_rate": doc.engine.sample_rate,
                "max_frames": doc.engine.max_frames,
                "failure_queue_capacity": doc.engine.failure_queue_capacity,
            },
            "graphs": graphs,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", doc.name);
    if let Some(description) = &doc.description {
        println!("{description}");
    }
    println!(
        "{} Hz, up to {} frames per cycle",
        doc.engine.sample_rate, doc.engine.max_frames
    );
    println!();
    for level in &levels {
        print_level(level)?;
    }
    Ok(())
}
