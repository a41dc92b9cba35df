//! Property-based tests for the connection table and render ordering.
//!
//! Random edit sequences are applied to a graph; whatever subset of them is
//! accepted, the committed topology must keep one connection per input, a
//! render order that respects every edge, and never reuse a node id.

mod common;

use std::collections::{HashMap, HashSet};

use common::{EFFECT, OUTPUT, SOURCE};
use patchbay_core::{Graph, GraphError, NodeId};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Connect { from: usize, to: usize, input: u32 },
    Disconnect { node: usize, input: u32 },
    Remove { node: usize },
    Add,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0usize..8, 0usize..8, 0u32..3).prop_map(|(from, to, input)| Op::Connect { from, to, input }),
        2 => (0usize..8, 0u32..3).prop_map(|(node, input)| Op::Disconnect { node, input }),
        1 => (0usize..8).prop_map(|node| Op::Remove { node }),
        1 => Just(Op::Add),
    ]
}

/// One output node plus a source and effects.
fn graph_with_nodes(effects: usize) -> (Graph, Vec<NodeId>) {
    let graph = Graph::with_settings(common::registry(), common::settings());
    let mut ids = vec![
        graph.add_node(OUTPUT, &[]).unwrap(),
        graph.add_node(SOURCE, &[]).unwrap(),
    ];
    for _ in 0..effects {
        ids.push(graph.add_node(EFFECT, &[]).unwrap());
    }
    (graph, ids)
}

fn apply(graph: &Graph, ids: &mut Vec<NodeId>, op: &Op) -> Result<(), GraphError> {
    let pick = |i: usize| ids[i % ids.len()];
    match *op {
        Op::Connect { from, to, input } => graph.connect(pick(from), 0, pick(to), input).map(drop),
        Op::Disconnect { node, input } => graph.disconnect(pick(node), input).map(drop),
        Op::Remove { node } => {
            let id = pick(node);
            let _status = graph.remove_node(id)?;
            ids.retain(|&n| n != id);
            Ok(())
        }
        Op::Add => {
            ids.push(graph.add_node(EFFECT, &[])?);
            Ok(())
        }
    }
}

fn assert_topology(graph: &Graph) -> Result<(), TestCaseError> {
    let connections = graph.connections();
    let nodes: HashSet<NodeId> = graph.node_ids().into_iter().collect();

    let mut inputs = HashSet::new();
    for c in &connections {
        prop_assert!(inputs.insert((c.dest, c.dest_input)), "input fed twice: {c}");
        prop_assert!(nodes.contains(&c.source) && nodes.contains(&c.dest), "dangling: {c}");
    }

    let order = graph.render_order();
    let position: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    prop_assert_eq!(position.len(), order.len(), "duplicate node in {:?}", order);
    match graph.output_node() {
        Some(output) => prop_assert_eq!(order.last(), Some(&output)),
        None => prop_assert!(order.is_empty()),
    }
    for c in &connections {
        if let (Some(s), Some(d)) = (position.get(&c.source), position.get(&c.dest)) {
            prop_assert!(s < d, "{c} violates order {order:?}");
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Whatever edits are accepted, each input has at most one feeder and the
    /// render order is a topological order ending at the output node.
    #[test]
    fn committed_topology_stays_well_formed(
        effects in 1usize..6,
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let (graph, mut ids) = graph_with_nodes(effects);
        for op in &ops {
            if ids.is_empty() {
                break;
            }
            let before = graph.connections();
            if apply(&graph, &mut ids, op).is_err() {
                prop_assert_eq!(graph.connections(), before, "rejected {:?} changed the table", op);
            }
            assert_topology(&graph)?;
        }
    }

    /// Deferred edits applied by `update` reach the same committed topology as
    /// applying them directly.
    #[test]
    fn deferred_edits_match_direct_edits(
        ops in prop::collection::vec(op(), 1..30),
    ) {
        let (direct, mut direct_ids) = graph_with_nodes(3);
        let (deferred, mut deferred_ids) = graph_with_nodes(3);
        deferred.open().unwrap();
        deferred.initialize().unwrap();
        deferred.start().unwrap();

        for op in ops.iter().filter(|op| !matches!(op, Op::Add)) {
            if direct_ids.is_empty() {
                break;
            }
            let direct_ok = apply(&direct, &mut direct_ids, op).is_ok();
            let queued = apply(&deferred, &mut deferred_ids, op);
            prop_assert!(queued.is_ok(), "queueing {:?} failed: {:?}", op, queued);
            let drained = deferred.update(true);
            prop_assert_eq!(direct_ok, drained.is_ok(), "{:?}", op);
            if drained.is_err() {
                prop_assert!(deferred.discard_pending_edit().unwrap().is_some());
            }
            prop_assert_eq!(deferred.connections(), direct.connections());
            prop_assert_eq!(deferred.render_order(), direct.render_order());
        }
        prop_assert_eq!(deferred.pending_edit_count(), 0);
    }

    /// Ids are allocated in increasing order and never handed out twice.
    #[test]
    fn node_ids_are_never_reused(removals in prop::collection::vec(0usize..16, 0..16)) {
        let graph = Graph::with_settings(common::registry(), common::settings());
        let mut seen = HashSet::new();
        let mut last = None;
        for pick in removals {
            let id = graph.add_node(EFFECT, &[]).unwrap();
            prop_assert!(seen.insert(id));
            prop_assert!(last < Some(id));
            last = Some(id);
            let live = graph.node_ids();
            let victim = live[pick % live.len()];
            let _ = graph.remove_node(victim).unwrap();
        }
        prop_assert!(graph.node_ids().iter().all(|id| seen.contains(id)));
    }
}
