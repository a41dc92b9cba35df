//! Compiled render plans.
//!
//! A [`RenderPlan`] is built on a control thread whenever the committed topology
//! changes and then handed to the renderer. It holds everything a cycle needs:
//! the node order, each node's input wiring as buffer indices, and a flat sample
//! pool with one `max_frames` buffer per output port. Running a plan performs no
//! allocation and takes no blocking locks.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::processor::{Inputs, Outputs, RenderContext};
use crate::render::{FailureLog, RenderFailure};

use super::connection::ConnectionTable;
use super::node::{NodeEntry, NodeId, ProcessorSlot};

/// One node's work within a plan.
pub(crate) struct RenderStep {
    pub node: NodeId,
    slot: Arc<ProcessorSlot>,
    /// Buffer index feeding each input port, `None` when unconnected.
    inputs: Box<[Option<usize>]>,
    first_output: usize,
    output_count: usize,
}

/// Immutable render schedule plus its sample pool.
pub(crate) struct RenderPlan {
    pub generation: u64,
    steps: Vec<RenderStep>,
    order: Vec<NodeId>,
    /// Buffer holding the output node's port 0.
    output_buffer: Option<usize>,
    stride: usize,
    pool: Vec<f32>,
}

impl RenderPlan {
    /// Compiles `order` (already topologically sorted) against the node table.
    ///
    /// Connections from sources outside `order`, or from output ports the
    /// source does not have, leave the input unconnected.
    pub fn compile(
        generation: u64,
        order: &[NodeId],
        nodes: &BTreeMap<NodeId, NodeEntry>,
        connections: &ConnectionTable,
        output_node: Option<NodeId>,
        max_frames: usize,
    ) -> Self {
        let mut steps = Vec::with_capacity(order.len());
        let mut first_buffer: BTreeMap<NodeId, (usize, usize)> = BTreeMap::new();
        let mut next_buffer = 0;

        for &id in order {
            let Some(entry) = nodes.get(&id) else {
                continue;
            };
            let output_count = entry.slot.lock().output_count();

            let port_count = connections
                .iter()
                .filter(|c| c.dest == id)
                .map(|c| c.dest_input as usize + 1)
                .max()
                .unwrap_or(0);
            let mut inputs = vec![None; port_count];
            for c in connections.iter().filter(|c| c.dest == id) {
                if let Some(&(first, count)) = first_buffer.get(&c.source)
                    && (c.source_output as usize) < count
                {
                    inputs[c.dest_input as usize] = Some(first + c.source_output as usize);
                }
            }

            first_buffer.insert(id, (next_buffer, output_count));
            steps.push(RenderStep {
                node: id,
                slot: Arc::clone(&entry.slot),
                inputs: inputs.into_boxed_slice(),
                first_output: next_buffer,
                output_count,
            });
            next_buffer += output_count;
        }

        let output_buffer = output_node
            .and_then(|id| first_buffer.get(&id))
            .filter(|(_, count)| *count > 0)
            .map(|(first, _)| *first);

        Self {
            generation,
            order: steps.iter().map(|s| s.node).collect(),
            steps,
            output_buffer,
            stride: max_frames,
            pool: vec![0.0; next_buffer * max_frames],
        }
    }

    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn max_frames(&self) -> usize {
        self.stride
    }

    /// Runs every step for `ctx.frames` frames.
    ///
    /// A failing step has its outputs silenced and is recorded in `failures`.
    pub fn run(&mut self, ctx: &RenderContext<'_>, failures: &mut FailureLog) {
        let frames = ctx.frames;
        let stride = self.stride;

        for step in &self.steps {
            let start = step.first_output * stride;
            let len = step.output_count * stride;
            let (before, rest) = self.pool.split_at_mut(start);
            let outs = &mut rest[..len];

            let inputs = Inputs::pooled(before, stride, &step.inputs, frames);
            let mut outputs = Outputs::new(outs, stride, frames);
            if let Err(kind) = step.slot.try_render(ctx, &inputs, &mut outputs) {
                outputs.silence();
                failures.push(RenderFailure {
                    cycle: ctx.cycle,
                    node: Some(step.node),
                    kind,
                });
            }
        }
    }

    /// Copies the output node's signal into `out`, or silence if there is none.
    pub fn read_output(&self, out: &mut [f32]) {
        match self.output_buffer {
            Some(buffer) => {
                let start = buffer * self.stride;
                out.copy_from_slice(&self.pool[start..start + out.len()]);
            }
            None => out.fill(0.0),
        }
    }

    /// Output node's signal for the last `frames` rendered.
    pub fn output(&self, frames: usize) -> Option<&[f32]> {
        let start = self.output_buffer? * self.stride;
        self.pool.get(start..start + frames)
    }
}

impl core::fmt::Debug for RenderPlan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderPlan")
            .field("generation", &self.generation)
            .field("order", &self.order)
            .field("buffers", &(self.pool.len() / self.stride.max(1)))
            .finish_non_exhaustive()
    }
}
