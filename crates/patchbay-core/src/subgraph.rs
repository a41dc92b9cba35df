//! Sub-graph nodes.
//!
//! A sub-graph node wraps a nested [`Graph`]. Its processor follows the parent's
//! lifecycle: opening the node opens the nested graph, initializing it
//! initializes and starts the nested graph and attaches its renderer, and the
//! reverse transitions undo those steps. Each parent render pulls one cycle from
//! the nested graph, passing the node's connected inputs as host inputs.

use crate::error::{GraphError, ProcessorError, RenderError};
use crate::graph::Graph;
use crate::processor::{Inputs, NodeProcessor, Outputs, RenderContext, StreamFormat};
use crate::render::Renderer;

/// Most input ports a sub-graph node forwards to its nested graph.
pub const MAX_SUB_GRAPH_INPUTS: usize = 8;

fn unavailable(err: GraphError) -> ProcessorError {
    ProcessorError::ResourceUnavailable(format!("sub-graph: {err}"))
}

pub(crate) struct SubGraphProcessor {
    graph: Graph,
    renderer: Option<Renderer>,
}

impl SubGraphProcessor {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            renderer: None,
        }
    }

    fn shut_down(&mut self) {
        self.renderer = None;
        if let Err(err) = self.graph.stop().and_then(|()| self.graph.uninitialize()) {
            tracing::warn!(error = %err, "sub-graph teardown failed");
        }
    }
}

impl NodeProcessor for SubGraphProcessor {
    fn open(&mut self) -> Result<(), ProcessorError> {
        self.graph.open().map_err(unavailable)
    }

    fn close(&mut self) {
        self.shut_down();
        if let Err(err) = self.graph.close() {
            tracing::warn!(error = %err, "sub-graph close failed");
        }
    }

    fn initialize(&mut self, _format: &StreamFormat) -> Result<(), ProcessorError> {
        self.graph.initialize().map_err(unavailable)?;
        if let Err(err) = self.graph.start() {
            if let Err(rollback) = self.graph.uninitialize() {
                tracing::warn!(error = %rollback, "sub-graph rollback failed");
            }
            return Err(unavailable(err));
        }
        match self.graph.renderer() {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                Ok(())
            }
            Err(err) => {
                self.shut_down();
                Err(unavailable(err))
            }
        }
    }

    fn uninitialize(&mut self) {
        self.shut_down();
    }

    fn render(
        &mut self,
        _ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError> {
        let renderer = self
            .renderer
            .as_mut()
            .ok_or(RenderError("sub-graph not initialized"))?;

        let mut host: [&[f32]; MAX_SUB_GRAPH_INPUTS] = [&[][..]; MAX_SUB_GRAPH_INPUTS];
        let count = inputs.len().min(MAX_SUB_GRAPH_INPUTS);
        for (port, slot) in host.iter_mut().enumerate().take(count) {
            if let Some(signal) = inputs.get(port) {
                *slot = signal;
            }
        }

        let out = outputs
            .get_mut(0)
            .ok_or(RenderError("sub-graph node has no output"))?;
        let report = renderer.render(&host[..count], out);
        if report.rendered {
            Ok(())
        } else {
            Err(RenderError("sub-graph did not render"))
        }
    }
}
