//! The render dispatcher.
//!
//! A [`Renderer`] is the single render-thread handle to a graph. Each call to
//! [`render`](Renderer::render) is one cycle:
//!
//! 1. `try_lock` the topology. If it is free, adopt the newest committed plan
//!    and hand the previous one back for the control thread to drop. If it is
//!    held, keep rendering the previous plan and flag the cycle as stale.
//! 2. If the graph is not running, write silence and return.
//! 3. Dispatch pre-render notifications, run the plan, copy the output node's
//!    signal out, dispatch post-render notifications and push failures into the
//!    failure channel.
//!
//! The cycle never blocks and never allocates. Plans are compiled on control
//! threads when edits commit, so cycle detection and sorting never happen here.

mod failure;
mod notify;

pub use failure::{FailureKind, MAX_FAILURES_PER_CYCLE, RenderFailure};
pub(crate) use failure::FailureLog;
pub(crate) use notify::NotifyList;
pub use notify::{RefCon, RenderNotification, RenderNotify, RenderPhase};

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::graph::{GraphShared, GraphState, NodeId, RenderPlan};
use crate::processor::RenderContext;

thread_local! {
    static RENDER_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// True while the current thread is inside [`Renderer::render`], including
/// notification callbacks and nested sub-graph renders.
pub fn in_render_context() -> bool {
    RENDER_DEPTH.with(Cell::get) > 0
}

struct RenderScope;

impl RenderScope {
    fn enter() -> Self {
        RENDER_DEPTH.with(|d| d.set(d.get() + 1));
        Self
    }
}

impl Drop for RenderScope {
    fn drop(&mut self) {
        RENDER_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Summary of one render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle counter, starting at 0.
    pub cycle: u64,
    /// Generation of the plan used, 0 if none has been adopted yet.
    pub generation: u64,
    /// True when the topology lock was busy and the previous plan was reused.
    pub stale_topology: bool,
    /// False when the graph was not running (or the request was too large) and
    /// silence was written.
    pub rendered: bool,
    /// Number of nodes (or cycle-wide conditions) that failed this cycle.
    pub failed_nodes: usize,
}

/// Render-thread handle. Obtain with [`Graph::renderer`](crate::Graph::renderer).
pub struct Renderer {
    shared: Arc<GraphShared>,
    plan: Option<Box<RenderPlan>>,
    cycle: u64,
    failures: FailureLog,
}

impl Renderer {
    pub(crate) fn new(shared: Arc<GraphShared>) -> Self {
        Self {
            shared,
            plan: None,
            cycle: 0,
            failures: FailureLog::new(),
        }
    }

    /// Adopts the newest committed plan if the topology lock is free.
    ///
    /// Returns true if the lock was busy.
    fn refresh_plan(&mut self) -> bool {
        let Some(mut topo) = self.shared.topology.try_lock() else {
            return true;
        };
        if topo.retired.is_none()
            && let Some(next) = topo.next_plan.take()
        {
            self.shared
                .active_generation
                .store(next.generation, Ordering::Release);
            topo.retired = self.plan.replace(next);
        }
        false
    }

    /// Renders one cycle into `output`. `output.len()` is the frame count.
    ///
    /// `host_inputs` are exposed to processors through
    /// [`RenderContext::host_input`].
    pub fn render(&mut self, host_inputs: &[&[f32]], output: &mut [f32]) -> CycleReport {
        let _scope = RenderScope::enter();
        let cycle = self.cycle;
        self.cycle += 1;
        self.failures.clear();

        let stale_topology = self.refresh_plan();
        let generation = self.plan.as_ref().map_or(0, |p| p.generation);
        let mut report = CycleReport {
            cycle,
            generation,
            stale_topology,
            rendered: false,
            failed_nodes: 0,
        };

        if self.shared.state() != GraphState::Running {
            output.fill(0.0);
            return report;
        }

        let frames = output.len();
        let limit = self.shared.settings.max_frames;
        if frames > limit {
            output.fill(0.0);
            self.failures.push(RenderFailure {
                cycle,
                node: None,
                kind: FailureKind::FrameLimit { frames, limit },
            });
            report.failed_nodes = self.publish_failures();
            return report;
        }

        let notify = &self.shared.notify;
        notify.dispatch(&RenderNotification {
            phase: RenderPhase::PreRender,
            cycle,
            frames,
            output: None,
            failures: &[],
            stale_topology,
        });

        let ctx = RenderContext {
            sample_rate: self.shared.settings.sample_rate,
            frames,
            cycle,
            host_inputs,
        };
        match self.plan.as_mut() {
            Some(plan) => {
                plan.run(&ctx, &mut self.failures);
                plan.read_output(output);
            }
            None => output.fill(0.0),
        }

        notify.dispatch(&RenderNotification {
            phase: RenderPhase::PostRender,
            cycle,
            frames,
            output: Some(&*output),
            failures: self.failures.as_slice(),
            stale_topology,
        });

        report.rendered = true;
        report.failed_nodes = self.publish_failures();
        report
    }

    fn publish_failures(&self) -> usize {
        for failure in self.failures.as_slice() {
            if self.shared.failure_tx.try_send(*failure).is_err() {
                self.shared.dropped_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.failures.total()
    }

    /// Order of the plan currently in use (empty before the first adoption).
    pub fn render_order(&self) -> &[NodeId] {
        self.plan.as_ref().map_or(&[][..], |p| p.order())
    }

    /// Number of cycles rendered so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Frames per cycle this renderer accepts.
    pub fn max_frames(&self) -> usize {
        self.shared.settings.max_frames
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shared.renderer_attached.store(false, Ordering::Release);
    }
}

impl core::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Renderer")
            .field("cycle", &self.cycle)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}
