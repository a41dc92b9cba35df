//! Render-time failure records.
//!
//! Failures are collected into a preallocated log during the cycle, handed to
//! post-render notifications, and pushed into the graph's bounded failure
//! channel with `try_send`. Nothing here allocates on the render thread.

use core::fmt;

use crate::error::RenderError;
use crate::graph::NodeId;

/// Why a node contributed silence this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The processor's `render` returned an error.
    Processor(RenderError),
    /// A control thread held the node's processor (mid-teardown or lifecycle step).
    Busy,
    /// The node's processor was not initialized.
    NotReady,
    /// The host asked for more frames than the graph was configured for.
    FrameLimit {
        /// Frames requested.
        frames: usize,
        /// Configured `max_frames`.
        limit: usize,
    },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processor(err) => write!(f, "processor error: {err}"),
            Self::Busy => f.write_str("processor busy"),
            Self::NotReady => f.write_str("processor not initialized"),
            Self::FrameLimit { frames, limit } => {
                write!(f, "{frames} frames requested, limit is {limit}")
            }
        }
    }
}

/// One render failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFailure {
    /// Render cycle the failure happened in.
    pub cycle: u64,
    /// Failing node, or `None` for cycle-wide failures.
    pub node: Option<NodeId>,
    /// What went wrong.
    pub kind: FailureKind,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "cycle {}: node {node}: {}", self.cycle, self.kind),
            None => write!(f, "cycle {}: {}", self.cycle, self.kind),
        }
    }
}

/// Maximum failures recorded per cycle. Further failures are only counted.
pub const MAX_FAILURES_PER_CYCLE: usize = 64;

/// Fixed-capacity per-cycle failure log.
#[derive(Debug)]
pub(crate) struct FailureLog {
    entries: Vec<RenderFailure>,
    overflow: usize,
}

impl FailureLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_FAILURES_PER_CYCLE),
            overflow: 0,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.overflow = 0;
    }

    pub fn push(&mut self, failure: RenderFailure) {
        if self.entries.len() < self.entries.capacity() {
            self.entries.push(failure);
        } else {
            self.overflow += 1;
        }
    }

    pub fn as_slice(&self) -> &[RenderFailure] {
        &self.entries
    }

    /// Failures recorded plus those that did not fit.
    pub fn total(&self) -> usize {
        self.entries.len() + self.overflow
    }
}
