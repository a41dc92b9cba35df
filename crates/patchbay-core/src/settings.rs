//! Engine settings shared by a graph and its sub-graphs.

use crate::processor::StreamFormat;

/// Rendering parameters fixed at graph creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphSettings {
    /// Sample rate in Hz passed to every processor at initialize.
    pub sample_rate: f64,
    /// Largest block a single render call may request. Port buffers are
    /// preallocated to this size.
    pub max_frames: usize,
    /// Capacity of the render-failure channel. Failures beyond it are counted
    /// and dropped.
    pub failure_queue_capacity: usize,
}

impl GraphSettings {
    /// The stream format handed to processors.
    pub fn format(&self) -> StreamFormat {
        StreamFormat {
            sample_rate: self.sample_rate,
            max_frames: self.max_frames,
        }
    }
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_frames: 512,
            failure_queue_capacity: 64,
        }
    }
}
