//! The processor interface every node implements.
//!
//! A [`NodeProcessor`] is the graph's view of one processing unit. The graph
//! drives it through the lifecycle (`open` → `initialize` → `start`, and back)
//! from control threads, and calls [`render`](NodeProcessor::render) from the
//! single render thread once per cycle.
//!
//! # Real-Time Safety
//!
//! `render` runs on the render thread. Implementations must not allocate, lock
//! with unbounded waits, or perform I/O there. Everything a processor needs while
//! rendering should be prepared in [`initialize`](NodeProcessor::initialize),
//! which receives the [`StreamFormat`] including the largest block size the
//! graph will ever request.

use crate::error::{ProcessorError, RenderError};

/// Format negotiated at initialize time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Largest number of frames a single render call will request.
    pub max_frames: usize,
}

/// Per-cycle information passed to [`NodeProcessor::render`].
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Frames to produce this cycle.
    pub frames: usize,
    /// Monotonic render cycle counter, starting at 0.
    pub cycle: u64,
    /// Channels supplied by the host for this cycle.
    pub host_inputs: &'a [&'a [f32]],
}

impl RenderContext<'_> {
    /// Returns host input channel `channel`, trimmed to this cycle's frame count.
    pub fn host_input(&self, channel: usize) -> Option<&[f32]> {
        self.host_inputs
            .get(channel)
            .map(|ch| &ch[..self.frames.min(ch.len())])
    }
}

#[derive(Clone, Copy)]
enum InputSource<'a> {
    Pool {
        pool: &'a [f32],
        stride: usize,
        ports: &'a [Option<usize>],
    },
    Slices(&'a [Option<&'a [f32]>]),
}

/// Read-only view of a node's input ports for one cycle.
///
/// Port `i` is `None` when nothing is connected to it.
#[derive(Clone, Copy)]
pub struct Inputs<'a> {
    source: InputSource<'a>,
    frames: usize,
}

impl<'a> Inputs<'a> {
    /// Inputs backed by a flat buffer pool, each connected port naming the
    /// offset of its source buffer in units of `stride`.
    pub(crate) fn pooled(
        pool: &'a [f32],
        stride: usize,
        ports: &'a [Option<usize>],
        frames: usize,
    ) -> Self {
        Self {
            source: InputSource::Pool {
                pool,
                stride,
                ports,
            },
            frames,
        }
    }

    /// Inputs backed by explicit slices. Useful for driving a processor directly.
    pub fn from_slices(ports: &'a [Option<&'a [f32]>], frames: usize) -> Self {
        Self {
            source: InputSource::Slices(ports),
            frames,
        }
    }

    /// Number of input ports (connected or not).
    pub fn len(&self) -> usize {
        match self.source {
            InputSource::Pool { ports, .. } => ports.len(),
            InputSource::Slices(ports) => ports.len(),
        }
    }

    /// True when the node has no input ports.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames valid in every input this cycle.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns the signal arriving at `port`, or `None` when unconnected.
    pub fn get(&self, port: usize) -> Option<&'a [f32]> {
        match self.source {
            InputSource::Pool {
                pool,
                stride,
                ports,
            } => {
                let buffer = (*ports.get(port)?)?;
                let start = buffer * stride;
                pool.get(start..start + self.frames)
            }
            InputSource::Slices(ports) => {
                let slice = (*ports.get(port)?)?;
                Some(&slice[..self.frames.min(slice.len())])
            }
        }
    }

    /// Iterates over connected ports as `(port, signal)`.
    pub fn connected(&self) -> impl Iterator<Item = (usize, &'a [f32])> + '_ {
        (0..self.len()).filter_map(|port| self.get(port).map(|signal| (port, signal)))
    }
}

/// Mutable view of a node's output port buffers for one cycle.
///
/// Buffers are contiguous in memory, `stride` apart, and only the first
/// `frames` samples of each are exposed.
pub struct Outputs<'a> {
    data: &'a mut [f32],
    stride: usize,
    frames: usize,
}

impl<'a> Outputs<'a> {
    /// Wraps `data` as `data.len() / stride` port buffers.
    pub fn new(data: &'a mut [f32], stride: usize, frames: usize) -> Self {
        debug_assert!(frames <= stride);
        Self {
            data,
            stride,
            frames,
        }
    }

    /// Number of output ports.
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.stride).unwrap_or(0)
    }

    /// True when the node has no output ports.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames to fill this cycle.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns the buffer for `port`.
    pub fn get_mut(&mut self, port: usize) -> Option<&mut [f32]> {
        let start = port.checked_mul(self.stride)?;
        self.data.get_mut(start..start + self.frames)
    }

    /// Zeroes every output buffer.
    pub fn silence(&mut self) {
        for port in self.iter_mut() {
            port.fill(0.0);
        }
    }

    /// Iterates over every output buffer in port order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [f32]> + '_ {
        let frames = self.frames;
        self.data
            .chunks_exact_mut(self.stride.max(1))
            .map(move |chunk| &mut chunk[..frames])
    }
}

/// A processing unit driven by a [`Graph`](crate::Graph).
///
/// All lifecycle methods have no-op defaults. Only [`render`](Self::render)
/// must be implemented.
pub trait NodeProcessor: Send {
    /// Acquires instance resources. Called when the graph opens.
    fn open(&mut self) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Releases instance resources. Called when the graph closes or the node is removed.
    fn close(&mut self) {}

    /// Allocates render resources for `format`.
    fn initialize(&mut self, _format: &StreamFormat) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Releases render resources.
    fn uninitialize(&mut self) {}

    /// Begins producing data. Only the output node is started by the graph.
    fn start(&mut self) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Stops producing data.
    fn stop(&mut self) {}

    /// Number of output ports. Must not change once the node is initialized.
    fn output_count(&self) -> usize {
        1
    }

    /// Produces one cycle of output.
    ///
    /// Called on the render thread. On error the graph silences this node's
    /// outputs for the cycle and reports the failure.
    fn render(
        &mut self,
        ctx: &RenderContext<'_>,
        inputs: &Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), RenderError>;
}
