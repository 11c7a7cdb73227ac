//! Control-thread graph handle and audio-thread renderer.
//!
//! ```text
//!  control thread                         audio thread
//! ┌──────────────────────┐   bounded    ┌──────────────────────┐
//! │ RealtimeGraph        │   channel    │ GraphRenderer        │
//! │  mirror: GraphState  │ ───────────→ │  graph: GraphState   │
//! │  (validates, answers │ GraphCommand │  drains, renders,    │
//! │   live-value queries)│              │  prunes, ticks clock │
//! └──────────┬───────────┘              └──────────┬───────────┘
//!            └──────────── SharedClock ────────────┘
//!                 frames, suspended, attached
//! ```
//!
//! Commands cross the thread boundary whole, so the renderer never sees a
//! half-written ramp. The mirror applies each command first, so a command the
//! graph would reject never reaches the audio thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use monovox_core::graph::{GraphCommand, GraphState, NodeId, ParamKind};
use monovox_engine::{AudioGraphBackend, BackendError};

/// Commands the queue holds before [`BackendError::QueueFull`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug)]
struct SharedClock {
    sample_rate: f32,
    frames: AtomicU64,
    suspended: AtomicBool,
    attached: AtomicBool,
}

impl SharedClock {
    fn seconds(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / f64::from(self.sample_rate)
    }
}

/// Control-side [`AudioGraphBackend`] feeding a [`GraphRenderer`].
///
/// Starts suspended, like an output device that has not been started by a
/// user gesture; the engine resumes it on the first note.
#[derive(Debug)]
pub struct RealtimeGraph {
    mirror: GraphState,
    commands: Sender<GraphCommand>,
    clock: Arc<SharedClock>,
    next_id: u32,
}

/// Audio-side half: owns the graph that actually renders.
#[derive(Debug)]
pub struct GraphRenderer {
    graph: GraphState,
    commands: Receiver<GraphCommand>,
    clock: Arc<SharedClock>,
    scratch: Vec<f32>,
    rejected: u64,
}

impl RealtimeGraph {
    /// Create a linked graph handle and renderer.
    pub fn new(sample_rate: f32) -> (Self, GraphRenderer) {
        Self::with_capacity(sample_rate, DEFAULT_QUEUE_CAPACITY)
    }

    /// Like [`new`](Self::new) with an explicit queue capacity.
    pub fn with_capacity(sample_rate: f32, capacity: usize) -> (Self, GraphRenderer) {
        let (tx, rx) = bounded(capacity);
        let clock = Arc::new(SharedClock {
            sample_rate,
            frames: AtomicU64::new(0),
            suspended: AtomicBool::new(true),
            attached: AtomicBool::new(true),
        });
        let graph = Self {
            mirror: GraphState::new(sample_rate),
            commands: tx,
            clock: Arc::clone(&clock),
            next_id: 0,
        };
        let renderer = GraphRenderer {
            graph: GraphState::new(sample_rate),
            commands: rx,
            clock,
            scratch: Vec::with_capacity(4096),
            rejected: 0,
        };
        (graph, renderer)
    }

    /// Suspend output; the renderer emits silence and the clock stops.
    pub fn suspend(&self) {
        self.clock.suspended.store(true, Ordering::Release);
    }

    /// Whether the renderer still exists.
    pub fn is_attached(&self) -> bool {
        self.clock.attached.load(Ordering::Acquire)
    }

    /// Commands waiting for the renderer.
    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    /// The control-side copy of the graph.
    pub fn mirror(&self) -> &GraphState {
        &self.mirror
    }
}

impl AudioGraphBackend for RealtimeGraph {
    fn current_time(&self) -> f64 {
        self.clock.seconds()
    }

    fn is_suspended(&self) -> bool {
        self.clock.suspended.load(Ordering::Acquire)
    }

    fn resume(&mut self) -> Result<(), BackendError> {
        if !self.is_attached() {
            return Err(BackendError::Unavailable("renderer has been dropped".into()));
        }
        self.clock.suspended.store(false, Ordering::Release);
        tracing::debug!(time = self.current_time(), "output resumed");
        Ok(())
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn submit(&mut self, command: GraphCommand) -> Result<(), BackendError> {
        if !self.is_attached() {
            return Err(BackendError::Unavailable("renderer has been dropped".into()));
        }
        // Single producer: a queue with room stays that way until we send.
        if self.commands.is_full() {
            return Err(BackendError::QueueFull);
        }

        let now = self.current_time();
        self.mirror.prune(now);
        self.mirror.apply(command, now)?;

        self.commands.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => BackendError::QueueFull,
            TrySendError::Disconnected(_) => {
                BackendError::Unavailable("renderer has been dropped".into())
            }
        })
    }

    fn param_value(&self, node: NodeId, param: ParamKind, at: f64) -> Result<f32, BackendError> {
        Ok(self.mirror.param_value(node, param, at)?)
    }
}

impl GraphRenderer {
    /// Render one mono block.
    ///
    /// Drains pending commands, then renders and advances the clock unless
    /// suspended, in which case `out` is silence.
    pub fn render(&mut self, out: &mut [f32]) {
        let now = self.clock.seconds();
        while let Ok(command) = self.commands.try_recv() {
            if self.graph.apply(command, now).is_err() {
                self.rejected += 1;
            }
        }

        if self.clock.suspended.load(Ordering::Acquire) {
            out.fill(0.0);
            return;
        }

        self.graph.render(out, now);
        let frames = self
            .clock
            .frames
            .fetch_add(out.len() as u64, Ordering::AcqRel)
            + out.len() as u64;
        self.graph
            .prune(frames as f64 / f64::from(self.clock.sample_rate));
    }

    /// Render into an interleaved buffer, copying the mono signal to every
    /// channel.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = data.len() / channels;
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(frames, 0.0);
        self.render(&mut scratch);
        for (frame, &sample) in data.chunks_mut(channels).zip(scratch.iter()) {
            frame.fill(sample);
        }
        self.scratch = scratch;
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.clock.sample_rate
    }

    /// Clock time in seconds.
    pub fn time(&self) -> f64 {
        self.clock.seconds()
    }

    /// Commands the render-side graph refused, typically a stop that arrived
    /// after the oscillator had already stopped.
    pub fn rejected_commands(&self) -> u64 {
        self.rejected
    }

    /// The render-side graph.
    pub fn graph(&self) -> &GraphState {
        &self.graph
    }
}

impl Drop for GraphRenderer {
    fn drop(&mut self) {
        self.clock.attached.store(false, Ordering::Release);
    }
}
