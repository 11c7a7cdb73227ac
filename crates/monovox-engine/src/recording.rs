//! Deterministic backend with a manual clock.

use monovox_core::graph::{GraphCommand, GraphState, NodeId, ParamKind};

use crate::backend::{AudioGraphBackend, BackendError};

/// In-memory [`AudioGraphBackend`] whose clock only moves when told to.
///
/// Every accepted command is applied to a [`GraphState`] and appended to a
/// log, so tests can assert both on scheduled values and on exactly what was
/// issued.
///
/// # Example
///
/// ```rust
/// use monovox_engine::{AudioGraphBackend, RecordingBackend};
///
/// let mut backend = RecordingBackend::new();
/// let vca = backend.create_gain(0.0).unwrap();
/// assert_eq!(backend.commands().len(), 1);
///
/// backend.advance(0.5);
/// assert_eq!(backend.current_time(), 0.5);
/// # let _ = vca;
/// ```
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    graph: GraphState,
    time: f64,
    suspended: bool,
    fail_resume: bool,
    resume_calls: usize,
    next_id: u32,
    log: Vec<GraphCommand>,
}

impl RecordingBackend {
    /// Running backend at time zero.
    pub fn new() -> Self {
        Self {
            graph: GraphState::new(48000.0),
            time: 0.0,
            suspended: false,
            fail_resume: false,
            resume_calls: 0,
            next_id: 0,
            log: Vec::new(),
        }
    }

    /// Backend that starts suspended, like an output device before the first
    /// user gesture.
    pub fn suspended() -> Self {
        Self {
            suspended: true,
            ..Self::new()
        }
    }

    /// Make every subsequent [`resume`](AudioGraphBackend::resume) fail.
    pub fn set_fail_resume(&mut self, fail: bool) {
        self.fail_resume = fail;
    }

    /// Suspend the clock.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Move the clock forward. Ignored while suspended.
    pub fn advance(&mut self, seconds: f64) {
        if !self.suspended {
            self.time += seconds;
        }
    }

    /// Jump the clock to an absolute time. Ignored while suspended.
    pub fn set_time(&mut self, time: f64) {
        if !self.suspended {
            self.time = time;
        }
    }

    /// Every command accepted so far, in order.
    pub fn commands(&self) -> &[GraphCommand] {
        &self.log
    }

    /// Drain the command log.
    pub fn take_commands(&mut self) -> Vec<GraphCommand> {
        std::mem::take(&mut self.log)
    }

    /// How many times resume was attempted.
    pub fn resume_calls(&self) -> usize {
        self.resume_calls
    }

    /// The graph as built by the accepted commands.
    pub fn graph(&self) -> &GraphState {
        &self.graph
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraphBackend for RecordingBackend {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) -> Result<(), BackendError> {
        self.resume_calls += 1;
        if self.fail_resume {
            return Err(BackendError::Unavailable("resume refused".into()));
        }
        self.suspended = false;
        Ok(())
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn submit(&mut self, command: GraphCommand) -> Result<(), BackendError> {
        self.graph.apply(command, self.time)?;
        self.log.push(command);
        Ok(())
    }

    fn param_value(&self, node: NodeId, param: ParamKind, at: f64) -> Result<f32, BackendError> {
        Ok(self.graph.param_value(node, param, at)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monovox_core::Waveform;
    use monovox_core::graph::Destination;

    #[test]
    fn rejected_commands_are_not_logged() {
        let mut backend = RecordingBackend::new();
        assert!(backend.destroy(NodeId::new(42)).is_err());
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn clock_is_frozen_while_suspended() {
        let mut backend = RecordingBackend::suspended();
        backend.advance(1.0);
        assert_eq!(backend.current_time(), 0.0);
        backend.resume().unwrap();
        backend.advance(1.0);
        assert_eq!(backend.current_time(), 1.0);
    }

    #[test]
    fn failing_resume_keeps_suspension() {
        let mut backend = RecordingBackend::suspended();
        backend.set_fail_resume(true);
        assert!(matches!(backend.resume(), Err(BackendError::Unavailable(_))));
        assert!(backend.is_suspended());
        assert_eq!(backend.resume_calls(), 1);
    }

    #[test]
    fn stop_after_stop_time_reports_already_stopped() {
        let mut backend = RecordingBackend::new();
        let osc = backend.create_oscillator(Waveform::Sine, 440.0, 0.0).unwrap();
        backend.connect(osc, Destination::Output).unwrap();
        backend.start(osc, 0.0).unwrap();
        backend.stop(osc, 0.5).unwrap();
        backend.set_time(1.0);
        assert_eq!(backend.stop(osc, 1.0), Err(BackendError::AlreadyStopped(osc)));
    }

    #[test]
    fn node_ids_are_never_reused() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_gain(1.0).unwrap();
        backend.destroy(a).unwrap();
        let b = backend.create_gain(1.0).unwrap();
        assert_ne!(a, b);
    }
}
