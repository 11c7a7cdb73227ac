//! The graph model and its block renderer.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::automation::{ParamTimeline, TimelineError};
use crate::biquad::{Biquad, q_from_db};
use crate::oscillator::{Oscillator, Waveform};
use crate::pitch::cents_to_ratio;

use super::command::GraphCommand;
use super::node::{Destination, NodeId, NodeKind, ParamKind};

/// Errors raised when a [`GraphCommand`] cannot be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// The node does not exist (never created, or destroyed).
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A node with this handle already exists.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// The connection would feed a node's output back into itself.
    #[error("connecting {from} to {to} would create a cycle")]
    CycleDetected {
        /// Source node.
        from: NodeId,
        /// Destination node.
        to: NodeId,
    },

    /// The same connection already exists.
    #[error("edge from {0} to {1} already exists")]
    DuplicateEdge(NodeId, Destination),

    /// The node kind has no such parameter.
    #[error("{node} has no {param} parameter")]
    ParamNotFound {
        /// Node addressed.
        node: NodeId,
        /// Parameter requested.
        param: ParamKind,
    },

    /// Start, stop, or waveform change sent to a non-oscillator.
    #[error("{0} is not an oscillator")]
    NotAnOscillator(NodeId),

    /// Oscillators can be started once.
    #[error("{0} was already started")]
    AlreadyStarted(NodeId),

    /// The oscillator's stop time has already passed.
    #[error("{0} has already stopped")]
    AlreadyStopped(NodeId),

    /// Malformed automation event or time.
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

#[derive(Debug, Clone)]
enum Processor {
    Oscillator {
        osc: Oscillator,
        frequency: ParamTimeline,
        detune: ParamTimeline,
        start: Option<f64>,
        stop: Option<f64>,
    },
    Gain {
        gain: ParamTimeline,
    },
    Lowpass {
        filter: Biquad,
        frequency: ParamTimeline,
        q: ParamTimeline,
    },
}

impl Processor {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Oscillator { osc, .. } => NodeKind::Oscillator(osc.waveform()),
            Self::Gain { .. } => NodeKind::Gain,
            Self::Lowpass { .. } => NodeKind::Lowpass,
        }
    }

    fn timeline(&self, param: ParamKind) -> Option<&ParamTimeline> {
        match (self, param) {
            (Self::Oscillator { frequency, .. }, ParamKind::Frequency)
            | (Self::Lowpass { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (Self::Oscillator { detune, .. }, ParamKind::Detune) => Some(detune),
            (Self::Gain { gain }, ParamKind::Gain) => Some(gain),
            (Self::Lowpass { q, .. }, ParamKind::Q) => Some(q),
            _ => None,
        }
    }

    fn timeline_mut(&mut self, param: ParamKind) -> Option<&mut ParamTimeline> {
        match (self, param) {
            (Self::Oscillator { frequency, .. }, ParamKind::Frequency)
            | (Self::Lowpass { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (Self::Oscillator { detune, .. }, ParamKind::Detune) => Some(detune),
            (Self::Gain { gain }, ParamKind::Gain) => Some(gain),
            (Self::Lowpass { q, .. }, ParamKind::Q) => Some(q),
            _ => None,
        }
    }

    fn timelines_mut(&mut self) -> impl Iterator<Item = &mut ParamTimeline> {
        let (a, b) = match self {
            Self::Oscillator {
                frequency, detune, ..
            } => (frequency, Some(detune)),
            Self::Gain { gain } => (gain, None),
            Self::Lowpass { frequency, q, .. } => (frequency, Some(q)),
        };
        core::iter::once(a).chain(b)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    processor: Processor,
    outputs: Vec<Destination>,
    /// Summed input for the block being rendered
    input: Vec<f32>,
    output: Vec<f32>,
}

impl NodeData {
    fn new(processor: Processor) -> Self {
        Self {
            processor,
            outputs: Vec::new(),
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    fn process(&mut self, start_time: f64, sample_rate: f32) {
        let frames = self.input.len();
        let dt = 1.0 / f64::from(sample_rate);
        self.output.clear();
        self.output.resize(frames, 0.0);

        match &mut self.processor {
            Processor::Oscillator {
                osc,
                frequency,
                detune,
                start,
                stop,
            } => {
                for (i, sample) in self.output.iter_mut().enumerate() {
                    let t = start_time + i as f64 * dt;
                    let started = start.is_some_and(|s| t >= s);
                    let stopped = stop.is_some_and(|s| t >= s);
                    if started && !stopped {
                        osc.set_frequency(frequency.value_at(t) * cents_to_ratio(detune.value_at(t)));
                        *sample = osc.advance();
                    }
                }
            }
            Processor::Gain { gain } => {
                for (i, (out, &x)) in self.output.iter_mut().zip(&self.input).enumerate() {
                    let t = start_time + i as f64 * dt;
                    *out = x * gain.value_at(t);
                }
            }
            Processor::Lowpass {
                filter,
                frequency,
                q,
            } => {
                for (i, (out, &x)) in self.output.iter_mut().zip(&self.input).enumerate() {
                    let t = start_time + i as f64 * dt;
                    filter.set_lowpass(frequency.value_at(t), q_from_db(q.value_at(t)), sample_rate);
                    *out = filter.process(x);
                }
            }
        }
    }
}

fn validate_value(value: f32) -> Result<(), TimelineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TimelineError::NonFiniteValue(value))
    }
}

fn validate_time(time: f64) -> Result<(), TimelineError> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(TimelineError::InvalidTime(time))
    }
}

/// A complete audio graph: nodes, routing, and parameter timelines.
///
/// `GraphState` is a plain value. The control thread keeps one as a mirror
/// for queries; the render thread keeps another and calls
/// [`render`](Self::render) once per block. Both receive the same
/// [`GraphCommand`]s in the same order.
///
/// # Example
///
/// ```rust
/// use monovox_core::graph::{Destination, GraphCommand, GraphState, NodeId};
/// use monovox_core::Waveform;
///
/// let mut graph = GraphState::new(48000.0);
/// let osc = NodeId::new(0);
/// graph.apply(GraphCommand::CreateOscillator {
///     id: osc,
///     waveform: Waveform::Sine,
///     frequency: 440.0,
///     detune: 0.0,
/// }, 0.0).unwrap();
/// graph.apply(GraphCommand::Connect { from: osc, to: Destination::Output }, 0.0).unwrap();
/// graph.apply(GraphCommand::Start { node: osc, at: 0.0 }, 0.0).unwrap();
///
/// let mut block = [0.0f32; 64];
/// graph.render(&mut block, 0.0);
/// assert!(block.iter().any(|s| s.abs() > 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct GraphState {
    sample_rate: f32,
    nodes: BTreeMap<NodeId, NodeData>,
    /// Topological render order, rebuilt lazily after structural changes
    plan: Vec<NodeId>,
    plan_dirty: bool,
}

impl GraphState {
    /// Empty graph rendering at `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            nodes: BTreeMap::new(),
            plan: Vec::new(),
            plan_dirty: false,
        }
    }

    /// Render sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `node` exists.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Handles of all live nodes in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Kind of `node`, if it exists.
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.processor.kind())
    }

    /// Waveform of an oscillator node.
    pub fn waveform(&self, node: NodeId) -> Option<Waveform> {
        match self.kind(node)? {
            NodeKind::Oscillator(waveform) => Some(waveform),
            _ => None,
        }
    }

    /// Outgoing connections of `node`.
    pub fn outputs_of(&self, node: NodeId) -> Option<&[Destination]> {
        self.nodes.get(&node).map(|n| n.outputs.as_slice())
    }

    /// The timeline driving `param` on `node`.
    pub fn timeline(&self, node: NodeId, param: ParamKind) -> Result<&ParamTimeline, GraphError> {
        self.nodes
            .get(&node)
            .ok_or(GraphError::NodeNotFound(node))?
            .processor
            .timeline(param)
            .ok_or(GraphError::ParamNotFound { node, param })
    }

    /// Value of `param` on `node` at absolute time `at`.
    pub fn param_value(&self, node: NodeId, param: ParamKind, at: f64) -> Result<f32, GraphError> {
        Ok(self.timeline(node, param)?.value_at(at))
    }

    /// Scheduled stop time of an oscillator.
    pub fn stop_time(&self, node: NodeId) -> Option<f64> {
        match self.nodes.get(&node)?.processor {
            Processor::Oscillator { stop, .. } => stop,
            _ => None,
        }
    }

    /// Whether an oscillator is producing sound at `at`.
    pub fn is_playing(&self, node: NodeId, at: f64) -> bool {
        match self.nodes.get(&node).map(|n| &n.processor) {
            Some(Processor::Oscillator { start, stop, .. }) => {
                start.is_some_and(|s| at >= s) && !stop.is_some_and(|s| at >= s)
            }
            _ => false,
        }
    }

    /// Apply one command. `now` is the current clock time, used to decide
    /// whether an oscillator has already stopped.
    ///
    /// A failed command leaves the graph unchanged.
    pub fn apply(&mut self, command: GraphCommand, now: f64) -> Result<(), GraphError> {
        #[cfg(feature = "tracing")]
        tracing::trace!(?command, now, "graph_apply");

        match command {
            GraphCommand::CreateOscillator {
                id,
                waveform,
                frequency,
                detune,
            } => {
                validate_value(frequency)?;
                validate_value(detune)?;
                self.insert_node(
                    id,
                    Processor::Oscillator {
                        osc: Oscillator::new(self.sample_rate, waveform),
                        frequency: ParamTimeline::new(frequency),
                        detune: ParamTimeline::new(detune),
                        start: None,
                        stop: None,
                    },
                )
            }
            GraphCommand::CreateGain { id, gain } => {
                validate_value(gain)?;
                self.insert_node(
                    id,
                    Processor::Gain {
                        gain: ParamTimeline::new(gain),
                    },
                )
            }
            GraphCommand::CreateLowpass { id, frequency, q } => {
                validate_value(frequency)?;
                validate_value(q)?;
                self.insert_node(
                    id,
                    Processor::Lowpass {
                        filter: Biquad::new(),
                        frequency: ParamTimeline::new(frequency),
                        q: ParamTimeline::new(q),
                    },
                )
            }
            GraphCommand::Connect { from, to } => self.connect(from, to),
            GraphCommand::Disconnect { node } => {
                self.node_mut(node)?.outputs.clear();
                self.plan_dirty = true;
                #[cfg(feature = "tracing")]
                tracing::debug!("graph_disconnect: {node}");
                Ok(())
            }
            GraphCommand::Start { node, at } => {
                validate_time(at)?;
                match &mut self.node_mut(node)?.processor {
                    Processor::Oscillator { start, .. } => {
                        if start.is_some() {
                            return Err(GraphError::AlreadyStarted(node));
                        }
                        *start = Some(at);
                        Ok(())
                    }
                    _ => Err(GraphError::NotAnOscillator(node)),
                }
            }
            GraphCommand::Stop { node, at } => {
                validate_time(at)?;
                match &mut self.node_mut(node)?.processor {
                    Processor::Oscillator { stop, .. } => {
                        if stop.is_some_and(|s| s <= now) {
                            return Err(GraphError::AlreadyStopped(node));
                        }
                        *stop = Some(at);
                        Ok(())
                    }
                    _ => Err(GraphError::NotAnOscillator(node)),
                }
            }
            GraphCommand::Destroy { node } => {
                self.nodes
                    .remove(&node)
                    .ok_or(GraphError::NodeNotFound(node))?;
                let target = Destination::Node(node);
                for other in self.nodes.values_mut() {
                    other.outputs.retain(|d| *d != target);
                }
                self.plan_dirty = true;
                #[cfg(feature = "tracing")]
                tracing::debug!("graph_remove: {node}");
                Ok(())
            }
            GraphCommand::SetWaveform { node, waveform } => {
                match &mut self.node_mut(node)?.processor {
                    Processor::Oscillator { osc, .. } => {
                        osc.set_waveform(waveform);
                        Ok(())
                    }
                    _ => Err(GraphError::NotAnOscillator(node)),
                }
            }
            GraphCommand::Automate { node, param, event } => {
                self.timeline_mut(node, param)?.insert(event)?;
                Ok(())
            }
            GraphCommand::CancelScheduled { node, param, from } => {
                validate_time(from)?;
                self.timeline_mut(node, param)?.cancel_scheduled_values(from);
                Ok(())
            }
        }
    }

    /// Collapse automation that lies entirely before `time` on every node.
    pub fn prune(&mut self, time: f64) {
        for node in self.nodes.values_mut() {
            for timeline in node.processor.timelines_mut() {
                timeline.prune_before(time);
            }
        }
    }

    /// Render one block starting at absolute time `start_time` into `out`.
    ///
    /// `out` is overwritten with the sum of everything connected to
    /// [`Destination::Output`].
    pub fn render(&mut self, out: &mut [f32], start_time: f64) {
        out.fill(0.0);
        if self.plan_dirty {
            self.rebuild_plan();
        }

        let frames = out.len();
        for node in self.nodes.values_mut() {
            node.input.clear();
            node.input.resize(frames, 0.0);
        }

        for index in 0..self.plan.len() {
            let id = self.plan[index];
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            node.process(start_time, self.sample_rate);
            let output = core::mem::take(&mut node.output);
            let outputs = core::mem::take(&mut node.outputs);

            for destination in &outputs {
                let sink = match destination {
                    Destination::Output => Some(&mut *out),
                    Destination::Node(target) => {
                        self.nodes.get_mut(target).map(|t| t.input.as_mut_slice())
                    }
                };
                if let Some(sink) = sink {
                    for (acc, &x) in sink.iter_mut().zip(&output) {
                        *acc += x;
                    }
                }
            }

            if let Some(node) = self.nodes.get_mut(&id) {
                node.output = output;
                node.outputs = outputs;
            }
        }
    }

    fn insert_node(&mut self, id: NodeId, processor: Processor) -> Result<(), GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: {:?} node {id}", processor.kind());
        self.nodes.insert(id, NodeData::new(processor));
        self.plan_dirty = true;
        Ok(())
    }

    fn connect(&mut self, from: NodeId, to: Destination) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::NodeNotFound(from));
        }
        if let Destination::Node(target) = to {
            if !self.nodes.contains_key(&target) {
                return Err(GraphError::NodeNotFound(target));
            }
            // A cycle exists if `target` can already reach `from`.
            if target == from || self.can_reach(target, from) {
                return Err(GraphError::CycleDetected { from, to: target });
            }
        }
        let node = self.node_mut(from)?;
        if node.outputs.contains(&to) {
            return Err(GraphError::DuplicateEdge(from, to));
        }
        node.outputs.push(to);
        self.plan_dirty = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {from} → {to}");
        Ok(())
    }

    fn can_reach(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = Vec::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.outputs.iter().filter_map(|d| match d {
                    Destination::Node(next) => Some(*next),
                    Destination::Output => None,
                }));
            }
        }
        false
    }

    fn rebuild_plan(&mut self) {
        let mut indegree: BTreeMap<NodeId, usize> = self.nodes.keys().map(|&id| (id, 0)).collect();
        for node in self.nodes.values() {
            for destination in &node.outputs {
                if let Destination::Node(target) = destination {
                    if let Some(count) = indegree.get_mut(target) {
                        *count += 1;
                    }
                }
            }
        }

        let mut ready: Vec<NodeId> = indegree
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&id, _)| id)
            .collect();
        self.plan.clear();

        while let Some(id) = ready.pop() {
            self.plan.push(id);
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            for destination in &node.outputs {
                let Destination::Node(target) = destination else {
                    continue;
                };
                if let Some(count) = indegree.get_mut(target) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(*target);
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_sort: {} nodes in topo order", self.plan.len());
        self.plan_dirty = false;
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeData, GraphError> {
        self.nodes.get_mut(&node).ok_or(GraphError::NodeNotFound(node))
    }

    fn timeline_mut(
        &mut self,
        node: NodeId,
        param: ParamKind,
    ) -> Result<&mut ParamTimeline, GraphError> {
        self.node_mut(node)?
            .processor
            .timeline_mut(param)
            .ok_or(GraphError::ParamNotFound { node, param })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::AutomationEvent;

    const SR: f32 = 48000.0;

    fn osc(graph: &mut GraphState, raw: u32, frequency: f32) -> NodeId {
        let id = NodeId::new(raw);
        graph
            .apply(
                GraphCommand::CreateOscillator {
                    id,
                    waveform: Waveform::Sine,
                    frequency,
                    detune: 0.0,
                },
                0.0,
            )
            .unwrap();
        id
    }

    fn gain(graph: &mut GraphState, raw: u32, value: f32) -> NodeId {
        let id = NodeId::new(raw);
        graph
            .apply(GraphCommand::CreateGain { id, gain: value }, 0.0)
            .unwrap();
        id
    }

    fn connect(graph: &mut GraphState, from: NodeId, to: impl Into<Destination>) {
        graph
            .apply(GraphCommand::Connect { from, to: to.into() }, 0.0)
            .unwrap();
    }

    fn peak(block: &[f32]) -> f32 {
        block.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn unstarted_oscillator_is_silent() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        connect(&mut graph, o, Destination::Output);
        let mut block = [1.0f32; 128];
        graph.render(&mut block, 0.0);
        assert_eq!(peak(&block), 0.0);
    }

    #[test]
    fn gain_scales_signal() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        let g = gain(&mut graph, 1, 0.5);
        connect(&mut graph, o, g);
        connect(&mut graph, g, Destination::Output);
        graph.apply(GraphCommand::Start { node: o, at: 0.0 }, 0.0).unwrap();

        let mut block = vec![0.0f32; 4800];
        graph.render(&mut block, 0.0);
        let p = peak(&block);
        assert!((p - 0.5).abs() < 0.01, "peak {p}");
    }

    #[test]
    fn fan_in_sums() {
        let mut graph = GraphState::new(SR);
        let a = osc(&mut graph, 0, 100.0);
        let b = osc(&mut graph, 1, 100.0);
        connect(&mut graph, a, Destination::Output);
        connect(&mut graph, b, Destination::Output);
        for id in [a, b] {
            graph.apply(GraphCommand::Start { node: id, at: 0.0 }, 0.0).unwrap();
        }
        let mut block = vec![0.0f32; 4800];
        graph.render(&mut block, 0.0);
        assert!(peak(&block) > 1.9);
    }

    #[test]
    fn stop_silences_from_stop_time() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        connect(&mut graph, o, Destination::Output);
        graph.apply(GraphCommand::Start { node: o, at: 0.0 }, 0.0).unwrap();
        graph.apply(GraphCommand::Stop { node: o, at: 0.01 }, 0.0).unwrap();

        let mut block = vec![0.0f32; 960];
        graph.render(&mut block, 0.0);
        assert!(peak(&block[..480]) > 0.5);
        assert_eq!(peak(&block[482..]), 0.0);
        assert!(!graph.is_playing(o, 0.02));
    }

    #[test]
    fn non_finite_create_is_rejected() {
        let mut graph = GraphState::new(SR);
        let command = GraphCommand::CreateOscillator {
            id: NodeId::new(0),
            waveform: Waveform::Sawtooth,
            frequency: f32::INFINITY,
            detune: 0.0,
        };
        assert!(matches!(
            graph.apply(command, 0.0),
            Err(GraphError::Timeline(TimelineError::NonFiniteValue(_)))
        ));
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn ultrasonic_oscillator_leaves_filter_usable() {
        let mut graph = GraphState::new(SR);
        let hot = NodeId::new(0);
        graph
            .apply(
                GraphCommand::CreateOscillator {
                    id: hot,
                    waveform: Waveform::Sawtooth,
                    frequency: 118_000.0,
                    detune: 0.0,
                },
                0.0,
            )
            .unwrap();
        let filter = NodeId::new(1);
        graph
            .apply(GraphCommand::CreateLowpass { id: filter, frequency: 2400.0, q: 2.0 }, 0.0)
            .unwrap();
        connect(&mut graph, hot, filter);
        connect(&mut graph, filter, Destination::Output);
        graph.apply(GraphCommand::Start { node: hot, at: 0.0 }, 0.0).unwrap();
        graph.apply(GraphCommand::Stop { node: hot, at: 0.1 }, 0.0).unwrap();
        let normal = osc(&mut graph, 2, 110.0);
        connect(&mut graph, normal, filter);
        graph.apply(GraphCommand::Start { node: normal, at: 0.1 }, 0.0).unwrap();

        let mut block = vec![0.0f32; 24000];
        graph.render(&mut block, 0.0);
        assert!(block.iter().all(|s| s.is_finite()));
        assert!(peak(&block) < 4.0, "peak {}", peak(&block));
        assert!(peak(&block[12000..]) > 0.1);
    }

    #[test]
    fn stopping_twice_after_stop_time_fails() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        graph.apply(GraphCommand::Start { node: o, at: 0.0 }, 0.0).unwrap();
        graph.apply(GraphCommand::Stop { node: o, at: 0.5 }, 0.0).unwrap();
        // Rescheduling before the stop time is fine.
        graph.apply(GraphCommand::Stop { node: o, at: 0.4 }, 0.1).unwrap();
        assert_eq!(
            graph.apply(GraphCommand::Stop { node: o, at: 1.0 }, 0.6),
            Err(GraphError::AlreadyStopped(o))
        );
    }

    #[test]
    fn start_twice_fails() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        graph.apply(GraphCommand::Start { node: o, at: 0.0 }, 0.0).unwrap();
        assert_eq!(
            graph.apply(GraphCommand::Start { node: o, at: 0.0 }, 0.0),
            Err(GraphError::AlreadyStarted(o))
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = GraphState::new(SR);
        let a = gain(&mut graph, 0, 1.0);
        let b = gain(&mut graph, 1, 1.0);
        connect(&mut graph, a, b);
        assert_eq!(
            graph.apply(GraphCommand::Connect { from: b, to: a.into() }, 0.0),
            Err(GraphError::CycleDetected { from: b, to: a })
        );
        assert!(matches!(
            graph.apply(GraphCommand::Connect { from: a, to: a.into() }, 0.0),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn duplicate_edges_and_nodes_are_rejected() {
        let mut graph = GraphState::new(SR);
        let a = gain(&mut graph, 0, 1.0);
        connect(&mut graph, a, Destination::Output);
        assert_eq!(
            graph.apply(GraphCommand::Connect { from: a, to: Destination::Output }, 0.0),
            Err(GraphError::DuplicateEdge(a, Destination::Output))
        );
        assert_eq!(
            graph.apply(GraphCommand::CreateGain { id: a, gain: 0.0 }, 0.0),
            Err(GraphError::DuplicateNode(a))
        );
    }

    #[test]
    fn destroy_removes_incoming_edges() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        let g = gain(&mut graph, 1, 1.0);
        connect(&mut graph, o, g);
        graph.apply(GraphCommand::Destroy { node: g }, 0.0).unwrap();
        assert_eq!(graph.outputs_of(o), Some(&[][..]));
        assert!(!graph.contains(g));
        assert_eq!(
            graph.apply(GraphCommand::Destroy { node: g }, 0.0),
            Err(GraphError::NodeNotFound(g))
        );
    }

    #[test]
    fn disconnect_clears_outgoing_edges() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        connect(&mut graph, o, Destination::Output);
        graph.apply(GraphCommand::Start { node: o, at: 0.0 }, 0.0).unwrap();
        graph.apply(GraphCommand::Disconnect { node: o }, 0.0).unwrap();
        let mut block = [0.0f32; 256];
        graph.render(&mut block, 0.0);
        assert_eq!(peak(&block), 0.0);
    }

    #[test]
    fn automation_reaches_the_param() {
        let mut graph = GraphState::new(SR);
        let g = gain(&mut graph, 0, 0.0);
        graph
            .apply(
                GraphCommand::Automate {
                    node: g,
                    param: ParamKind::Gain,
                    event: AutomationEvent::LinearRamp {
                        end_time: 1.0,
                        value: 1.0,
                    },
                },
                0.0,
            )
            .unwrap();
        let mid = graph.param_value(g, ParamKind::Gain, 0.5).unwrap();
        assert!((mid - 0.5).abs() < 1e-6);

        graph
            .apply(
                GraphCommand::CancelScheduled {
                    node: g,
                    param: ParamKind::Gain,
                    from: 0.0,
                },
                0.0,
            )
            .unwrap();
        assert_eq!(graph.param_value(g, ParamKind::Gain, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn wrong_param_and_kind_are_reported() {
        let mut graph = GraphState::new(SR);
        let g = gain(&mut graph, 0, 1.0);
        assert_eq!(
            graph.param_value(g, ParamKind::Q, 0.0),
            Err(GraphError::ParamNotFound {
                node: g,
                param: ParamKind::Q
            })
        );
        assert_eq!(
            graph.apply(GraphCommand::Start { node: g, at: 0.0 }, 0.0),
            Err(GraphError::NotAnOscillator(g))
        );
    }

    #[test]
    fn lowpass_attenuates_high_oscillator() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 8000.0);
        let f = NodeId::new(1);
        graph
            .apply(
                GraphCommand::CreateLowpass {
                    id: f,
                    frequency: 200.0,
                    q: 0.0,
                },
                0.0,
            )
            .unwrap();
        connect(&mut graph, o, f);
        connect(&mut graph, f, Destination::Output);
        graph.apply(GraphCommand::Start { node: o, at: 0.0 }, 0.0).unwrap();

        let mut block = vec![0.0f32; 4800];
        graph.render(&mut block, 0.0);
        assert!(peak(&block[2400..]) < 0.05);
    }

    #[test]
    fn waveform_switch_is_visible() {
        let mut graph = GraphState::new(SR);
        let o = osc(&mut graph, 0, 440.0);
        graph
            .apply(
                GraphCommand::SetWaveform {
                    node: o,
                    waveform: Waveform::Square,
                },
                0.0,
            )
            .unwrap();
        assert_eq!(graph.waveform(o), Some(Waveform::Square));
    }
}
