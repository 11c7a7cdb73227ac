//! Reference audio graph driven by scheduled commands.
//!
//! The graph holds oscillator, gain, and lowpass nodes wired into a DAG that
//! ends at the device output. Nothing here knows about notes or envelopes;
//! callers shape the sound purely by scheduling automation on node params.
//!
//! # Architecture
//!
//! - [`GraphCommand`] is the only way to mutate a graph. Commands are `Copy`
//!   values, so a backend can hand them whole to another thread.
//! - [`GraphState`] applies commands and renders blocks. A realtime backend
//!   keeps two: a control-side mirror for queries and a render-side copy fed
//!   with the same commands in the same order.
//!
//! ```text
//!   osc ─┐
//!   osc ─┼─→ gain ─→ lowpass ─→ gain ─→ Output
//!   osc ─┘
//! ```

mod command;
mod node;
mod state;

pub use command::GraphCommand;
pub use node::{Destination, NodeId, NodeKind, ParamKind};
pub use state::{GraphError, GraphState};
