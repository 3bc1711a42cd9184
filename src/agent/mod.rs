//! Agent module - reasoning loop, session state, and the event stream

pub mod events;
pub mod runner;
pub mod state;

pub use events::{AgentEvent, PlanAggregates};
pub use runner::AgentLoop;
pub use state::AgentState;
