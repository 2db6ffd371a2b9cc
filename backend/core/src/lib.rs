pub mod agent;
pub mod error;
pub mod event;

pub use agent::{Agent, AgentRegistry, AgentState};
pub use error::PulseError;
pub use event::{Event, Gap, SYSTEM_AGENT};
