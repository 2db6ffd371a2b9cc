//! Event buffering and fan-out for AgentPulse.
//!
//! The hub decouples event producers from viewer delivery timing: `publish`
//! appends to a bounded in-memory log and hands the event to every subscriber
//! without waiting on network IO.

pub mod buffer;
pub mod control;
pub mod hub;

pub use buffer::{EventLogBuffer, Replay};
pub use control::ControlInterface;
pub use hub::{BroadcastHub, HubStats};
