//! Telemetry and structured logging for AgentPulse.
//!
//! Handles JSON output generation, file rotation, and the event stream trace
//! log.

pub mod event_logger;
pub mod logger;

pub use event_logger::StreamEventLogger;
pub use logger::init_logger;
