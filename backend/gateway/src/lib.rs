//! AgentPulse gateway: accepts viewer connections, performs the resume
//! handshake, replays buffered history, and forwards live events with
//! per-session backpressure.

pub mod delivery;
pub mod server;
pub mod session;
pub mod ws_protocol;
pub mod ws_server;

pub use delivery::{Delivery, DeliveryCursor, LagOutcome};
pub use server::{start_server, GatewayState, SessionSettings};
pub use session::{SessionHandle, SessionPhase, SessionRegistry};
pub use ws_protocol::{ClientMessage, CommandAction, ResumeFrame, ServerMessage};
