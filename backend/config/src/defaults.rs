//! Built-in defaults, applied when a field is absent from the config file.

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Events retained for replay to reconnecting viewers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;
/// Largest accepted event payload, in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Per-session outbound queue bound.
pub const DEFAULT_FANOUT_CAPACITY: usize = 256;
/// Queue overflows tolerated before a session is forcibly disconnected.
pub const DEFAULT_LAG_DISCONNECT_THRESHOLD: u32 = 8;
/// How long the server waits for an optional resume handshake frame.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 500;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";
