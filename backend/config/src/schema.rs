//! AgentPulse runtime configuration schema, typed for serde TOML
//! deserialization.

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Root configuration for the AgentPulse service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub buffer: BufferConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Static agent roster registered at startup.
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Most recent events retained for replay (oldest evicted first).
    #[serde(default = "default_buffer_capacity")]
    pub capacity: usize,
    /// Payloads above this size are rejected with `PayloadTooLarge`.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bound on each viewer session's outbound queue.
    #[serde(default = "default_fanout_capacity")]
    pub fanout_capacity: usize,
    /// Queue overflows tolerated before the session is forcibly closed.
    #[serde(default = "default_lag_disconnect_threshold")]
    pub lag_disconnect_threshold: u32,
    /// Wait for the optional resume handshake frame, in milliseconds.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for rolling NDJSON log files.
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

/// One roster entry: an agent known at startup, initially inactive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEntry {
    pub id: String,
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_buffer_capacity(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fanout_capacity: default_fanout_capacity(),
            lag_disconnect_threshold: default_lag_disconnect_threshold(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

fn default_bind_address() -> String {
    defaults::DEFAULT_BIND_ADDRESS.to_string()
}

fn default_port() -> u16 {
    defaults::DEFAULT_PORT
}

fn default_buffer_capacity() -> usize {
    defaults::DEFAULT_BUFFER_CAPACITY
}

fn default_max_payload_bytes() -> usize {
    defaults::DEFAULT_MAX_PAYLOAD_BYTES
}

fn default_fanout_capacity() -> usize {
    defaults::DEFAULT_FANOUT_CAPACITY
}

fn default_lag_disconnect_threshold() -> u32 {
    defaults::DEFAULT_LAG_DISCONNECT_THRESHOLD
}

fn default_handshake_timeout_ms() -> u64 {
    defaults::DEFAULT_HANDSHAKE_TIMEOUT_MS
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_dir() -> String {
    defaults::DEFAULT_LOG_DIR.to_string()
}
