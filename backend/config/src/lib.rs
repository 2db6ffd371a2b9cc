//! AgentPulse configuration: TOML schema, file IO, environment overrides,
//! and validation.

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::apply_env_overrides;
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{
    AgentEntry, BufferConfig, LoggingConfig, PulseConfig, ServerConfig, SessionConfig,
};
pub use validation::{validate, ValidationReport};
