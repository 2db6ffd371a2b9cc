//! Environment variable overrides, applied on top of the loaded config file.

use std::collections::HashMap;

use tracing::warn;

use crate::schema::PulseConfig;

/// Apply `AGENTPULSE_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut PulseConfig) {
    apply_overrides_from(config, &std::env::vars().collect());
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_overrides_from(config: &mut PulseConfig, env: &HashMap<String, String>) {
    if let Some(bind) = env.get("AGENTPULSE_BIND") {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = env.get("AGENTPULSE_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %port, "Ignoring unparseable AGENTPULSE_PORT"),
        }
    }
    if let Some(capacity) = env.get("AGENTPULSE_BUFFER_CAPACITY") {
        match capacity.parse() {
            Ok(capacity) => config.buffer.capacity = capacity,
            Err(_) => warn!(value = %capacity, "Ignoring unparseable AGENTPULSE_BUFFER_CAPACITY"),
        }
    }
    if let Some(level) = env.get("AGENTPULSE_LOG_LEVEL") {
        config.logging.level = level.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let mut config = PulseConfig::default();
        let env: HashMap<String, String> = [
            ("AGENTPULSE_BIND", "127.0.0.1"),
            ("AGENTPULSE_PORT", "9001"),
            ("AGENTPULSE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        apply_overrides_from(&mut config, &env);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_port_ignored() {
        let mut config = PulseConfig::default();
        let env: HashMap<String, String> =
            [("AGENTPULSE_PORT".to_string(), "not-a-port".to_string())]
                .into_iter()
                .collect();

        apply_overrides_from(&mut config, &env);
        assert_eq!(config.server.port, 8000);
    }
}
