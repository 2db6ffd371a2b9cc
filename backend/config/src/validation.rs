//! Config validation: schema checks with user-friendly error messages.

use std::collections::HashSet;

use thiserror::Error;

use crate::schema::PulseConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PulseConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_buffer(config, &mut report);
    validate_session(config, &mut report);
    validate_agents(config, &mut report);
    report
}

fn validate_buffer(config: &PulseConfig, report: &mut ValidationReport) {
    if config.buffer.capacity == 0 {
        report.error("buffer.capacity", "must be at least 1");
    }
    if config.buffer.max_payload_bytes == 0 {
        report.error("buffer.max_payload_bytes", "must be at least 1");
    }
}

fn validate_session(config: &PulseConfig, report: &mut ValidationReport) {
    if config.session.fanout_capacity == 0 {
        report.error("session.fanout_capacity", "must be at least 1");
    }
    if config.session.lag_disconnect_threshold == 0 {
        report.warn(
            "session.lag_disconnect_threshold",
            "0 disconnects a session on its first overflow",
        );
    }
}

fn validate_agents(config: &PulseConfig, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (i, agent) in config.agents.iter().enumerate() {
        if agent.id.is_empty() {
            report.error(format!("agents[{i}].id"), "must not be empty");
        }
        if agent.id == agentpulse_core::SYSTEM_AGENT {
            report.error(
                format!("agents[{i}].id"),
                "'system' is reserved for lifecycle events",
            );
        }
        if !seen.insert(agent.id.clone()) {
            report.error(format!("agents[{i}].id"), format!("duplicate id '{}'", agent.id));
        }
        if agent.name.is_empty() {
            report.warn(format!("agents[{i}].name"), "empty display name");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AgentEntry;

    #[test]
    fn test_default_config_valid() {
        let report = validate(&PulseConfig::default());
        assert!(report.is_valid());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = PulseConfig::default();
        config.buffer.capacity = 0;
        let report = validate(&config);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "buffer.capacity");
    }

    #[test]
    fn test_duplicate_roster_ids_rejected() {
        let mut config = PulseConfig::default();
        config.agents = vec![
            AgentEntry {
                id: "a1".into(),
                name: "One".into(),
            },
            AgentEntry {
                id: "a1".into(),
                name: "One Again".into(),
            },
        ];
        let report = validate(&config);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_reserved_system_id_rejected() {
        let mut config = PulseConfig::default();
        config.agents = vec![AgentEntry {
            id: "system".into(),
            name: "Nope".into(),
        }];
        assert!(!validate(&config).is_valid());
    }
}
