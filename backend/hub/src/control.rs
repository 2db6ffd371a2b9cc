use std::sync::Arc;

use tracing::info;

use agentpulse_core::{AgentRegistry, AgentState, Event, PulseError, SYSTEM_AGENT};

use crate::hub::BroadcastHub;

/// Activate/deactivate commands: validates the agent, performs the state
/// transition, and publishes a lifecycle event when the state actually
/// changed. Registered viewers see lifecycle events through the same hub as
/// everything else.
pub struct ControlInterface {
    registry: Arc<AgentRegistry>,
    hub: Arc<BroadcastHub>,
}

impl ControlInterface {
    pub fn new(registry: Arc<AgentRegistry>, hub: Arc<BroadcastHub>) -> Self {
        Self { registry, hub }
    }

    /// `Ok(Some(event))` on a real transition, `Ok(None)` when the agent was
    /// already active.
    pub async fn activate(&self, agent_id: &str) -> Result<Option<Event>, PulseError> {
        self.transition(agent_id, AgentState::Active).await
    }

    /// `Ok(Some(event))` on a real transition, `Ok(None)` when the agent was
    /// already inactive.
    pub async fn deactivate(&self, agent_id: &str) -> Result<Option<Event>, PulseError> {
        self.transition(agent_id, AgentState::Inactive).await
    }

    async fn transition(
        &self,
        agent_id: &str,
        next: AgentState,
    ) -> Result<Option<Event>, PulseError> {
        let previous = self.registry.set_state(agent_id, next).await?;
        if previous == next {
            return Ok(None);
        }

        info!(agent_id, state = %next, "Agent state changed");
        let verb = match next {
            AgentState::Active => "activated",
            AgentState::Inactive => "deactivated",
        };
        let event = self
            .hub
            .publish(SYSTEM_AGENT, format!("agent {agent_id} {verb}"))
            .await?;
        Ok(Some(event))
    }
}
