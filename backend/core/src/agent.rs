use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::PulseError;

/// Lifecycle state of a worker agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Inactive,
    Active,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Inactive => write!(f, "inactive"),
            AgentState::Active => write!(f, "active"),
        }
    }
}

/// A named worker agent tracked by the registry. Agents are created from the
/// roster at startup and are never destroyed during a session; only their
/// state toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub state: AgentState,
}

/// The current known set of agents and their lifecycle states.
///
/// All mutations go through an exclusive write lock; `list()` takes a read
/// lock only, so snapshots never block event ingestion.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<String, Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent in state `Inactive`.
    pub async fn register(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<(), PulseError> {
        let id = id.into();
        let mut agents = self.agents.write().await;
        if agents.contains_key(&id) {
            return Err(PulseError::DuplicateAgent(id));
        }
        debug!(agent_id = %id, "Agent registered");
        agents.insert(
            id.clone(),
            Agent {
                id,
                name: name.into(),
                state: AgentState::Inactive,
            },
        );
        Ok(())
    }

    /// Atomically update an agent's state, returning the previous state.
    ///
    /// A no-op transition (e.g. active -> active) still succeeds; the caller
    /// compares the returned state to decide whether a lifecycle event is due.
    pub async fn set_state(&self, id: &str, next: AgentState) -> Result<AgentState, PulseError> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| PulseError::UnknownAgent(id.to_string()))?;
        let previous = agent.state;
        agent.state = next;
        Ok(previous)
    }

    /// Snapshot of all agents, stable-ordered by id.
    pub async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<Agent> {
        self.agents.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}
