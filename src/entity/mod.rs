pub mod bird;
pub mod floor;
pub mod pipe;

pub use bird::Bird;
pub use floor::Floor;
pub use pipe::Pipe;

use serde::{Deserialize, Serialize};

/// Identifier of one agent within an episode
///
/// Agents are numbered by the order their controllers were handed to the
/// episode, so the id doubles as an index into the optimizer's population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(usize);

impl AgentId {
    /// Get the raw index (useful for debugging/serialization)
    pub fn raw(&self) -> usize {
        self.0
    }

    /// Create an AgentId from a population index
    pub fn from_raw(index: usize) -> Self {
        AgentId(index)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Agent({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_from_raw() {
        let id = AgentId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "Agent(42)");
    }

    #[test]
    fn test_agent_id_ordering() {
        assert!(AgentId::from_raw(1) < AgentId::from_raw(2));
    }
}
