//! Core mesh logic: beliefs, agents, relevance-driven topology, routing.

pub mod agents;
pub mod beliefs;
pub mod config;
pub mod error;
pub mod output;
pub mod routing;
pub mod setup;

pub use agents::{into_handle, Agent, AgentHandle, AgentRegistry};
pub use beliefs::{Belief, BeliefNetwork, PropagationStrategy};
pub use config::MeshConfig;
pub use error::{BeliefError, MeshError};
pub use output::{MeshSnapshot, MessageJournal};
pub use routing::{MessageSystem, RelevanceMode, RelevanceRule, TopologyManager};
pub use setup::Scenario;
