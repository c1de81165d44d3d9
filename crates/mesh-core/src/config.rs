//! Configuration loading for the mesh.
//!
//! Settings come from a TOML file. Every section has defaults, so a partial
//! or empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::agents::Agent;
use crate::beliefs::PropagationStrategy;
use crate::routing::{RelevanceMode, TopologyManager};

/// Complete mesh configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Edge rule for topology rebuilds
    #[serde(default)]
    pub topology: TopologyConfig,
    /// How updates cascade through each agent's network
    #[serde(default)]
    pub propagation: PropagationConfig,
    /// Seeded driver settings
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl MeshConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The default configuration rendered as TOML.
    pub fn default_toml() -> Result<String, ConfigError> {
        Self::default().to_toml()
    }

    /// An empty topology manager using the configured relevance mode.
    pub fn topology_manager(&self) -> TopologyManager {
        TopologyManager::with_mode(self.topology.relevance_mode)
    }

    /// A fresh agent using the configured propagation strategy.
    pub fn new_agent(&self, id: impl Into<String>, name: impl Into<String>) -> Agent {
        Agent::with_strategy(id, name, self.propagation.strategy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub relevance_mode: RelevanceMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub strategy: PropagationStrategy,
}

/// Seeded scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// RNG seed; equal seeds give equal runs
    pub seed: u64,
    pub agent_count: usize,
    /// Beliefs seeded into each agent's network
    pub beliefs_per_agent: usize,
    /// Topics each agent follows as relevance rules
    pub rules_per_agent: usize,
    pub rounds: u32,
    /// Topic prefixes for generated propositions
    pub topics: Vec<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            agent_count: 8,
            beliefs_per_agent: 3,
            rules_per_agent: 2,
            rounds: 10,
            topics: ["Weather", "Sports", "Markets", "Science", "Politics"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MeshConfig::default();
        assert_eq!(config.topology.relevance_mode, RelevanceMode::Mutual);
        assert_eq!(config.propagation.strategy, PropagationStrategy::Copy);
        assert_eq!(config.scenario.seed, 42);
        assert_eq!(config.scenario.topics.len(), 5);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(MeshConfig::from_str("").unwrap(), MeshConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = MeshConfig::from_str(
            r#"
            [topology]
            relevance_mode = "either"

            [scenario]
            agent_count = 3
            topics = ["Weather"]
            "#,
        )
        .unwrap();

        assert_eq!(config.topology.relevance_mode, RelevanceMode::Either);
        assert_eq!(config.propagation.strategy, PropagationStrategy::Copy);
        assert_eq!(config.scenario.agent_count, 3);
        assert_eq!(config.scenario.rounds, 10);
        assert_eq!(config.scenario.topics, vec!["Weather"]);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = MeshConfig::from_str("[propagation]\nstrategy = \"max\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_default_toml_roundtrip() {
        let toml = MeshConfig::default_toml().unwrap();
        assert!(toml.contains("relevance_mode = \"mutual\""));
        assert!(toml.contains("strategy = \"copy\""));
        assert_eq!(MeshConfig::from_str(&toml).unwrap(), MeshConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[propagation]\nstrategy = \"min\"").unwrap();

        let config = MeshConfig::from_file(file.path()).unwrap();
        assert_eq!(config.propagation.strategy, PropagationStrategy::Min);
        assert_eq!(
            config.new_agent("agent-1", "Ada").network().strategy(),
            PropagationStrategy::Min
        );
    }

    #[test]
    fn test_missing_file() {
        let err = MeshConfig::from_file(Path::new("/nonexistent/mesh.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_topology_manager_uses_mode() {
        let config = MeshConfig::from_str("[topology]\nrelevance_mode = \"either\"").unwrap();
        assert_eq!(config.topology_manager().mode(), RelevanceMode::Either);
    }
}
