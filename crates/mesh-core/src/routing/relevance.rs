//! Relevance Rules
//!
//! Patterns declaring which propositions an agent cares about.
//!
//! A pattern ending in `*` matches any text starting with the part before
//! the star; any other pattern matches text that contains it. Matching is
//! case-sensitive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single relevance pattern
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelevanceRule(String);

impl RelevanceRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }

    /// True for `Prefix*` patterns.
    pub fn is_prefix(&self) -> bool {
        self.0.ends_with('*')
    }

    /// Tests `text` against this pattern.
    pub fn matches(&self, text: &str) -> bool {
        match self.0.strip_suffix('*') {
            Some(prefix) => text.starts_with(prefix),
            None => text.contains(self.0.as_str()),
        }
    }
}

impl From<&str> for RelevanceRule {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for RelevanceRule {
    fn from(pattern: String) -> Self {
        Self(pattern)
    }
}

impl fmt::Display for RelevanceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which direction of relevance licenses a topology edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceMode {
    /// Each agent must hold a belief matching one of the other's rules
    #[default]
    Mutual,
    /// One agent holding a belief the other cares about is enough
    Either,
}

impl RelevanceMode {
    /// Combines the two one-directional relevance checks.
    pub fn licenses(&self, a_to_b: bool, b_to_a: bool) -> bool {
        match self {
            RelevanceMode::Mutual => a_to_b && b_to_a,
            RelevanceMode::Either => a_to_b || b_to_a,
        }
    }
}

/// True if any rule matches `text`.
pub fn any_rule_matches<'a>(rules: impl IntoIterator<Item = &'a RelevanceRule>, text: &str) -> bool {
    rules.into_iter().any(|rule| rule.matches(text))
}

/// True if any proposition matches any rule.
pub fn is_relevant<'r, 'p, R, P>(rules: R, propositions: P) -> bool
where
    R: IntoIterator<Item = &'r RelevanceRule> + Clone,
    P: IntoIterator<Item = &'p str>,
{
    propositions
        .into_iter()
        .any(|p| any_rule_matches(rules.clone(), p))
}
