//! Belief
//!
//! A single proposition with a versioned confidence value and the full
//! history of how it got there.

use mesh_events::{now_millis, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::BeliefError;

/// Checks that a confidence value lies in [0, 1].
///
/// Out-of-range and NaN values are rejected, never clamped.
pub fn validate_confidence(value: f64) -> Result<f64, BeliefError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(BeliefError::InvalidConfidence { value })
    }
}

/// One recorded state of a belief
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefRevision {
    pub confidence: f64,
    pub justification: String,
    pub timestamp: Timestamp,
}

/// A proposition held with some confidence
///
/// History holds every state the belief has been in, oldest first; the last
/// revision always matches the current confidence and justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    proposition: String,
    confidence: f64,
    justification: String,
    history: Vec<BeliefRevision>,
}

impl Belief {
    pub(crate) fn new(
        proposition: impl Into<String>,
        confidence: f64,
        justification: impl Into<String>,
    ) -> Result<Self, BeliefError> {
        let confidence = validate_confidence(confidence)?;
        let justification = justification.into();
        Ok(Self {
            proposition: proposition.into(),
            confidence,
            history: vec![BeliefRevision {
                confidence,
                justification: justification.clone(),
                timestamp: now_millis(),
            }],
            justification,
        })
    }

    pub fn proposition(&self) -> &str {
        &self.proposition
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn justification(&self) -> &str {
        &self.justification
    }

    /// Replaces confidence and justification and appends the NEW state to
    /// the history. The last entry therefore always equals the current
    /// value; earlier states stay in the preceding entries.
    pub fn update(
        &mut self,
        confidence: f64,
        justification: impl Into<String>,
    ) -> Result<&Belief, BeliefError> {
        let confidence = validate_confidence(confidence)?;
        let justification = justification.into();
        self.history.push(BeliefRevision {
            confidence,
            justification: justification.clone(),
            timestamp: now_millis(),
        });
        self.confidence = confidence;
        self.justification = justification;
        Ok(self)
    }

    /// Returns a copy of the full revision history.
    pub fn get_history(&self) -> Vec<BeliefRevision> {
        self.history.clone()
    }

    /// Read-only view of the revision history.
    pub fn history(&self) -> &[BeliefRevision] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_belief_records_initial_state() {
        let belief = Belief::new("Weather: Sunny", 0.9, "clear sky").unwrap();

        assert_eq!(belief.proposition(), "Weather: Sunny");
        assert_eq!(belief.confidence(), 0.9);
        assert_eq!(belief.history().len(), 1);
        assert_eq!(belief.history()[0].justification, "clear sky");
    }

    #[test]
    fn test_update_appends_history() {
        let mut belief = Belief::new("Weather: Sunny", 0.9, "clear sky").unwrap();
        belief.update(0.3, "clouds").unwrap();
        belief.update(0.1, "rain").unwrap();

        let history = belief.get_history();
        let confidences: Vec<f64> = history.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.3, 0.1]);
        assert_eq!(belief.justification(), "rain");
        let last = history.last().unwrap();
        assert_eq!(last.confidence, belief.confidence());
        assert_eq!(last.justification, belief.justification());
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_history_is_a_copy() {
        let mut belief = Belief::new("X", 0.5, "start").unwrap();
        let mut history = belief.get_history();
        history.clear();

        belief.update(0.6, "later").unwrap();
        assert_eq!(belief.history().len(), 2);
    }

    #[test]
    fn test_out_of_range_rejected_without_mutation() {
        let mut belief = Belief::new("X", 0.5, "start").unwrap();

        for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                belief.update(bad, "nope"),
                Err(BeliefError::InvalidConfidence { .. })
            ));
        }
        assert_eq!(belief.confidence(), 0.5);
        assert_eq!(belief.history().len(), 1);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(Belief::new("X", 0.0, "floor").is_ok());
        assert!(Belief::new("X", 1.0, "ceiling").is_ok());
        assert!(Belief::new("X", 1.5, "over").is_err());
    }
}
