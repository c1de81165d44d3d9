//! Agent
//!
//! An agent owns one belief network, a set of subscribed topics, and the log
//! of every message it has received. Agents do no I/O; everything here is
//! pure computation over the agent's own state.

use mesh_events::{BeliefUpdate, Message, MessageBody, MessageError, Query, ResponseStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;

use crate::beliefs::{validate_confidence, Belief, BeliefNetwork, NetworkStats, PropagationStrategy};
use crate::error::{BeliefError, MeshError};
use crate::output::AgentSnapshot;

/// Summary of an agent's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub network: NetworkStats,
    pub subscription_count: usize,
    pub messages_received: usize,
}

/// An autonomous holder of beliefs
#[derive(Debug, Clone)]
pub struct Agent {
    id: String,
    name: String,
    network: BeliefNetwork,
    subscriptions: BTreeSet<String>,
    message_history: Vec<Message>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_strategy(id, name, PropagationStrategy::default())
    }

    /// Creates an agent whose network propagates with `strategy`.
    pub fn with_strategy(
        id: impl Into<String>,
        name: impl Into<String>,
        strategy: PropagationStrategy,
    ) -> Self {
        let id = id.into();
        Self {
            network: BeliefNetwork::with_strategy(id.clone(), strategy),
            id,
            name: name.into(),
            subscriptions: BTreeSet::new(),
            message_history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only view of the owned network.
    pub fn network(&self) -> &BeliefNetwork {
        &self.network
    }

    // --- Subscriptions ---

    /// Subscribes to a topic. Returns false if already subscribed.
    pub fn subscribe(&mut self, topic: impl Into<String>) -> bool {
        self.subscriptions.insert(topic.into())
    }

    /// Unsubscribes from a topic. Returns false if not subscribed.
    pub fn unsubscribe(&mut self, topic: &str) -> bool {
        self.subscriptions.remove(topic)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains(topic)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(String::as_str)
    }

    // --- Beliefs (forwarded to the network) ---

    pub fn add_belief(
        &mut self,
        proposition: impl Into<String>,
        confidence: f64,
        justification: impl Into<String>,
        dependencies: &[&str],
    ) -> Result<&Belief, BeliefError> {
        self.network
            .add_belief(proposition, confidence, justification, dependencies)
    }

    pub fn update_belief(
        &mut self,
        proposition: &str,
        confidence: f64,
        justification: impl Into<String>,
    ) -> Result<Vec<Belief>, BeliefError> {
        self.network
            .update_belief(proposition, confidence, justification)
    }

    pub fn remove_belief(&mut self, proposition: &str) -> bool {
        self.network.remove_belief(proposition)
    }

    pub fn get_belief(&self, proposition: &str) -> Option<&Belief> {
        self.network.get_belief(proposition)
    }

    pub fn get_beliefs(&self) -> Vec<&Belief> {
        self.network.get_all_beliefs()
    }

    // --- Messaging ---

    /// Handles an inbound message and returns the reply.
    ///
    /// The message is appended to the history before validation, so
    /// rejected messages are still on record.
    pub fn receive_message(&mut self, message: Message) -> Result<Message, MeshError> {
        self.message_history.push(message.clone());

        let body = message.body().map_err(|e| {
            tracing::warn!(agent = %self.id, sender = %message.sender_id, error = %e, "message rejected");
            e
        })?;

        match body {
            MessageBody::BeliefUpdate(update) => self.merge_update(&message, update),
            MessageBody::Query(query) => Ok(self.answer_query(&message, query)),
            MessageBody::Response(_) => {
                tracing::warn!(agent = %self.id, sender = %message.sender_id, "response cannot be dispatched to an agent");
                Err(MessageError::Unsupported {
                    kind: message.kind.clone(),
                }
                .into())
            }
        }
    }

    /// Applies an incoming belief, averaging with any existing confidence.
    fn merge_update(&mut self, message: &Message, update: BeliefUpdate) -> Result<Message, MeshError> {
        let incoming = validate_confidence(update.confidence)?;

        let (confidence, merged, changed) = match self.network.get_belief(&update.proposition) {
            Some(existing) => {
                let confidence = (existing.confidence() + incoming) / 2.0;
                let changed = self.network.update_belief(
                    &update.proposition,
                    confidence,
                    update.justification,
                )?;
                (confidence, true, changed.len())
            }
            None => {
                self.network
                    .add_belief(update.proposition.clone(), incoming, update.justification, &[])?;
                (incoming, false, 1)
            }
        };

        tracing::debug!(
            agent = %self.id,
            sender = %message.sender_id,
            proposition = %update.proposition,
            confidence,
            merged,
            "belief update applied"
        );

        Ok(Message::response_to(
            message,
            self.id.clone(),
            ResponseStatus::Ok,
            json!({
                "proposition": update.proposition,
                "confidence": confidence,
                "merged": merged,
                "changed": changed,
            }),
        ))
    }

    fn answer_query(&self, message: &Message, query: Query) -> Message {
        let (status, data) = match query {
            Query::GetBelief { proposition } => match self.network.get_belief(&proposition) {
                Some(belief) => (ResponseStatus::Ok, json!({ "belief": belief })),
                None => (
                    ResponseStatus::NotFound,
                    json!({ "proposition": proposition, "found": false }),
                ),
            },
            Query::GetAllBeliefs => (
                ResponseStatus::Ok,
                json!({ "beliefs": self.network.get_all_beliefs() }),
            ),
        };
        Message::response_to(message, self.id.clone(), status, data)
    }

    /// Every message received, oldest first.
    pub fn message_history(&self) -> &[Message] {
        &self.message_history
    }

    pub fn clear_message_history(&mut self) {
        self.message_history.clear();
    }

    pub fn get_stats(&self) -> AgentStats {
        AgentStats {
            id: self.id.clone(),
            name: self.name.clone(),
            network: self.network.get_stats(),
            subscription_count: self.subscriptions.len(),
            messages_received: self.message_history.len(),
        }
    }

    /// Captures id, name, network and subscriptions.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            network: self.network.snapshot(),
            subscriptions: self.subscriptions.iter().cloned().collect(),
        }
    }

    /// Rehydrates an agent. The message history starts empty.
    pub fn from_snapshot(snapshot: AgentSnapshot) -> Result<Self, BeliefError> {
        Ok(Self {
            network: BeliefNetwork::from_snapshot(snapshot.network)?,
            id: snapshot.id,
            name: snapshot.name,
            subscriptions: snapshot.subscriptions.into_iter().collect(),
            message_history: Vec::new(),
        })
    }
}
