//! Message Types
//!
//! The in-process message envelope exchanged between agents, and the typed
//! bodies it is validated into before dispatch.
//!
//! Envelopes stay loosely typed (`type` string plus a JSON payload) so that
//! anything a peer sends can be recorded verbatim. [`Message::body`] turns an
//! envelope into a [`MessageBody`], rejecting unknown types and payloads of
//! the wrong shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::timestamp::{generate_message_id, now_millis, Timestamp};

/// Errors raised while validating a message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The envelope's `type` is not one this mesh understands
    #[error("unsupported message type: {kind}")]
    Unsupported { kind: String },
    /// The payload does not have the shape its `type` requires
    #[error("malformed {kind} message: {reason}")]
    Malformed { kind: String, reason: String },
}

/// Message type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    BeliefUpdate,
    Query,
    Response,
}

impl MessageKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::BeliefUpdate => "belief_update",
            MessageKind::Query => "query",
            MessageKind::Response => "response",
        }
    }

    /// Returns all message kinds.
    pub fn all() -> &'static [MessageKind] {
        &[
            MessageKind::BeliefUpdate,
            MessageKind::Query,
            MessageKind::Response,
        ]
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MessageError::Unsupported {
                kind: s.to_string(),
            })
    }
}

/// Payload of a `belief_update` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefUpdate {
    pub proposition: String,
    pub confidence: f64,
    #[serde(default)]
    pub justification: String,
}

/// Payload of a `query` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum Query {
    /// Fetch a single belief by proposition
    GetBelief { proposition: String },
    /// Fetch every belief the agent holds
    GetAllBeliefs,
}

/// Outcome carried by a `response` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[default]
    Ok,
    NotFound,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Ok => "ok",
            ResponseStatus::NotFound => "not_found",
        }
    }
}

/// Payload of a `response` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the message being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub data: Value,
}

/// A validated message body, one payload shape per message type
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    BeliefUpdate(BeliefUpdate),
    Query(Query),
    Response(Response),
}

impl MessageBody {
    /// Returns the discriminator for this body.
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::BeliefUpdate(_) => MessageKind::BeliefUpdate,
            MessageBody::Query(_) => MessageKind::Query,
            MessageBody::Response(_) => MessageKind::Response,
        }
    }

    /// Renders the body as an envelope payload.
    pub fn to_payload(&self) -> Value {
        match self {
            MessageBody::BeliefUpdate(update) => json!({
                "proposition": update.proposition,
                "confidence": update.confidence,
                "justification": update.justification,
            }),
            MessageBody::Query(Query::GetBelief { proposition }) => json!({
                "query_type": "get_belief",
                "proposition": proposition,
            }),
            MessageBody::Query(Query::GetAllBeliefs) => json!({
                "query_type": "get_all_beliefs",
            }),
            MessageBody::Response(response) => {
                let mut payload = json!({
                    "status": response.status.as_str(),
                    "data": response.data,
                });
                if let (Some(id), Some(map)) = (&response.in_reply_to, payload.as_object_mut()) {
                    map.insert("in_reply_to".to_string(), Value::String(id.clone()));
                }
                payload
            }
        }
    }
}

/// Message envelope: `{type, sender_id, payload, timestamp}` plus a unique id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sender_id: String,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: Timestamp,
}

impl Message {
    /// Creates an envelope from a raw type name and payload.
    ///
    /// No validation happens here; see [`Message::body`].
    pub fn new(kind: impl Into<String>, sender_id: impl Into<String>, payload: Value) -> Self {
        Self {
            message_id: generate_message_id(),
            kind: kind.into(),
            sender_id: sender_id.into(),
            payload,
            timestamp: now_millis(),
        }
    }

    /// Creates an envelope carrying a typed body.
    pub fn from_body(sender_id: impl Into<String>, body: &MessageBody) -> Self {
        Self::new(body.kind().as_str(), sender_id, body.to_payload())
    }

    /// Creates a `belief_update` message.
    pub fn belief_update(
        sender_id: impl Into<String>,
        proposition: impl Into<String>,
        confidence: f64,
        justification: impl Into<String>,
    ) -> Self {
        Self::from_body(
            sender_id,
            &MessageBody::BeliefUpdate(BeliefUpdate {
                proposition: proposition.into(),
                confidence,
                justification: justification.into(),
            }),
        )
    }

    /// Creates a `query` message.
    pub fn query(sender_id: impl Into<String>, query: Query) -> Self {
        Self::from_body(sender_id, &MessageBody::Query(query))
    }

    /// Creates a `response` message answering `request`.
    pub fn response_to(
        request: &Message,
        sender_id: impl Into<String>,
        status: ResponseStatus,
        data: Value,
    ) -> Self {
        Self::from_body(
            sender_id,
            &MessageBody::Response(Response {
                in_reply_to: Some(request.message_id.clone()),
                status,
                data,
            }),
        )
    }

    /// Returns the parsed discriminator, if the type is known.
    pub fn message_kind(&self) -> Option<MessageKind> {
        self.kind.parse().ok()
    }

    /// Checks whether this envelope has the given type.
    pub fn is(&self, kind: MessageKind) -> bool {
        self.kind == kind.as_str()
    }

    /// Validates the envelope into a typed body.
    pub fn body(&self) -> Result<MessageBody, MessageError> {
        let kind: MessageKind = self.kind.parse()?;
        let malformed = |e: serde_json::Error| MessageError::Malformed {
            kind: self.kind.clone(),
            reason: e.to_string(),
        };

        let body = match kind {
            MessageKind::BeliefUpdate => MessageBody::BeliefUpdate(
                serde_json::from_value(self.payload.clone()).map_err(malformed)?,
            ),
            MessageKind::Query => {
                MessageBody::Query(serde_json::from_value(self.payload.clone()).map_err(malformed)?)
            }
            MessageKind::Response => MessageBody::Response(
                serde_json::from_value(self.payload.clone()).map_err(malformed)?,
            ),
        };
        Ok(body)
    }

    /// Parses a message from a single JSONL line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Serializes this message as a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
