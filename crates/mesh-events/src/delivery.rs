//! Delivery accounting for routed messages.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// A recipient that received a message but could not handle it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedDelivery {
    pub recipient_id: String,
    pub reason: String,
}

/// Result of routing one message to zero or more recipients.
///
/// `delivered_count` counts every recipient whose handler was invoked,
/// including those listed in `rejected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub message_id: String,
    pub sender_id: String,
    pub delivered_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedDelivery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<Message>,
}

impl DeliveryReport {
    /// Creates an empty report for `message`.
    pub fn new(message: &Message) -> Self {
        Self {
            message_id: message.message_id.clone(),
            sender_id: message.sender_id.clone(),
            delivered_count: 0,
            recipients: Vec::new(),
            rejected: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Records a handled delivery and the recipient's reply.
    pub fn record_response(&mut self, recipient_id: impl Into<String>, response: Message) {
        self.delivered_count += 1;
        self.recipients.push(recipient_id.into());
        self.responses.push(response);
    }

    /// Records a delivery the recipient rejected.
    pub fn record_rejection(&mut self, recipient_id: impl Into<String>, reason: impl Into<String>) {
        let recipient_id = recipient_id.into();
        self.delivered_count += 1;
        self.recipients.push(recipient_id.clone());
        self.rejected.push(RejectedDelivery {
            recipient_id,
            reason: reason.into(),
        });
    }

    /// True when nothing was delivered.
    pub fn is_empty(&self) -> bool {
        self.delivered_count == 0
    }

    /// True when every recipient handled the message.
    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}
