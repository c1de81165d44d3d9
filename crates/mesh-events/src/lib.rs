//! Shared message types and serialization for the belief mesh.
//!
//! This crate contains pure data structures with no mesh logic.
//! It is a dependency for all other crates in the workspace.

pub mod delivery;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod message;
pub mod timestamp;

// Re-export timestamp helpers
pub use timestamp::{format_timestamp, generate_message_id, now_millis, Timestamp};

// Re-export message types
pub use message::{
    BeliefUpdate, Message, MessageBody, MessageError, MessageKind, Query, Response,
    ResponseStatus,
};

// Re-export delivery types
pub use delivery::{DeliveryReport, RejectedDelivery};
