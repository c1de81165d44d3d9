//! Sample data fixtures for testing.
//!
//! This module provides ready-made messages for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // mesh-events = { path = "../mesh-events", features = ["test-fixtures"] }
//!
//! use mesh_events::fixtures;
//!
//! let messages = fixtures::sample_messages();
//! ```

use crate::Message;

/// Returns sample messages from the fixtures file.
///
/// Contains 7 messages:
/// - 3 belief updates (weather and sports)
/// - 2 queries (single belief, all beliefs)
/// - 1 message of an unknown type (`gossip`)
/// - 1 belief update whose payload is missing its confidence
pub fn sample_messages() -> Vec<Message> {
    let jsonl = include_str!("../tests/fixtures/sample_messages.jsonl");
    jsonl
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            Message::from_jsonl(l).unwrap_or_else(|e| {
                panic!("Failed to parse message line: {}\nError: {}", l, e)
            })
        })
        .collect()
}

/// Returns a specific message by ID from the sample messages.
pub fn get_message(message_id: &str) -> Option<Message> {
    sample_messages()
        .into_iter()
        .find(|m| m.message_id == message_id)
}

/// Returns the sample update lowering confidence in sunny weather.
pub fn weather_update() -> Message {
    get_message("msg_fixture_0001").expect("weather update fixture")
}

/// Returns the sample message with an unsupported type.
pub fn gossip_message() -> Message {
    get_message("msg_fixture_0006").expect("gossip fixture")
}

/// Returns the sample belief update with a malformed payload.
pub fn malformed_update() -> Message {
    get_message("msg_fixture_0007").expect("malformed fixture")
}
