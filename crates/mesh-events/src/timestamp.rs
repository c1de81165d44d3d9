//! Wall-clock timestamps and identifiers.
//!
//! Envelopes, belief revisions and log entries all carry a millisecond
//! timestamp since the Unix epoch.
//!
//! # Example
//!
//! ```
//! use mesh_events::{format_timestamp, generate_message_id};
//!
//! assert!(generate_message_id().starts_with("msg_"));
//! assert_eq!(format_timestamp(0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Returns the current wall-clock time in milliseconds.
pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

/// Renders a timestamp as RFC 3339 with millisecond precision.
///
/// Returns `None` when the value is outside the representable range.
pub fn format_timestamp(ts: Timestamp) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Generates a unique message identifier.
pub fn generate_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}
