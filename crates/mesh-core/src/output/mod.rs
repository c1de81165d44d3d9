//! Output
//!
//! Snapshots for persistence and the message journal.

pub mod journal;
pub mod snapshot;

pub use journal::*;
pub use snapshot::*;
