//! Routing
//!
//! Relevance rules, the topology they induce, and message delivery over it.

pub mod messaging;
pub mod relevance;
pub mod topology;

pub use messaging::*;
pub use relevance::*;
pub use topology::*;
