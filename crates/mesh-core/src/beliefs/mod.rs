//! Beliefs
//!
//! Single beliefs and the per-agent network that links them.

pub mod belief;
pub mod network;

pub use belief::*;
pub use network::*;
