//! Agents
//!
//! Agents, their handles, and the registry the driver hands to routing.

pub mod agent;
pub mod registry;

pub use agent::*;
pub use registry::*;
