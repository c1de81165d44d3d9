//! Mesh Setup
//!
//! Seeded population building and the round driver.

pub mod scenario;

pub use scenario::*;
