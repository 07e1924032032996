//! Plugin implementations
//!
//! The adapter plugin knows the configuration markup; the orchestrator wires
//! it into the edit cycle.

pub mod adapter;
pub mod orchestrator;

pub use adapter::*;
pub use orchestrator::*;
