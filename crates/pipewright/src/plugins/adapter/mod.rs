//! Adapter configuration plugin
//!
//! Everything specific to pipeline adapter markup: choosing the adapter,
//! turning it into a flow graph, placing nodes that have no coordinates and
//! editing the markup in response to diagram events.

mod database;
mod graph;
mod layout;
mod parser;
mod selector;
mod surgeon;

pub use database::*;
pub use graph::*;
pub use layout::*;
pub use parser::*;
pub use selector::*;
pub use surgeon::*;
