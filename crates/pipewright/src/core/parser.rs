//! Core parser trait for configuration markup
//!
//! A parser turns markup text into the node and edge data of a database.

use anyhow::Result;

use super::Database;

/// Core trait for configuration parsers
///
/// # Example
/// ```
/// use pipewright::core::{Database, Parser};
/// use pipewright::plugins::adapter::{AdapterParser, FlowGraph};
///
/// let parser = AdapterParser::new();
/// let mut db = FlowGraph::new();
/// parser
///     .parse(
///         r#"<Adapter name="A"><Pipeline><EchoPipe name="Echo"/><Exit path="EXIT"/></Pipeline></Adapter>"#,
///         &mut db,
///     )
///     .unwrap();
/// assert_eq!(db.node_count(), 2);
/// ```
pub trait Parser<D: Database>: Send + Sync {
    /// Parse markup into the provided database
    fn parse(&self, input: &str, database: &mut D) -> Result<()>;

    /// Get the name of this parser
    fn name(&self) -> &'static str;

    /// Get the version of this parser
    fn version(&self) -> &'static str;

    /// Check if the input looks like something this parser understands
    fn can_parse(&self, input: &str) -> bool;
}
