//! Core database trait for diagram data storage
//!
//! A database holds the nodes and edges derived from one adapter. It is
//! rebuilt from scratch on every text change and never patched in place.

use anyhow::Result;

use super::types::{Edge, Node};

/// Core trait for diagram databases
///
/// # Example
/// ```
/// use pipewright::core::{Database, Edge, Node};
/// use pipewright::plugins::adapter::FlowGraph;
///
/// let mut db = FlowGraph::new();
/// db.add_node(Node::new("Read", "FileReaderPipe")).unwrap();
/// db.add_node(Node::exit("EXIT")).unwrap();
/// db.add_edge(Edge::new("Read", "EXIT", "success")).unwrap();
/// assert_eq!(db.edge_count(), 1);
/// ```
pub trait Database: Send + Sync {
    /// Add a node; fails when the name is already taken
    fn add_node(&mut self, node: Node) -> Result<()>;

    /// Add an edge
    fn add_edge(&mut self, edge: Edge) -> Result<()>;

    /// Get a node by name
    fn get_node(&self, name: &str) -> Option<&Node>;

    /// All nodes in graph order
    fn nodes(&self) -> &[Node];

    /// All edges in insertion order
    fn edges(&self) -> &[Edge];

    /// Clear all data from the database
    fn clear(&mut self);

    /// Get the number of nodes
    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Get the number of edges
    fn edge_count(&self) -> usize {
        self.edges().len()
    }
}
