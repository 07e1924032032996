//! Flow graph database
//!
//! Stores the nodes and edges built from one adapter in graph order: stages
//! first, then exits, then receivers.

use anyhow::{bail, Result};
use tracing::trace;

use crate::core::{CanvasExtent, Database, DiagramRender, Edge, Node};

/// Node and edge store for one adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowGraph {
    /// Name of the adapter the graph was built from
    adapter_name: Option<String>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl FlowGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter_name(name: Option<String>) -> Self {
        Self {
            adapter_name: name,
            ..Self::default()
        }
    }

    pub fn adapter_name(&self) -> Option<&str> {
        self.adapter_name.as_deref()
    }

    pub fn set_adapter_name(&mut self, name: Option<String>) {
        self.adapter_name = name;
    }

    /// Check if a node exists
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Names of nodes this node points to
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == name)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Names of nodes pointing at this node
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == name)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Stage nodes in pipeline order
    pub fn stages(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_exit && !n.is_receiver())
    }

    pub fn exits(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_exit)
    }

    pub fn receivers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_receiver())
    }

    /// First free name of the form `base`, `base2`, `base3`, ...
    pub fn unique_stage_name(&self, base: &str) -> String {
        if !self.has_node(base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{}{}", base, i))
            .find(|candidate| !self.has_node(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Render payload for the diagram surface
    pub fn render(&self, extent: CanvasExtent) -> DiagramRender {
        DiagramRender::new(self.nodes.clone(), self.edges.clone(), extent)
    }
}

impl Database for FlowGraph {
    fn add_node(&mut self, node: Node) -> Result<()> {
        if self.has_node(&node.name) {
            bail!("duplicate node name: {}", node.name);
        }
        trace!(name = %node.name, kind = %node.kind, "Adding node");
        self.nodes.push(node);
        Ok(())
    }

    fn add_edge(&mut self, edge: Edge) -> Result<()> {
        trace!(source = %edge.source, target = %edge.target, label = %edge.label, "Adding edge");
        self.edges.push(edge);
        Ok(())
    }

    fn get_node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}
