//! Adapter configuration parser
//!
//! Runs the tree, selection and graph stages back to back and loads the result
//! into a [`FlowGraph`].

use anyhow::{anyhow, Result};
use tracing::{debug, span, Level};

use super::database::FlowGraph;
use super::graph::{GraphBuild, GraphBuilder};
use super::selector::ConfigurationSelector;
use crate::core::{to_tree, Database, Parser};

/// Parser for adapter configuration markup
#[derive(Debug, Clone, Default)]
pub struct AdapterParser {
    adapter: Option<String>,
}

impl AdapterParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the named adapter instead of the first one
    pub fn for_adapter(adapter: impl Into<String>) -> Self {
        Self {
            adapter: Some(adapter.into()),
        }
    }
}

impl Parser<FlowGraph> for AdapterParser {
    fn parse(&self, input: &str, database: &mut FlowGraph) -> Result<()> {
        let parse_span = span!(Level::DEBUG, "parse_adapter", input_len = input.len());
        let _enter = parse_span.enter();

        let tree = to_tree(input)?;
        let model = ConfigurationSelector::new().select(&tree, self.adapter.as_deref());
        let graph = match GraphBuilder::new().build(&model) {
            GraphBuild::Diagram(graph) => graph,
            GraphBuild::NoDiagram(reason) => return Err(anyhow!("no diagram: {}", reason)),
        };

        database.set_adapter_name(graph.adapter_name().map(str::to_string));
        for node in graph.nodes() {
            database.add_node(node.clone())?;
        }
        for edge in graph.edges() {
            database.add_edge(edge.clone())?;
        }

        debug!(
            adapter = ?model.name(),
            node_count = database.node_count(),
            edge_count = database.edge_count(),
            "Parsed adapter"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "adapter"
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn can_parse(&self, input: &str) -> bool {
        let trimmed = input.trim_start_matches('\u{feff}').trim_start();
        trimmed.starts_with('<')
            && ["<Configuration", "<Adapter", "<IOS-Adaptering", "<Module"]
                .iter()
                .any(|tag| input.contains(tag))
    }
}
