//! Pipewright - keep adapter configuration markup and its flow diagram in sync
//!
//! Parses pipeline adapter configurations into a flow graph, places nodes
//! that carry no coordinates, and turns diagram edits back into minimal,
//! byte-preserving edits of the markup.
//!
//! # Quick Start
//!
//! ```rust
//! use pipewright::build_diagram;
//!
//! let text = r#"<Configuration>
//!   <Adapter name="Hello">
//!     <Pipeline>
//!       <EchoPipe name="Echo"/>
//!       <Exit path="EXIT"/>
//!     </Pipeline>
//!   </Adapter>
//! </Configuration>"#;
//!
//! let render = build_diagram(text).unwrap();
//! assert_eq!(render.nodes.len(), 2);
//! assert_eq!(render.edges.len(), 0);
//! ```
//!
//! # Editing
//!
//! The [`Orchestrator`](plugins::orchestrator::Orchestrator) applies diagram
//! events to the text and rebuilds:
//!
//! ```rust
//! use pipewright::prelude::*;
//!
//! let mut editor = Orchestrator::default();
//! editor
//!     .text_changed(r#"<Adapter name="A"><Pipeline><EchoPipe name="One"/><Exit path="EXIT"/></Pipeline></Adapter>"#)
//!     .unwrap();
//! editor
//!     .handle_event(DiagramEvent::Connect { source: "One".into(), target: "EXIT".into() })
//!     .unwrap();
//! assert!(editor.text().contains(r#"<Forward name="success" path="EXIT"/>"#));
//! ```

pub mod core;
pub mod plugins;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        CanvasExtent, Database, DiagramRender, Edge, EditorConfig, EditorError, LayoutAlgorithm,
        LayoutMode, Node, Parser,
    };
    pub use crate::plugins::adapter::{
        AdapterParser, ConfigurationSelector, FlowGraph, GraphBuilder, LayoutOffsetter, Surgery,
        TextSurgeon,
    };
    pub use crate::plugins::orchestrator::{DiagramEvent, EditorState, Orchestrator};
}

/// Build the diagram of the first adapter without touching the text
///
/// Nodes without coordinates receive fallback placements in the render only.
///
/// # Example
/// ```rust
/// use pipewright::build_diagram;
///
/// let render = build_diagram(
///     r#"<Adapter name="A"><Pipeline><EchoPipe name="E"/><Exit path="EXIT"/></Pipeline></Adapter>"#,
/// )
/// .unwrap();
/// assert_eq!(render.nodes[0].y, Some(250));
/// ```
pub fn build_diagram(text: &str) -> Result<DiagramRender, EditorError> {
    use crate::plugins::orchestrator::Orchestrator;

    let mut orchestrator = Orchestrator::new(EditorConfig::default().with_commit_layout(false));
    orchestrator.text_changed(text).cloned()
}

/// Parse the first adapter into a flow graph
///
/// # Example
/// ```rust
/// use pipewright::parse;
/// use pipewright::prelude::Database;
///
/// let graph = parse(
///     r#"<Adapter name="A"><Pipeline><EchoPipe name="One"/><EchoPipe name="Two"/><Exit path="EXIT"/></Pipeline></Adapter>"#,
/// )
/// .unwrap();
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge_count(), 1);
/// ```
pub fn parse(text: &str) -> anyhow::Result<plugins::adapter::FlowGraph> {
    use crate::core::Parser as _;
    use crate::plugins::adapter::{AdapterParser, FlowGraph};

    let parser = AdapterParser::new();
    let mut graph = FlowGraph::new();
    parser.parse(text, &mut graph)?;
    Ok(graph)
}
