//! Editor orchestrator
//!
//! Owns the session and drives the rebuild cycle:
//! text → tree → adapter → graph → layout → (commit) → render.
//!
//! Diagram events go through the text surgeon first, so the markup stays the
//! single source of truth and the diagram is always rebuilt from it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, span, warn, Level};

use crate::core::{
    to_tree, CanvasExtent, CatalogProvider, ConfigurationProvider, Database, DiagramRender,
    EditorConfig, EditorError, EditorSession, LayoutMode, SchemaProvider,
};
use crate::plugins::adapter::{
    adapter_at_offset, adapter_names, commit_layout, ConfigurationSelector, FlowGraph, GraphBuild,
    GraphBuilder, LayoutOffsetter, LayoutPlan, Surgery, TextSurgeon,
};

/// Where the orchestrator is in its edit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorState {
    #[default]
    Idle,
    /// A surgery and its rebuild are in flight
    Mutating,
    /// The last rebuild failed and the diagram is cleared
    Error,
}

/// An edit made on the diagram surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DiagramEvent {
    Rename {
        old: String,
        new: String,
    },
    Move {
        name: String,
        x: i64,
        y: i64,
    },
    MoveExit {
        name: String,
        x: i64,
        y: i64,
    },
    Connect {
        source: String,
        target: String,
    },
    Disconnect {
        source: String,
        target: String,
    },
    AddStage {
        name: String,
        x: i64,
        y: i64,
        kind: String,
    },
    ChangeKind {
        name: String,
        kind: String,
    },
    SetAttribute {
        name: String,
        key: String,
        value: String,
    },
    RemoveAttribute {
        name: String,
        key: String,
    },
}

/// Coordinates the editor pipeline for one document
#[derive(Debug, Clone)]
pub struct Orchestrator {
    session: EditorSession,
    config: EditorConfig,
    state: EditorState,
    graph: Option<FlowGraph>,
    render: DiagramRender,
    extent: CanvasExtent,
    last_error: Option<String>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Orchestrator {
    /// Create an orchestrator with an empty document
    pub fn new(config: EditorConfig) -> Self {
        Self {
            session: EditorSession::default(),
            extent: config.canvas,
            render: DiagramRender::empty(config.canvas),
            config,
            state: EditorState::Idle,
            graph: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current markup text
    pub fn text(&self) -> &str {
        &self.session.raw_text
    }

    pub fn render(&self) -> &DiagramRender {
        &self.render
    }

    /// Graph of the last successful rebuild
    pub fn graph(&self) -> Option<&FlowGraph> {
        self.graph.as_ref()
    }

    /// Message of the last failed rebuild
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn selected_adapter(&self) -> Option<&str> {
        self.session.selected_adapter.as_deref()
    }

    /// Adapter names in the current text
    pub fn adapters(&self) -> Vec<String> {
        adapter_names(&self.session.raw_text)
    }

    /// The text changed outside the diagram
    ///
    /// Text identical to the current one is an echo of our own write and does
    /// not trigger a rebuild. This check carries the loop prevention for hosts
    /// that feed every editor change back in. The `Mutating` guard only fires
    /// when a host reports a change while an event is still being applied;
    /// through `&mut self` that needs the host to drive the state itself, so
    /// in practice the state has returned to `Idle` or `Error` by then.
    pub fn text_changed(&mut self, text: &str) -> Result<&DiagramRender, EditorError> {
        if self.state == EditorState::Mutating {
            debug!("Rebuild requested during mutation; suppressed");
            return Ok(&self.render);
        }
        if self.state == EditorState::Idle && self.graph.is_some() && text == self.session.raw_text
        {
            debug!("Text unchanged; rebuild skipped");
            return Ok(&self.render);
        }
        self.session.raw_text = text.to_string();
        self.rebuild()
    }

    /// Apply a diagram event to the text and rebuild
    pub fn handle_event(&mut self, event: DiagramEvent) -> Result<&DiagramRender, EditorError> {
        let event_span = span!(Level::INFO, "handle_event", event = ?event);
        let _enter = event_span.enter();

        self.state = EditorState::Mutating;
        let surgery = self.surgery_for(event);
        let surgeon = TextSurgeon::for_adapter(self.session.selected_adapter.as_deref());
        let edited = surgeon.apply(&self.session.raw_text, &surgery);
        if edited == self.session.raw_text {
            debug!(surgery = %surgery, "Event left the text unchanged");
        } else {
            info!(surgery = %surgery, "Applied diagram event");
            self.session.raw_text = edited;
        }
        self.rebuild()
    }

    fn surgery_for(&self, event: DiagramEvent) -> Surgery {
        match event {
            DiagramEvent::Rename { old, new } => Surgery::Rename { old, new },
            DiagramEvent::Move { name, x, y } => Surgery::Move { name, x, y },
            DiagramEvent::MoveExit { name, x, y } => Surgery::MoveExit { name, x, y },
            DiagramEvent::Connect { source, target } => Surgery::Connect { source, target },
            DiagramEvent::Disconnect { source, target } => Surgery::Disconnect { source, target },
            DiagramEvent::AddStage { name, x, y, kind } => {
                if !self.session.knows_kind(&kind) {
                    warn!(kind = %kind, "Stage kind missing from catalog");
                }
                let name = match &self.graph {
                    Some(graph) => graph.unique_stage_name(&name),
                    None => name,
                };
                Surgery::InsertStage { name, x, y, kind }
            }
            DiagramEvent::ChangeKind { name, kind } => Surgery::ChangeKind { name, kind },
            DiagramEvent::SetAttribute { name, key, value } => {
                Surgery::SetAttribute { name, key, value }
            }
            DiagramEvent::RemoveAttribute { name, key } => Surgery::RemoveAttribute { name, key },
        }
    }

    /// Rebuild the diagram from the current text
    pub fn rebuild(&mut self) -> Result<&DiagramRender, EditorError> {
        let rebuild_span = span!(Level::INFO, "rebuild", text_len = self.session.raw_text.len());
        let _enter = rebuild_span.enter();

        self.state = EditorState::Mutating;
        let graph = match self.build_graph() {
            Ok(graph) => graph,
            Err(err) => return self.fail(err),
        };

        let offsetter = LayoutOffsetter::from_config(&self.config);
        let plan = offsetter.compute_layout(&graph, self.extent);
        self.finish(graph, plan)
    }

    /// Recompute placements for every node and commit them
    pub fn relayout(&mut self, mode: LayoutMode) -> Result<&DiagramRender, EditorError> {
        let relayout_span = span!(Level::INFO, "relayout", mode = %mode);
        let _enter = relayout_span.enter();

        self.config.layout_mode = mode;
        self.state = EditorState::Mutating;
        let graph = match self.build_graph() {
            Ok(graph) => graph,
            Err(err) => return self.fail(err),
        };

        let plan = LayoutOffsetter::from_config(&self.config).compute_full_layout(&graph, self.extent);
        self.session.raw_text = commit_layout(&self.session.raw_text, &plan, graph.adapter_name());
        self.finish(graph, plan)
    }

    /// Switch to the named adapter
    pub fn select_adapter(&mut self, name: &str) -> Result<&DiagramRender, EditorError> {
        if !self.adapters().iter().any(|a| a == name) {
            return Err(EditorError::unknown_adapter(name));
        }
        info!(adapter = name, "Selecting adapter");
        self.session.selected_adapter = Some(name.to_string());
        self.extent = self.config.canvas;
        self.rebuild()
    }

    /// Switch to the adapter enclosing a cursor offset, if it differs
    pub fn select_adapter_at(&mut self, offset: usize) -> Result<&DiagramRender, EditorError> {
        match adapter_at_offset(&self.session.raw_text, offset) {
            Some(name) if Some(name.as_str()) != self.selected_adapter() => {
                self.select_adapter(&name)
            }
            _ => Ok(&self.render),
        }
    }

    /// Open a saved configuration by display name
    pub fn open_configuration(&mut self, name: &str) -> Result<&DiagramRender, EditorError> {
        self.session.open_configuration(name)?;
        self.extent = self.config.canvas;
        self.rebuild()
    }

    pub fn load_reference_data(
        &mut self,
        schema: &dyn SchemaProvider,
        catalog: &dyn CatalogProvider,
        configurations: &dyn ConfigurationProvider,
    ) {
        self.session
            .load_reference_data(schema, catalog, configurations);
    }

    fn build_graph(&mut self) -> Result<FlowGraph, EditorError> {
        let tree = to_tree(&self.session.raw_text)?;
        let model =
            ConfigurationSelector::new().select(&tree, self.session.selected_adapter.as_deref());
        match GraphBuilder::new().build(&model) {
            GraphBuild::Diagram(graph) => {
                if let Some(name) = graph.adapter_name() {
                    self.session.selected_adapter = Some(name.to_string());
                }
                Ok(graph)
            }
            GraphBuild::NoDiagram(reason) => Err(EditorError::no_diagram(reason)),
        }
    }

    fn finish(&mut self, mut graph: FlowGraph, plan: LayoutPlan) -> Result<&DiagramRender, EditorError> {
        for placement in &plan.placements {
            if let Some(node) = graph.node_mut(&placement.name) {
                node.x = Some(placement.x);
                node.y = Some(placement.y);
            }
        }
        self.extent = plan.extent;

        if self.config.commit_layout && !plan.is_empty() {
            self.session.raw_text =
                commit_layout(&self.session.raw_text, &plan, graph.adapter_name());
        }

        self.render = graph.render(self.extent);
        info!(
            nodes = graph.node_count(),
            edges = self.render.edges.len(),
            placed = plan.placements.len(),
            "Diagram rebuilt"
        );
        self.graph = Some(graph);
        self.last_error = None;
        self.state = EditorState::Idle;
        Ok(&self.render)
    }

    fn fail(&mut self, err: EditorError) -> Result<&DiagramRender, EditorError> {
        warn!(error = %err, "Rebuild failed; clearing diagram");
        self.state = EditorState::Error;
        self.graph = None;
        self.render = DiagramRender::empty(self.extent);
        self.last_error = Some(err.to_string());
        Err(err)
    }
}
