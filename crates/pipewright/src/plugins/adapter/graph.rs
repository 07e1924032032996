//! Graph builder
//!
//! Walks a selected adapter into stage, exit and receiver nodes plus forward
//! and inferred edges.

use tracing::{debug, span, trace, warn, Level};

use super::database::FlowGraph;
use super::selector::AdapterModel;
use crate::core::{
    unescape_text, Database, Edge, ElementView, Node, TreeMap, TreeValue, RECEIVER_PREFIX,
};

pub const PIPELINE_TAG: &str = "Pipeline";
pub const FORWARD_TAG: &str = "Forward";
pub const EXIT_TAG: &str = "Exit";
pub const EXITS_TAG: &str = "Exits";
pub const RECEIVER_TAG: &str = "Receiver";
pub const DOCUMENTATION_TAG: &str = "Documentation";
/// Legacy stage tag whose kind lives in `className`
pub const LEGACY_STAGE_TAG: &str = "pipe";

const PREVIEW_CHARS: usize = 15;

/// True for tags that name a stage
pub fn is_stage_tag(tag: &str) -> bool {
    tag.ends_with("Pipe") || tag == LEGACY_STAGE_TAG
}

/// Outcome of a graph build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphBuild {
    Diagram(FlowGraph),
    /// The adapter cannot be drawn; carries the reason
    NoDiagram(String),
}

impl GraphBuild {
    pub fn diagram(self) -> Option<FlowGraph> {
        match self {
            GraphBuild::Diagram(graph) => Some(graph),
            GraphBuild::NoDiagram(_) => None,
        }
    }
}

/// Builds flow graphs from adapter models
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder;

struct Stage<'a> {
    name: String,
    kind: String,
    map: Option<&'a TreeMap>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, model: &AdapterModel) -> GraphBuild {
        let build_span = span!(Level::DEBUG, "build_graph", adapter = ?model.name());
        let _enter = build_span.enter();

        let Some(adapter) = model.tree() else {
            return GraphBuild::NoDiagram("no adapter selected".to_string());
        };
        let Some(pipeline_value) = adapter.child(PIPELINE_TAG) else {
            return GraphBuild::NoDiagram(format!(
                "adapter {} has no pipeline",
                model.name().unwrap_or("<unnamed>")
            ));
        };
        let empty = TreeMap::new(PIPELINE_TAG);
        let pipeline = pipeline_value.as_map().unwrap_or(&empty);

        let stages = match collect_stages(pipeline) {
            Ok(stages) => stages,
            Err(reason) => return GraphBuild::NoDiagram(reason),
        };

        let mut graph = FlowGraph::with_adapter_name(model.name().map(str::to_string));
        let mut edges = Vec::new();

        for (index, stage) in stages.iter().enumerate() {
            let mut node = Node::new(stage.name.clone(), stage.kind.clone());
            if let Some(map) = stage.map {
                let (x, y) = coordinates(map);
                node = node.with_position(x, y);
                node.preview = preview_text(map);
                node.description = map
                    .child(DOCUMENTATION_TAG)
                    .and_then(TreeValue::text)
                    .map(|text| unescape_text(text).trim().to_string())
                    .filter(|text| !text.is_empty());
            }
            trace!(name = %node.name, kind = %node.kind, x = ?node.x, y = ?node.y, "Stage");
            // names were checked for duplicates above
            let _ = graph.add_node(node);

            let forwards = stage.map.map(forwards_of).unwrap_or_default();
            if !forwards.is_empty() {
                for (label, path) in forwards {
                    edges.push(Edge::new(stage.name.clone(), path, label));
                }
            } else if let Some(next) = stages.get(index + 1) {
                edges.push(Edge::new(stage.name.clone(), next.name.clone(), "success"));
            }
        }

        for exit in exit_maps(pipeline) {
            let Some(name) = exit.attribute("path").or_else(|| exit.attribute("name")) else {
                warn!("Skipping exit without path or name");
                continue;
            };
            let (x, y) = coordinates(exit);
            if graph.add_node(Node::exit(name).with_position(x, y)).is_err() {
                warn!(name, "Skipping exit whose name is already taken");
            }
        }

        let entry = pipeline
            .attribute("firstPipe")
            .map(str::to_string)
            .or_else(|| stages.first().map(|s| s.name.clone()));
        for receiver in adapter.child_elements(RECEIVER_TAG) {
            let Some(name) = receiver.attribute("name") else {
                warn!("Skipping receiver without name");
                continue;
            };
            let node_name = format!("{}{}", RECEIVER_PREFIX, name);
            let (x, y) = coordinates(receiver);
            if graph
                .add_node(Node::new(node_name.clone(), RECEIVER_TAG).with_position(x, y))
                .is_err()
            {
                warn!(name, "Skipping duplicate receiver");
                continue;
            }
            if let Some(entry) = &entry {
                edges.push(Edge::new(node_name, entry.clone(), "request"));
            }
        }

        for edge in edges {
            let _ = graph.add_edge(edge);
        }

        debug!(
            node_count = graph.node_count(),
            edge_count = graph.edge_count(),
            "Graph built"
        );
        GraphBuild::Diagram(graph)
    }
}

/// Build the graph for a selected adapter
pub fn build_graph(model: &AdapterModel) -> GraphBuild {
    GraphBuilder::new().build(model)
}

fn collect_stages(pipeline: &TreeMap) -> Result<Vec<Stage<'_>>, String> {
    let mut stages: Vec<Stage<'_>> = Vec::new();
    for (tag, value) in pipeline.elements_in_order() {
        if !is_stage_tag(tag) {
            continue;
        }
        let map = value.as_map();
        let Some(name) = map.and_then(|m| m.attribute("name")) else {
            warn!(tag, "Skipping stage without name");
            continue;
        };
        if stages.iter().any(|s| s.name == name) {
            return Err(format!("duplicate stage name {}", name));
        }
        let kind = if tag == LEGACY_STAGE_TAG {
            map.and_then(|m| m.attribute("className"))
                .and_then(|class| class.rsplit('.').next())
                .filter(|kind| !kind.is_empty())
                .unwrap_or(tag)
                .to_string()
        } else {
            tag.to_string()
        };
        stages.push(Stage {
            name: name.to_string(),
            kind,
            map,
        });
    }
    Ok(stages)
}

/// Explicit forwards as (label, target)
fn forwards_of(stage: &TreeMap) -> Vec<(String, String)> {
    stage
        .child_elements(FORWARD_TAG)
        .into_iter()
        .filter_map(|forward| {
            let path = forward.attribute("path")?;
            let label = forward.attribute("name").unwrap_or("success");
            Some((label.to_string(), path.to_string()))
        })
        .collect()
}

fn exit_maps(pipeline: &TreeMap) -> Vec<&TreeMap> {
    let mut exits = Vec::new();
    for (tag, value) in pipeline.elements_in_order() {
        match tag {
            EXIT_TAG => exits.extend(value.as_map()),
            EXITS_TAG => {
                if let Some(wrapper) = value.as_map() {
                    exits.extend(wrapper.child_elements(EXIT_TAG));
                }
            }
            _ => {}
        }
    }
    exits
}

fn parse_coordinate(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64)
    })
}

/// x/y attributes; a lone coordinate is used for both
fn coordinates(map: &TreeMap) -> (Option<i64>, Option<i64>) {
    let x = parse_coordinate(map.attribute("x"));
    let y = parse_coordinate(map.attribute("y"));
    match (x, y) {
        (Some(x), None) => (Some(x), Some(x)),
        (None, Some(y)) => (Some(y), Some(y)),
        other => other,
    }
}

fn preview_text(stage: &TreeMap) -> Option<String> {
    let source = stage
        .attribute("xpathExpression")
        .or_else(|| {
            stage
                .child_elements("FixedQuerySender")
                .first()
                .and_then(|sender| sender.attribute("query"))
        })
        .or_else(|| stage.attribute("styleSheetName"))?;
    let head: String = source.chars().take(PREVIEW_CHARS).collect();
    Some(format!("{}...", head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::to_tree;
    use crate::plugins::adapter::ConfigurationSelector;

    fn build(text: &str) -> GraphBuild {
        let tree = to_tree(text).unwrap();
        let model = ConfigurationSelector::new().select(&tree, None);
        build_graph(&model)
    }

    fn graph(text: &str) -> FlowGraph {
        match build(text) {
            GraphBuild::Diagram(graph) => graph,
            GraphBuild::NoDiagram(reason) => panic!("no diagram: {reason}"),
        }
    }

    fn edge_list(graph: &FlowGraph) -> Vec<(String, String, String)> {
        graph
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.label.clone()))
            .collect()
    }

    #[test]
    fn test_implicit_edges_follow_document_order() {
        let g = graph(
            r#"<Adapter name="A"><Pipeline>
                <EchoPipe name="one"/><XsltPipe name="two"/><EchoPipe name="three"/>
                <Exit path="EXIT"/>
            </Pipeline></Adapter>"#,
        );
        assert_eq!(
            edge_list(&g),
            vec![
                ("one".into(), "two".into(), "success".into()),
                ("two".into(), "three".into(), "success".into()),
            ]
        );
        let names: Vec<_> = g.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two", "three", "EXIT"]);
    }

    #[test]
    fn test_explicit_forwards_replace_inference() {
        let g = graph(
            r#"<Adapter name="A"><Pipeline>
                <EchoPipe name="A"><Forward name="failure" path="Exit"/><Forward name="success" path="B"/></EchoPipe>
                <EchoPipe name="B"/>
                <Exit path="Exit"/>
            </Pipeline></Adapter>"#,
        );
        assert_eq!(
            edge_list(&g),
            vec![
                ("A".into(), "Exit".into(), "failure".into()),
                ("A".into(), "B".into(), "success".into()),
            ]
        );
    }

    #[test]
    fn test_stage_details() {
        let g = graph(
            r#"<Adapter name="A"><Pipeline>
                <XmlSwitchPipe name="Switch" xpathExpression="/root/element/child" x="40">
                  <Documentation>Routes "messages"
by type</Documentation>
                </XmlSwitchPipe>
                <SenderPipe name="Query" y="abc"><FixedQuerySender query="SELECT 1"/></SenderPipe>
                <pipe name="Legacy" className="nl.nn.adapterframework.pipes.EchoPipe"/>
            </Pipeline></Adapter>"#,
        );
        let switch = g.get_node("Switch").unwrap();
        assert_eq!((switch.x, switch.y), (Some(40), Some(40)));
        assert_eq!(switch.preview.as_deref(), Some("/root/element/c..."));
        assert_eq!(switch.description.as_deref(), Some("Routes \"messages\"\nby type"));

        let query = g.get_node("Query").unwrap();
        assert_eq!((query.x, query.y), (None, None));
        assert_eq!(query.preview.as_deref(), Some("SELECT 1..."));

        assert_eq!(g.get_node("Legacy").unwrap().kind, "EchoPipe");
    }

    #[test]
    fn test_exits_and_receivers() {
        let g = graph(
            r#"<Adapter name="A">
                <Receiver name="Listener" x="5" y="6"/>
                <Pipeline firstPipe="Second">
                  <EchoPipe name="First"/><EchoPipe name="Second"/>
                  <Exits><Exit path="READY"/><Exit name="ERROR" x="1" y="2"/></Exits>
                </Pipeline>
            </Adapter>"#,
        );
        let receiver = format!("{}Listener", RECEIVER_PREFIX);
        assert!(g.get_node("READY").unwrap().is_exit);
        assert_eq!(g.get_node("ERROR").unwrap().x, Some(1));
        assert_eq!(g.get_node(&receiver).unwrap().y, Some(6));
        assert!(edge_list(&g).contains(&(receiver, "Second".into(), "request".into())));
    }

    #[test]
    fn test_receiver_defaults_to_first_stage() {
        let g = graph(
            r#"<Adapter name="A"><Receiver name="R"/><Pipeline><EchoPipe name="Only"/><Exit path="EXIT"/></Pipeline></Adapter>"#,
        );
        assert_eq!(g.successors(&format!("{}R", RECEIVER_PREFIX)), vec!["Only"]);
    }

    #[test]
    fn test_exit_only_pipeline_is_valid() {
        let g = graph(r#"<Adapter name="A"><Pipeline><Exit path="EXIT"/></Pipeline></Adapter>"#);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_no_diagram_cases() {
        assert!(matches!(build_graph(&AdapterModel::Empty), GraphBuild::NoDiagram(_)));
        assert!(matches!(
            build(r#"<Adapter name="A"><Receiver name="R"/></Adapter>"#),
            GraphBuild::NoDiagram(_)
        ));
        match build(r#"<Adapter name="A"><Pipeline><EchoPipe name="X"/><XsltPipe name="X"/></Pipeline></Adapter>"#) {
            GraphBuild::NoDiagram(reason) => assert!(reason.contains("duplicate")),
            other => panic!("expected no diagram, got {other:?}"),
        }
    }
}
