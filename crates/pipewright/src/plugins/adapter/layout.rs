//! Fallback layout for nodes without coordinates
//!
//! Layout is two-phase. `compute_layout` is pure and returns a plan holding a
//! placement per unplaced node plus the grown canvas extent. `commit_layout`
//! writes those placements into the markup so the next rebuild finds every
//! node already placed.

use anyhow::Result;
use tracing::{debug, span, trace, Level};
use unicode_width::UnicodeWidthStr;

use super::database::FlowGraph;
use super::surgeon::{Surgery, TextSurgeon};
use crate::core::{CanvasExtent, Database, EditorConfig, LayoutAlgorithm, LayoutMode, Node, Placement};

/// Approximate pixel width of one display column
const CHAR_WIDTH: i64 = 8;
const NODE_PADDING: i64 = 40;
const MIN_NODE_WIDTH: i64 = 200;
const NODE_HEIGHT: i64 = 100;
const CANVAS_MARGIN: i64 = 100;
/// Cross-axis coordinate of the receiver column (vertical) or row (horizontal)
const RECEIVER_BAND: i64 = 500;

/// Placements for unplaced nodes and the extent that covers every node
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct LayoutPlan {
    pub placements: Vec<Placement>,
    pub extent: CanvasExtent,
}

impl LayoutPlan {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn placement(&self, name: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.name == name)
    }
}

/// Slot-based layout along one axis
#[derive(Debug, Clone)]
pub struct LayoutOffsetter {
    mode: LayoutMode,
    slot_step: i64,
    band_offset: i64,
    canvas: CanvasExtent,
}

impl Default for LayoutOffsetter {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl LayoutOffsetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            mode: config.layout_mode,
            slot_step: config.slot_step,
            band_offset: config.band_offset,
            canvas: config.canvas,
        }
    }

    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Coordinates of 1-based slot `index` within the band at `band`
    fn slot(&self, index: usize, band: i64) -> (i64, i64) {
        let offset = index as i64 * self.slot_step;
        match self.mode {
            LayoutMode::Vertical => (band, offset),
            LayoutMode::Horizontal => (offset, band),
        }
    }

    /// Place every node that lacks a coordinate
    ///
    /// Every node consumes a slot in graph order, placed or not, so adding a
    /// coordinate to one node never moves the others. Receivers sit in a band
    /// of their own and are numbered separately within it.
    pub fn compute_layout(&self, graph: &FlowGraph, extent: CanvasExtent) -> LayoutPlan {
        self.plan(graph.nodes(), extent, false)
    }

    /// Place every node, discarding existing coordinates
    pub fn compute_full_layout(&self, graph: &FlowGraph, extent: CanvasExtent) -> LayoutPlan {
        self.plan(graph.nodes(), extent, true)
    }

    fn plan(&self, nodes: &[Node], mut extent: CanvasExtent, everything: bool) -> LayoutPlan {
        let layout_span = span!(Level::DEBUG, "compute_layout", mode = %self.mode, everything);
        let _enter = layout_span.enter();

        let mut placements = Vec::new();
        let mut receivers = 0;
        for (i, node) in nodes.iter().enumerate() {
            if node.is_receiver() {
                receivers += 1;
            }
            let (x, y) = match (node.x, node.y) {
                (Some(x), Some(y)) if !everything => (x, y),
                _ => {
                    let (x, y) = if node.is_receiver() {
                        self.slot(receivers, RECEIVER_BAND)
                    } else {
                        self.slot(i + 1, self.band_offset)
                    };
                    trace!(node = %node.name, x, y, "Placed node");
                    placements.push(Placement {
                        name: node.name.clone(),
                        x,
                        y,
                        is_exit: node.is_exit,
                    });
                    (x, y)
                }
            };
            extent.grow_to(
                x + node_width(node) + CANVAS_MARGIN,
                y + NODE_HEIGHT + CANVAS_MARGIN,
            );
        }

        debug!(
            placed = placements.len(),
            width = extent.width,
            height = extent.height,
            "Computed layout"
        );
        LayoutPlan { placements, extent }
    }

    /// Nodes with this offsetter's placements applied
    pub fn assign_layout(&self, nodes: Vec<Node>) -> Vec<Node> {
        let plan = self.plan(&nodes, self.canvas, false);
        apply_plan(nodes, &plan)
    }
}

/// Apply a plan's placements to a node list
pub fn apply_plan(nodes: Vec<Node>, plan: &LayoutPlan) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match plan.placement(&node.name) {
            Some(placement) => node.with_position(Some(placement.x), Some(placement.y)),
            None => node,
        })
        .collect()
}

/// Default-spaced placements for `nodes` in the given mode
pub fn assign_layout(nodes: Vec<Node>, mode: LayoutMode) -> Vec<Node> {
    LayoutOffsetter::new().with_mode(mode).assign_layout(nodes)
}

/// Write a plan's placements into the markup of `adapter`
pub fn commit_layout(text: &str, plan: &LayoutPlan, adapter: Option<&str>) -> String {
    if plan.is_empty() {
        return text.to_string();
    }
    let surgeries: Vec<Surgery> = plan
        .placements
        .iter()
        .map(|p| {
            if p.is_exit {
                Surgery::MoveExit {
                    name: p.name.clone(),
                    x: p.x,
                    y: p.y,
                }
            } else {
                Surgery::Move {
                    name: p.name.clone(),
                    x: p.x,
                    y: p.y,
                }
            }
        })
        .collect();
    debug!(count = surgeries.len(), "Committing layout");
    TextSurgeon::for_adapter(adapter).apply_all(text, &surgeries)
}

/// Estimated drawn width of a node's box
fn node_width(node: &Node) -> i64 {
    let columns = node.name.width().max(node.kind.width()) as i64;
    (columns * CHAR_WIDTH + NODE_PADDING).max(MIN_NODE_WIDTH)
}

impl LayoutAlgorithm<FlowGraph> for LayoutOffsetter {
    type Output = LayoutPlan;

    fn layout(&self, database: &FlowGraph) -> Result<Self::Output> {
        Ok(self.compute_layout(database, self.canvas))
    }

    fn name(&self) -> &'static str {
        "offset"
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn direction(&self) -> &'static str {
        match self.mode {
            LayoutMode::Vertical => "TB",
            LayoutMode::Horizontal => "LR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RECEIVER_PREFIX;

    fn graph(nodes: Vec<Node>) -> FlowGraph {
        let mut graph = FlowGraph::new();
        for node in nodes {
            graph.add_node(node).unwrap();
        }
        graph
    }

    #[test]
    fn test_vertical_slots() {
        let g = graph(vec![
            Node::new("A", "EchoPipe"),
            Node::new("B", "EchoPipe"),
            Node::exit("EXIT"),
        ]);
        let plan = LayoutOffsetter::new().compute_layout(&g, CanvasExtent::default());
        let coords: Vec<(i64, i64)> = plan.placements.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords, vec![(100, 250), (100, 500), (100, 750)]);
        assert!(plan.placements[2].is_exit);
    }

    #[test]
    fn test_horizontal_slots() {
        let g = graph(vec![Node::new("A", "EchoPipe"), Node::new("B", "EchoPipe")]);
        let plan = LayoutOffsetter::new()
            .with_mode(LayoutMode::Horizontal)
            .compute_layout(&g, CanvasExtent::default());
        assert_eq!(plan.placements[0].x, 250);
        assert_eq!(plan.placements[1].x, 500);
        assert!(plan.placements.iter().all(|p| p.y == 100));
    }

    #[test]
    fn test_receivers_use_their_own_band() {
        let receiver = format!("{}In", RECEIVER_PREFIX);
        let g = graph(vec![
            Node::new("A", "EchoPipe"),
            Node::exit("EXIT"),
            Node::new(receiver.clone(), "Receiver"),
        ]);
        let vertical = LayoutOffsetter::new().compute_layout(&g, CanvasExtent::default());
        assert_eq!(vertical.placement("A").map(|p| (p.x, p.y)), Some((100, 250)));
        assert_eq!(vertical.placement("EXIT").map(|p| (p.x, p.y)), Some((100, 500)));
        assert_eq!(vertical.placement(&receiver).map(|p| (p.x, p.y)), Some((500, 250)));

        let horizontal = LayoutOffsetter::new()
            .with_mode(LayoutMode::Horizontal)
            .compute_layout(&g, CanvasExtent::default());
        assert_eq!(horizontal.placement(&receiver).map(|p| (p.x, p.y)), Some((250, 500)));
        assert_eq!(horizontal.placement("EXIT").map(|p| (p.x, p.y)), Some((500, 100)));
    }

    #[test]
    fn test_placed_nodes_keep_their_slot() {
        let g = graph(vec![
            Node::new("A", "EchoPipe").with_position(Some(7), Some(9)),
            Node::new("B", "EchoPipe"),
        ]);
        let plan = LayoutOffsetter::new().compute_layout(&g, CanvasExtent::default());
        assert_eq!(plan.placements.len(), 1);
        assert_eq!(plan.placements[0].name, "B");
        assert_eq!(plan.placements[0].y, 500);
    }

    #[test]
    fn test_full_layout_replaces_coordinates() {
        let g = graph(vec![Node::new("A", "EchoPipe").with_position(Some(7), Some(9))]);
        let plan = LayoutOffsetter::new().compute_full_layout(&g, CanvasExtent::default());
        assert_eq!(plan.placements.len(), 1);
        assert_eq!((plan.placements[0].x, plan.placements[0].y), (100, 250));
    }

    #[test]
    fn test_extent_grows_never_shrinks() {
        let nodes: Vec<Node> = (0..12).map(|i| Node::new(format!("S{}", i), "EchoPipe")).collect();
        let plan = LayoutOffsetter::new().compute_layout(&graph(nodes), CanvasExtent::new(500, 500));
        assert_eq!(plan.extent.height, 12 * 250 + NODE_HEIGHT + CANVAS_MARGIN);
        assert_eq!(plan.extent.width, 500);

        let small = LayoutOffsetter::new()
            .compute_layout(&graph(vec![Node::new("A", "EchoPipe")]), CanvasExtent::new(9000, 9000));
        assert_eq!(small.extent, CanvasExtent::new(9000, 9000));
    }

    #[test]
    fn test_wide_names_widen_the_canvas() {
        let long = "N".repeat(100);
        let g = graph(vec![Node::new(long, "EchoPipe")]);
        let plan = LayoutOffsetter::new()
            .with_mode(LayoutMode::Horizontal)
            .compute_layout(&g, CanvasExtent::new(100, 100));
        assert_eq!(plan.extent.width, 250 + 100 * CHAR_WIDTH + NODE_PADDING + CANVAS_MARGIN);
    }

    #[test]
    fn test_assign_layout() {
        let nodes = assign_layout(
            vec![Node::new("A", "EchoPipe"), Node::new("B", "EchoPipe").with_position(Some(1), Some(2))],
            LayoutMode::Vertical,
        );
        assert_eq!((nodes[0].x, nodes[0].y), (Some(100), Some(250)));
        assert_eq!((nodes[1].x, nodes[1].y), (Some(1), Some(2)));
    }

    #[test]
    fn test_commit_layout() {
        let text = r#"<Adapter name="A"><Pipeline><EchoPipe name="E"/><Exit path="EXIT"/></Pipeline></Adapter>"#;
        let plan = LayoutPlan {
            placements: vec![
                Placement {
                    name: "E".into(),
                    x: 100,
                    y: 250,
                    is_exit: false,
                },
                Placement {
                    name: "EXIT".into(),
                    x: 100,
                    y: 500,
                    is_exit: true,
                },
            ],
            extent: CanvasExtent::default(),
        };
        assert_eq!(
            commit_layout(text, &plan, None),
            r#"<Adapter name="A"><Pipeline><EchoPipe name="E" x="100" y="250"/><Exit path="EXIT" x="100" y="500"/></Pipeline></Adapter>"#
        );
        assert_eq!(commit_layout(text, &LayoutPlan::default(), None), text);
    }
}
