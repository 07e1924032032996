//! Core type definitions for the editor
//!
//! Nodes, edges, byte spans, layout modes and the render payload handed to the
//! diagram surface. Node and edge coordinates are caches: the markup text owns
//! the authoritative copy and these are rebuilt on every cycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix given to synthesized receiver nodes so they never collide with a stage
pub const RECEIVER_PREFIX: &str = "(receiver): ";

/// Half-open byte range into the markup text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span used for insertions
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True when the two spans share at least one byte, or one is an
    /// insertion strictly inside the other
    pub fn overlaps(&self, other: &Span) -> bool {
        if self.is_empty() || other.is_empty() {
            let (point, range) = if self.is_empty() {
                (self.start, other)
            } else {
                (other.start, self)
            };
            return range.start < point && point < range.end;
        }
        self.start < other.end && other.start < self.end
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Which axis the fallback layout walks along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Nodes stacked top to bottom in a fixed column
    #[default]
    Vertical,
    /// Nodes placed left to right in a fixed band
    Horizontal,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMode::Vertical => write!(f, "vertical"),
            LayoutMode::Horizontal => write!(f, "horizontal"),
        }
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vertical" | "v" | "td" => Ok(LayoutMode::Vertical),
            "horizontal" | "h" | "lr" => Ok(LayoutMode::Horizontal),
            _ => Err(format!("Unknown layout mode: {}", s)),
        }
    }
}

/// Width/height bound of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasExtent {
    pub width: i64,
    pub height: i64,
}

impl CanvasExtent {
    pub fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }

    /// Grow to cover the given point; never shrinks
    pub fn grow_to(&mut self, right: i64, bottom: i64) -> bool {
        let mut grown = false;
        if right > self.width {
            self.width = right;
            grown = true;
        }
        if bottom > self.height {
            self.height = bottom;
            grown = true;
        }
        grown
    }
}

impl Default for CanvasExtent {
    fn default() -> Self {
        Self::new(2000, 2000)
    }
}

/// A diagram node: a stage, a receiver or an exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Identity within the adapter
    pub name: String,
    /// Kind label, usually the stage's tag
    pub kind: String,
    pub x: Option<i64>,
    pub y: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_exit: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            x: None,
            y: None,
            preview: None,
            description: None,
            is_exit: false,
        }
    }

    pub fn exit(name: impl Into<String>) -> Self {
        Self {
            is_exit: true,
            ..Self::new(name, "Exit")
        }
    }

    pub fn with_position(mut self, x: Option<i64>, y: Option<i64>) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn is_receiver(&self) -> bool {
        self.name.starts_with(RECEIVER_PREFIX)
    }

    /// Both coordinates known
    pub fn is_placed(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }
}

/// A directed, labelled connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub label: String,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
        }
    }
}

/// Fallback coordinates chosen for a node that had none
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub is_exit: bool,
}

/// Everything the diagram surface needs to draw one adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramRender {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub canvas_extent: CanvasExtent,
}

impl DiagramRender {
    /// Drop duplicate (source, target) pairs and edges with a missing endpoint
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>, canvas_extent: CanvasExtent) -> Self {
        let mut seen = std::collections::HashSet::new();
        let edges = edges
            .into_iter()
            .filter(|edge| {
                let known = nodes.iter().any(|n| n.name == edge.source)
                    && nodes.iter().any(|n| n.name == edge.target);
                if !known {
                    tracing::warn!(
                        source = %edge.source,
                        target = %edge.target,
                        "Dropping edge with unknown endpoint"
                    );
                }
                known && seen.insert((edge.source.clone(), edge.target.clone()))
            })
            .collect();

        Self {
            nodes,
            edges,
            canvas_extent,
        }
    }

    pub fn empty(canvas_extent: CanvasExtent) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            canvas_extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_overlap() {
        let a = Span::new(0, 10);
        assert!(a.overlaps(&Span::new(5, 15)));
        assert!(!a.overlaps(&Span::new(10, 12)));
        assert!(a.overlaps(&Span::at(4)));
        assert!(!a.overlaps(&Span::at(10)));
        assert!(!Span::at(3).overlaps(&Span::at(3)));
    }

    #[test]
    fn test_layout_mode_parsing() {
        assert_eq!("Horizontal".parse::<LayoutMode>(), Ok(LayoutMode::Horizontal));
        assert_eq!("v".parse::<LayoutMode>(), Ok(LayoutMode::Vertical));
        assert!("diagonal".parse::<LayoutMode>().is_err());
        assert_eq!(LayoutMode::default().to_string(), "vertical");
    }

    #[test]
    fn test_canvas_extent_never_shrinks() {
        let mut extent = CanvasExtent::new(100, 100);
        assert!(!extent.grow_to(50, 80));
        assert_eq!(extent, CanvasExtent::new(100, 100));
        assert!(extent.grow_to(150, 90));
        assert_eq!(extent, CanvasExtent::new(150, 100));
    }

    #[test]
    fn test_render_dedupes_and_drops_dangling_edges() {
        let nodes = vec![Node::new("A", "EchoPipe"), Node::new("B", "EchoPipe")];
        let edges = vec![
            Edge::new("A", "B", "success"),
            Edge::new("A", "B", "failure"),
            Edge::new("A", "Nowhere", "success"),
        ];
        let render = DiagramRender::new(nodes, edges, CanvasExtent::default());
        assert_eq!(render.edges, vec![Edge::new("A", "B", "success")]);
    }

    #[test]
    fn test_receiver_naming() {
        let node = Node::new(format!("{}Listener", RECEIVER_PREFIX), "Receiver");
        assert!(node.is_receiver());
        assert!(!Node::exit("EXIT").is_receiver());
        assert!(Node::exit("EXIT").is_exit);
    }
}
