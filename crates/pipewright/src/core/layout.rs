//! Core layout trait for diagram positioning
//!
//! A layout algorithm reads a database and decides where nodes go. It does not
//! mutate the database; callers apply the output themselves.

use anyhow::Result;

use super::Database;

/// Core trait for layout algorithms
///
/// # Example
/// ```
/// use pipewright::core::{Database, LayoutAlgorithm, Node};
/// use pipewright::plugins::adapter::{FlowGraph, LayoutOffsetter};
///
/// let mut db = FlowGraph::new();
/// db.add_node(Node::new("A", "EchoPipe")).unwrap();
/// let plan = LayoutOffsetter::new().layout(&db).unwrap();
/// assert_eq!(plan.placements.len(), 1);
/// ```
pub trait LayoutAlgorithm<D: Database>: Send + Sync {
    /// The output type of this layout algorithm
    type Output;

    /// Arrange elements in the database using this layout algorithm
    fn layout(&self, database: &D) -> Result<Self::Output>;

    /// Get the name of this layout algorithm
    fn name(&self) -> &'static str;

    /// Get the version of this layout algorithm
    fn version(&self) -> &'static str;

    /// Get the layout direction (TB or LR)
    fn direction(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LayoutMode, Node};
    use crate::plugins::adapter::{FlowGraph, LayoutOffsetter};

    #[test]
    fn test_layout_algorithm_metadata() {
        let layout = LayoutOffsetter::new();
        assert_eq!(layout.name(), "offset");
        assert_eq!(layout.version(), "0.1.0");
        assert_eq!(layout.direction(), "TB");
        assert_eq!(
            LayoutOffsetter::new().with_mode(LayoutMode::Horizontal).direction(),
            "LR"
        );
    }

    #[test]
    fn test_basic_layout() {
        let layout = LayoutOffsetter::new();
        let mut database = FlowGraph::new();
        database.add_node(Node::new("A", "EchoPipe")).unwrap();
        database
            .add_node(Node::new("B", "EchoPipe").with_position(Some(5), Some(5)))
            .unwrap();

        let plan = layout.layout(&database).unwrap();
        assert_eq!(plan.placements.len(), 1);
        assert_eq!(plan.placements[0].name, "A");
        assert!(plan.extent.width > 0);
    }
}
