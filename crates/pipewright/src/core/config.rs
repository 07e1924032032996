//! Editor configuration
//!
//! Controls the fallback layout and whether computed placements are written
//! back into the markup. Every field has a default, so a partial JSON object
//! is a valid configuration.

use serde::{Deserialize, Serialize};

use super::error::EditorError;
use super::types::{CanvasExtent, LayoutMode};

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Axis the fallback layout walks along
    pub layout_mode: LayoutMode,
    /// Distance between consecutive layout slots
    pub slot_step: i64,
    /// Fixed coordinate on the axis the layout does not walk
    pub band_offset: i64,
    /// Initial canvas extent; grows as nodes are placed
    pub canvas: CanvasExtent,
    /// Write fallback placements into the markup after each rebuild
    pub commit_layout: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            layout_mode: LayoutMode::Vertical,
            slot_step: 250,
            band_offset: 100,
            canvas: CanvasExtent::default(),
            commit_layout: true,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json).map_err(|e| EditorError::invalid_reference_data(e.to_string()))
    }

    pub fn with_layout_mode(mut self, mode: LayoutMode) -> Self {
        self.layout_mode = mode;
        self
    }

    pub fn with_commit_layout(mut self, commit: bool) -> Self {
        self.commit_layout = commit;
        self
    }
}
