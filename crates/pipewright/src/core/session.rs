//! Editor session state and reference-data collaborators
//!
//! The session holds everything that survives between rebuilds: the raw text,
//! the adapter being edited and whatever reference data the host has handed
//! over. Providers are plain traits; the host decides where the data comes
//! from.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::EditorError;
use super::markup::parse_markup;

/// Catalog entry describing a stage kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageKind {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl StageKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Parse a catalog given as a JSON array of kinds
pub fn parse_catalog(json: &str) -> Result<Vec<StageKind>, EditorError> {
    serde_json::from_str(json).map_err(|e| EditorError::invalid_reference_data(e.to_string()))
}

/// A stored configuration the user can open
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedConfiguration {
    pub name: String,
    pub text: String,
}

/// Source of the configuration schema text
pub trait SchemaProvider {
    /// Schema text, or `None` when not available
    fn schema(&self) -> Option<String>;
}

/// Source of the stage-kind catalog
pub trait CatalogProvider {
    fn catalog(&self) -> Vec<StageKind>;
}

/// Source of saved configurations
pub trait ConfigurationProvider {
    fn configurations(&self) -> Vec<SavedConfiguration>;
}

/// Reference data already in memory
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceData {
    pub schema: Option<String>,
    pub catalog: Vec<StageKind>,
    pub configurations: Vec<SavedConfiguration>,
}

impl SchemaProvider for StaticReferenceData {
    fn schema(&self) -> Option<String> {
        self.schema.clone()
    }
}

impl CatalogProvider for StaticReferenceData {
    fn catalog(&self) -> Vec<StageKind> {
        self.catalog.clone()
    }
}

impl ConfigurationProvider for StaticReferenceData {
    fn configurations(&self) -> Vec<SavedConfiguration> {
        self.configurations.clone()
    }
}

/// Everything the editor remembers between events
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    pub raw_text: String,
    pub selected_adapter: Option<String>,
    pub cached_schema: Option<String>,
    pub cached_catalog: Vec<StageKind>,
    pub saved_configurations: Vec<SavedConfiguration>,
}

impl EditorSession {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }

    /// Fetch and cache reference data from the providers
    pub fn load_reference_data(
        &mut self,
        schema: &dyn SchemaProvider,
        catalog: &dyn CatalogProvider,
        configurations: &dyn ConfigurationProvider,
    ) {
        self.cached_schema = schema.schema();
        self.cached_catalog = catalog.catalog();
        self.saved_configurations = configurations.configurations();
        info!(
            schema = self.cached_schema.is_some(),
            kinds = self.cached_catalog.len(),
            configurations = self.saved_configurations.len(),
            "Loaded reference data"
        );
    }

    /// True when the catalog is empty or lists `kind`
    pub fn knows_kind(&self, kind: &str) -> bool {
        self.cached_catalog.is_empty() || self.cached_catalog.iter().any(|k| k.name == kind)
    }

    /// Replace the text with a saved configuration; clears the adapter selection
    pub fn open_configuration(&mut self, name: &str) -> Result<(), EditorError> {
        let saved = self
            .saved_configurations
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| EditorError::invalid_reference_data(format!("no saved configuration named {}", name)))?;
        self.raw_text = saved.text.clone();
        self.selected_adapter = None;
        debug!(name, "Opened saved configuration");
        Ok(())
    }
}

const LEGACY_ROOT: &str = "IOS-Adaptering";
const ROOT: &str = "Configuration";

/// Split a response holding several configurations into saved configurations
///
/// Each `<Configuration ...>...</Configuration>` block becomes one entry. The
/// legacy root tag is renamed first. Display names come from the root's
/// `name` attribute, falling back to the block's index.
pub fn split_configurations(text: &str) -> Vec<SavedConfiguration> {
    let text = text.replace(LEGACY_ROOT, ROOT);
    let open = format!("<{}", ROOT);
    let close = format!("</{}>", ROOT);

    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(rel) = text[cursor..].find(&open) {
        let start = cursor + rel;
        let after_name = start + open.len();
        let boundary = text[after_name..].chars().next();
        if !matches!(boundary, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            cursor = after_name;
            continue;
        }

        let end = match text[after_name..].find(&close) {
            Some(rel_end) => after_name + rel_end + close.len(),
            None => match text[after_name..].find("/>") {
                Some(rel_end) => after_name + rel_end + 2,
                None => break,
            },
        };

        let block = &text[start..end];
        let name = parse_markup(block)
            .ok()
            .and_then(|root| root.attribute("name").map(|a| a.value.clone()))
            .unwrap_or_else(|| found.len().to_string());
        found.push(SavedConfiguration {
            name,
            text: block.to_string(),
        });
        cursor = end;
    }

    debug!(count = found.len(), "Split saved configurations");
    found
}
