//! Configuration selector
//!
//! Picks the adapter being edited out of a document that may hold several,
//! either directly under the root or grouped into modules. The same rule runs
//! over the markup tree (for the diagram) and over the span-annotated markup
//! (for text surgery) so both always agree on which adapter is current.

use tracing::{debug, trace};

use crate::core::markup::{parse_markup, Element};
use crate::core::{ElementView, MarkupTree, TreeMap};

pub const ADAPTER_TAG: &str = "Adapter";
pub const MODULE_TAG: &str = "Module";

/// The adapter subtree selected for editing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdapterModel {
    /// Nothing could be located
    #[default]
    Empty,
    Adapter(TreeMap),
}

impl AdapterModel {
    pub fn is_empty(&self) -> bool {
        matches!(self, AdapterModel::Empty)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AdapterModel::Adapter(map) => map.attribute("name"),
            AdapterModel::Empty => None,
        }
    }

    pub fn tree(&self) -> Option<&TreeMap> {
        match self {
            AdapterModel::Adapter(map) => Some(map),
            AdapterModel::Empty => None,
        }
    }
}

/// Selects the current adapter from a document
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigurationSelector;

impl ConfigurationSelector {
    pub fn new() -> Self {
        Self
    }

    /// Select from the markup tree; never fails
    pub fn select(&self, tree: &MarkupTree, current: Option<&str>) -> AdapterModel {
        let Some(root) = tree.root().and_then(|(_, value)| value.as_map()) else {
            debug!("Document root holds no elements; no adapter selected");
            return AdapterModel::Empty;
        };

        match select_view(root, current) {
            Some(adapter) => {
                trace!(adapter = ?adapter.attribute("name"), "Selected adapter");
                AdapterModel::Adapter(adapter.clone())
            }
            None => AdapterModel::Empty,
        }
    }

    /// Select from span-annotated markup
    pub fn select_element<'a>(&self, root: &'a Element, current: Option<&str>) -> Option<&'a Element> {
        select_view(root, current)
    }
}

/// Shared selection rule over either representation
fn select_view<'a, V: ElementView>(root: &'a V, current: Option<&str>) -> Option<&'a V> {
    if root.tag() == ADAPTER_TAG {
        return Some(root);
    }

    let matches = |adapter: &V| current.is_some() && adapter.attr("name") == current;

    let modules = root.child_elements(MODULE_TAG);
    if modules.is_empty() {
        let adapters = root.child_elements(ADAPTER_TAG);
        return match adapters.iter().find(|a| matches(a)) {
            Some(adapter) => Some(*adapter),
            None => {
                if current.is_some() {
                    debug!(current = ?current, "Adapter not found; falling back to the first one");
                }
                adapters.first().copied()
            }
        };
    }

    for module in &modules {
        if let Some(adapter) = module
            .child_elements(ADAPTER_TAG)
            .into_iter()
            .find(|a| matches(a))
        {
            return Some(adapter);
        }
    }

    debug!(current = ?current, "Adapter not found in modules; falling back to the first module");
    modules
        .first()
        .and_then(|module| module.child_elements(ADAPTER_TAG).first().copied())
}

/// Adapter open tags as (offset, name), in document order
///
/// Uses the parsed markup when the text is well formed and a plain scan of
/// `<Adapter ...>` tags otherwise, so cursor lookups keep working mid-edit.
fn adapter_tags(text: &str) -> Vec<(usize, String)> {
    if let Ok(root) = parse_markup(text) {
        return root
            .find_all(&|e| e.name == ADAPTER_TAG)
            .into_iter()
            .filter_map(|e| e.attr("name").map(|name| (e.span.start, name.to_string())))
            .collect();
    }

    let open = format!("<{}", ADAPTER_TAG);
    let mut tags = Vec::new();
    let mut cursor = 0;
    while let Some(rel) = text[cursor..].find(&open) {
        let start = cursor + rel;
        cursor = start + open.len();
        if !text[cursor..].starts_with(char::is_whitespace) {
            continue;
        }
        let tag_end = text[cursor..].find('>').map(|i| cursor + i).unwrap_or(text.len());
        if let Some(name) = attribute_in_tag(&text[cursor..tag_end], "name") {
            tags.push((start, name));
        }
    }
    tags
}

/// Value of `key="..."` inside raw opening-tag text
fn attribute_in_tag(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;
    while let Some(pos) = rest.find(key) {
        let preceded_by_space = rest[..pos].ends_with(char::is_whitespace) || pos == 0;
        let after = rest[pos + key.len()..].trim_start();
        if preceded_by_space {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
                let body = &value[1..];
                return body.find(quote).map(|end| body[..end].to_string());
            }
        }
        rest = &rest[pos + key.len()..];
    }
    None
}

/// Names of all adapters in document order
pub fn adapter_names(text: &str) -> Vec<String> {
    adapter_tags(text).into_iter().map(|(_, name)| name).collect()
}

/// The last adapter opened before `offset`
pub fn adapter_at_offset(text: &str, offset: usize) -> Option<String> {
    adapter_tags(text)
        .into_iter()
        .take_while(|(start, _)| *start < offset)
        .last()
        .map(|(_, name)| name)
}
