//! Markup tree builder
//!
//! Converts markup text into a generic nested key/value tree. Attributes are
//! kept as `@name` entries, repeated children always form an ordered sequence
//! (even when there is only one), and text content is stored escaped so the
//! tree serializes to JSON without further quoting.

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, span, trace, Level};

use super::error::EditorError;
use super::markup::{parse_markup, Content, Element};

/// Read-only view of an element, shared by the tree and the span-annotated
/// markup so selection logic can run against either
pub trait ElementView {
    /// Tag name
    fn tag(&self) -> &str;

    /// Children with the given tag, in document order
    fn child_elements(&self, tag: &str) -> Vec<&Self>;

    /// Decoded attribute value
    fn attr(&self, key: &str) -> Option<&str>;
}

/// A node of the markup tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TreeValue {
    /// Element present but empty
    #[default]
    Null,
    /// Escaped text content
    Text(String),
    Map(TreeMap),
}

impl TreeValue {
    pub fn as_map(&self) -> Option<&TreeMap> {
        match self {
            TreeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Escaped text of a leaf, or the `#text` entry of a mapping
    pub fn text(&self) -> Option<&str> {
        match self {
            TreeValue::Text(text) => Some(text),
            TreeValue::Map(map) => map.text.as_deref().or(map.cdata.as_deref()),
            TreeValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TreeValue::Null)
    }
}

/// Element mapping: attributes, named child sequences and text content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeMap {
    /// Tag of the element this mapping was built from
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// Child sequences keyed by tag, in order of first appearance
    pub children: Vec<(String, Vec<TreeValue>)>,
    pub text: Option<String>,
    pub cdata: Option<String>,
    /// Document order of child elements as (sequence, position) indices
    order: Vec<(usize, usize)>,
}

impl TreeMap {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The sequence of children with the given tag (empty if none)
    pub fn children(&self, tag: &str) -> &[TreeValue] {
        self.children
            .iter()
            .find(|(k, _)| k == tag)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// First child with the given tag
    pub fn child(&self, tag: &str) -> Option<&TreeValue> {
        self.children(tag).first()
    }

    /// Child element tags in order of first appearance
    pub fn child_tags(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(k, _)| k.as_str())
    }

    /// Child elements with their tags, in document order
    pub fn elements_in_order(&self) -> impl Iterator<Item = (&str, &TreeValue)> {
        self.order.iter().filter_map(|&(seq, pos)| {
            self.children
                .get(seq)
                .and_then(|(tag, values)| values.get(pos).map(|v| (tag.as_str(), v)))
        })
    }

    pub fn push_child(&mut self, tag: &str, value: TreeValue) {
        match self.children.iter().position(|(k, _)| k == tag) {
            Some(seq) => {
                self.order.push((seq, self.children[seq].1.len()));
                self.children[seq].1.push(value);
            }
            None => {
                self.order.push((self.children.len(), 0));
                self.children.push((tag.to_string(), vec![value]));
            }
        }
    }
}

impl ElementView for TreeMap {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn child_elements(&self, tag: &str) -> Vec<&Self> {
        self.children(tag).iter().filter_map(TreeValue::as_map).collect()
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attribute(key)
    }
}

impl Serialize for TreeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TreeValue::Null => serializer.serialize_none(),
            TreeValue::Text(text) => serializer.serialize_str(text),
            TreeValue::Map(map) => map.serialize(serializer),
        }
    }
}

impl Serialize for TreeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.attributes.len()
            + self.children.len()
            + usize::from(self.text.is_some())
            + usize::from(self.cdata.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, value) in &self.attributes {
            map.serialize_entry(&format!("@{}", key), value)?;
        }
        for (key, values) in &self.children {
            map.serialize_entry(key, values)?;
        }
        if let Some(text) = &self.text {
            map.serialize_entry("#text", text)?;
        }
        if let Some(cdata) = &self.cdata {
            map.serialize_entry("#cdata", cdata)?;
        }
        map.end()
    }
}

/// The tree for a whole document: a mapping holding the root element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupTree {
    pub document: TreeMap,
}

impl MarkupTree {
    /// Tag and value of the single top-level element
    pub fn root(&self) -> Option<(&str, &TreeValue)> {
        self.document
            .children
            .first()
            .and_then(|(tag, seq)| seq.first().map(|v| (tag.as_str(), v)))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document)
    }
}

impl Serialize for MarkupTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

/// Convert markup text into a markup tree
pub fn to_tree(markup: &str) -> Result<MarkupTree, EditorError> {
    let tree_span = span!(Level::DEBUG, "to_tree", input_len = markup.len());
    let _enter = tree_span.enter();

    let root = parse_markup(markup)?;
    Ok(tree_from_element(markup, &root))
}

/// Build the tree from an already parsed root element
pub fn tree_from_element(markup: &str, root: &Element) -> MarkupTree {
    let mut document = TreeMap::new("#document");
    document.push_child(&root.name, element_value(markup, root));
    debug!(root = %root.name, "Built markup tree");
    MarkupTree { document }
}

fn element_value(markup: &str, element: &Element) -> TreeValue {
    let mut text_children = 0usize;
    let mut cdata_children = 0usize;
    let mut has_elements = false;
    for child in &element.children {
        match child {
            Content::Text { text, .. } if !text.trim().is_empty() => text_children += 1,
            Content::CData { .. } => cdata_children += 1,
            Content::Element(_) => has_elements = true,
            _ => {}
        }
    }

    if element.attributes.is_empty() && text_children == 0 && cdata_children == 0 && !has_elements {
        return TreeValue::Null;
    }

    let mut map = TreeMap::new(element.name.clone());
    map.attributes = element
        .attributes
        .iter()
        .map(|a| (a.name.clone(), a.value.clone()))
        .collect();

    if has_elements {
        if text_children < 2 && cdata_children < 2 {
            for child in &element.children {
                match child {
                    Content::Element(e) => map.push_child(&e.name, element_value(markup, e)),
                    Content::Text { text, .. } if !text.trim().is_empty() => {
                        map.text = Some(escape_text(text));
                    }
                    Content::CData { text, .. } => map.cdata = Some(escape_text(text)),
                    _ => {}
                }
            }
        } else {
            trace!(tag = %element.name, "Collapsing mixed content to raw markup");
            let inner = element
                .inner_span()
                .map(|s| s.slice(markup))
                .unwrap_or_default();
            return leaf_or_text(map, escape_text(inner));
        }
    } else if text_children > 0 || cdata_children > 0 {
        let text: String = element
            .children
            .iter()
            .filter_map(|c| match c {
                Content::Text { text, .. } | Content::CData { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        return leaf_or_text(map, escape_text(&text));
    }

    TreeValue::Map(map)
}

fn leaf_or_text(mut map: TreeMap, text: String) -> TreeValue {
    if map.attributes.is_empty() {
        TreeValue::Text(text)
    } else {
        map.text = Some(text);
        TreeValue::Map(map)
    }
}

/// Escape text for storage in the tree
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Exact inverse of [`escape_text`]
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
