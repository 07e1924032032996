//! Text surgeon
//!
//! Structural edits applied directly to the markup text. Each edit locates
//! its target in a span-annotated parse of the current adapter, produces span
//! patches and leaves every byte outside those spans untouched. An edit whose
//! target cannot be found (including unparsable text) returns the input
//! unchanged.

use std::fmt;

use serde::Serialize;
use tracing::{debug, span, trace, Level};

use super::graph::{is_stage_tag, EXITS_TAG, EXIT_TAG, FORWARD_TAG, PIPELINE_TAG, RECEIVER_TAG};
use super::selector::ConfigurationSelector;
use crate::core::markup::{escape_attribute, parse_markup, Element};
use crate::core::{apply_patches, ElementView, Span, TextPatch, RECEIVER_PREFIX};

/// One structural edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Surgery {
    /// Rename a stage and every reference to it
    Rename { old: String, new: String },
    /// Position a stage or receiver
    Move { name: String, x: i64, y: i64 },
    /// Position an exit
    MoveExit { name: String, x: i64, y: i64 },
    /// Add a `success` forward from `source` to `target`
    Connect { source: String, target: String },
    /// Remove every forward from `source` to `target`
    Disconnect { source: String, target: String },
    /// Add a stage in front of the pipeline's exits
    InsertStage {
        name: String,
        x: i64,
        y: i64,
        kind: String,
    },
    /// Change a stage's tag
    ChangeKind { name: String, kind: String },
    SetAttribute {
        name: String,
        key: String,
        value: String,
    },
    RemoveAttribute { name: String, key: String },
}

impl Surgery {
    pub fn label(&self) -> &'static str {
        match self {
            Surgery::Rename { .. } => "rename",
            Surgery::Move { .. } => "move",
            Surgery::MoveExit { .. } => "move_exit",
            Surgery::Connect { .. } => "connect",
            Surgery::Disconnect { .. } => "disconnect",
            Surgery::InsertStage { .. } => "insert_stage",
            Surgery::ChangeKind { .. } => "change_kind",
            Surgery::SetAttribute { .. } => "set_attribute",
            Surgery::RemoveAttribute { .. } => "remove_attribute",
        }
    }
}

impl fmt::Display for Surgery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surgery::Rename { old, new } => write!(f, "rename {} -> {}", old, new),
            Surgery::Move { name, x, y } => write!(f, "move {} to ({}, {})", name, x, y),
            Surgery::MoveExit { name, x, y } => write!(f, "move exit {} to ({}, {})", name, x, y),
            Surgery::Connect { source, target } => write!(f, "connect {} -> {}", source, target),
            Surgery::Disconnect { source, target } => {
                write!(f, "disconnect {} -> {}", source, target)
            }
            Surgery::InsertStage { name, kind, .. } => write!(f, "insert {} {}", kind, name),
            Surgery::ChangeKind { name, kind } => write!(f, "change {} to {}", name, kind),
            Surgery::SetAttribute { name, key, value } => {
                write!(f, "set {}@{}={}", name, key, value)
            }
            Surgery::RemoveAttribute { name, key } => write!(f, "remove {}@{}", name, key),
        }
    }
}

/// Applies surgeries to the adapter that the diagram currently shows
#[derive(Debug, Clone, Default)]
pub struct TextSurgeon {
    adapter: Option<String>,
}

impl TextSurgeon {
    /// Surgeon for the first adapter in the document
    pub fn new() -> Self {
        Self::default()
    }

    /// Surgeon scoped to the named adapter, with the usual selection fallback
    pub fn for_adapter(adapter: Option<&str>) -> Self {
        Self {
            adapter: adapter.map(str::to_string),
        }
    }

    pub fn apply(&self, text: &str, surgery: &Surgery) -> String {
        self.apply_all(text, std::slice::from_ref(surgery))
    }

    /// Apply several surgeries located against the same parse
    ///
    /// Surgeries in one batch must target different structural units; a
    /// patch that overlaps an earlier one is dropped.
    pub fn apply_all(&self, text: &str, surgeries: &[Surgery]) -> String {
        let surgery_span = span!(Level::DEBUG, "text_surgery", count = surgeries.len());
        let _enter = surgery_span.enter();

        let root = match parse_markup(text) {
            Ok(root) => root,
            Err(err) => {
                debug!(error = %err, "Markup unparsable; surgery skipped");
                return text.to_string();
            }
        };
        let Some(scope) = Scope::new(&root, self.adapter.as_deref()) else {
            debug!(adapter = ?self.adapter, "No adapter to edit; surgery skipped");
            return text.to_string();
        };

        let mut patches = Vec::new();
        for surgery in surgeries {
            match scope.patches(text, surgery) {
                Some(found) if !found.is_empty() => {
                    trace!(surgery = %surgery, patches = found.len(), "Located surgery");
                    patches.extend(found);
                }
                _ => debug!(surgery = %surgery, "Surgery target not found; no-op"),
            }
        }

        if patches.is_empty() {
            return text.to_string();
        }
        apply_patches(text, patches)
    }

    /// Span of the named stage, receiver or exit
    pub fn locate_stage(&self, text: &str, name: &str) -> Option<Span> {
        let root = parse_markup(text).ok()?;
        let scope = Scope::new(&root, self.adapter.as_deref())?;
        scope
            .positioned(name)
            .or_else(|| scope.exit(name))
            .map(|element| element.span)
    }

    pub fn rename(&self, text: &str, old: &str, new: &str) -> String {
        self.apply(
            text,
            &Surgery::Rename {
                old: old.to_string(),
                new: new.to_string(),
            },
        )
    }

    pub fn move_stage(&self, text: &str, name: &str, x: i64, y: i64) -> String {
        self.apply(
            text,
            &Surgery::Move {
                name: name.to_string(),
                x,
                y,
            },
        )
    }

    pub fn move_exit(&self, text: &str, name: &str, x: i64, y: i64) -> String {
        self.apply(
            text,
            &Surgery::MoveExit {
                name: name.to_string(),
                x,
                y,
            },
        )
    }

    pub fn connect(&self, text: &str, source: &str, target: &str) -> String {
        self.apply(
            text,
            &Surgery::Connect {
                source: source.to_string(),
                target: target.to_string(),
            },
        )
    }

    pub fn disconnect(&self, text: &str, source: &str, target: &str) -> String {
        self.apply(
            text,
            &Surgery::Disconnect {
                source: source.to_string(),
                target: target.to_string(),
            },
        )
    }

    pub fn insert_stage(&self, text: &str, name: &str, x: i64, y: i64, kind: &str) -> String {
        self.apply(
            text,
            &Surgery::InsertStage {
                name: name.to_string(),
                x,
                y,
                kind: kind.to_string(),
            },
        )
    }

    pub fn change_kind(&self, text: &str, name: &str, kind: &str) -> String {
        self.apply(
            text,
            &Surgery::ChangeKind {
                name: name.to_string(),
                kind: kind.to_string(),
            },
        )
    }

    pub fn set_attribute(&self, text: &str, name: &str, key: &str, value: &str) -> String {
        self.apply(
            text,
            &Surgery::SetAttribute {
                name: name.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    pub fn remove_attribute(&self, text: &str, name: &str, key: &str) -> String {
        self.apply(
            text,
            &Surgery::RemoveAttribute {
                name: name.to_string(),
                key: key.to_string(),
            },
        )
    }
}

/// The located adapter and its pipeline
struct Scope<'a> {
    adapter: &'a Element,
    pipeline: Option<&'a Element>,
}

impl<'a> Scope<'a> {
    fn new(root: &'a Element, adapter: Option<&str>) -> Option<Self> {
        let adapter = ConfigurationSelector::new().select_element(root, adapter)?;
        let pipeline = adapter.children_named(PIPELINE_TAG).next();
        Some(Self { adapter, pipeline })
    }

    fn stages(&self) -> impl Iterator<Item = &'a Element> {
        self.pipeline
            .into_iter()
            .flat_map(|pipeline| pipeline.elements())
            .filter(|e| is_stage_tag(&e.name))
    }

    fn stage(&self, name: &str) -> Option<&'a Element> {
        self.stages().find(|e| e.attr("name") == Some(name))
    }

    fn receiver(&self, name: &str) -> Option<&'a Element> {
        let name = name.strip_prefix(RECEIVER_PREFIX)?;
        self.adapter
            .children_named(RECEIVER_TAG)
            .find(|e| e.attr("name") == Some(name))
    }

    /// Stage, or receiver when the name carries the receiver prefix
    fn positioned(&self, name: &str) -> Option<&'a Element> {
        self.stage(name).or_else(|| self.receiver(name))
    }

    /// True when a stage, exit or receiver node already carries `name`
    fn name_taken(&self, name: &str) -> bool {
        self.stage(name).is_some() || self.exit(name).is_some() || self.receiver(name).is_some()
    }

    fn exit(&self, name: &str) -> Option<&'a Element> {
        let pipeline = self.pipeline?;
        pipeline
            .elements()
            .flat_map(|e| match e.name.as_str() {
                EXIT_TAG => vec![e],
                EXITS_TAG => e.children_named(EXIT_TAG).collect(),
                _ => Vec::new(),
            })
            .find(|exit| {
                exit.attr("path")
                    .or_else(|| exit.attr("name"))
                    == Some(name)
            })
    }

    fn patches(&self, text: &str, surgery: &Surgery) -> Option<Vec<TextPatch>> {
        match surgery {
            Surgery::Rename { old, new } => self.rename(old, new),
            Surgery::Move { name, x, y } => Some(set_position(self.positioned(name)?, *x, *y)),
            Surgery::MoveExit { name, x, y } => Some(set_position(self.exit(name)?, *x, *y)),
            Surgery::Connect { source, target } => self.connect(text, source, target),
            Surgery::Disconnect { source, target } => self.disconnect(text, source, target),
            Surgery::InsertStage { name, x, y, kind } => {
                self.insert_stage(text, name, *x, *y, kind)
            }
            Surgery::ChangeKind { name, kind } => self.change_kind(name, kind),
            Surgery::SetAttribute { name, key, value } => {
                if key == "name" {
                    return self.rename(name, value);
                }
                if !is_valid_name(key) {
                    return None;
                }
                let element = self.positioned(name)?;
                let value = escape_attribute(value);
                Some(vec![match element.attribute(key) {
                    Some(attribute) => TextPatch::replace(attribute.value_span, value),
                    None => TextPatch::insert(element.attrs_end, format!(" {}=\"{}\"", key, value)),
                }])
            }
            Surgery::RemoveAttribute { name, key } => {
                if key == "name" {
                    return None;
                }
                let attribute = self.positioned(name)?.attribute(key)?;
                let start = text[..attribute.span.start]
                    .trim_end_matches(char::is_whitespace)
                    .len();
                Some(vec![TextPatch::delete(Span::new(start, attribute.span.end))])
            }
        }
    }

    fn rename(&self, old: &str, new: &str) -> Option<Vec<TextPatch>> {
        if old == new || new.is_empty() {
            return None;
        }

        if old.starts_with(RECEIVER_PREFIX) {
            let new = new.strip_prefix(RECEIVER_PREFIX).unwrap_or(new);
            if self.receiver(&format!("{}{}", RECEIVER_PREFIX, new)).is_some() {
                return None;
            }
            let attribute = self.receiver(old)?.attribute("name")?;
            return Some(vec![TextPatch::replace(attribute.value_span, escape_attribute(new))]);
        }

        let stage = self.stage(old)?;
        if self.name_taken(new) {
            debug!(old, new, "Rename target already names a node");
            return None;
        }

        let escaped = escape_attribute(new);
        let mut patches = Vec::new();
        patches.extend(
            stage
                .attribute("name")
                .map(|a| TextPatch::replace(a.value_span, escaped.clone())),
        );
        for forward in self
            .adapter
            .find_all(&|e| e.name == FORWARD_TAG && e.attr("path") == Some(old))
        {
            patches.extend(
                forward
                    .attribute("path")
                    .map(|a| TextPatch::replace(a.value_span, escaped.clone())),
            );
        }
        if let Some(first) = self
            .pipeline
            .and_then(|p| p.attribute("firstPipe"))
            .filter(|a| a.value == old)
        {
            patches.push(TextPatch::replace(first.value_span, escaped));
        }
        Some(patches)
    }

    fn connect(&self, text: &str, source: &str, target: &str) -> Option<Vec<TextPatch>> {
        let stage = self.stage(source)?;
        if stage
            .children_named(FORWARD_TAG)
            .any(|f| f.attr("path") == Some(target))
        {
            debug!(source, target, "Forward already present");
            return None;
        }

        let forward = format!(
            "<{} name=\"success\" path=\"{}\"/>",
            FORWARD_TAG,
            escape_attribute(target)
        );
        let indent = line_indent(text, stage.span.start);
        let child_indent = self.child_indent(text, stage, &indent);

        let patch = match stage.close_tag {
            None => TextPatch::replace(
                Span::new(stage.open_tag_close(), stage.open_tag.end),
                format!(">\n{}{}\n{}</{}>", child_indent, forward, indent, stage.name),
            ),
            Some(close) => match own_line_start(text, close.start) {
                Some(line_start) => {
                    TextPatch::insert(line_start, format!("{}{}\n", child_indent, forward))
                }
                None => TextPatch::insert(
                    close.start,
                    format!("\n{}{}\n{}", child_indent, forward, indent),
                ),
            },
        };
        Some(vec![patch])
    }

    fn disconnect(&self, text: &str, source: &str, target: &str) -> Option<Vec<TextPatch>> {
        let stage = self.stage(source)?;
        // `exit` matches the exit path in any case
        let any_case = target.eq_ignore_ascii_case("exit");
        let patches: Vec<TextPatch> = stage
            .children_named(FORWARD_TAG)
            .filter(|f| match f.attr("path") {
                Some(path) if any_case => path.eq_ignore_ascii_case(target),
                Some(path) => path == target,
                None => false,
            })
            .map(|f| TextPatch::delete(line_aware(text, f.span)))
            .collect();
        (!patches.is_empty()).then_some(patches)
    }

    fn insert_stage(
        &self,
        text: &str,
        name: &str,
        x: i64,
        y: i64,
        kind: &str,
    ) -> Option<Vec<TextPatch>> {
        if !is_valid_name(kind) || name.is_empty() || self.name_taken(name) {
            return None;
        }
        let anchor = self
            .pipeline?
            .elements()
            .find(|e| e.name == EXIT_TAG || e.name == EXITS_TAG)?;
        let indent = line_indent(text, anchor.span.start);
        let block = format!(
            "<{kind} name=\"{name}\" x=\"{x}\" y=\"{y}\">\n{indent}</{kind}>",
            kind = kind,
            name = escape_attribute(name),
            x = x,
            y = y,
            indent = indent
        );
        let insertion = if own_line_start(text, anchor.span.start).is_some() {
            format!("{}\n{}", block, indent)
        } else {
            block
        };
        Some(vec![TextPatch::insert(anchor.span.start, insertion)])
    }

    fn change_kind(&self, name: &str, kind: &str) -> Option<Vec<TextPatch>> {
        let stage = self.stage(name)?;
        if stage.name == kind || !is_valid_name(kind) {
            return None;
        }
        let mut patches = vec![TextPatch::replace(stage.name_span, kind)];
        if let Some(close) = stage.close_tag {
            let start = close.start + 2;
            patches.push(TextPatch::replace(
                Span::new(start, start + stage.name.len()),
                kind,
            ));
        }
        Some(patches)
    }

    /// Indentation for a new child line inside `stage`
    fn child_indent(&self, text: &str, stage: &Element, indent: &str) -> String {
        if let Some(existing) = stage
            .elements()
            .next()
            .and_then(|child| own_line_start(text, child.span.start).map(|_| child))
        {
            return line_indent(text, existing.span.start);
        }

        let unit = self
            .pipeline
            .map(|p| line_indent(text, p.span.start))
            .and_then(|outer| indent.strip_prefix(outer.as_str()).map(str::to_string))
            .filter(|unit| !unit.is_empty())
            .unwrap_or_else(|| "\t".to_string());
        format!("{}{}", indent, unit)
    }
}

fn set_position(element: &Element, x: i64, y: i64) -> Vec<TextPatch> {
    let mut patches = Vec::new();
    let mut missing = String::new();
    for (key, value) in [("x", x), ("y", y)] {
        match element.attribute(key) {
            Some(attribute) => patches.push(TextPatch::replace(attribute.value_span, value.to_string())),
            None => missing.push_str(&format!(" {}=\"{}\"", key, value)),
        }
    }
    if !missing.is_empty() {
        patches.push(TextPatch::insert(element.attrs_end, missing));
    }
    patches
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || "<>/=!?\"'&".contains(c))
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Start of the line when only whitespace precedes `offset` on it
fn own_line_start(text: &str, offset: usize) -> Option<usize> {
    let start = line_start(text, offset);
    text[start..offset]
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(start)
}

/// Leading whitespace of the line holding `offset`
fn line_indent(text: &str, offset: usize) -> String {
    let start = line_start(text, offset);
    text[start..offset]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Widen `span` to its whole line (newline included) when it stands alone on it
fn line_aware(text: &str, span: Span) -> Span {
    let Some(start) = own_line_start(text, span.start) else {
        return span;
    };
    let rest = &text[span.end..];
    let line_end = rest.find('\n').map(|i| span.end + i);
    let tail = &text[span.end..line_end.unwrap_or(text.len())];
    if !tail.chars().all(|c| c == ' ' || c == '\t' || c == '\r') {
        return span;
    }
    match line_end {
        Some(newline) => Span::new(start, newline + 1),
        None => Span::new(start, text.len()),
    }
}
