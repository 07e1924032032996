//! Core abstractions for configuration editing
//!
//! Generic pieces shared by every plugin: the span-annotated markup parser,
//! the markup tree, text patches, session state and the traits that plugins
//! implement.

mod config;
mod database;
mod error;
mod layout;
pub mod logging;
pub mod markup;
pub mod patch;
mod parser;
pub mod session;
pub mod tree;
mod types;

pub use config::*;
pub use database::*;
pub use error::*;
pub use layout::*;
pub use logging::*;
pub use parser::*;
pub use patch::{apply_patches, TextPatch};
pub use session::{
    parse_catalog, split_configurations, CatalogProvider, ConfigurationProvider, EditorSession,
    SavedConfiguration, SchemaProvider, StageKind, StaticReferenceData,
};
pub use tree::{escape_text, to_tree, unescape_text, ElementView, MarkupTree, TreeMap, TreeValue};
pub use types::*;
