//! Command-line interface for the pipewright utility
//!
//! Inspects adapter configurations (tree, adapters, diagram) and applies
//! diagram edits to them from the shell.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use pipewright::core::logging::{init_logging, FORMAT_ENV, LEVEL_ENV};
use pipewright::plugins::{adapter_names, AdapterParser, DiagramEvent, FlowGraph, Orchestrator};
use pipewright::Parser as _;
use pipewright::{to_tree, EditorConfig, LayoutMode};

/// Pipewright - keep adapter configurations and their flow diagrams in sync
#[derive(Parser)]
#[command(name = "pipewright")]
#[command(about = "Inspect and edit pipeline adapter configurations and their flow diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the markup tree as JSON
    Tree {
        /// Input configuration file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List adapter names in document order
    Adapters {
        /// Input configuration file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print a JSON summary of each adapter's diagram
        #[arg(long)]
        json: bool,
    },

    /// Print the diagram of one adapter as JSON
    Graph {
        /// Input configuration file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the diagram (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        editor: EditorArgs,

        /// Write committed placements back into the input file
        #[arg(long)]
        write: bool,
    },

    /// Apply one diagram edit and write the resulting markup
    Edit {
        /// Input configuration file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the edited markup (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        editor: EditorArgs,

        #[command(subcommand)]
        operation: EditOperation,
    },

    /// Check that a diagram can be built
    Validate {
        /// Input configuration file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Adapter to validate (defaults to the first)
        #[arg(long)]
        adapter: Option<String>,
    },
}

/// Options shared by commands that run the editor
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EditorArgs {
    /// Adapter to work on (defaults to the first)
    #[arg(long)]
    pub adapter: Option<String>,

    /// Lay out unplaced nodes left to right
    #[arg(long)]
    pub horizontal: bool,

    /// Do not write fallback placements into the markup
    #[arg(long)]
    pub no_commit: bool,

    /// JSON editor configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Diagram edits available from the command line
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Rename a stage and every reference to it
    Rename { old: String, new: String },
    /// Position a stage or receiver
    Move {
        name: String,
        #[arg(allow_negative_numbers = true)]
        x: i64,
        #[arg(allow_negative_numbers = true)]
        y: i64,
    },
    /// Position an exit
    MoveExit {
        name: String,
        #[arg(allow_negative_numbers = true)]
        x: i64,
        #[arg(allow_negative_numbers = true)]
        y: i64,
    },
    /// Add a success forward
    Connect { source: String, target: String },
    /// Remove forwards between two nodes
    Disconnect { source: String, target: String },
    /// Insert a stage before the exits
    AddStage {
        name: String,
        x: i64,
        y: i64,
        /// Stage kind (element tag)
        #[arg(long, default_value = "EchoPipe")]
        kind: String,
    },
    /// Change a stage's kind
    ChangeKind { name: String, kind: String },
    /// Set an attribute on a stage
    SetAttribute {
        name: String,
        key: String,
        value: String,
    },
    /// Remove an attribute from a stage
    RemoveAttribute { name: String, key: String },
}

impl From<EditOperation> for DiagramEvent {
    fn from(operation: EditOperation) -> Self {
        match operation {
            EditOperation::Rename { old, new } => DiagramEvent::Rename { old, new },
            EditOperation::Move { name, x, y } => DiagramEvent::Move { name, x, y },
            EditOperation::MoveExit { name, x, y } => DiagramEvent::MoveExit { name, x, y },
            EditOperation::Connect { source, target } => DiagramEvent::Connect { source, target },
            EditOperation::Disconnect { source, target } => {
                DiagramEvent::Disconnect { source, target }
            }
            EditOperation::AddStage { name, x, y, kind } => {
                DiagramEvent::AddStage { name, x, y, kind }
            }
            EditOperation::ChangeKind { name, kind } => DiagramEvent::ChangeKind { name, kind },
            EditOperation::SetAttribute { name, key, value } => {
                DiagramEvent::SetAttribute { name, key, value }
            }
            EditOperation::RemoveAttribute { name, key } => {
                DiagramEvent::RemoveAttribute { name, key }
            }
        }
    }
}

/// Main CLI application
#[derive(Default)]
pub struct PipewrightApp;

impl PipewrightApp {
    pub fn new() -> Self {
        Self
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let log_level = std::env::var(LEVEL_ENV)
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| cli.log_level.as_str().to_string());
        let log_format = std::env::var(FORMAT_ENV)
            .ok()
            .unwrap_or_else(|| cli.log_format.as_str().to_string());

        if let Err(e) = init_logging(Some(&log_level), Some(&log_format)) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Pipewright v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Tree { input } => self.tree_command(input, cli.verbose),
            Commands::Adapters { input, json } => self.adapters_command(input, json, cli.verbose),
            Commands::Graph {
                input,
                output,
                editor,
                write,
            } => self.graph_command(input, output, &editor, write, cli.verbose),
            Commands::Edit {
                input,
                output,
                editor,
                operation,
            } => self.edit_command(input, output, &editor, operation, cli.verbose),
            Commands::Validate { input, adapter } => {
                self.validate_command(input, adapter, cli.verbose)
            }
        }
    }

    /// Handle the tree command
    fn tree_command(&self, input: Option<PathBuf>, verbose: bool) -> Result<()> {
        let content = self.read_input(input.as_deref())?;
        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }
        let tree = to_tree(&content)?;
        self.write_output(None, &tree.to_json()?)
    }

    /// Handle the adapters command
    fn adapters_command(&self, input: Option<PathBuf>, json: bool, verbose: bool) -> Result<()> {
        let content = self.read_input(input.as_deref())?;
        let names = adapter_names(&content);
        if verbose {
            eprintln!("Found {} adapter(s)", names.len());
        }
        if json {
            let summaries: Vec<AdapterSummary> = names
                .iter()
                .map(|name| AdapterSummary::from_text(&content, name))
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            return Ok(());
        }
        for name in names {
            println!("{}", name);
        }
        Ok(())
    }

    /// Handle the graph command
    fn graph_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        editor: &EditorArgs,
        write: bool,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input.as_deref())?;
        let mut config = self.build_config(editor)?;
        config.commit_layout = write && !editor.no_commit;

        let orchestrator = self.load(&content, config, editor.adapter.as_deref())?;
        let render = serde_json::to_string_pretty(orchestrator.render())?;
        self.write_output(output.as_deref(), &render)?;

        if write && orchestrator.text() != content {
            let path = input
                .as_deref()
                .filter(|p| !is_stdio(p))
                .ok_or_else(|| anyhow!("--write needs an input file"))?;
            fs::write(path, orchestrator.text())
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            if verbose {
                eprintln!("Committed layout to {}", path.display());
            }
        }
        Ok(())
    }

    /// Handle the edit command
    fn edit_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        editor: &EditorArgs,
        operation: EditOperation,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input.as_deref())?;
        let mut config = self.build_config(editor)?;
        if editor.no_commit {
            config.commit_layout = false;
        }

        let mut orchestrator = self.load(&content, config, editor.adapter.as_deref())?;
        let before = orchestrator.text().to_string();
        orchestrator.handle_event(operation.into())?;
        if verbose && orchestrator.text() == before {
            eprintln!("Edit left the configuration unchanged");
        }
        self.write_output(output.as_deref(), orchestrator.text())
    }

    /// Handle the validate command
    fn validate_command(
        &self,
        input: Option<PathBuf>,
        adapter: Option<String>,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input.as_deref())?;
        let config = EditorConfig::default().with_commit_layout(false);
        match self.load(&content, config, adapter.as_deref()) {
            Ok(orchestrator) => {
                if verbose {
                    eprintln!(
                        "{} node(s), {} edge(s)",
                        orchestrator.render().nodes.len(),
                        orchestrator.render().edges.len()
                    );
                }
                println!(
                    "✓ Valid adapter {}",
                    orchestrator.selected_adapter().unwrap_or("<unnamed>")
                );
                Ok(())
            }
            Err(e) => {
                println!("✗ Invalid configuration: {}", e);
                Err(e)
            }
        }
    }

    fn build_config(&self, editor: &EditorArgs) -> Result<EditorConfig> {
        let mut config = match &editor.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config '{}'", path.display()))?;
                EditorConfig::from_json(&json)?
            }
            None => EditorConfig::default(),
        };
        if editor.horizontal {
            config.layout_mode = LayoutMode::Horizontal;
        }
        debug!(?config, "Editor configuration");
        Ok(config)
    }

    /// Build the diagram for `content`, switching adapter when asked
    fn load(
        &self,
        content: &str,
        config: EditorConfig,
        adapter: Option<&str>,
    ) -> Result<Orchestrator> {
        let mut orchestrator = Orchestrator::new(config);
        orchestrator.text_changed(content)?;
        if let Some(name) = adapter {
            orchestrator.select_adapter(name)?;
        }
        Ok(orchestrator)
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<&Path>) -> Result<String> {
        match input {
            Some(path) if !is_stdio(path) => fs::read_to_string(path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<&Path>, content: &str) -> Result<()> {
        match output {
            Some(path) if !is_stdio(path) => fs::write(path, content)
                .map_err(|e| anyhow!("Failed to write output file '{}': {}", path.display(), e)),
            _ => {
                if content.is_empty() || content.ends_with('\n') {
                    print!("{}", content);
                } else {
                    println!("{}", content);
                }
                io::stdout().flush()?;
                Ok(())
            }
        }
    }
}

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

/// One row of `adapters --json`
#[derive(Debug, Serialize)]
struct AdapterSummary {
    name: String,
    stages: usize,
    exits: usize,
    receivers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AdapterSummary {
    fn from_text(text: &str, name: &str) -> Self {
        let mut graph = FlowGraph::new();
        let error = AdapterParser::for_adapter(name)
            .parse(text, &mut graph)
            .err()
            .map(|e| e.to_string());
        Self {
            name: name.to_string(),
            stages: graph.stages().count(),
            exits: graph.exits().count(),
            receivers: graph.receivers().count(),
            error,
        }
    }
}
