// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `validate`: Validate a settings file and optionally a published nodes file
//! - `browse`: Browse an address space snapshot
//! - `expand`: Expand a published nodes file against an address space snapshot
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use uapub_nodes::{BrowseDirection, NodeClass};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uapub - OPC UA publisher node services
///
/// Browses address spaces and expands configured nodes into publishable
/// data set writer entries.
#[derive(Parser, Debug)]
#[command(
    name = "uapub",
    author = "Sylvex <contact@sylvex.io>",
    version = uapub_nodes::VERSION,
    about = "OPC UA publisher node services",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Settings file path (YAML, TOML or JSON)
    #[arg(short, long, env = "UAPUB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the settings file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format; overrides the settings file
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the uapub CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate the settings file
    ///
    /// Loads and validates settings, then the published nodes file when
    /// one is given.
    Validate(ValidateArgs),

    /// Browse an address space snapshot
    ///
    /// Prints the references of a node, or walks everything below it with
    /// `--recursive`.
    Browse(BrowseArgs),

    /// Expand published nodes
    ///
    /// Expands every entry of a published nodes file against an address
    /// space snapshot and prints or writes the resulting entries.
    Expand(ExpandArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Published nodes file to validate as well
    #[arg(short, long)]
    pub published_nodes: Option<PathBuf>,

    /// Show parsed settings after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `browse` command.
#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    /// Address space snapshot (YAML, TOML or JSON)
    #[arg(short, long, env = "UAPUB_ADDRESS_SPACE")]
    pub address_space: PathBuf,

    /// Node to browse; the Objects folder when absent
    #[arg(short, long)]
    pub node_id: Option<String>,

    /// Reference direction
    #[arg(short, long, default_value = "forward")]
    pub direction: Direction,

    /// Reference type to follow (hierarchical references by default)
    #[arg(long)]
    pub reference_type: Option<String>,

    /// Only return targets of these node classes
    #[arg(long, value_delimiter = ',')]
    pub node_class: Vec<NodeClassArg>,

    /// Walk everything below the node
    #[arg(short, long)]
    pub recursive: bool,

    /// Read the value of variables
    #[arg(long)]
    pub values: bool,

    /// References per page; the server limit when absent
    #[arg(long)]
    pub max_references: Option<u32>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `expand` command.
#[derive(Args, Debug, Clone)]
pub struct ExpandArgs {
    /// Address space snapshot (YAML, TOML or JSON)
    #[arg(short, long, env = "UAPUB_ADDRESS_SPACE")]
    pub address_space: PathBuf,

    /// Published nodes file to expand
    #[arg(short, long)]
    pub published_nodes: PathBuf,

    /// Write the expanded entries to this published nodes file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Object search depth
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Variable search depth below each object; 0 is unlimited
    #[arg(long)]
    pub max_levels_to_expand: Option<u32>,

    /// Merge everything into one writer per entry
    #[arg(long)]
    pub single_writer: bool,

    /// Fold component objects into their instance
    #[arg(long)]
    pub flatten: bool,

    /// Do not search below a found instance
    #[arg(long)]
    pub stop_at_first: bool,

    /// Match type definitions exactly
    #[arg(long)]
    pub no_subtypes: bool,

    /// Publish only what is found below an instance root
    #[arg(long)]
    pub exclude_root: bool,

    /// Drop results carrying errors
    #[arg(long)]
    pub discard_errors: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<uapub_config::LogFormat> for LogFormat {
    fn from(format: uapub_config::LogFormat) -> Self {
        match format {
            uapub_config::LogFormat::Text => LogFormat::Text,
            uapub_config::LogFormat::Json => LogFormat::Json,
            uapub_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
    /// YAML format
    Yaml,
}

/// Browse direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    /// Forward references
    #[default]
    Forward,
    /// Inverse references
    Backward,
    /// Both directions
    Both,
}

impl From<Direction> for BrowseDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => BrowseDirection::Forward,
            Direction::Backward => BrowseDirection::Backward,
            Direction::Both => BrowseDirection::Both,
        }
    }
}

/// Node class filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NodeClassArg {
    /// Objects
    Object,
    /// Variables
    Variable,
    /// Methods
    Method,
    /// Object types
    ObjectType,
    /// Variable types
    VariableType,
    /// Reference types
    ReferenceType,
    /// Data types
    DataType,
    /// Views
    View,
}

impl From<NodeClassArg> for NodeClass {
    fn from(class: NodeClassArg) -> Self {
        match class {
            NodeClassArg::Object => NodeClass::Object,
            NodeClassArg::Variable => NodeClass::Variable,
            NodeClassArg::Method => NodeClass::Method,
            NodeClassArg::ObjectType => NodeClass::ObjectType,
            NodeClassArg::VariableType => NodeClass::VariableType,
            NodeClassArg::ReferenceType => NodeClass::ReferenceType,
            NodeClassArg::DataType => NodeClass::DataType,
            NodeClassArg::View => NodeClass::View,
        }
    }
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose logging is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// The log level flags ask for, if any.
    pub fn effective_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["uapub"]).is_err());
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["uapub", "validate", "--show-config", "-p", "pn.json"]);
        if let Commands::Validate(args) = cli.command {
            assert!(args.show_config);
            assert_eq!(args.published_nodes, Some(PathBuf::from("pn.json")));
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["uapub", "-c", "/etc/uapub/settings.yaml", "version"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/uapub/settings.yaml")));
    }

    #[test]
    fn test_log_flags() {
        let cli = Cli::parse_from(["uapub", "-l", "debug", "--log-format", "json", "version"]);
        assert_eq!(cli.effective_log_level(), Some("debug"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));

        let cli = Cli::parse_from(["uapub", "-q", "version"]);
        assert_eq!(cli.effective_log_level(), Some("warn"));

        let cli = Cli::parse_from(["uapub", "version"]);
        assert_eq!(cli.effective_log_level(), None);
    }

    #[test]
    fn test_browse_command() {
        let cli = Cli::parse_from([
            "uapub",
            "browse",
            "-a",
            "plant.yaml",
            "-n",
            "i=85",
            "--node-class",
            "object,variable",
            "-r",
        ]);
        if let Commands::Browse(args) = cli.command {
            assert_eq!(args.node_id.as_deref(), Some("i=85"));
            assert_eq!(args.node_class, vec![NodeClassArg::Object, NodeClassArg::Variable]);
            assert!(args.recursive);
            assert_eq!(BrowseDirection::from(args.direction), BrowseDirection::Forward);
        } else {
            panic!("Expected Browse command");
        }
    }

    #[test]
    fn test_expand_command() {
        let cli = Cli::parse_from([
            "uapub",
            "expand",
            "-a",
            "plant.yaml",
            "-p",
            "pn.json",
            "--max-depth",
            "2",
            "--single-writer",
        ]);
        if let Commands::Expand(args) = cli.command {
            assert_eq!(args.max_depth, Some(2));
            assert!(args.single_writer);
            assert!(args.output.is_none());
        } else {
            panic!("Expected Expand command");
        }
    }
}
