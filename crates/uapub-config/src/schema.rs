// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings schema for uapub.
//!
//! # Schema Structure
//!
//! ```text
//! NodeServicesSettings
//! ├── diagnostics_level: DiagnosticsLevel
//! ├── browse: BrowseSettings
//! ├── expansion: ExpansionSettings
//! ├── operation_timeout: Duration
//! └── logging: LoggingSettings
//! ```
//!
//! A minimal YAML file:
//!
//! ```yaml
//! diagnostics_level: information
//! operation_timeout: 10s
//! browse:
//!   max_references_per_node: 250
//! expansion:
//!   max_levels_to_expand: 3
//!   discard_errors: true
//! logging:
//!   level: debug
//!   format: json
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uapub_nodes::{DiagnosticsLevel, NodeServicesOptions, PublishedNodeExpansion};

// =============================================================================
// Constants
// =============================================================================

/// Default number of references a session returns per node and page.
pub const DEFAULT_MAX_REFERENCES_PER_NODE: u32 = 1000;

/// Largest accepted page size.
pub const MAX_REFERENCES_PER_NODE: u32 = 65_535;

/// Default session call timeout in seconds.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Longest accepted session call timeout (1 hour).
pub const MAX_OPERATION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Deepest accepted walk bound.
pub const MAX_WALK_DEPTH: u32 = 1024;

// =============================================================================
// Top-Level Settings
// =============================================================================

/// Settings of the node services and the command line tool.
///
/// Every section is optional; an empty file yields [`Default`] settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeServicesSettings {
    /// Diagnostics level of requests without a header.
    #[serde(default, with = "diagnostics_level")]
    pub diagnostics_level: DiagnosticsLevel,

    /// Browse settings.
    #[serde(default)]
    pub browse: BrowseSettings,

    /// Expansion defaults.
    #[serde(default)]
    pub expansion: ExpansionSettings,

    /// Timeout of each session call.
    #[serde(
        default = "default_operation_timeout",
        with = "uapub_nodes::types::humantime_serde"
    )]
    pub operation_timeout: Duration,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl NodeServicesSettings {
    /// Validates every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.browse.validate()?;
        self.expansion.validate()?;

        if self.operation_timeout.is_zero() {
            return Err(ConfigError::validation(
                "operation_timeout",
                "must be greater than zero",
            ));
        }
        if self.operation_timeout > MAX_OPERATION_TIMEOUT {
            return Err(ConfigError::out_of_range(
                "operation_timeout",
                humantime::format_duration(self.operation_timeout).to_string(),
                "1ms".to_string(),
                humantime::format_duration(MAX_OPERATION_TIMEOUT).to_string(),
            ));
        }
        Ok(())
    }

    /// Options of [`uapub_nodes::NodeServices`].
    pub fn node_services_options(&self) -> NodeServicesOptions {
        NodeServicesOptions {
            diagnostics_level: self.diagnostics_level,
            max_stream_depth: self.browse.max_stream_depth,
            operation_timeout: self.operation_timeout,
        }
    }

    /// Expansion options used when a request brings none.
    pub fn expansion_defaults(&self) -> PublishedNodeExpansion {
        self.expansion.to_expansion()
    }
}

impl Default for NodeServicesSettings {
    fn default() -> Self {
        Self {
            diagnostics_level: DiagnosticsLevel::default(),
            browse: BrowseSettings::default(),
            expansion: ExpansionSettings::default(),
            operation_timeout: default_operation_timeout(),
            logging: LoggingSettings::default(),
        }
    }
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS)
}

// =============================================================================
// Browse Settings
// =============================================================================

/// Browse settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseSettings {
    /// References returned per node and page by the session.
    #[serde(default = "default_max_references_per_node")]
    pub max_references_per_node: u32,

    /// Depth limit of browse streams; 0 is unlimited.
    #[serde(default)]
    pub max_stream_depth: usize,
}

impl BrowseSettings {
    /// Validates the browse settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_references_per_node == 0 || self.max_references_per_node > MAX_REFERENCES_PER_NODE
        {
            return Err(ConfigError::out_of_range(
                "browse.max_references_per_node",
                self.max_references_per_node,
                1,
                MAX_REFERENCES_PER_NODE,
            ));
        }
        if self.max_stream_depth > MAX_WALK_DEPTH as usize {
            return Err(ConfigError::out_of_range(
                "browse.max_stream_depth",
                self.max_stream_depth,
                0,
                MAX_WALK_DEPTH as usize,
            ));
        }
        Ok(())
    }
}

impl Default for BrowseSettings {
    fn default() -> Self {
        Self {
            max_references_per_node: DEFAULT_MAX_REFERENCES_PER_NODE,
            max_stream_depth: 0,
        }
    }
}

fn default_max_references_per_node() -> u32 {
    DEFAULT_MAX_REFERENCES_PER_NODE
}

// =============================================================================
// Expansion Settings
// =============================================================================

/// Default expansion options, in settings file naming.
///
/// Mirrors [`PublishedNodeExpansion`] without the request header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpansionSettings {
    /// Publish only what is found below an instance root.
    #[serde(default)]
    pub exclude_root_if_instance_node: bool,

    /// Match type definitions exactly.
    #[serde(default)]
    pub no_sub_types_of_type_nodes: bool,

    /// Fold component objects into their instance.
    #[serde(default)]
    pub flatten_type_instance: bool,

    /// Depth of the object search.
    #[serde(default)]
    pub max_depth: u32,

    /// Depth of the variable search below each object; 0 is unlimited.
    #[serde(default)]
    pub max_levels_to_expand: u32,

    /// Merge everything into one writer.
    #[serde(default)]
    pub create_single_writer: bool,

    /// Do not search below a found instance.
    #[serde(default)]
    pub stop_at_first_found_instance: bool,

    /// Drop results carrying errors.
    #[serde(default)]
    pub discard_errors: bool,
}

impl ExpansionSettings {
    /// Validates the expansion bounds.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("expansion.max_depth", self.max_depth),
            ("expansion.max_levels_to_expand", self.max_levels_to_expand),
        ] {
            if value > MAX_WALK_DEPTH {
                return Err(ConfigError::out_of_range(field, value, 0, MAX_WALK_DEPTH));
            }
        }
        Ok(())
    }

    /// The equivalent request options.
    pub fn to_expansion(&self) -> PublishedNodeExpansion {
        PublishedNodeExpansion {
            header: None,
            exclude_root_if_instance_node: self.exclude_root_if_instance_node,
            no_sub_types_of_type_nodes: self.no_sub_types_of_type_nodes,
            flatten_type_instance: self.flatten_type_instance,
            max_depth: self.max_depth,
            max_levels_to_expand: self.max_levels_to_expand,
            create_single_writer: self.create_single_writer,
            stop_at_first_found_instance: self.stop_at_first_found_instance,
            discard_errors: self.discard_errors,
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive of this level.
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

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON lines for log aggregation.
    Json,
    /// Compact single-line output.
    Compact,
}

// =============================================================================
// Diagnostics level serde
// =============================================================================

/// Accepts any spelling [`DiagnosticsLevel::from_str`] accepts.
mod diagnostics_level {
    use super::*;

    pub fn serialize<S: Serializer>(level: &DiagnosticsLevel, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DiagnosticsLevel, D::Error> {
        let text = String::deserialize(deserializer)?;
        DiagnosticsLevel::from_str(&text).map_err(serde::de::Error::custom)
    }
}
