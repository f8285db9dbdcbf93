// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings and data file loading.
//!
//! # Loading Pipeline
//!
//! 1. Pick the format from the file extension
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders in the raw text
//! 3. Parse into [`NodeServicesSettings`]
//! 4. Apply environment variable overrides
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! With the default `UAPUB` prefix:
//!
//! ```text
//! UAPUB_DIAGNOSTICS_LEVEL=verbose
//! UAPUB_LOG_LEVEL=debug
//! UAPUB_LOG_FORMAT=json
//! UAPUB_BROWSE_MAX_REFERENCES=100
//! UAPUB_OPERATION_TIMEOUT=5s
//! ```
//!
//! The same module reads published nodes files (a JSON array of
//! [`PublishedNodesEntry`]) and address space snapshots
//! ([`AddressSpaceModel`] in YAML, TOML or JSON).

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, NodeServicesSettings};
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uapub_nodes::{AddressSpaceModel, DiagnosticsLevel, MemorySession, PublishedNodesEntry};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UAPUB";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Settings loader.
///
/// # Examples
///
/// ```no_run
/// use uapub_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new().with_env_prefix("UAPUB");
/// let settings = loader.load("uapub.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve environment variables in values.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Creates a builder for configuring the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholders and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// The environment variable prefix.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Loads settings from a file.
    ///
    /// The file format is determined by the file extension:
    /// - `.yaml` or `.yml` - YAML format
    /// - `.toml` - TOML format
    /// - `.json` - JSON format
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<NodeServicesSettings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        let format = ConfigFormat::from_path(path)?;
        let content = read_file(path)?;
        let content = self.resolve(&content);

        let mut settings: NodeServicesSettings = if content.trim().is_empty() {
            NodeServicesSettings::default()
        } else {
            parse_str(&content, format).map_err(|e| e.at_path(path))?
        };

        self.finish(&mut settings)?;
        debug!(
            diagnostics_level = %settings.diagnostics_level,
            max_references = settings.browse.max_references_per_node,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Loads settings from a string.
    pub fn load_from_str(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigResult<NodeServicesSettings> {
        let content = self.resolve(content);
        let mut settings = parse_str(&content, format)?;
        self.finish(&mut settings)?;
        Ok(settings)
    }

    /// Loads `path` when given, defaults otherwise.
    ///
    /// Environment overrides apply in both cases.
    pub fn load_or_default(&self, path: Option<&Path>) -> ConfigResult<NodeServicesSettings> {
        match path {
            Some(path) => self.load(path),
            None => {
                let mut settings = NodeServicesSettings::default();
                self.finish(&mut settings)?;
                Ok(settings)
            }
        }
    }

    fn finish(&self, settings: &mut NodeServicesSettings) -> ConfigResult<()> {
        if self.resolve_env_vars {
            self.apply_env_overrides(settings)?;
        }
        settings.validate()
    }

    fn resolve(&self, content: &str) -> String {
        if self.resolve_env_vars {
            resolve_env_placeholders(content)
        } else {
            content.to_string()
        }
    }

    fn var(&self, name: &str) -> Option<(String, String)> {
        let key = format!("{}_{}", self.env_prefix, name);
        env::var(&key).ok().map(|value| (key, value))
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, settings: &mut NodeServicesSettings) -> ConfigResult<()> {
        if let Some((key, value)) = self.var("DIAGNOSTICS_LEVEL") {
            settings.diagnostics_level = value
                .parse::<DiagnosticsLevel>()
                .map_err(|e| ConfigError::invalid_env_var(key, e))?;
        }

        if let Some((key, value)) = self.var("LOG_LEVEL") {
            settings.logging.level = value
                .parse::<LogLevel>()
                .map_err(|e| ConfigError::invalid_env_var(key, e))?;
        }
        if let Some((key, value)) = self.var("LOG_FORMAT") {
            settings.logging.format = match value.trim().to_lowercase().as_str() {
                "text" | "pretty" => LogFormat::Text,
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => {
                    return Err(ConfigError::invalid_env_var(
                        key,
                        "expected text, json or compact",
                    ))
                }
            };
        }

        if let Some((key, value)) = self.var("BROWSE_MAX_REFERENCES") {
            settings.browse.max_references_per_node = value.trim().parse().map_err(|_| {
                ConfigError::invalid_env_var(key, "expected a positive number")
            })?;
        }

        if let Some((key, value)) = self.var("OPERATION_TIMEOUT") {
            settings.operation_timeout = humantime::parse_duration(value.trim())
                .map_err(|e| ConfigError::invalid_env_var(key, e.to_string()))?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for ConfigLoader.
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Builds the ConfigLoader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(resolve_env_vars) = self.resolve_env_vars {
            loader.resolve_env_vars = resolve_env_vars;
        }
        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Data Files
// =============================================================================

/// Reads a published nodes file.
///
/// The file holds a JSON array of entries. Every entry needs an endpoint
/// url and an `OpcNodes` list; node level checks happen when the entry is
/// expanded.
pub fn load_published_nodes(path: impl AsRef<Path>) -> ConfigResult<Vec<PublishedNodesEntry>> {
    let path = path.as_ref();
    let content = read_file(path)?;
    if content.trim().is_empty() {
        warn!("Published nodes file {} is empty", path.display());
        return Ok(Vec::new());
    }

    let entries: Vec<PublishedNodesEntry> =
        parse_str(&content, ConfigFormat::Json).map_err(|e| e.at_path(path))?;

    for (index, entry) in entries.iter().enumerate() {
        if entry.endpoint_url.trim().is_empty() {
            return Err(ConfigError::invalid_entry(path, index, "EndpointUrl is required"));
        }
        if entry.opc_nodes.is_none() {
            return Err(ConfigError::invalid_entry(path, index, "OpcNodes is required"));
        }
    }

    info!(
        entries = entries.len(),
        nodes = entries.iter().map(PublishedNodesEntry::node_count).sum::<usize>(),
        "Loaded published nodes from {}",
        path.display()
    );
    Ok(entries)
}

/// Writes entries as a published nodes file.
pub fn save_published_nodes(
    path: impl AsRef<Path>,
    entries: &[PublishedNodesEntry],
) -> ConfigResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| ConfigError::serialization(e.to_string()))?;
    fs::write(path, json).map_err(|e| ConfigError::io(path, e))?;
    debug!(entries = entries.len(), "Saved published nodes to {}", path.display());
    Ok(())
}

/// Reads an address space snapshot; the format follows the extension.
pub fn load_address_space(path: impl AsRef<Path>) -> ConfigResult<AddressSpaceModel> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = read_file(path)?;
    let model: AddressSpaceModel = parse_str(&content, format).map_err(|e| e.at_path(path))?;
    debug!(
        namespaces = model.namespaces.len(),
        nodes = model.nodes.len(),
        "Loaded address space from {}",
        path.display()
    );
    Ok(model)
}

/// Builds an in-memory session from a snapshot file.
///
/// The session pages browse results at `max_references_per_node`.
pub fn open_memory_session(
    path: impl AsRef<Path>,
    max_references_per_node: u32,
) -> ConfigResult<MemorySession> {
    let path = path.as_ref();
    let model = load_address_space(path)?;
    let session = MemorySession::from_model(&model)
        .map_err(|e| ConfigError::address_space(path, e))?;
    Ok(session.with_max_references_per_node(max_references_per_node as usize))
}

// =============================================================================
// Helper Functions
// =============================================================================

fn read_file(path: &Path) -> ConfigResult<String> {
    if !path.exists() {
        return Err(ConfigError::file_not_found(path));
    }
    fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
}

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
            let line = e.location().map(|l| l.line());
            ConfigError::serialization_at(e.to_string(), line)
        }),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.message().to_string()))
        }
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| ConfigError::serialization_at(e.to_string(), Some(e.line()))),
    }
}

/// Resolves environment variable placeholders in content.
///
/// Supports `${VAR_NAME}` and `${VAR_NAME:default}`. Unset variables
/// without a default are left in place.
pub fn resolve_env_placeholders(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            result.push(c);
            continue;
        }
        chars.next();

        let mut var_content = String::new();
        let mut found_close = false;
        for c in chars.by_ref() {
            if c == '}' {
                found_close = true;
                break;
            }
            var_content.push(c);
        }

        if !found_close {
            result.push_str("${");
            result.push_str(&var_content);
            continue;
        }

        let (var_name, default_value) = match var_content.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (var_content.as_str(), None),
        };

        match (env::var(var_name), default_value) {
            (Ok(value), _) => result.push_str(&value),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {
                warn!("Environment variable '{}' not found", var_name);
                result.push_str(&format!("${{{}}}", var_name));
            }
        }
    }

    result
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads settings from a file with the default loader.
pub fn load_settings(path: impl AsRef<Path>) -> ConfigResult<NodeServicesSettings> {
    ConfigLoader::new().load(path)
}

/// Loads settings from a string with the default loader.
pub fn load_settings_str(content: &str, format: ConfigFormat) -> ConfigResult<NodeServicesSettings> {
    ConfigLoader::new().load_from_str(content, format)
}

/// Settings file names looked up when none is given.
pub fn default_settings_paths() -> Vec<PathBuf> {
    ["uapub.yaml", "uapub.yml", "uapub.toml", "uapub.json"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::{Builder, NamedTempFile};

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // Every test uses its own prefix so parallel tests never see each
    // other's variables.
    fn loader(prefix: &str) -> ConfigLoader {
        ConfigLoader::builder().env_prefix(prefix).build()
    }

    #[test]
    fn test_load_yaml_settings() {
        let file = temp_file(
            ".yaml",
            "diagnostics_level: none\nbrowse:\n  max_references_per_node: 50\n",
        );
        let settings = loader("UAPUB_T_YAML").load(file.path()).unwrap();
        assert_eq!(settings.diagnostics_level, DiagnosticsLevel::None);
        assert_eq!(settings.browse.max_references_per_node, 50);
    }

    #[test]
    fn test_load_toml_settings() {
        let file = temp_file(
            ".toml",
            "operation_timeout = \"250ms\"\n\n[logging]\nlevel = \"warn\"\nformat = \"json\"\n",
        );
        let settings = loader("UAPUB_T_TOML").load(file.path()).unwrap();
        assert_eq!(settings.operation_timeout, Duration::from_millis(250));
        assert_eq!(settings.logging.level, LogLevel::Warn);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = temp_file(".yaml", "");
        let settings = loader("UAPUB_T_EMPTY").load(file.path()).unwrap();
        assert_eq!(settings, NodeServicesSettings::default());
    }

    #[test]
    fn test_placeholders() {
        env::set_var("UAPUB_T_PH_LEVEL", "verbose");
        let content = "diagnostics_level: ${UAPUB_T_PH_LEVEL}\noperation_timeout: ${UAPUB_T_PH_UNSET:12s}\n";
        let settings = loader("UAPUB_T_PH")
            .load_from_str(content, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(settings.diagnostics_level, DiagnosticsLevel::Verbose);
        assert_eq!(settings.operation_timeout, Duration::from_secs(12));

        assert_eq!(resolve_env_placeholders("a ${UAPUB_T_PH_MISSING} b"), "a ${UAPUB_T_PH_MISSING} b");
        assert_eq!(resolve_env_placeholders("open ${brace"), "open ${brace");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("UAPUB_T_ENV_DIAGNOSTICS_LEVEL", "information");
        env::set_var("UAPUB_T_ENV_LOG_LEVEL", "trace");
        env::set_var("UAPUB_T_ENV_BROWSE_MAX_REFERENCES", "7");
        env::set_var("UAPUB_T_ENV_OPERATION_TIMEOUT", "2s");

        let settings = loader("UAPUB_T_ENV").load_or_default(None).unwrap();
        assert_eq!(settings.diagnostics_level, DiagnosticsLevel::Information);
        assert_eq!(settings.logging.level, LogLevel::Trace);
        assert_eq!(settings.browse.max_references_per_node, 7);
        assert_eq!(settings.operation_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_env_override() {
        env::set_var("UAPUB_T_BAD_BROWSE_MAX_REFERENCES", "many");
        let err = loader("UAPUB_T_BAD").load_or_default(None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));

        env::set_var("UAPUB_T_ZERO_BROWSE_MAX_REFERENCES", "0");
        let err = loader("UAPUB_T_ZERO").load_or_default(None).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_env_vars_disabled() {
        env::set_var("UAPUB_T_OFF_LOG_LEVEL", "error");
        let settings = ConfigLoader::builder()
            .env_prefix("UAPUB_T_OFF")
            .resolve_env_vars(false)
            .build()
            .load_or_default(None)
            .unwrap();
        assert_eq!(settings.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("settings")).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_settings("/nonexistent/uapub.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_parse_error_has_path() {
        let file = temp_file(".yaml", "browse: [1, 2\n");
        let err = loader("UAPUB_T_PARSE").load(file.path()).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_published_nodes_round_trip() {
        let file = temp_file(
            ".json",
            r#"[
  {
    "EndpointUrl": "opc.tcp://plant:4840",
    "DataSetWriterGroup": "Line1",
    "OpcNodes": [ { "Id": "i=2258", "DataSetFieldId": "ServerTime" } ]
  }
]"#,
        );
        let entries = load_published_nodes(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].group(), "Line1");

        let out = Builder::new().suffix(".json").tempfile().unwrap();
        save_published_nodes(out.path(), &entries).unwrap();
        assert_eq!(load_published_nodes(out.path()).unwrap(), entries);
    }

    #[test]
    fn test_published_nodes_rejects_entries() {
        let file = temp_file(".json", r#"[{ "OpcNodes": [] }]"#);
        let err = load_published_nodes(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { index: 0, .. }));

        let file = temp_file(
            ".json",
            r#"[{ "EndpointUrl": "opc.tcp://a", "OpcNodes": [] }, { "EndpointUrl": "opc.tcp://b" }]"#,
        );
        let err = load_published_nodes(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { index: 1, .. }));

        let file = temp_file(".json", r#"{ "EndpointUrl": "opc.tcp://a" }"#);
        let err = load_published_nodes(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_open_memory_session() {
        let file = temp_file(
            ".yaml",
            r#"
namespaces: ["http://test.org/Line/"]
nodes:
  - nodeId: "ns=1;s=Line"
    nodeClass: Object
    browseName: "1:Line"
    parent: "i=85"
    typeDefinition: "i=58"
"#,
        );
        let session = open_memory_session(file.path(), 10).unwrap();
        assert!(session.read_space(|space| space.len() > 1));
    }
}
