// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Integration tests for uapub-config including:
//!
//! - Settings files in every supported format
//! - Environment overrides
//! - Published nodes files
//! - Address space snapshots driving the node services
//!
//! ## Test Categories
//!
//! - `test_settings_*`: Settings loading
//! - `test_published_nodes_*`: Published nodes files
//! - `test_snapshot_*`: Address space snapshots

use std::fs;
use std::path::PathBuf;

use uapub_config::{
    load_published_nodes, load_settings, open_memory_session, save_published_nodes, ConfigError,
    ConfigFormat, ConfigLoader, LogFormat, LogLevel, NodeServicesSettings,
};
use uapub_nodes::{ValueReadRequest, ValueWriteRequest};
use uapub_tests::prelude::*;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Settings
// =============================================================================

#[test]
fn test_settings_in_every_format() {
    let dir = temp_test_dir("settings");
    let yaml = write_file(
        &dir,
        "uapub.yaml",
        r#"
diagnostics_level: verbose
operation_timeout: 5s
browse:
  max_references_per_node: 250
expansion:
  exclude_root_if_instance_node: true
  max_depth: 3
logging:
  level: debug
  format: json
"#,
    );
    let toml = write_file(
        &dir,
        "uapub.toml",
        r#"
diagnostics_level = "verbose"
operation_timeout = "5s"

[browse]
max_references_per_node = 250

[expansion]
exclude_root_if_instance_node = true
max_depth = 3

[logging]
level = "debug"
format = "json"
"#,
    );
    let json = write_file(
        &dir,
        "uapub.json",
        r#"{
  "diagnostics_level": "verbose",
  "operation_timeout": "5s",
  "browse": { "max_references_per_node": 250 },
  "expansion": { "exclude_root_if_instance_node": true, "max_depth": 3 },
  "logging": { "level": "debug", "format": "json" }
}"#,
    );

    let loader = ConfigLoader::new().with_env_vars(false);
    let settings: Vec<NodeServicesSettings> =
        [yaml, toml, json].iter().map(|p| loader.load(p).unwrap()).collect();

    for s in &settings {
        assert_eq!(s.diagnostics_level, DiagnosticsLevel::Verbose);
        assert_eq!(s.operation_timeout, Duration::from_secs(5));
        assert_eq!(s.browse.max_references_per_node, 250);
        assert_eq!(s.logging.level, LogLevel::Debug);
        assert_eq!(s.logging.format, LogFormat::Json);

        let expansion = s.expansion_defaults();
        assert!(expansion.exclude_root_if_instance_node);
        assert_eq!(expansion.max_depth, 3);
    }
    assert_eq!(settings[0], settings[1]);
    assert_eq!(settings[1], settings[2]);
}

#[test]
fn test_settings_options_for_the_services() {
    let settings = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str("diagnostics_level: none\nbrowse:\n  max_stream_depth: 4\n", ConfigFormat::Yaml)
        .unwrap();
    let options = settings.node_services_options();
    assert_eq!(options.diagnostics_level, DiagnosticsLevel::None);
    assert_eq!(options.max_stream_depth, 4);
}

#[test]
fn test_settings_reject_unknown_fields() {
    let result = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str("diagnostics_level: status\nlisten_port: 8080\n", ConfigFormat::Yaml);
    assert!(result.is_err());
}

#[test]
fn test_settings_missing_file() {
    let dir = temp_test_dir("missing");
    let result = load_settings(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
}

#[test]
fn test_settings_env_overrides() {
    let prefix = format!("UAPUB_IT_{}", unique_test_id().replace('-', "_").to_uppercase());
    std::env::set_var(format!("{}_DIAGNOSTICS_LEVEL", prefix), "information");
    std::env::set_var(format!("{}_BROWSE_MAX_REFERENCES", prefix), "64");
    std::env::set_var(format!("{}_OPERATION_TIMEOUT", prefix), "250ms");

    let settings = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load_or_default(None)
        .unwrap();
    assert_eq!(settings.diagnostics_level, DiagnosticsLevel::Information);
    assert_eq!(settings.browse.max_references_per_node, 64);
    assert_eq!(settings.operation_timeout, Duration::from_millis(250));

    std::env::set_var(format!("{}_BROWSE_MAX_REFERENCES", prefix), "many");
    let result = ConfigLoader::new().with_env_prefix(&prefix).load_or_default(None);
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));

    for name in ["DIAGNOSTICS_LEVEL", "BROWSE_MAX_REFERENCES", "OPERATION_TIMEOUT"] {
        std::env::remove_var(format!("{}_{}", prefix, name));
    }
}

// =============================================================================
// Published nodes
// =============================================================================

#[test]
fn test_published_nodes_file() {
    let dir = temp_test_dir("published");
    let path = write_file(&dir, "publishednodes.json", &published_nodes_json());

    let entries = load_published_nodes(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].group(), "Pumps");
    assert_eq!(entries[0].node_count(), 2);
    assert_eq!(entries[1].endpoint_url, PLANT_ENDPOINT);
}

#[test]
fn test_published_nodes_round_trip() {
    let dir = temp_test_dir("round-trip");
    let entries = vec![
        EntryBuilder::new()
            .group("Pumps")
            .writer_id("P1")
            .node(plant_id("P1.Speed"), "Speed")
            .node_at_path(plant_id("P1"), [plant_name("Motor"), plant_name("Current")], "Current")
            .build(),
    ];
    let path = dir.path().join("saved.json");
    save_published_nodes(&path, &entries).unwrap();

    let loaded = load_published_nodes(&path).unwrap();
    assert_eq!(loaded, entries);
}

#[test]
fn test_published_nodes_entry_without_nodes() {
    let dir = temp_test_dir("invalid");
    let path = write_file(
        &dir,
        "publishednodes.json",
        &format!(r#"[{{ "EndpointUrl": "{}" }}]"#, PLANT_ENDPOINT),
    );
    let result = load_published_nodes(&path);
    assert!(matches!(result, Err(ConfigError::InvalidEntry { index: 0, .. })));
}

#[tokio::test]
async fn test_published_nodes_file_expands() {
    let dir = temp_test_dir("expand");
    let path = write_file(&dir, "publishednodes.json", &published_nodes_json());
    let entries = load_published_nodes(&path).unwrap();

    let services = uapub_nodes::ConfigurationServices::new(NodeServices::default(), RecordingPublishedNodes::new());
    let results: Vec<_> = services
        .expand(
            &plant_connection(),
            entries[0].clone(),
            PublishedNodeExpansion::default(),
            &CancellationToken::new(),
        )
        .unwrap()
        .collect()
        .await;
    results.assert_all_good();
    assert_eq!(results.writer_ids(), vec!["P1", "P2"]);
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn test_snapshot_session_serves_values() {
    let dir = temp_test_dir("snapshot");
    let path = write_file(&dir, "space.yaml", &address_space_yaml());
    let connection: Connection = Arc::new(open_memory_session(&path, 100).unwrap());
    let services = NodeServices::default();
    let node_id = format!("nsu={};s=Line.Speed", PLANT_NS);

    let read = |node_id: String| ValueReadRequest {
        node_id: Some(node_id),
        ..Default::default()
    };
    let response = services
        .value_read(&connection, read(node_id.clone()), &CancellationToken::new())
        .await
        .unwrap();
    response.assert_ok();
    assert_eq!(response.value, Some(json!(12.5)));

    let write = ValueWriteRequest {
        node_id: Some(node_id.clone()),
        value: Some(json!(20.0)),
        ..Default::default()
    };
    services
        .value_write(&connection, write, &CancellationToken::new())
        .await
        .unwrap()
        .assert_ok();

    let response = services
        .value_read(&connection, read(node_id), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.value, Some(json!(20.0)));
}

#[test]
fn test_snapshot_missing_file() {
    let dir = temp_test_dir("snapshot-missing");
    let result = open_memory_session(dir.path().join("absent.yaml"), 100);
    assert!(result.is_err());
}
