// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for published nodes expansion.
//!
//! Covers:
//! - Writer and field id derivation for folders, objects and types
//! - Deterministic results for an unchanged address space
//! - Depth, level and first-instance limits
//! - Error isolation and discarding
//! - Persistence through the published nodes store

use uapub_nodes::ConfigurationServices;
use uapub_tests::prelude::*;

type Results = Vec<ServiceResponse<PublishedNodesEntry>>;

fn services(store: Arc<RecordingPublishedNodes>) -> ConfigurationServices<RecordingPublishedNodes> {
    ConfigurationServices::new(NodeServices::default(), store)
}

async fn expand(entry: PublishedNodesEntry, options: PublishedNodeExpansion) -> Results {
    services(RecordingPublishedNodes::new())
        .expand(&plant_connection(), entry, options, &CancellationToken::new())
        .unwrap()
        .collect()
        .await
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

// =============================================================================
// Writer derivation
// =============================================================================

#[tokio::test]
async fn test_folder_gives_one_writer_per_instance() {
    init_test_logging();
    let entry = EntryBuilder::new().node(plant_id("Plant"), "Plant").build();
    let results = expand(entry, ExpansionBuilder::new().exclude_root().build()).await;

    results.assert_all_good();
    assert_eq!(
        sorted(results.writer_ids()),
        vec!["Plant/B1", "Plant/P1", "Plant/P2", "Plant/V1"]
    );
    assert_unique(&results.writer_ids());
}

#[tokio::test]
async fn test_expansion_is_deterministic() {
    let entry = EntryBuilder::new().node(plant_id("Plant"), "Plant").build();
    let options = ExpansionBuilder::new().exclude_root().build();

    let first = expand(entry.clone(), options.clone()).await;
    let second = expand(entry, options).await;
    assert_eq!(first.writer_ids(), second.writer_ids());
    assert_eq!(first.field_ids(), second.field_ids());
}

#[tokio::test]
async fn test_object_root_publishes_its_variables() {
    let entry = EntryBuilder::new().node(plant_id("P2"), "P2").build();
    let results = expand(entry, ExpansionBuilder::new().build()).await;

    assert_eq!(results.len(), 1);
    results.assert_all_good();
    assert_eq!(results.writer_ids(), vec!["P2"]);
    assert_eq!(results.field_ids(), vec!["P2/Speed", "P2/Temperature"]);
}

#[tokio::test]
async fn test_type_includes_subtype_instances() {
    let entry = EntryBuilder::new().node(plant_id("PumpType"), "Pump").build();
    let results = expand(entry.clone(), ExpansionBuilder::new().build()).await;

    results.assert_all_good();
    let writers = results.writer_ids();
    for pump in PUMPS {
        assert!(writers.contains(&format!("Pump/Plant/{}", pump)), "{} missing in {:?}", pump, writers);
    }
    assert!(writers.contains(&"Pump/Plant/P1/Motor".to_string()));
    assert!(!writers.iter().any(|w| w.contains("V1")));

    let results = expand(entry, ExpansionBuilder::new().no_subtypes().build()).await;
    let writers = results.writer_ids();
    assert!(writers.contains(&"Pump/Plant/P1".to_string()));
    assert!(!writers.contains(&"Pump/Plant/B1".to_string()));
}

#[tokio::test]
async fn test_single_writer_collects_all_instances() {
    let entry = EntryBuilder::new().node(plant_id("PumpType"), "Pump").build();
    let results = expand(entry, ExpansionBuilder::new().single_writer().build()).await;

    assert_eq!(results.len(), 1);
    let fields = results.field_ids();
    assert!(fields.contains(&"Pump/Plant/B1/Speed".to_string()));
    assert!(fields.contains(&"Pump/Plant/P1/Motor/Current".to_string()));
    assert_unique(&fields);
}

// =============================================================================
// Depth and levels
// =============================================================================

#[tokio::test]
async fn test_max_depth_one_finds_direct_child_objects() {
    let entry = EntryBuilder::new().node(plant_id("Plant"), "Plant").build();

    let results = expand(entry.clone(), ExpansionBuilder::new().max_depth(1).build()).await;
    results.assert_all_good();
    assert_eq!(
        sorted(results.writer_ids()),
        vec!["Plant/B1", "Plant/P1", "Plant/P2", "Plant/V1"]
    );

    let results = expand(entry, ExpansionBuilder::new().max_depth(2).build()).await;
    results.assert_all_good();
    assert_eq!(
        sorted(results.writer_ids()),
        vec![
            "Plant/B1",
            "Plant/B1/Stage",
            "Plant/P1",
            "Plant/P1/Motor",
            "Plant/P2",
            "Plant/V1"
        ]
    );
}

#[tokio::test]
async fn test_max_depth_zero_is_root_only_for_objects() {
    let entry = EntryBuilder::new().node(plant_id("P1"), "P1").build();
    let results = expand(entry.clone(), ExpansionBuilder::new().max_depth(0).build()).await;
    assert_eq!(results.writer_ids(), vec!["P1"]);

    let results = expand(entry, ExpansionBuilder::new().max_depth(1).build()).await;
    assert_eq!(sorted(results.writer_ids()), vec!["P1", "P1/Motor"]);
}

#[tokio::test]
async fn test_max_depth_zero_is_unlimited_for_types() {
    let entry = EntryBuilder::new().node(plant_id("PumpType"), "Pump").build();

    // instances sit two levels below the Objects folder
    let results = expand(entry.clone(), ExpansionBuilder::new().max_depth(1).build()).await;
    assert_eq!(results.error_codes(), vec![StatusCode::BAD_NOT_FOUND]);

    let results = expand(entry.clone(), ExpansionBuilder::new().flatten().max_depth(2).build()).await;
    results.assert_all_good();
    assert_eq!(
        sorted(results.writer_ids()),
        vec!["Pump/Plant/B1", "Pump/Plant/P1", "Pump/Plant/P2"]
    );

    let results = expand(entry, ExpansionBuilder::new().flatten().max_depth(0).build()).await;
    results.assert_all_good();
    assert_eq!(
        sorted(results.writer_ids()),
        vec!["Pump/Plant/B1", "Pump/Plant/B1/Stage", "Pump/Plant/P1", "Pump/Plant/P2"]
    );
}

#[tokio::test]
async fn test_max_levels_collects_direct_variables_only() {
    let entry = EntryBuilder::new().node(plant_id("P1"), "P1").build();

    let results = expand(entry.clone(), ExpansionBuilder::new().build()).await;
    assert_eq!(
        sorted(results.field_ids()),
        vec!["P1/SerialNumber", "P1/Speed", "P1/Speed/Unit", "P1/Temperature"]
    );

    let results = expand(entry, ExpansionBuilder::new().max_levels(1).build()).await;
    results.assert_all_good();
    assert_eq!(
        sorted(results.field_ids()),
        vec!["P1/SerialNumber", "P1/Speed", "P1/Temperature"]
    );
}

#[tokio::test]
async fn test_max_levels_stops_at_nested_objects_of_flattened_instances() {
    let entry = EntryBuilder::new().node(plant_id("PumpType"), "Pump").build();

    let results = expand(entry.clone(), ExpansionBuilder::new().flatten().build()).await;
    assert!(results.field_ids().contains(&"Pump/Motor/Current".to_string()));

    let results = expand(entry, ExpansionBuilder::new().flatten().max_levels(1).build()).await;
    results.assert_all_good();
    let fields = results.field_ids();
    assert!(fields.contains(&"Pump/Speed".to_string()));
    assert!(!fields.contains(&"Pump/Motor/Current".to_string()));
    assert!(!fields.contains(&"Pump/Speed/Unit".to_string()));
}

#[tokio::test]
async fn test_stop_at_first_found_instance_skips_nested_instances() {
    let entry = EntryBuilder::new().node(plant_id("PumpType"), "Pump").build();

    let results = expand(entry.clone(), ExpansionBuilder::new().flatten().build()).await;
    assert!(results.writer_ids().contains(&"Pump/Plant/B1/Stage".to_string()));

    let results = expand(entry, ExpansionBuilder::new().flatten().stop_at_first().build()).await;
    results.assert_all_good();
    assert_eq!(
        sorted(results.writer_ids()),
        vec!["Pump/Plant/B1", "Pump/Plant/P1", "Pump/Plant/P2"]
    );
    // the nested pump is still published as part of its parent
    assert!(results.field_ids().contains(&"Pump/Stage/Speed".to_string()));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_failed_nodes_do_not_affect_the_others() {
    let entry = EntryBuilder::new()
        .node(plant_id("Missing"), "Missing")
        .node(plant_id("P2"), "P2")
        .node(plant_id("B1"), "B1")
        .build();

    let results = expand(entry.clone(), ExpansionBuilder::new().build()).await;
    assert_eq!(results.good_count(), 2);
    assert_eq!(results.error_codes(), vec![StatusCode::BAD_NODE_ID_UNKNOWN]);
    assert_eq!(sorted(results.writer_ids()), vec!["B1", "P2"]);

    let results = expand(entry, ExpansionBuilder::new().discard_errors().build()).await;
    assert_eq!(results.len(), 2);
    results.assert_all_good();
}

#[tokio::test]
async fn test_method_nodes_are_not_supported() {
    let entry = EntryBuilder::new().node(plant_id("P1.Start"), "Start").build();
    let results = expand(entry, ExpansionBuilder::new().build()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results.error_codes(), vec![StatusCode::BAD_NOT_SUPPORTED]);
    let error = results[0].error_info.as_ref().unwrap();
    assert_eq!(error.error_message.as_deref(), Some("Node class Method not supported."));
}

#[tokio::test]
async fn test_entry_without_nodes_is_rejected() {
    let entry = PublishedNodesEntry::new(PLANT_ENDPOINT);
    let result = services(RecordingPublishedNodes::new()).expand(
        &plant_connection(),
        entry,
        ExpansionBuilder::new().build(),
        &CancellationToken::new(),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cancelled_expansion_is_empty() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let entry = EntryBuilder::new().node(plant_id("Plant"), "Plant").build();
    let results: Results = services(RecordingPublishedNodes::new())
        .expand(&plant_connection(), entry, ExpansionBuilder::new().build(), &cancel)
        .unwrap()
        .collect()
        .await;
    assert!(results.is_empty());
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_create_or_update_stores_every_writer() {
    let store = RecordingPublishedNodes::new();
    let services = services(store.clone());
    let entry = EntryBuilder::new().group("Pumps").node(plant_id("Plant"), "Plant").build();

    let results: Results = services
        .create_or_update(
            &plant_connection(),
            entry,
            ExpansionBuilder::new().exclude_root().build(),
            &CancellationToken::new(),
        )
        .unwrap()
        .collect()
        .await;

    results.assert_all_good();
    assert_eq!(store.recorded_writer_ids(), results.writer_ids());
    assert_eq!(store.store().len(), 4);
    assert!(store.recorded().iter().all(|e| e.group() == "Pumps"));
}

#[tokio::test]
async fn test_expand_does_not_store() {
    let store = RecordingPublishedNodes::new();
    let entry = EntryBuilder::new().node(plant_id("Plant"), "Plant").build();
    let results: Results = services(store.clone())
        .expand(
            &plant_connection(),
            entry,
            ExpansionBuilder::new().exclude_root().build(),
            &CancellationToken::new(),
        )
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.good_count(), 4);
    assert!(store.recorded().is_empty());
}

#[tokio::test]
async fn test_rejected_writes_are_reported_per_entry() {
    let store = RecordingPublishedNodes::new();
    store.reject_writes("store is read only");
    let services = services(store.clone());
    let entry = EntryBuilder::new().node(plant_id("Plant"), "Plant").build();

    let results: Results = services
        .create_or_update(
            &plant_connection(),
            entry.clone(),
            ExpansionBuilder::new().exclude_root().build(),
            &CancellationToken::new(),
        )
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 4);
    assert_eq!(results.error_codes(), vec![StatusCode::BAD_INVALID_ARGUMENT; 4]);
    assert!(store.store().is_empty());

    let results: Results = services
        .create_or_update(
            &plant_connection(),
            entry,
            ExpansionBuilder::new().exclude_root().discard_errors().build(),
            &CancellationToken::new(),
        )
        .unwrap()
        .collect()
        .await;
    assert!(results.is_empty());
}
