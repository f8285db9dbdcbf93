// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for error reporting across diagnostics levels.
//!
//! Every failure must carry only the fields its level allows, and a richer
//! level must never drop a field a poorer level reported.

use uapub_nodes::{BrowseNextRequest, ValueReadRequest};
use uapub_tests::prelude::*;

const LEVELS: [DiagnosticsLevel; 4] = [
    DiagnosticsLevel::None,
    DiagnosticsLevel::Status,
    DiagnosticsLevel::Information,
    DiagnosticsLevel::Verbose,
];

/// Checks one failure as reported at every level.
fn assert_levels_nest(results: &[(DiagnosticsLevel, ServiceResult)]) {
    for (level, result) in results {
        result.assert_within_level(*level);
    }
    for pair in results.windows(2) {
        pair[0].1.assert_subset_of(&pair[1].1);
    }
}

async fn value_read_error(connection: &Connection, level: DiagnosticsLevel) -> ServiceResult {
    let request = ValueReadRequest {
        header: header(level),
        node_id: Some(plant_id("Missing")),
        ..Default::default()
    };
    NodeServices::default()
        .value_read(connection, request, &CancellationToken::new())
        .await
        .unwrap()
        .error_info
        .expect("unknown node fails")
}

// =============================================================================
// Levels
// =============================================================================

#[tokio::test]
async fn test_unknown_node_at_every_level() {
    init_test_logging();
    let connection = plant_connection();
    let mut results = Vec::new();
    for level in LEVELS {
        let error = value_read_error(&connection, level).await;
        assert_eq!(error.status_code, StatusCode::BAD_NODE_ID_UNKNOWN);
        results.push((level, error));
    }
    assert_levels_nest(&results);

    let (_, none) = &results[0];
    assert!(none.error_message.is_none());
    let (_, status) = &results[1];
    assert!(status.error_message.is_some());
    let (_, verbose) = &results[3];
    assert!(verbose.additional_info.is_some());
}

#[tokio::test]
async fn test_browse_of_unknown_node_at_every_level() {
    let connection = plant_connection();
    let mut results = Vec::new();
    for level in LEVELS {
        let request = BrowseRequestBuilder::new(plant_id("Missing")).diagnostics(level).build();
        let response = NodeServices::default()
            .browse_first(&connection, request, &CancellationToken::new())
            .await
            .unwrap();
        let error = response.error_info.expect("unknown node fails");
        results.push((level, error));
    }
    assert_levels_nest(&results);
}

#[tokio::test]
async fn test_invalid_continuation_token_at_every_level() {
    let connection = plant_connection();
    let mut results = Vec::new();
    for level in LEVELS {
        let request = BrowseNextRequest {
            header: header(level),
            continuation_token: Some("bm90IGEgdG9rZW4".into()),
            ..Default::default()
        };
        let response = NodeServices::default()
            .browse_next(&connection, request, &CancellationToken::new())
            .await
            .unwrap();
        assert!(response.references.is_none());
        results.push((level, response.error_info.expect("bogus token fails")));
    }
    assert_levels_nest(&results);
}

#[tokio::test]
async fn test_session_failure_at_every_level() {
    let session = Arc::new(MockSession::new(plant_session()));
    session.fail(MockService::Read, StatusCode::BAD_TOO_MANY_OPERATIONS);
    let connection: Connection = session.clone();

    let mut results = Vec::new();
    for level in LEVELS {
        let request = ValueReadRequest {
            header: header(level),
            node_id: Some(plant_id("P1.Speed")),
            ..Default::default()
        };
        let response = NodeServices::default()
            .value_read(&connection, request, &CancellationToken::new())
            .await
            .unwrap();
        assert!(response.value.is_none());
        let error = response.error_info.expect("session failure is reported");
        assert_eq!(error.status_code, StatusCode::BAD_TOO_MANY_OPERATIONS);
        results.push((level, error));
    }
    assert_levels_nest(&results);
    assert_eq!(session.calls(MockService::Read), LEVELS.len() as u64);

    session.heal();
    let response = NodeServices::default()
        .value_read(
            &connection,
            ValueReadRequest {
                node_id: Some(plant_id("P1.Speed")),
                ..Default::default()
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    response.assert_ok();
}

// =============================================================================
// Defaults
// =============================================================================

#[tokio::test]
async fn test_level_defaults_to_the_service_options() {
    let connection = plant_connection();
    let services = NodeServices::new(NodeServicesOptions {
        diagnostics_level: DiagnosticsLevel::None,
        ..Default::default()
    });
    let request = ValueReadRequest {
        node_id: Some(plant_id("Missing")),
        ..Default::default()
    };
    let error = services
        .value_read(&connection, request.clone(), &CancellationToken::new())
        .await
        .unwrap()
        .error_info
        .unwrap();
    error.assert_within_level(DiagnosticsLevel::None);
    assert!(error.error_message.is_none());

    // an explicit header wins over the default
    let request = ValueReadRequest {
        header: header(DiagnosticsLevel::Verbose),
        ..request
    };
    let error = services
        .value_read(&connection, request, &CancellationToken::new())
        .await
        .unwrap()
        .error_info
        .unwrap();
    assert!(error.error_message.is_some());
    assert!(error.additional_info.is_some());
}

#[tokio::test]
async fn test_symbolic_id_names_the_status() {
    let error = value_read_error(&plant_connection(), DiagnosticsLevel::None).await;
    assert_eq!(error.symbolic_id.as_deref(), Some("BadNodeIdUnknown"));
}
