// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for browsing and browse paths.
//!
//! Covers:
//! - Paging through a large folder with continuation tokens
//! - Releasing continuation points
//! - Node class filtering
//! - Recursive browse streams
//! - Equivalent browse path forms

use uapub_nodes::{BrowseNextRequest, BrowsePathRequest, BrowseStreamRequest, NodeReferenceModel};
use uapub_tests::prelude::*;

fn services() -> NodeServices {
    NodeServices::default()
}

/// Follows continuation tokens until the browse is complete.
async fn browse_all(
    services: &NodeServices,
    connection: &Connection,
    request: uapub_nodes::BrowseFirstRequest,
) -> (Vec<NodeReferenceModel>, usize) {
    let cancel = CancellationToken::new();
    let first = services.browse_first(connection, request, &cancel).await.unwrap();
    first.assert_ok();

    let mut references = first.references.unwrap_or_default();
    let mut token = first.continuation_token;
    let mut pages = 1;
    while let Some(continuation_token) = token.take() {
        let next = services
            .browse_next(
                connection,
                BrowseNextRequest {
                    continuation_token: Some(continuation_token),
                    node_ids_only: Some(true),
                    ..Default::default()
                },
                &cancel,
            )
            .await
            .unwrap();
        next.assert_ok();
        references.extend(next.references.unwrap_or_default());
        token = next.continuation_token;
        pages += 1;
    }
    (references, pages)
}

// =============================================================================
// Paging
// =============================================================================

#[tokio::test]
async fn test_browse_large_folder_with_server_paging() {
    init_test_logging();
    let session = Arc::new(MockSession::new(paged_plant_session(100)));
    let connection: Connection = session.clone();

    let request = BrowseRequestBuilder::new(plant_id("Large"))
        .direction(BrowseDirection::Forward)
        .reference_type("HierarchicalReferences", false)
        .node_ids_only()
        .build();
    let (references, pages) = browse_all(&services(), &connection, request).await;

    let ids: Vec<String> = references.iter().map(|r| r.target.node_id.clone()).collect();
    assert_eq!(ids.len(), LARGE_FOLDER_SIZE);
    assert_unique(&ids);
    assert!(pages >= LARGE_FOLDER_SIZE / 100);
    assert!(session.calls(MockService::BrowseNext) >= (pages - 1) as u64);
    assert_eq!(session.inner().continuation_point_count(), 0);
}

#[tokio::test]
async fn test_browse_large_folder_with_client_paging() {
    init_test_logging();
    let connection = plant_connection();

    let request = BrowseRequestBuilder::new(plant_id("Large"))
        .direction(BrowseDirection::Forward)
        .reference_type("HierarchicalReferences", false)
        .max_references(64)
        .node_ids_only()
        .build();
    let (references, pages) = browse_all(&services(), &connection, request).await;

    let ids: Vec<String> = references.iter().map(|r| r.target.node_id.clone()).collect();
    assert_eq!(ids.len(), LARGE_FOLDER_SIZE);
    assert_unique(&ids);
    assert!(pages >= LARGE_FOLDER_SIZE / 64);
    assert!(ids.contains(&plant_id("Large.0000")));
    assert!(ids.contains(&plant_id(&format!("Large.{:04}", LARGE_FOLDER_SIZE - 1))));
}

#[tokio::test]
async fn test_abort_releases_continuation_point() {
    let session = Arc::new(paged_plant_session(50));
    let connection: Connection = session.clone();
    let services = services();
    let cancel = CancellationToken::new();

    let request = BrowseRequestBuilder::new(plant_id("Large")).node_ids_only().build();
    let first = services.browse_first(&connection, request, &cancel).await.unwrap();
    let token = first.continuation_token.expect("first page is partial");
    assert_eq!(session.continuation_point_count(), 1);

    let aborted = services
        .browse_next(
            &connection,
            BrowseNextRequest {
                continuation_token: Some(token.clone()),
                abort: Some(true),
                ..Default::default()
            },
            &cancel,
        )
        .await
        .unwrap();
    aborted.assert_ok();
    assert_eq!(aborted.references.map(|r| r.len()), Some(0));
    assert!(aborted.continuation_token.is_none());
    assert_eq!(session.continuation_point_count(), 0);

    // a released token reads as an empty last page
    let reused = services
        .browse_next(
            &connection,
            BrowseNextRequest {
                continuation_token: Some(token),
                ..Default::default()
            },
            &cancel,
        )
        .await
        .unwrap();
    reused.assert_ok();
    assert_eq!(reused.references.map(|r| r.len()), Some(0));
    assert!(reused.continuation_token.is_none());
}

#[tokio::test]
async fn test_exhausted_token_gives_empty_last_page() {
    let session = Arc::new(paged_plant_session(100));
    let connection: Connection = session.clone();
    let services = services();
    let cancel = CancellationToken::new();

    let request = BrowseRequestBuilder::new(plant_id("Large")).node_ids_only().build();
    let first = services.browse_first(&connection, request, &cancel).await.unwrap();
    let mut token = first.continuation_token;
    let mut last = None;
    while let Some(continuation_token) = token.take() {
        last = Some(continuation_token.clone());
        let next = services
            .browse_next(
                &connection,
                BrowseNextRequest {
                    continuation_token: Some(continuation_token),
                    ..Default::default()
                },
                &cancel,
            )
            .await
            .unwrap();
        next.assert_ok();
        token = next.continuation_token;
    }
    assert_eq!(session.continuation_point_count(), 0);

    let replayed = services
        .browse_next(
            &connection,
            BrowseNextRequest {
                continuation_token: last,
                ..Default::default()
            },
            &cancel,
        )
        .await
        .unwrap();
    assert!(replayed.error_info.is_none());
    assert_eq!(replayed.references, Some(Vec::new()));
    assert!(replayed.continuation_token.is_none());
}

#[tokio::test]
async fn test_zero_max_references_reads_node_only() {
    let request = BrowseRequestBuilder::new(plant_id("Large")).max_references(0).build();
    let response = services()
        .browse_first(&plant_connection(), request, &CancellationToken::new())
        .await
        .unwrap();
    response.assert_ok();
    assert!(response.references.is_none());
    assert!(response.continuation_token.is_none());
    assert_eq!(response.node.node_id, plant_id("Large"));
    assert_eq!(response.node.children, Some(true));
}

// =============================================================================
// Filtering
// =============================================================================

#[tokio::test]
async fn test_node_class_filter_is_applied_to_every_target() {
    let connection = plant_connection();
    let cases: [(&[NodeClass], &[&str]); 3] = [
        (&[NodeClass::Variable], &["P1.Speed", "P1.Temperature", "P1.SerialNumber"]),
        (&[NodeClass::Method], &["P1.Start", "P1.Scale"]),
        (&[NodeClass::Object, NodeClass::ObjectType], &["P1.Motor", "PumpType"]),
    ];

    for (classes, expected) in cases {
        let request = BrowseRequestBuilder::new(plant_id("P1"))
            .direction(BrowseDirection::Both)
            .reference_type("References", false)
            .node_classes(classes)
            .build();
        let response = services()
            .browse_first(&connection, request, &CancellationToken::new())
            .await
            .unwrap();
        response.assert_ok();

        let references = response.references.unwrap_or_default();
        assert_node_classes(references.iter().map(|r| &r.target), classes);
        let ids: Vec<&str> = references.iter().map(|r| r.target.node_id.as_str()).collect();
        for name in expected {
            assert!(ids.contains(&plant_id(name).as_str()), "{} missing in {:?}", name, ids);
        }
    }
}

#[tokio::test]
async fn test_filter_without_matches_is_empty() {
    let request = BrowseRequestBuilder::new(plant_id("Large"))
        .direction(BrowseDirection::Forward)
        .node_classes(&[NodeClass::Method])
        .build();
    let response = services()
        .browse_first(&plant_connection(), request, &CancellationToken::new())
        .await
        .unwrap();
    response.assert_ok();
    assert_eq!(response.references.map(|r| r.len()), Some(0));
}

#[tokio::test]
async fn test_browse_reads_variable_values() {
    let request = BrowseRequestBuilder::new(plant_id("P2"))
        .direction(BrowseDirection::Forward)
        .node_classes(&[NodeClass::Variable])
        .read_values()
        .build();
    let response = services()
        .browse_first(&plant_connection(), request, &CancellationToken::new())
        .await
        .unwrap();
    let references = response.references.unwrap();
    let speed = references
        .iter()
        .find(|r| r.target.node_id == plant_id("P2.Speed"))
        .expect("speed is browsed");
    assert_eq!(speed.target.value, Some(json!(1450.0)));
}

#[tokio::test]
async fn test_unknown_node_is_reported_inline() {
    let request = BrowseRequestBuilder::new(plant_id("Nowhere")).build();
    let response = services()
        .browse_first(&plant_connection(), request, &CancellationToken::new())
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_NODE_ID_UNKNOWN);
    assert!(response.references.is_none());
}

// =============================================================================
// Browse streams
// =============================================================================

#[tokio::test]
async fn test_browse_stream_visits_each_node_once() {
    init_test_logging();
    let request = BrowseStreamRequest {
        node_ids: Some(vec![plant_id("Plant")]),
        direction: Some(BrowseDirection::Forward),
        ..Default::default()
    };
    let chunks: Vec<_> = services()
        .browse_stream(&plant_connection(), request, &CancellationToken::new())
        .collect()
        .await;

    assert!(chunks.iter().all(|c| c.error_info.is_none()));
    let visited: Vec<String> = chunks
        .iter()
        .filter_map(|c| c.attributes.as_ref())
        .map(|n| n.node_id.clone())
        .collect();
    assert_unique(&visited);
    assert_eq!(visited[0], plant_id("Plant"));
    for name in ["P1", "P2", "B1", "V1", "P1.Motor.Current", "V1.Position"] {
        assert!(visited.contains(&plant_id(name)), "{} not visited", name);
    }
    assert!(!visited.contains(&plant_id("Values")));

    // every reference chunk belongs to a visited source
    for chunk in chunks.iter().filter(|c| c.reference.is_some()) {
        assert!(visited.contains(&chunk.source_id));
    }
}

#[tokio::test]
async fn test_browse_stream_depth_limit() {
    let services = NodeServices::new(NodeServicesOptions {
        max_stream_depth: 2,
        ..Default::default()
    });
    let request = BrowseStreamRequest {
        node_ids: Some(vec![plant_id("Plant")]),
        direction: Some(BrowseDirection::Forward),
        ..Default::default()
    };
    let chunks: Vec<_> = services
        .browse_stream(&plant_connection(), request, &CancellationToken::new())
        .collect()
        .await;
    let visited: Vec<String> = chunks
        .iter()
        .filter_map(|c| c.attributes.as_ref())
        .map(|n| n.node_id.clone())
        .collect();
    assert!(visited.contains(&plant_id("P1")));
    assert!(!visited.contains(&plant_id("P1.Speed")));
}

#[tokio::test]
async fn test_browse_stream_reports_session_failure() {
    let session = Arc::new(MockSession::new(plant_session()));
    session.fail(MockService::Browse, StatusCode::BAD_TOO_MANY_OPERATIONS);
    let connection: Connection = session.clone();

    let request = BrowseStreamRequest {
        node_ids: Some(vec![plant_id("Plant")]),
        direction: Some(BrowseDirection::Forward),
        ..Default::default()
    };
    let chunks: Vec<_> = services()
        .browse_stream(&connection, request, &CancellationToken::new())
        .collect()
        .await;

    let errors: Vec<_> = chunks.iter().filter_map(|c| c.error_info.as_ref()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status_code, StatusCode::BAD_TOO_MANY_OPERATIONS);
    assert_eq!(chunks.iter().filter(|c| c.attributes.is_some()).count(), 1);
}

#[tokio::test]
async fn test_cancelled_browse_stream_is_empty() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let request = BrowseStreamRequest {
        node_ids: Some(vec![plant_id("Plant")]),
        ..Default::default()
    };
    let chunks: Vec<_> = services()
        .browse_stream(&plant_connection(), request, &cancel)
        .collect()
        .await;
    assert!(chunks.iter().all(|c| c.attributes.is_none()));
}

// =============================================================================
// Browse paths
// =============================================================================

#[tokio::test]
async fn test_browse_path_forms_resolve_to_the_same_node() {
    let connection = plant_connection();
    let speed = plant_name("Speed");
    for last in [
        speed.clone(),
        format!(".{}", speed),
        format!("/{}", speed),
        format!("<HasComponent>{}", speed),
        format!("<Aggregates>{}", speed),
    ] {
        let request = BrowsePathRequest {
            node_id: Some("i=85".into()),
            browse_paths: Some(vec![vec![plant_name("Plant"), plant_name("P1"), last.clone()]]),
            ..Default::default()
        };
        let response = services()
            .browse_path(&connection, request, &CancellationToken::new())
            .await
            .unwrap();
        response.assert_ok();
        let targets = response.targets.unwrap();
        assert_eq!(targets.len(), 1, "{}", last);
        assert_eq!(targets[0].target.node_id, plant_id("P1.Speed"), "{}", last);
        assert_eq!(targets[0].remaining_path_index, -1, "{}", last);
    }
}

#[tokio::test]
async fn test_browse_path_from_root_folder() {
    let request = BrowsePathRequest {
        browse_paths: Some(vec![
            vec!["Objects".into(), plant_name("Values"), plant_name("Double")],
            vec!["Objects".into(), plant_name("Plant"), plant_name("V1"), plant_name("Position")],
        ]),
        read_variable_values: Some(true),
        ..Default::default()
    };
    let response = services()
        .browse_path(&plant_connection(), request, &CancellationToken::new())
        .await
        .unwrap();
    response.assert_ok();
    let targets = response.targets.unwrap();
    assert_eq!(targets.len(), 2);
    let position = targets
        .iter()
        .find(|t| t.target.node_id == plant_id("V1.Position"))
        .expect("position resolved");
    assert_eq!(position.target.value, Some(json!(50)));
}

#[tokio::test]
async fn test_browse_path_without_match() {
    let request = BrowsePathRequest {
        node_id: Some(plant_id("Plant")),
        browse_paths: Some(vec![vec![plant_name("P9")]]),
        ..Default::default()
    };
    let response = services()
        .browse_path(&plant_connection(), request, &CancellationToken::new())
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_NO_MATCH);
    assert_eq!(response.targets.map(|t| t.len()), Some(0));
}

#[tokio::test]
async fn test_browse_path_wrong_namespace_does_not_match() {
    let request = BrowsePathRequest {
        node_id: Some(plant_id("Plant")),
        browse_paths: Some(vec![vec!["P1".into()]]),
        ..Default::default()
    };
    let response = services()
        .browse_path(&plant_connection(), request, &CancellationToken::new())
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_NO_MATCH);
}
