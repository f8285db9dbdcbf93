// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uapub Integration Tests
//!
//! Integration tests for the node services and the published nodes
//! configuration services, run against an in-memory reference plant.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities, fixtures, and helpers
//!   - `fixtures`: The reference plant address space
//!   - `builders`: Request and entry builders
//!   - `assertions`: Assertions on responses and `ServiceResult`s
//!   - `mocks`: Failure injecting session and recording entry store
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p uapub-tests
//!
//! # Run a specific suite
//! cargo test -p uapub-tests --test integration_browse
//! cargo test -p uapub-tests --test integration_values
//! cargo test -p uapub-tests --test integration_expansion
//! cargo test -p uapub-tests --test integration_diagnostics
//! cargo test -p uapub-tests --test integration_config
//!
//! # Run with log output
//! RUST_LOG=uapub=trace cargo test -p uapub-tests -- --nocapture
//! ```
//!
//! ## Test Categories
//!
//! ### Browse Tests (`integration_browse.rs`)
//! - Paging through large reference sets with continuation tokens
//! - Node class filtering
//! - Recursive browse streams
//! - Browse path forms
//!
//! ### Value Tests (`integration_values.rs`)
//! - Value read and write of every built-in type
//! - Attribute read and write
//! - Method metadata and calls
//! - Node metadata
//!
//! ### Expansion Tests (`integration_expansion.rs`)
//! - Writer counts per instance and per type
//! - Error isolation and discarding
//! - Entry store updates
//!
//! ### Diagnostics Tests (`integration_diagnostics.rs`)
//! - Error detail by diagnostics level
//! - Session failures and cancellation
//!
//! ### Config Tests (`integration_config.rs`)
//! - Settings loading and environment overrides
//! - Published nodes files and address space snapshots

pub mod common;

/// Prelude for convenient imports in test files.
pub mod prelude {
    pub use crate::common::*;

    pub use futures::StreamExt;
    pub use serde_json::json;
    pub use std::sync::Arc;
    pub use std::time::Duration;
    pub use tokio_util::sync::CancellationToken;

    pub use uapub_nodes::{
        BrowseDirection, ConfigurationServicesApi, Connection, DiagnosticsLevel, NodeClass,
        NodeServices, NodeServicesApi, NodeServicesOptions, PublishedNodeExpansion,
        PublishedNodesEntry, ServiceResponse, ServiceResult, StatusCode,
    };
}
