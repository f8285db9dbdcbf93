// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! Shared fixtures, builders, assertions and mocks for the integration tests.
//!
//! ## Module Structure
//!
//! - `fixtures`: The reference plant address space and published nodes files
//! - `builders`: Builders for service requests and published nodes entries
//! - `assertions`: Assertions on `ServiceResult` carrying responses
//! - `mocks`: A session with failure injection and a recording entry store

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use mocks::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();
static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,uapub=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Generate a unique test ID for resource isolation.
pub fn unique_test_id() -> String {
    let sequence = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("test_{}_{}", std::process::id(), sequence)
}

/// Create a temporary directory for test data.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}
