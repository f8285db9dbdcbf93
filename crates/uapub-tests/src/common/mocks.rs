// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mocks for exercising the services in isolation.
//!
//! - [`MockSession`] wraps a [`MemorySession`] and can fail or delay whole
//!   service requests, counting every request it sees
//! - [`RecordingPublishedNodes`] records every stored entry and can reject
//!   writes

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use uapub_nodes::client::{
    BrowseDescription, BrowsePath, BrowsePathResult, BrowseResult, CallMethodRequest,
    CallMethodResult, ReadValueId, WriteValue,
};
use uapub_nodes::error::OperationError;
use uapub_nodes::{
    DataValue, InMemoryPublishedNodes, MemorySession, NamespaceTable, OpcNode, OpcUaError,
    OpcUaResult, OpcUaSession, PersistenceError, PublishedNodesEntry, PublishedNodesServices,
    StatusCode,
};

// =============================================================================
// MockService
// =============================================================================

/// Service requests a [`MockSession`] can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockService {
    /// Browse.
    Browse,
    /// BrowseNext.
    BrowseNext,
    /// TranslateBrowsePathsToNodeIds.
    TranslateBrowsePaths,
    /// Read.
    Read,
    /// Write.
    Write,
    /// Call.
    Call,
}

impl MockService {
    fn name(self) -> &'static str {
        match self {
            Self::Browse => "Browse",
            Self::BrowseNext => "BrowseNext",
            Self::TranslateBrowsePaths => "TranslateBrowsePaths",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Call => "Call",
        }
    }
}

// =============================================================================
// MockSession
// =============================================================================

/// A session delegating to a [`MemorySession`] with failure injection.
pub struct MockSession {
    /// The session answering the requests.
    inner: MemorySession,

    /// Services failing with a status code.
    failures: Mutex<HashMap<MockService, StatusCode>>,

    /// Fail only the next request of a service.
    fail_once: AtomicBool,

    /// Simulated latency of every request.
    latency: Mutex<Duration>,

    /// Requests seen per service.
    calls: Mutex<HashMap<MockService, u64>>,

    /// Requests seen in total.
    total: AtomicU64,
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession")
            .field("inner", &self.inner)
            .field("failures", &*self.failures.lock())
            .field("total", &self.total.load(Ordering::SeqCst))
            .finish()
    }
}

impl MockSession {
    /// Wraps a session.
    pub fn new(inner: MemorySession) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
            fail_once: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            calls: Mutex::new(HashMap::new()),
            total: AtomicU64::new(0),
        }
    }

    /// Makes every request of `service` fail with `status`.
    pub fn fail(&self, service: MockService, status: StatusCode) {
        self.failures.lock().insert(service, status);
    }

    /// Makes only the next request of `service` fail with `status`.
    pub fn fail_next(&self, service: MockService, status: StatusCode) {
        self.fail(service, status);
        self.fail_once.store(true, Ordering::SeqCst);
    }

    /// Stops failing requests.
    pub fn heal(&self) {
        self.failures.lock().clear();
        self.fail_once.store(false, Ordering::SeqCst);
    }

    /// Delays every request.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Requests seen for `service`.
    pub fn calls(&self, service: MockService) -> u64 {
        self.calls.lock().get(&service).copied().unwrap_or(0)
    }

    /// Requests seen in total.
    pub fn total_calls(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Resets the counters.
    pub fn reset_counters(&self) {
        self.calls.lock().clear();
        self.total.store(0, Ordering::SeqCst);
    }

    /// The wrapped session.
    pub fn inner(&self) -> &MemorySession {
        &self.inner
    }

    async fn enter(&self, service: MockService) -> OpcUaResult<()> {
        *self.calls.lock().entry(service).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let status = {
            let mut failures = self.failures.lock();
            let status = failures.get(&service).copied();
            if status.is_some() && self.fail_once.swap(false, Ordering::SeqCst) {
                failures.remove(&service);
            }
            status
        };
        match status {
            Some(status) => Err(OpcUaError::operation(OperationError::service_fault(
                service.name(),
                status,
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OpcUaSession for MockSession {
    fn namespaces(&self) -> NamespaceTable {
        self.inner.namespaces()
    }

    async fn browse(
        &self,
        nodes: &[BrowseDescription],
        max_references_per_node: u32,
    ) -> OpcUaResult<Vec<BrowseResult>> {
        self.enter(MockService::Browse).await?;
        self.inner.browse(nodes, max_references_per_node).await
    }

    async fn browse_next(
        &self,
        release: bool,
        continuation_points: &[Vec<u8>],
    ) -> OpcUaResult<Vec<BrowseResult>> {
        self.enter(MockService::BrowseNext).await?;
        self.inner.browse_next(release, continuation_points).await
    }

    async fn translate_browse_paths(
        &self,
        paths: &[BrowsePath],
    ) -> OpcUaResult<Vec<BrowsePathResult>> {
        self.enter(MockService::TranslateBrowsePaths).await?;
        self.inner.translate_browse_paths(paths).await
    }

    async fn read(&self, nodes: &[ReadValueId], max_age: Duration) -> OpcUaResult<Vec<DataValue>> {
        self.enter(MockService::Read).await?;
        self.inner.read(nodes, max_age).await
    }

    async fn write(&self, values: &[WriteValue]) -> OpcUaResult<Vec<StatusCode>> {
        self.enter(MockService::Write).await?;
        self.inner.write(values).await
    }

    async fn call(&self, methods: &[CallMethodRequest]) -> OpcUaResult<Vec<CallMethodResult>> {
        self.enter(MockService::Call).await?;
        self.inner.call(methods).await
    }
}

// =============================================================================
// RecordingPublishedNodes
// =============================================================================

/// An entry store that records every write and can reject them.
#[derive(Debug, Default)]
pub struct RecordingPublishedNodes {
    /// Backing store.
    store: InMemoryPublishedNodes,

    /// Every entry passed to the store, in call order.
    recorded: Mutex<Vec<PublishedNodesEntry>>,

    /// Reject writes with this message.
    reject: Mutex<Option<String>>,
}

impl RecordingPublishedNodes {
    /// Creates an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Rejects every following write.
    pub fn reject_writes(&self, message: impl Into<String>) {
        *self.reject.lock() = Some(message.into());
    }

    /// Accepts writes again.
    pub fn accept_writes(&self) {
        *self.reject.lock() = None;
    }

    /// Entries passed to the store, in call order.
    pub fn recorded(&self) -> Vec<PublishedNodesEntry> {
        self.recorded.lock().clone()
    }

    /// Writer ids passed to the store, in call order.
    pub fn recorded_writer_ids(&self) -> Vec<String> {
        self.recorded
            .lock()
            .iter()
            .map(|e| e.writer_id().to_string())
            .collect()
    }

    /// The backing store.
    pub fn store(&self) -> &InMemoryPublishedNodes {
        &self.store
    }
}

#[async_trait]
impl PublishedNodesServices for RecordingPublishedNodes {
    async fn create_or_update_data_set_writer_entry(
        &self,
        entry: &PublishedNodesEntry,
    ) -> OpcUaResult<()> {
        self.recorded.lock().push(entry.clone());
        let reject = self.reject.lock().clone();
        if let Some(message) = reject {
            return Err(PersistenceError::rejected(message).into());
        }
        self.store.create_or_update_data_set_writer_entry(entry).await
    }

    async fn remove_data_set_writer_entry(&self, group: &str, writer_id: &str) -> OpcUaResult<()> {
        self.store.remove_data_set_writer_entry(group, writer_id).await
    }

    async fn get_configured_endpoints(&self) -> OpcUaResult<Vec<PublishedNodesEntry>> {
        self.store.get_configured_endpoints().await
    }

    async fn get_configured_nodes(&self, group: &str, writer_id: &str) -> OpcUaResult<Vec<OpcNode>> {
        self.store.get_configured_nodes(group, writer_id).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::plant_session;
    use uapub_nodes::{AttributeId, NodeId};

    #[tokio::test]
    async fn test_mock_session_fail_next() {
        let session = MockSession::new(plant_session());
        session.fail_next(MockService::Read, StatusCode::BAD_TIMEOUT);

        let first = session.read_one(&NodeId::OBJECTS_FOLDER, AttributeId::BrowseName).await;
        assert_eq!(first.unwrap_err().status_code(), StatusCode::BAD_TIMEOUT);

        let second = session.read_one(&NodeId::OBJECTS_FOLDER, AttributeId::BrowseName).await;
        assert!(second.unwrap().is_good());
        assert_eq!(session.calls(MockService::Read), 2);
        assert_eq!(session.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_recording_store_rejects() {
        let store = RecordingPublishedNodes::new();
        let entry = PublishedNodesEntry::new("opc.tcp://localhost:4840")
            .with_nodes(vec![OpcNode::new("i=2258").with_field_id("Time")]);

        store.create_or_update_data_set_writer_entry(&entry).await.unwrap();
        store.reject_writes("read only");
        assert!(store.create_or_update_data_set_writer_entry(&entry).await.is_err());

        assert_eq!(store.recorded().len(), 2);
        assert_eq!(store.store().len(), 1);
    }
}
