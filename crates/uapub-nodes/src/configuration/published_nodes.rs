// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Published nodes sink.
//!
//! The expansion hands every data set writer it produces to a
//! [`PublishedNodesServices`] implementation. Writers are identified by
//! their group and writer id; a second write with the same identity
//! replaces the nodes of the first.
//!
//! # Features
//!
//! - **Upsert Semantics**: `create_or_update` replaces an existing writer
//!   and bumps its version
//! - **Validation**: entries without nodes or with duplicate field ids are
//!   rejected before anything is stored
//! - **In-Memory Store**: [`InMemoryPublishedNodes`] for tests and for
//!   running the tooling without a publisher
//!
//! # Example
//!
//! ```rust,ignore
//! use uapub_nodes::configuration::{InMemoryPublishedNodes, PublishedNodesServices};
//!
//! let store = InMemoryPublishedNodes::new();
//! store.create_or_update_data_set_writer_entry(&entry).await?;
//! assert_eq!(store.len(), 1);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::configuration::models::{OpcNode, PublishedNodesEntry};
use crate::error::{OpcUaError, OpcUaResult, PersistenceError};

// =============================================================================
// PublishedNodesServices
// =============================================================================

/// Store of data set writer entries.
#[async_trait]
pub trait PublishedNodesServices: Send + Sync {
    /// Adds a writer or replaces the writer with the same group and id.
    async fn create_or_update_data_set_writer_entry(
        &self,
        entry: &PublishedNodesEntry,
    ) -> OpcUaResult<()>;

    /// Removes a writer.
    ///
    /// # Errors
    ///
    /// [`PersistenceError::EntryNotFound`] when no such writer exists.
    async fn remove_data_set_writer_entry(&self, group: &str, writer_id: &str) -> OpcUaResult<()>;

    /// Every configured writer, nodes included.
    async fn get_configured_endpoints(&self) -> OpcUaResult<Vec<PublishedNodesEntry>>;

    /// Nodes of one writer.
    async fn get_configured_nodes(&self, group: &str, writer_id: &str) -> OpcUaResult<Vec<OpcNode>> {
        self.get_configured_endpoints()
            .await?
            .into_iter()
            .find(|e| e.group() == group && e.writer_id() == writer_id)
            .map(|e| e.opc_nodes.unwrap_or_default())
            .ok_or_else(|| PersistenceError::entry_not_found(group, writer_id).into())
    }
}

/// Checks an entry can be stored.
pub fn validate_entry(entry: &PublishedNodesEntry) -> Result<(), PersistenceError> {
    let nodes = entry.opc_nodes.as_deref().unwrap_or_default();
    if nodes.is_empty() {
        return Err(PersistenceError::rejected(format!(
            "Data set writer '{}' has no nodes",
            entry.writer_id()
        )));
    }
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        let field_id = node
            .data_set_field_id
            .as_deref()
            .or_else(|| node.node_id())
            .unwrap_or_default();
        if field_id.is_empty() || !seen.insert(field_id) {
            return Err(PersistenceError::duplicate_field_id(field_id));
        }
    }
    Ok(())
}

// =============================================================================
// InMemoryPublishedNodes
// =============================================================================

type WriterKey = (String, String);

/// A [`PublishedNodesServices`] kept in memory.
///
/// Concurrent writers are safe; entries live in a `DashMap` keyed by group
/// and writer id.
#[derive(Debug, Default)]
pub struct InMemoryPublishedNodes {
    entries: DashMap<WriterKey, PublishedNodesEntry>,
    updates: AtomicU64,
}

impl InMemoryPublishedNodes {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = PublishedNodesEntry>) -> OpcUaResult<Self> {
        let store = Self::new();
        for entry in entries {
            store.upsert(entry)?;
        }
        Ok(store)
    }

    /// Number of writers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful create or update calls.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// A stored writer.
    pub fn get(&self, group: &str, writer_id: &str) -> Option<PublishedNodesEntry> {
        self.entries
            .get(&(group.to_string(), writer_id.to_string()))
            .map(|e| e.value().clone())
    }

    fn upsert(&self, mut entry: PublishedNodesEntry) -> OpcUaResult<()> {
        validate_entry(&entry).map_err(OpcUaError::persistence)?;
        let key = (entry.group().to_string(), entry.writer_id().to_string());
        let nodes = entry.node_count();
        match self.entries.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(mut existing) => {
                let version = existing.get().version.unwrap_or(0);
                entry.version = Some(version + 1);
                debug!(
                    group = %existing.key().0,
                    writer_id = %existing.key().1,
                    version = version + 1,
                    nodes,
                    "Data set writer updated"
                );
                existing.insert(entry);
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                entry.version = Some(entry.version.unwrap_or(0));
                debug!(
                    group = %slot.key().0,
                    writer_id = %slot.key().1,
                    nodes,
                    "Data set writer created"
                );
                slot.insert(entry);
            }
        }
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl PublishedNodesServices for InMemoryPublishedNodes {
    async fn create_or_update_data_set_writer_entry(
        &self,
        entry: &PublishedNodesEntry,
    ) -> OpcUaResult<()> {
        self.upsert(entry.clone())
    }

    async fn remove_data_set_writer_entry(&self, group: &str, writer_id: &str) -> OpcUaResult<()> {
        match self.entries.remove(&(group.to_string(), writer_id.to_string())) {
            Some(_) => {
                info!(group, writer_id, "Data set writer removed");
                Ok(())
            }
            None => Err(PersistenceError::entry_not_found(group, writer_id).into()),
        }
    }

    async fn get_configured_endpoints(&self) -> OpcUaResult<Vec<PublishedNodesEntry>> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| (a.group(), a.writer_id()).cmp(&(b.group(), b.writer_id())));
        Ok(entries)
    }
}
