// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command runtime.
//!
//! Ties the loaded settings to a session and the node services:
//!
//! - Settings loading and validation
//! - In-memory session from an address space snapshot
//! - Node and configuration services built from the settings
//! - Cancellation on OS signals

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use uapub_config::{open_memory_session, ConfigLoader, NodeServicesSettings};
use uapub_nodes::{
    ConfigurationServices, Connection, InMemoryPublishedNodes, NodeServices, PublishedNodeExpansion,
};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// SessionRuntime
// =============================================================================

/// Everything a command needs to talk to an address space.
pub struct SessionRuntime {
    settings: Arc<NodeServicesSettings>,
    connection: Connection,
    services: NodeServices,
    shutdown: ShutdownCoordinator,
}

impl SessionRuntime {
    /// Creates a runtime on an existing connection.
    pub fn new(settings: NodeServicesSettings, connection: Connection) -> Self {
        let services = NodeServices::new(settings.node_services_options());
        Self {
            settings: Arc::new(settings),
            connection,
            services,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// The settings.
    pub fn settings(&self) -> &NodeServicesSettings {
        &self.settings
    }

    /// The session.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The node services.
    pub fn services(&self) -> &NodeServices {
        &self.services
    }

    /// Configuration services storing into a fresh in-memory store.
    pub fn configuration(&self) -> ConfigurationServices<InMemoryPublishedNodes> {
        ConfigurationServices::new(self.services.clone(), Arc::new(InMemoryPublishedNodes::new()))
    }

    /// Expansion defaults of the settings.
    pub fn expansion_defaults(&self) -> PublishedNodeExpansion {
        self.settings.expansion_defaults()
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// A token cancelled on shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.shutdown.token()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing a [`SessionRuntime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    settings_path: Option<PathBuf>,
    settings: Option<NodeServicesSettings>,
    address_space: Option<PathBuf>,
    connection: Option<Connection>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the settings file path.
    pub fn settings_path(mut self, path: Option<impl AsRef<Path>>) -> Self {
        self.settings_path = path.map(|p| p.as_ref().to_path_buf());
        self
    }

    /// Sets the settings directly.
    pub fn settings(mut self, settings: NodeServicesSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the address space snapshot to open.
    pub fn address_space(mut self, path: impl AsRef<Path>) -> Self {
        self.address_space = Some(path.as_ref().to_path_buf());
        self
    }

    /// Uses an existing connection instead of a snapshot.
    pub fn connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<SessionRuntime> {
        let settings = match self.settings {
            Some(settings) => settings,
            None => load_settings(self.settings_path.as_deref())?,
        };

        let connection = match (self.connection, self.address_space) {
            (Some(connection), _) => connection,
            (None, Some(path)) => {
                let session =
                    open_memory_session(&path, settings.browse.max_references_per_node)
                        .map_err(|e| BinError::from(e).with_context("Failed to open address space"))?;
                info!(
                    path = %path.display(),
                    max_references = settings.browse.max_references_per_node,
                    "Opened address space"
                );
                Arc::new(session) as Connection
            }
            (None, None) => return Err(BinError::init("No address space provided")),
        };

        Ok(SessionRuntime::new(settings, connection))
    }
}

/// Loads settings from `path`, or defaults plus environment overrides.
pub fn load_settings(path: Option<&Path>) -> BinResult<NodeServicesSettings> {
    ConfigLoader::new()
        .load_or_default(path)
        .map_err(|e| BinError::from(e).with_context("Failed to load settings"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uapub_nodes::{AddressSpace, MemorySession};

    #[test]
    fn test_runtime_from_connection() {
        let mut settings = NodeServicesSettings::default();
        settings.operation_timeout = Duration::from_secs(5);
        settings.expansion.discard_errors = true;

        let connection: Connection = Arc::new(MemorySession::new(AddressSpace::with_standard_nodes()));
        let runtime = RuntimeBuilder::new()
            .settings(settings)
            .connection(connection)
            .build()
            .unwrap();

        assert_eq!(runtime.services().options().operation_timeout, Duration::from_secs(5));
        assert!(runtime.expansion_defaults().discard_errors);
        assert!(runtime.configuration().published_nodes().is_empty());
        assert!(!runtime.cancel_token().is_cancelled());
    }

    #[test]
    fn test_runtime_builder_requires_address_space() {
        let result = RuntimeBuilder::new()
            .settings(NodeServicesSettings::default())
            .build();
        assert!(matches!(result, Err(BinError::Initialization(_))));
    }

    #[test]
    fn test_runtime_builder_missing_snapshot() {
        let err = RuntimeBuilder::new()
            .settings(NodeServicesSettings::default())
            .address_space("/nonexistent/space.yaml")
            .build()
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 1);
    }
}
