// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA node services for a publisher.
//!
//! This crate gives a publisher everything it needs to explore and operate
//! an OPC UA server's address space over an established session, and to
//! turn configured nodes into data set writer entries.
//!
//! # Features
//!
//! - **Browse**: first page, continuation and a depth-first node stream
//!   with node class and reference type filtering
//! - **Browse Paths**: relative path resolution (`<HasComponent>ns=2;Name`,
//!   `.Name`, `/Name`) from any start node
//! - **Attributes**: typed reads and writes of any attribute with JSON value
//!   encoding driven by the node's data type
//! - **Methods**: call with formal-argument defaults and method metadata
//! - **Metadata**: type definition hierarchy and variable data type details
//! - **Configuration**: expansion of objects, types and variables into
//!   publishable entries, optionally persisted through a sink
//!
//! # Error Handling
//!
//! Failures reported by the server never abort a request; they are returned
//! inline as [`ServiceResult`] records. Only structurally invalid requests
//! return an error:
//!
//! ```text
//! OpcUaError
//! ├── Browse        - Unknown nodes and unresolved paths
//! ├── Operation     - Failed reads, writes, calls and service faults
//! ├── Conversion    - Value encoding and decoding failures
//! ├── Configuration - Malformed identifiers
//! ├── Request       - Structurally invalid requests (returned to the caller)
//! ├── Persistence   - Published nodes sink rejections
//! └── Cancelled     - Cooperative cancellation
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use uapub_nodes::{BrowseFirstRequest, Connection, MemorySession, NodeServices, NodeServicesApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection: Connection = Arc::new(MemorySession::from_model(&model)?);
//!     let services = NodeServices::default();
//!
//!     let response = services
//!         .browse_first(&connection, BrowseFirstRequest::default(), &CancellationToken::new())
//!         .await?;
//!     for reference in response.references.unwrap_or_default() {
//!         println!("{:?}", reference.target.display_name);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

mod attributes;
mod browse;
pub mod browse_path;
pub mod client;
pub mod configuration;
pub mod diagnostics;
pub mod error;
mod metadata;
mod method;
pub mod models;
mod reader;
pub mod services;
pub mod status;
pub mod types;
pub mod variant;

// Re-export commonly used types
pub use error::{
    BrowseError, ConfigurationError, ConversionError, ErrorCode, ErrorSeverity, OpcUaError,
    OpcUaErrorContext, OpcUaResult, OperationError, PersistenceError, RequestError,
};

pub use types::{
    AttributeId, BrowseDirection, ExpandedNodeId, LocalizedText, NamespaceTable, NodeClass,
    NodeId, NodeIdentifier, OpcUaDataType, QualifiedName,
};

pub use variant::{Array, DataValue, ExtensionObject, IndexRange, Variant};

pub use status::{status_code_name, StatusCode};

pub use diagnostics::{DiagnosticsLevel, RequestHeader, ServiceResult};

// Re-export session types
pub use client::{
    AddressSpace, AddressSpaceModel, Connection, MemorySession, OpcUaSession, VariantCodec,
    VariantConverterRegistry,
};

// Re-export request and response models
pub use models::{
    BrowseFirstRequest, BrowseFirstResponse, BrowseNextRequest, BrowseNextResponse,
    BrowsePathRequest, BrowsePathResponse, BrowseStreamChunk, BrowseStreamRequest,
    MethodCallArgument, MethodCallRequest, MethodCallResponse, MethodMetadataRequest,
    MethodMetadataResponse, NodeMetadataRequest, NodeMetadataResponse, NodeModel,
    NodeReferenceModel, ReadRequest, ReadResponse, ValueReadRequest, ValueReadResponse,
    ValueWriteRequest, ValueWriteResponse, WriteRequest, WriteResponse,
};

// Re-export services
pub use services::{NodeServices, NodeServicesApi, NodeServicesOptions};

pub use configuration::{
    ConfigurationServices, ConfigurationServicesApi, InMemoryPublishedNodes, OpcNode,
    PublishedNodeExpansion, PublishedNodesEntry, PublishedNodesServices, ServiceResponse,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
