// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node services facade.
//!
//! [`NodeServicesApi`] is the entry point of every node operation. Each call
//! binds the connection, the request's diagnostics level and the caller's
//! cancellation token into one request-scoped reader and runs the operation
//! on it.
//!
//! # Error Routing
//!
//! ```text
//! operation result
//!     ├── Ok(response)              -> response
//!     ├── Err(OpcUaError::Request)  -> Err (structurally invalid request)
//!     └── Err(anything else)        -> Ok(response { error_info })
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use uapub_nodes::{MemorySession, NodeServices, NodeServicesApi, ValueReadRequest};
//!
//! let connection: Connection = Arc::new(MemorySession::from_model(&model)?);
//! let services = NodeServices::default();
//! let response = services
//!     .value_read(
//!         &connection,
//!         ValueReadRequest { node_id: Some("i=2255".into()), ..Default::default() },
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::attributes;
use crate::browse;
use crate::browse_path;
use crate::client::{Connection, VariantConverterRegistry};
use crate::diagnostics::{DiagnosticsLevel, RequestHeader};
use crate::error::OpcUaResult;
use crate::metadata;
use crate::method;
use crate::models::{
    BrowseFirstRequest, BrowseFirstResponse, BrowseNextRequest, BrowseNextResponse,
    BrowsePathRequest, BrowsePathResponse, BrowseStreamChunk, BrowseStreamRequest,
    MethodCallRequest, MethodCallResponse, MethodMetadataRequest, MethodMetadataResponse,
    NodeMetadataRequest, NodeMetadataResponse, ReadRequest, ReadResponse, ValueReadRequest,
    ValueReadResponse, ValueWriteRequest, ValueWriteResponse, WriteRequest, WriteResponse,
};
use crate::reader::NodeReader;

// =============================================================================
// NodeServicesOptions
// =============================================================================

/// Defaults applied to every node service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeServicesOptions {
    /// Diagnostics level of requests without a header.
    #[serde(default)]
    pub diagnostics_level: DiagnosticsLevel,

    /// Depth limit of `browse_stream`; 0 is unlimited.
    #[serde(default)]
    pub max_stream_depth: usize,

    /// Timeout of each session call.
    #[serde(default = "default_operation_timeout", with = "crate::types::humantime_serde")]
    pub operation_timeout: Duration,
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for NodeServicesOptions {
    fn default() -> Self {
        Self {
            diagnostics_level: DiagnosticsLevel::default(),
            max_stream_depth: 0,
            operation_timeout: default_operation_timeout(),
        }
    }
}

// =============================================================================
// NodeServicesApi
// =============================================================================

/// Browse, read, write and call services on an OPC UA connection.
///
/// Server failures come back inside the response's `error_info`; only
/// structurally invalid requests fail the call.
#[async_trait]
pub trait NodeServicesApi: Send + Sync {
    /// Browses the first page of references of a node.
    async fn browse_first(
        &self,
        connection: &Connection,
        request: BrowseFirstRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<BrowseFirstResponse>;

    /// Continues or releases a browse.
    async fn browse_next(
        &self,
        connection: &Connection,
        request: BrowseNextRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<BrowseNextResponse>;

    /// Walks the address space below the start nodes.
    fn browse_stream(
        &self,
        connection: &Connection,
        request: BrowseStreamRequest,
        cancel: &CancellationToken,
    ) -> BoxStream<'static, BrowseStreamChunk>;

    /// Resolves browse paths to nodes.
    async fn browse_path(
        &self,
        connection: &Connection,
        request: BrowsePathRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<BrowsePathResponse>;

    /// Reads attributes.
    async fn read(
        &self,
        connection: &Connection,
        request: ReadRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ReadResponse>;

    /// Writes attributes.
    async fn write(
        &self,
        connection: &Connection,
        request: WriteRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<WriteResponse>;

    /// Reads a typed value.
    async fn value_read(
        &self,
        connection: &Connection,
        request: ValueReadRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ValueReadResponse>;

    /// Writes a typed value.
    async fn value_write(
        &self,
        connection: &Connection,
        request: ValueWriteRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ValueWriteResponse>;

    /// Reads the signature of a method.
    async fn get_method_metadata(
        &self,
        connection: &Connection,
        request: MethodMetadataRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<MethodMetadataResponse>;

    /// Reads the unified metadata of a node.
    async fn get_metadata(
        &self,
        connection: &Connection,
        request: NodeMetadataRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<NodeMetadataResponse>;

    /// Calls a method.
    async fn method_call(
        &self,
        connection: &Connection,
        request: MethodCallRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<MethodCallResponse>;
}

// =============================================================================
// NodeServices
// =============================================================================

/// Default [`NodeServicesApi`] implementation.
#[derive(Debug, Clone)]
pub struct NodeServices {
    options: NodeServicesOptions,
    registry: Arc<VariantConverterRegistry>,
}

impl NodeServices {
    /// Creates services with the built-in value converters.
    pub fn new(options: NodeServicesOptions) -> Self {
        Self::with_registry(options, Arc::new(VariantConverterRegistry::with_builtin_converters()))
    }

    /// Creates services with a custom converter registry.
    pub fn with_registry(options: NodeServicesOptions, registry: Arc<VariantConverterRegistry>) -> Self {
        Self { options, registry }
    }

    /// Returns the options.
    pub fn options(&self) -> &NodeServicesOptions {
        &self.options
    }

    pub(crate) fn reader(
        &self,
        connection: &Connection,
        header: Option<&RequestHeader>,
        cancel: &CancellationToken,
    ) -> NodeReader {
        NodeReader::new(
            connection,
            Arc::clone(&self.registry),
            RequestHeader::level_or(header, self.options.diagnostics_level),
            cancel,
            self.options.operation_timeout,
        )
    }
}

impl Default for NodeServices {
    fn default() -> Self {
        Self::new(NodeServicesOptions::default())
    }
}

#[async_trait]
impl NodeServicesApi for NodeServices {
    async fn browse_first(
        &self,
        connection: &Connection,
        request: BrowseFirstRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<BrowseFirstResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = browse::browse_first(&reader, &request).await;
        reader.settle("BrowseFirst", result)
    }

    async fn browse_next(
        &self,
        connection: &Connection,
        request: BrowseNextRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<BrowseNextResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = browse::browse_next(&reader, &request).await;
        reader.settle("BrowseNext", result)
    }

    fn browse_stream(
        &self,
        connection: &Connection,
        request: BrowseStreamRequest,
        cancel: &CancellationToken,
    ) -> BoxStream<'static, BrowseStreamChunk> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        browse::browse_stream(reader, request, self.options.max_stream_depth)
    }

    async fn browse_path(
        &self,
        connection: &Connection,
        request: BrowsePathRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<BrowsePathResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = browse_path::browse_path(&reader, &request).await;
        reader.settle("BrowsePath", result)
    }

    async fn read(
        &self,
        connection: &Connection,
        request: ReadRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ReadResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = attributes::read(&reader, &request).await;
        reader.settle("Read", result)
    }

    async fn write(
        &self,
        connection: &Connection,
        request: WriteRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<WriteResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = attributes::write(&reader, &request).await;
        reader.settle("Write", result)
    }

    async fn value_read(
        &self,
        connection: &Connection,
        request: ValueReadRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ValueReadResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = attributes::value_read(&reader, &request).await;
        reader.settle("ValueRead", result)
    }

    async fn value_write(
        &self,
        connection: &Connection,
        request: ValueWriteRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ValueWriteResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = attributes::value_write(&reader, &request).await;
        reader.settle("ValueWrite", result)
    }

    async fn get_method_metadata(
        &self,
        connection: &Connection,
        request: MethodMetadataRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<MethodMetadataResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = method::get_method_metadata(&reader, &request).await;
        reader.settle("GetMethodMetadata", result)
    }

    async fn get_metadata(
        &self,
        connection: &Connection,
        request: NodeMetadataRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<NodeMetadataResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = metadata::get_metadata(&reader, &request).await;
        reader.settle("GetMetadata", result)
    }

    async fn method_call(
        &self,
        connection: &Connection,
        request: MethodCallRequest,
        cancel: &CancellationToken,
    ) -> OpcUaResult<MethodCallResponse> {
        let reader = self.reader(connection, request.header.as_ref(), cancel);
        let result = method::method_call(&reader, &request).await;
        reader.settle("MethodCall", result)
    }
}

// =============================================================================
// Tests
// =============================================================================
