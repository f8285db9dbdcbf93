// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types of the node and configuration services.
//!
//! Server-reported failures never surface as [`OpcUaError`]; they are turned
//! into inline [`ServiceResult`] records next to the affected item. The error
//! hierarchy below is reserved for structurally invalid requests, codec
//! failures, persistence sink rejections and session-level faults, each of
//! which can still be folded into a [`ServiceResult`] with
//! [`OpcUaError::to_service_result`].
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Browse        - Node browsing and path resolution failures
//! ├── Operation     - Read/write/call failures reported by the session
//! ├── Conversion    - JSON <-> variant codec errors
//! ├── Configuration - Invalid identifiers and settings
//! ├── Request       - Structurally invalid requests
//! ├── Persistence   - Published nodes sink rejections
//! └── Cancelled     - Cooperative cancellation
//! ```
//!
//! # Examples
//!
//! ```
//! use uapub_nodes::error::{OpcUaError, RequestError};
//! use uapub_nodes::diagnostics::DiagnosticsLevel;
//! use uapub_nodes::status::StatusCode;
//!
//! let error = OpcUaError::request(RequestError::bad_request("Bad browse path"));
//! assert!(!error.is_retryable());
//!
//! let info = error.to_service_result(DiagnosticsLevel::None);
//! assert_eq!(info.status_code, StatusCode::BAD_INVALID_ARGUMENT);
//! assert!(info.error_message.is_none());
//! ```

use std::fmt;

use thiserror::Error;
use tracing::Level;

use crate::diagnostics::{DiagnosticsLevel, ServiceResult};
use crate::status::StatusCode;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type of the node services.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Node browsing errors.
    #[error("{0}")]
    Browse(#[from] BrowseError),

    /// Read/write/call operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Data conversion errors.
    #[error("{0}")]
    Conversion(#[from] ConversionError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Invalid request errors.
    #[error("{0}")]
    Request(#[from] RequestError),

    /// Published nodes persistence errors.
    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    /// The operation was cancelled.
    #[error("Operation was cancelled")]
    Cancelled,
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a browse error.
    #[inline]
    pub fn browse(error: BrowseError) -> Self {
        Self::Browse(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Creates a conversion error.
    #[inline]
    pub fn conversion(error: ConversionError) -> Self {
        Self::Conversion(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a request error.
    #[inline]
    pub fn request(error: RequestError) -> Self {
        Self::Request(error)
    }

    /// Creates a persistence error.
    #[inline]
    pub fn persistence(error: PersistenceError) -> Self {
        Self::Persistence(error)
    }

    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::Browse(BrowseError::node_not_found(node_id))
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Request(RequestError::bad_request(message))
    }

    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation(OperationError::read_failed(node_id, message))
    }

    /// Creates a write failed error.
    pub fn write_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation(OperationError::write_failed(node_id, message))
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::Conversion(ConversionError::type_mismatch(expected, actual))
    }

    /// Creates an invalid node id error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::invalid_node_id(node_id, reason))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Browse(e) => e.is_retryable(),
            Self::Operation(e) => e.is_retryable(),
            Self::Persistence(e) => e.is_retryable(),
            Self::Conversion(_) | Self::Configuration(_) | Self::Request(_) | Self::Cancelled => {
                false
            }
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Browse(e) => e.severity(),
            Self::Operation(e) => e.severity(),
            Self::Conversion(_) => ErrorSeverity::Warning,
            Self::Configuration(_) => ErrorSeverity::Error,
            Self::Request(_) => ErrorSeverity::Warning,
            Self::Persistence(e) => e.severity(),
            Self::Cancelled => ErrorSeverity::Info,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Browse(_) => "browse",
            Self::Operation(_) => "operation",
            Self::Conversion(_) => "conversion",
            Self::Configuration(_) => "configuration",
            Self::Request(_) => "request",
            Self::Persistence(_) => "persistence",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Browse(e) => e.error_code(),
            Self::Operation(e) => e.error_code(),
            Self::Conversion(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
            Self::Request(e) => e.error_code(),
            Self::Persistence(e) => e.error_code(),
            Self::Cancelled => ErrorCode::new(12, 1),
        }
    }

    /// Returns the OPC UA status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Browse(e) => e.status_code(),
            Self::Operation(e) => e.status_code(),
            Self::Conversion(e) => e.status_code(),
            Self::Configuration(e) => e.status_code(),
            Self::Request(e) => e.status_code(),
            Self::Persistence(e) => e.status_code(),
            Self::Cancelled => StatusCode::BAD_REQUEST_CANCELLED_BY_CLIENT,
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Browse(e) => e.recovery_hints(),
            Self::Operation(e) => e.recovery_hints(),
            Self::Conversion(e) => e.recovery_hints(),
            Self::Configuration(e) => e.recovery_hints(),
            Self::Request(e) => e.recovery_hints(),
            Self::Persistence(e) => e.recovery_hints(),
            Self::Cancelled => vec!["The caller cancelled the operation"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Browse(e) => e.user_message(),
            Self::Operation(e) => e.user_message(),
            Self::Conversion(e) => e.user_message(),
            Self::Configuration(e) => e.user_message(),
            Self::Request(e) => e.user_message(),
            Self::Persistence(e) => e.user_message(),
            Self::Cancelled => "작업이 취소됨".to_string(),
        }
    }

    /// Converts this error into an inline diagnostics record.
    pub fn to_service_result(&self, level: DiagnosticsLevel) -> ServiceResult {
        ServiceResult::with_message(self.status_code(), self.to_string())
            .additional_info(format!("{} ({})", self.category(), self.error_code()))
            .filtered(level)
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let level = self.tracing_level();
        let code = self.error_code();

        match level {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

// =============================================================================
// BrowseError
// =============================================================================

/// Node browsing and path resolution errors.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// Node not found.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The node ID that was not found.
        node_id: String,
    },

    /// Browse failed.
    #[error("Browse failed for node '{node_id}': {message}")]
    BrowseFailed {
        /// Node ID being browsed.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// Continuation point unknown or already consumed.
    #[error("Invalid continuation point")]
    BadContinuationPoint,

    /// Invalid browse path.
    #[error("Invalid browse path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: String,
        /// Reason.
        reason: String,
    },

    /// Path not found.
    #[error("{path} did not resolve to any node.")]
    PathNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Path resolved to more than one node.
    #[error("{path} resolved to {count} nodes.")]
    AmbiguousPath {
        /// The ambiguous path.
        path: String,
        /// Number of resolved nodes.
        count: usize,
    },
}

impl BrowseError {
    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Creates a browse failed error.
    pub fn browse_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrowseFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a path not found error.
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Creates an ambiguous path error.
    pub fn ambiguous_path(path: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousPath {
            path: path.into(),
            count,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BrowseFailed { .. })
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::BrowseFailed { .. } => ErrorSeverity::Error,
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NodeNotFound { .. } => ErrorCode::new(4, 1),
            Self::BrowseFailed { .. } => ErrorCode::new(4, 2),
            Self::BadContinuationPoint => ErrorCode::new(4, 4),
            Self::InvalidPath { .. } => ErrorCode::new(4, 7),
            Self::PathNotFound { .. } => ErrorCode::new(4, 9),
            Self::AmbiguousPath { .. } => ErrorCode::new(4, 10),
        }
    }

    /// Returns the status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NodeNotFound { .. } => StatusCode::BAD_NODE_ID_UNKNOWN,
            Self::BrowseFailed { .. } => StatusCode::BAD_UNEXPECTED_ERROR,
            Self::BadContinuationPoint => StatusCode::BAD_CONTINUATION_POINT_INVALID,
            Self::InvalidPath { .. } => StatusCode::BAD_BROWSE_NAME_INVALID,
            Self::PathNotFound { .. } => StatusCode::BAD_NOT_FOUND,
            Self::AmbiguousPath { .. } => StatusCode::BAD_INVALID_ARGUMENT,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NodeNotFound { .. } => vec![
                "Verify the node ID is correct",
                "Use browse to discover available nodes",
            ],
            Self::BrowseFailed { .. } => vec![
                "Check server connection",
                "Verify browse permissions",
                "Retry the operation",
            ],
            Self::BadContinuationPoint => vec![
                "Continuation point may have been consumed or released",
                "Restart the browse operation with browse_first",
            ],
            Self::InvalidPath { .. } => vec![
                "Path elements: Name, /Name, .Name or <ReferenceType>Name",
                "Qualify names with ns:Name or uri#Name",
            ],
            Self::PathNotFound { .. } => vec![
                "Verify each element of the path exists",
                "Use browse to discover available paths",
            ],
            Self::AmbiguousPath { .. } => vec![
                "Use a more specific reference type in the path",
                "Start the path from a node closer to the target",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NodeNotFound { node_id } => {
                format!("노드를 찾을 수 없음: {}", node_id)
            }
            Self::BrowseFailed { node_id, .. } => {
                format!("노드 탐색 실패: {}", node_id)
            }
            Self::BadContinuationPoint => "잘못된 연속 포인트".to_string(),
            Self::InvalidPath { path, .. } => {
                format!("잘못된 탐색 경로: {}", path)
            }
            Self::PathNotFound { path } => {
                format!("경로를 찾을 수 없음: {}", path)
            }
            Self::AmbiguousPath { path, count } => {
                format!("경로가 {}개의 노드로 해석됨: {}", count, path)
            }
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Read/write/call operation errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Read operation failed.
    #[error("Read failed for node '{node_id}': {message}")]
    ReadFailed {
        /// Node ID.
        node_id: String,
        /// Error message.
        message: String,
        /// Status code reported by the session, if any.
        status_code: Option<StatusCode>,
    },

    /// Write operation failed.
    #[error("Write failed for node '{node_id}': {message}")]
    WriteFailed {
        /// Node ID.
        node_id: String,
        /// Error message.
        message: String,
        /// Status code reported by the session, if any.
        status_code: Option<StatusCode>,
    },

    /// Method call failed.
    #[error("Call of method '{method_id}' failed: {message}")]
    CallFailed {
        /// Method node ID.
        method_id: String,
        /// Error message.
        message: String,
        /// Status code reported by the session, if any.
        status_code: Option<StatusCode>,
    },

    /// Operation returned a bad status code.
    #[error("Bad status for node '{node_id}': {status_code}")]
    BadStatus {
        /// Node ID.
        node_id: String,
        /// Status code.
        status_code: StatusCode,
    },

    /// A whole service request failed.
    #[error("Service '{service}' failed: {status_code}")]
    ServiceFault {
        /// Name of the service.
        service: String,
        /// Status code.
        status_code: StatusCode,
    },

    /// Node is not readable.
    #[error("Node '{node_id}' is not readable")]
    NotReadable {
        /// Node ID.
        node_id: String,
    },

    /// Node is not writable.
    #[error("Node '{node_id}' is not writable")]
    NotWritable {
        /// Node ID.
        node_id: String,
    },

    /// Operation not supported.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },
}

impl OperationError {
    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            node_id: node_id.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates a write failed error.
    pub fn write_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            node_id: node_id.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates a call failed error.
    pub fn call_failed(method_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallFailed {
            method_id: method_id.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates a bad status error.
    pub fn bad_status(node_id: impl Into<String>, status_code: StatusCode) -> Self {
        Self::BadStatus {
            node_id: node_id.into(),
            status_code,
        }
    }

    /// Creates a service fault error.
    pub fn service_fault(service: impl Into<String>, status_code: StatusCode) -> Self {
        Self::ServiceFault {
            service: service.into(),
            status_code,
        }
    }

    /// Creates a not readable error.
    pub fn not_readable(node_id: impl Into<String>) -> Self {
        Self::NotReadable {
            node_id: node_id.into(),
        }
    }

    /// Creates a not writable error.
    pub fn not_writable(node_id: impl Into<String>) -> Self {
        Self::NotWritable {
            node_id: node_id.into(),
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        let code = match self {
            Self::ReadFailed { status_code, .. }
            | Self::WriteFailed { status_code, .. }
            | Self::CallFailed { status_code, .. } => *status_code,
            Self::BadStatus { status_code, .. } | Self::ServiceFault { status_code, .. } => {
                Some(*status_code)
            }
            _ => None,
        };
        matches!(
            code.map(StatusCode::code),
            Some(0x8005_0000) | Some(0x800A_0000) | Some(0x800D_0000) | Some(0x8004_0000)
        )
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ServiceFault { .. } => ErrorSeverity::Error,
            Self::NotSupported { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ReadFailed { .. } => ErrorCode::new(5, 1),
            Self::WriteFailed { .. } => ErrorCode::new(5, 2),
            Self::BadStatus { .. } => ErrorCode::new(5, 3),
            Self::NotReadable { .. } => ErrorCode::new(5, 4),
            Self::NotWritable { .. } => ErrorCode::new(5, 5),
            Self::NotSupported { .. } => ErrorCode::new(5, 8),
            Self::CallFailed { .. } => ErrorCode::new(5, 9),
            Self::ServiceFault { .. } => ErrorCode::new(5, 10),
        }
    }

    /// Returns the status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ReadFailed { status_code, .. }
            | Self::WriteFailed { status_code, .. }
            | Self::CallFailed { status_code, .. } => {
                status_code.unwrap_or(StatusCode::BAD_UNEXPECTED_ERROR)
            }
            Self::BadStatus { status_code, .. } | Self::ServiceFault { status_code, .. } => {
                *status_code
            }
            Self::NotReadable { .. } => StatusCode::BAD_NOT_READABLE,
            Self::NotWritable { .. } => StatusCode::BAD_NOT_WRITABLE,
            Self::NotSupported { .. } => StatusCode::BAD_NOT_SUPPORTED,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::ReadFailed { .. } | Self::BadStatus { .. } => vec![
                "Verify the node exists and is readable",
                "Check the attribute is supported by the node class",
            ],
            Self::WriteFailed { .. } => vec![
                "Verify the node exists and is writable",
                "Check the value matches the node's data type",
            ],
            Self::CallFailed { .. } => vec![
                "Verify the method belongs to the object",
                "Check the input arguments against the method metadata",
            ],
            Self::ServiceFault { .. } => vec![
                "Check server connection",
                "Retry the operation",
            ],
            Self::NotReadable { .. } => vec!["Check the AccessLevel attribute of the node"],
            Self::NotWritable { .. } => vec!["Check the AccessLevel attribute of the node"],
            Self::NotSupported { .. } => vec!["This operation is not supported by the session"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::ReadFailed { node_id, .. } => format!("읽기 실패: {}", node_id),
            Self::WriteFailed { node_id, .. } => format!("쓰기 실패: {}", node_id),
            Self::CallFailed { method_id, .. } => format!("메서드 호출 실패: {}", method_id),
            Self::BadStatus {
                node_id,
                status_code,
            } => format!("잘못된 상태 코드 ({}): {}", status_code.name(), node_id),
            Self::ServiceFault { service, .. } => format!("서비스 실패: {}", service),
            Self::NotReadable { node_id } => format!("읽기 권한 없음: {}", node_id),
            Self::NotWritable { node_id } => format!("쓰기 권한 없음: {}", node_id),
            Self::NotSupported { operation } => format!("지원되지 않는 작업: {}", operation),
        }
    }
}

// =============================================================================
// ConversionError
// =============================================================================

/// JSON <-> variant conversion errors.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Type mismatch.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// Invalid value.
    #[error("Invalid value for type '{target_type}': {message}")]
    InvalidValue {
        /// Target type.
        target_type: String,
        /// Error message.
        message: String,
    },

    /// Value overflow.
    #[error("Value overflow: {value} exceeds range for {target_type}")]
    Overflow {
        /// The value that overflowed.
        value: String,
        /// Target type.
        target_type: String,
    },

    /// Unknown data type name or id.
    #[error("Unknown data type: {type_name}")]
    UnknownDataType {
        /// Type name.
        type_name: String,
    },

    /// Index range syntax invalid.
    #[error("Invalid index range '{range}': {reason}")]
    InvalidIndexRange {
        /// The range text.
        range: String,
        /// Reason.
        reason: String,
    },

    /// Index range outside of the value.
    #[error("Index range '{range}' selects no data")]
    IndexRangeNoData {
        /// The range text.
        range: String,
    },
}

impl ConversionError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(target_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            target_type: target_type.into(),
            message: message.into(),
        }
    }

    /// Creates an overflow error.
    pub fn overflow(value: impl fmt::Display, target_type: impl Into<String>) -> Self {
        Self::Overflow {
            value: value.to_string(),
            target_type: target_type.into(),
        }
    }

    /// Creates an unknown data type error.
    pub fn unknown_data_type(type_name: impl Into<String>) -> Self {
        Self::UnknownDataType {
            type_name: type_name.into(),
        }
    }

    /// Creates an invalid index range error.
    pub fn invalid_index_range(range: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIndexRange {
            range: range.into(),
            reason: reason.into(),
        }
    }

    /// Creates an index range no data error.
    pub fn index_range_no_data(range: impl Into<String>) -> Self {
        Self::IndexRangeNoData {
            range: range.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => ErrorCode::new(7, 1),
            Self::InvalidValue { .. } => ErrorCode::new(7, 3),
            Self::Overflow { .. } => ErrorCode::new(7, 4),
            Self::UnknownDataType { .. } => ErrorCode::new(7, 11),
            Self::InvalidIndexRange { .. } => ErrorCode::new(7, 12),
            Self::IndexRangeNoData { .. } => ErrorCode::new(7, 13),
        }
    }

    /// Returns the status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidIndexRange { .. } => StatusCode::BAD_INDEX_RANGE_INVALID,
            Self::IndexRangeNoData { .. } => StatusCode::BAD_INDEX_RANGE_NO_DATA,
            _ => StatusCode::BAD_TYPE_MISMATCH,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::TypeMismatch { .. } => vec![
                "Check the expected data type for this node",
                "Pass the data type explicitly with the value",
            ],
            Self::InvalidValue { .. } => vec![
                "Check the value format",
                "Ensure value is valid for the target type",
            ],
            Self::Overflow { .. } => vec![
                "Value exceeds the range of the target type",
                "Use a larger data type",
            ],
            Self::UnknownDataType { .. } => vec![
                "Use a built-in type name such as Double or a data type node id",
            ],
            Self::InvalidIndexRange { .. } => vec!["Index range format: n or a:b with a < b"],
            Self::IndexRangeNoData { .. } => vec!["The range lies outside of the value"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::TypeMismatch { expected, actual } => {
                format!("타입 불일치 (예상: {}, 실제: {})", expected, actual)
            }
            Self::InvalidValue { target_type, .. } => {
                format!("잘못된 값 (타입: {})", target_type)
            }
            Self::Overflow { .. } => "값 오버플로우".to_string(),
            Self::UnknownDataType { type_name } => {
                format!("알 수 없는 데이터 타입: {}", type_name)
            }
            Self::InvalidIndexRange { range, .. } => format!("잘못된 인덱스 범위: {}", range),
            Self::IndexRangeNoData { range } => format!("인덱스 범위에 데이터 없음: {}", range),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Identifier and settings errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid node ID format.
    #[error("Invalid node ID format: '{node_id}' - {reason}")]
    InvalidNodeId {
        /// The invalid node ID.
        node_id: String,
        /// Reason.
        reason: String,
    },

    /// Namespace uri not present in the namespace table.
    #[error("Unknown namespace: {uri}")]
    UnknownNamespace {
        /// The namespace uri or index.
        uri: String,
    },

    /// Invalid configuration value.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid node ID error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown namespace error.
    pub fn unknown_namespace(uri: impl Into<String>) -> Self {
        Self::UnknownNamespace { uri: uri.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidNodeId { .. } => ErrorCode::new(8, 2),
            Self::UnknownNamespace { .. } => ErrorCode::new(8, 3),
            Self::InvalidValue { .. } => ErrorCode::new(8, 4),
        }
    }

    /// Returns the status code this error is reported with.
    ///
    /// Malformed identifiers are reported like unknown ones so that a caller
    /// cannot distinguish a typo from a missing node.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidNodeId { .. } | Self::UnknownNamespace { .. } => {
                StatusCode::BAD_NODE_ID_UNKNOWN
            }
            _ => StatusCode::BAD_INVALID_ARGUMENT,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidNodeId { .. } => vec![
                "Node ID format: i=85, ns=2;s=Name, nsu=<uri>;i=1 or <uri>#s=Name",
                "Built-in data type names such as Double are accepted as well",
            ],
            Self::UnknownNamespace { .. } => vec![
                "Check the namespace array of the server",
                "Use the namespace index form ns=<index>;…",
            ],
            Self::InvalidValue { .. } => vec!["Check the configuration value"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidNodeId { node_id, .. } => format!("잘못된 노드 ID 형식: {}", node_id),
            Self::UnknownNamespace { uri } => format!("알 수 없는 네임스페이스: {}", uri),
            Self::InvalidValue { field, .. } => format!("잘못된 설정 값: {}", field),
        }
    }
}

// =============================================================================
// RequestError
// =============================================================================

/// Structurally invalid requests.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Generic bad request.
    #[error("{message}")]
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Required argument missing.
    #[error("Missing argument: {name}")]
    MissingArgument {
        /// Argument name.
        name: String,
    },

    /// Too many method arguments.
    #[error("Too many arguments provided: expected at most {expected}, got {actual}")]
    TooManyArguments {
        /// Formal argument count.
        expected: usize,
        /// Provided argument count.
        actual: usize,
    },
}

impl RequestError {
    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a missing argument error.
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Creates a too many arguments error.
    pub fn too_many_arguments(expected: usize, actual: usize) -> Self {
        Self::TooManyArguments { expected, actual }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::BadRequest { .. } => ErrorCode::new(10, 1),
            Self::MissingArgument { .. } => ErrorCode::new(10, 2),
            Self::TooManyArguments { .. } => ErrorCode::new(10, 3),
        }
    }

    /// Returns the status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooManyArguments { .. } => StatusCode::BAD_TOO_MANY_ARGUMENTS,
            _ => StatusCode::BAD_INVALID_ARGUMENT,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::BadRequest { .. } => vec!["Check the request model"],
            Self::MissingArgument { .. } => vec!["Provide the missing argument"],
            Self::TooManyArguments { .. } => vec!["Query the method metadata for its signature"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message } => format!("잘못된 요청: {}", message),
            Self::MissingArgument { name } => format!("인수 누락: {}", name),
            Self::TooManyArguments { expected, actual } => {
                format!("인수가 너무 많음 ({}/{})", actual, expected)
            }
        }
    }
}

// =============================================================================
// PersistenceError
// =============================================================================

/// Published nodes sink errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Entry rejected by validation.
    #[error("{message}")]
    Rejected {
        /// Error message.
        message: String,
    },

    /// Duplicate data set field id.
    #[error("Field ids must be present and unique.")]
    DuplicateFieldId {
        /// The duplicated field id.
        field_id: String,
    },

    /// Entry to remove does not exist.
    #[error("Data set writer '{writer_id}' not found in group '{group}'")]
    EntryNotFound {
        /// Writer group.
        group: String,
        /// Data set writer id.
        writer_id: String,
    },

    /// Sink unavailable.
    #[error("Published nodes store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },
}

impl PersistenceError {
    /// Creates a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a duplicate field id error.
    pub fn duplicate_field_id(field_id: impl Into<String>) -> Self {
        Self::DuplicateFieldId {
            field_id: field_id.into(),
        }
    }

    /// Creates an entry not found error.
    pub fn entry_not_found(group: impl Into<String>, writer_id: impl Into<String>) -> Self {
        Self::EntryNotFound {
            group: group.into(),
            writer_id: writer_id.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Unavailable { .. } => ErrorSeverity::Error,
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Rejected { .. } => ErrorCode::new(11, 1),
            Self::DuplicateFieldId { .. } => ErrorCode::new(11, 2),
            Self::EntryNotFound { .. } => ErrorCode::new(11, 3),
            Self::Unavailable { .. } => ErrorCode::new(11, 4),
        }
    }

    /// Returns the status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EntryNotFound { .. } => StatusCode::BAD_NOT_FOUND,
            Self::Unavailable { .. } => StatusCode::BAD_RESOURCE_UNAVAILABLE,
            _ => StatusCode::BAD_INVALID_ARGUMENT,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Rejected { .. } => vec!["Check the entry contains at least one node"],
            Self::DuplicateFieldId { .. } => vec![
                "Give every node a unique DataSetFieldId",
                "Let the expansion synthesize field ids",
            ],
            Self::EntryNotFound { .. } => vec!["List the configured endpoints first"],
            Self::Unavailable { .. } => vec!["Retry once the store is reachable"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message } => format!("항목 거부됨: {}", message),
            Self::DuplicateFieldId { field_id } => format!("중복된 필드 ID: {}", field_id),
            Self::EntryNotFound { writer_id, .. } => format!("항목을 찾을 수 없음: {}", writer_id),
            Self::Unavailable { .. } => "저장소를 사용할 수 없음".to_string(),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 4: Browse
/// - 5: Operation
/// - 7: Conversion
/// - 8: Configuration
/// - 10: Request
/// - 11: Persistence
/// - 12: Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }

    /// Creates from a u16.
    pub fn from_u16(value: u16) -> Self {
        Self {
            category: (value >> 8) as u8,
            code: (value & 0xFF) as u8,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with OpcUaError.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Error Context Extension
// =============================================================================

/// Extension trait for adding context to OPC UA errors.
pub trait OpcUaErrorContext<T> {
    /// Adds node context to errors.
    fn with_node(self, node_id: &str) -> Result<T, OpcUaError>;

    /// Adds operation context to errors.
    fn with_operation(self, operation: &str) -> Result<T, OpcUaError>;
}

impl<T> OpcUaErrorContext<T> for Result<T, OpcUaError> {
    fn with_node(self, node_id: &str) -> Result<T, OpcUaError> {
        self.map_err(|e| {
            tracing::debug!(node_id = node_id, error = %e, "OPC UA error with node context");
            e
        })
    }

    fn with_operation(self, operation: &str) -> Result<T, OpcUaError> {
        self.map_err(|e| {
            tracing::debug!(operation = operation, error = %e, "OPC UA error with operation context");
            e
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
