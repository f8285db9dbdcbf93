// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration error types for uapub-config.
//!
//! Covers reading, parsing and validating settings files, published nodes
//! files and address space snapshots.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration file.
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Error message.
        message: String,
        /// Line number (if available).
        line: Option<usize>,
    },

    /// Configuration validation failed.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid environment variable value.
    #[error("Invalid environment variable value for '{name}': {message}")]
    InvalidEnvVar {
        /// The environment variable name.
        name: String,
        /// Error message.
        message: String,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Value out of range.
    #[error("Value out of range for '{field}': {value} (expected {min}..{max})")]
    OutOfRange {
        /// The field name.
        field: String,
        /// The actual value.
        value: String,
        /// Minimum value.
        min: String,
        /// Maximum value.
        max: String,
    },

    /// A published nodes entry is malformed.
    #[error("Invalid published nodes entry {index} in '{path}': {message}")]
    InvalidEntry {
        /// File the entry was read from.
        path: PathBuf,
        /// Position of the entry in the file.
        index: usize,
        /// Error message.
        message: String,
    },

    /// Unsupported configuration format.
    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The unsupported format.
        format: String,
    },

    /// Serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
        /// Line number reported by the parser.
        line: Option<usize>,
    },

    /// An address space snapshot could not be built.
    #[error("Invalid address space '{path}': {source}")]
    AddressSpace {
        /// Snapshot file.
        path: PathBuf,
        /// Underlying node services error.
        #[source]
        source: uapub_nodes::OpcUaError,
    },
}

impl ConfigError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid environment variable error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an out of range error.
    pub fn out_of_range<T: std::fmt::Display>(
        field: impl Into<String>,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Creates an invalid published nodes entry error.
    pub fn invalid_entry(
        path: impl Into<PathBuf>,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidEntry {
            path: path.into(),
            index,
            message: message.into(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            line: None,
        }
    }

    /// Creates a serialization error carrying the parser's line number.
    pub fn serialization_at(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::Serialization {
            message: message.into(),
            line,
        }
    }

    /// Creates an address space error.
    pub fn address_space(path: impl Into<PathBuf>, source: uapub_nodes::OpcUaError) -> Self {
        Self::AddressSpace {
            path: path.into(),
            source,
        }
    }

    /// Attaches the file a serialization error came from.
    pub(crate) fn at_path(self, path: &std::path::Path) -> Self {
        match self {
            ConfigError::Serialization { message, line } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
                line,
            },
            other => other,
        }
    }

    /// Returns a user-friendly error message in Korean.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Parse { path, message, line } => {
                if let Some(line) = line {
                    format!(
                        "설정 파일 파싱 실패 ({}, 라인 {}): {}",
                        path.display(),
                        line,
                        message
                    )
                } else {
                    format!("설정 파일 파싱 실패 ({}): {}", path.display(), message)
                }
            }
            ConfigError::Validation { field, message } => {
                format!("설정 검증 실패 ({}): {}", field, message)
            }
            ConfigError::Io { path, .. } => {
                format!("설정 파일 읽기 실패: {}", path.display())
            }
            ConfigError::InvalidEnvVar { name, message } => {
                format!("잘못된 환경 변수 값 ({}): {}", name, message)
            }
            ConfigError::FileNotFound { path } => {
                format!("파일을 찾을 수 없습니다: {}", path.display())
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                format!(
                    "범위 초과 ({}): {} (허용 범위: {}..{})",
                    field, value, min, max
                )
            }
            ConfigError::InvalidEntry { path, index, message } => {
                format!(
                    "잘못된 게시 노드 항목 ({} #{}): {}",
                    path.display(),
                    index,
                    message
                )
            }
            ConfigError::UnsupportedFormat { format } => {
                format!("지원하지 않는 설정 형식: {}", format)
            }
            ConfigError::Serialization { message, .. } => {
                format!("직렬화 오류: {}", message)
            }
            ConfigError::AddressSpace { path, source } => {
                format!("주소 공간 로드 실패 ({}): {}", path.display(), source)
            }
        }
    }
}

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creation() {
        let error = ConfigError::validation("browse.max_references_per_node", "must be positive");
        assert!(matches!(error, ConfigError::Validation { .. }));

        let error = ConfigError::invalid_entry("pn.json", 2, "missing opc nodes");
        assert!(matches!(error, ConfigError::InvalidEntry { index: 2, .. }));
        assert_eq!(
            error.to_string(),
            "Invalid published nodes entry 2 in 'pn.json': missing opc nodes"
        );
    }

    #[test]
    fn test_config_error_user_message() {
        let error = ConfigError::validation("operation_timeout", "must be positive");
        let msg = error.user_message();
        assert!(msg.contains("설정 검증 실패"));
        assert!(msg.contains("operation_timeout"));
    }

    #[test]
    fn test_serialization_error_gains_path() {
        let error = ConfigError::serialization_at("expected a sequence", Some(3))
            .at_path(std::path::Path::new("pn.json"));
        match error {
            ConfigError::Parse { path, line, .. } => {
                assert_eq!(path, PathBuf::from("pn.json"));
                assert_eq!(line, Some(3));
            }
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range() {
        let error = ConfigError::out_of_range("browse.max_references_per_node", 0, 1, 65535);
        let msg = error.user_message();
        assert!(msg.contains("범위 초과"));
        assert!(msg.contains("max_references_per_node"));
    }
}
