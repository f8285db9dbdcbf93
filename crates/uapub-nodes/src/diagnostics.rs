// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request-scoped diagnostics and the inline error record returned by every
//! node service.
//!
//! Failures reported by the server are never raised as errors. They travel
//! back to the caller as a [`ServiceResult`] attached to the affected item,
//! and the amount of detail it carries is controlled by the
//! [`DiagnosticsLevel`] of the request:
//!
//! | level         | populated fields                                   |
//! |---------------|----------------------------------------------------|
//! | `None`        | `status_code`, `symbolic_id`                       |
//! | `Status`      | + `error_message`                                  |
//! | `Information` | + `locale`, `inner`                                |
//! | `Verbose`     | + `additional_info`                                |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::status::StatusCode;

/// Locale attached to diagnostics messages.
pub const DEFAULT_LOCALE: &str = "en-US";

// =============================================================================
// DiagnosticsLevel
// =============================================================================

/// How much diagnostic detail a service returns on failure.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DiagnosticsLevel {
    /// Status code and symbolic id only.
    None,
    /// Adds the error message.
    #[default]
    Status,
    /// Adds the locale and nested results.
    Information,
    /// Adds additional information such as the failing operation.
    Verbose,
}

impl DiagnosticsLevel {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Status => "Status",
            Self::Information => "Information",
            Self::Verbose => "Verbose",
        }
    }
}

impl fmt::Display for DiagnosticsLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticsLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "status" => Ok(Self::Status),
            "information" | "info" => Ok(Self::Information),
            "verbose" | "debug" => Ok(Self::Verbose),
            other => Err(format!("unknown diagnostics level '{}'", other)),
        }
    }
}

// =============================================================================
// Request header
// =============================================================================

/// Diagnostics options of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsModel {
    /// Requested level.
    #[serde(default)]
    pub level: DiagnosticsLevel,
}

/// Header carried by every service request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeader {
    /// Diagnostics options. When absent the service default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsModel>,
}

impl RequestHeader {
    /// Creates a header requesting the given level.
    pub fn with_level(level: DiagnosticsLevel) -> Self {
        Self {
            diagnostics: Some(DiagnosticsModel { level }),
        }
    }

    /// Returns the requested level or `default` when none was requested.
    pub fn level_or(header: Option<&RequestHeader>, default: DiagnosticsLevel) -> DiagnosticsLevel {
        header
            .and_then(|h| h.diagnostics)
            .map(|d| d.level)
            .unwrap_or(default)
    }
}

// =============================================================================
// ServiceResult
// =============================================================================

/// Inline error record (`ErrorInfo`) of a service response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResult {
    /// Raw status code.
    pub status_code: StatusCode,

    /// Symbolic name of the status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbolic_id: Option<String>,

    /// Human readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Locale of `error_message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Additional detail such as the operation that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,

    /// Nested result that caused this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Box<ServiceResult>>,
}

impl ServiceResult {
    /// Creates a fully populated result for `code`.
    pub fn new(code: StatusCode) -> Self {
        Self {
            status_code: code,
            symbolic_id: Some(code.name().to_string()),
            ..Default::default()
        }
    }

    /// Creates a result with a message.
    pub fn with_message(code: StatusCode, message: impl Into<String>) -> Self {
        Self::new(code).message(message)
    }

    /// Sets the error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self.locale = Some(DEFAULT_LOCALE.to_string());
        self
    }

    /// Sets the additional info.
    pub fn additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    /// Sets the nested result.
    pub fn inner(mut self, inner: ServiceResult) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Returns `true` if the status code is good.
    pub fn is_good(&self) -> bool {
        self.status_code.is_good()
    }

    /// Returns `true` if the status code is bad.
    pub fn is_bad(&self) -> bool {
        self.status_code.is_bad()
    }

    /// Strips the fields the given level does not allow.
    pub fn filtered(mut self, level: DiagnosticsLevel) -> Self {
        if level < DiagnosticsLevel::Verbose {
            self.additional_info = None;
        }
        if level < DiagnosticsLevel::Information {
            self.locale = None;
            self.inner = None;
        }
        if level < DiagnosticsLevel::Status {
            self.error_message = None;
        }
        if let Some(inner) = self.inner.take() {
            self.inner = Some(Box::new(inner.filtered(level)));
        }
        self
    }

    /// Builds a result from a raw status code reported by the server, or
    /// `None` when the code is good.
    pub fn from_status(
        code: StatusCode,
        context: &str,
        level: DiagnosticsLevel,
    ) -> Option<Self> {
        if code.is_good() {
            return None;
        }
        Some(
            Self::with_message(code, format!("{} failed with {}", context, code.name()))
                .additional_info(context)
                .filtered(level),
        )
    }
}

impl fmt::Display for ServiceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_message {
            Some(message) => write!(f, "{}: {}", self.status_code, message),
            None => write!(f, "{}", self.status_code),
        }
    }
}
