// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Assertion helpers for responses carrying an inline `ServiceResult`.

use uapub_nodes::models::ErrorInfoResponse;
use uapub_nodes::{
    DiagnosticsLevel, NodeClass, NodeModel, PublishedNodesEntry, ServiceResponse, ServiceResult,
    StatusCode,
};

// =============================================================================
// Response Assertions
// =============================================================================

/// Assertion extensions for responses with an `error_info`.
pub trait ResponseAssertions {
    /// Assert the response carries no error.
    fn assert_ok(&self);

    /// Assert the response failed with `expected`.
    fn assert_status(&self, expected: StatusCode);
}

impl<T: ErrorInfoResponse + std::fmt::Debug> ResponseAssertions for T {
    fn assert_ok(&self) {
        assert!(
            self.error_info().is_none(),
            "Expected no error, but got {:?}",
            self.error_info()
        );
    }

    fn assert_status(&self, expected: StatusCode) {
        let actual = self.error_info().map(|e| e.status_code);
        assert_eq!(
            actual,
            Some(expected),
            "Expected {} but got {:?} in {:?}",
            expected,
            actual,
            self
        );
    }
}

// =============================================================================
// ServiceResult Assertions
// =============================================================================

/// Assertion extensions for [`ServiceResult`].
pub trait ServiceResultAssertions {
    /// Assert the result only carries fields `level` allows.
    fn assert_within_level(&self, level: DiagnosticsLevel);

    /// Assert every field set in `self` is set in `richer`.
    fn assert_subset_of(&self, richer: &ServiceResult);
}

impl ServiceResultAssertions for ServiceResult {
    fn assert_within_level(&self, level: DiagnosticsLevel) {
        assert!(self.symbolic_id.is_some(), "Symbolic id missing in {:?}", self);
        if level < DiagnosticsLevel::Status {
            assert!(self.error_message.is_none(), "Message at level {}: {:?}", level, self);
        }
        if level < DiagnosticsLevel::Information {
            assert!(self.locale.is_none(), "Locale at level {}: {:?}", level, self);
            assert!(self.inner.is_none(), "Inner result at level {}: {:?}", level, self);
        }
        if level < DiagnosticsLevel::Verbose {
            assert!(
                self.additional_info.is_none(),
                "Additional info at level {}: {:?}",
                level,
                self
            );
        }
    }

    fn assert_subset_of(&self, richer: &ServiceResult) {
        assert_eq!(self.status_code, richer.status_code);
        let fields = [
            ("symbolic_id", self.symbolic_id.is_some(), richer.symbolic_id.is_some()),
            ("error_message", self.error_message.is_some(), richer.error_message.is_some()),
            ("locale", self.locale.is_some(), richer.locale.is_some()),
            ("additional_info", self.additional_info.is_some(), richer.additional_info.is_some()),
            ("inner", self.inner.is_some(), richer.inner.is_some()),
        ];
        for (name, here, there) in fields {
            assert!(
                !here || there,
                "Field {} lost at the richer level: {:?} vs {:?}",
                name,
                self,
                richer
            );
        }
    }
}

// =============================================================================
// Expansion Assertions
// =============================================================================

/// Assertion and query extensions for expansion results.
pub trait ExpansionAssertions {
    /// Number of good results.
    fn good_count(&self) -> usize;

    /// Writer ids of the good results, in order.
    fn writer_ids(&self) -> Vec<String>;

    /// Field ids of every good result, flattened.
    fn field_ids(&self) -> Vec<String>;

    /// Status codes of the failed results, in order.
    fn error_codes(&self) -> Vec<StatusCode>;

    /// Assert every result is good.
    fn assert_all_good(&self);
}

impl ExpansionAssertions for [ServiceResponse<PublishedNodesEntry>] {
    fn good_count(&self) -> usize {
        self.iter().filter(|r| r.is_good()).count()
    }

    fn writer_ids(&self) -> Vec<String> {
        self.iter()
            .filter(|r| r.is_good())
            .filter_map(|r| r.result.as_ref())
            .map(|e| e.writer_id().to_string())
            .collect()
    }

    fn field_ids(&self) -> Vec<String> {
        self.iter()
            .filter(|r| r.is_good())
            .filter_map(|r| r.result.as_ref()?.opc_nodes.as_ref())
            .flatten()
            .filter_map(|n| n.data_set_field_id.clone())
            .collect()
    }

    fn error_codes(&self) -> Vec<StatusCode> {
        self.iter()
            .filter_map(|r| r.error_info.as_ref())
            .map(|e| e.status_code)
            .collect()
    }

    fn assert_all_good(&self) {
        for (index, result) in self.iter().enumerate() {
            assert!(
                result.is_good(),
                "Result {} failed: {:?}",
                index,
                result.error_info
            );
        }
    }
}

// =============================================================================
// Node Assertions
// =============================================================================

/// Assert every node is of one of `classes`.
pub fn assert_node_classes<'a>(nodes: impl IntoIterator<Item = &'a NodeModel>, classes: &[NodeClass]) {
    for node in nodes {
        assert!(
            node.node_class.map_or(false, |c| classes.contains(&c)),
            "Node {} has class {:?}, expected one of {:?}",
            node.node_id,
            node.node_class,
            classes
        );
    }
}

/// Assert the ids contain no duplicates.
pub fn assert_unique<'a>(ids: impl IntoIterator<Item = &'a String>) {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        assert!(seen.insert(id), "Duplicate id {}", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_nest() {
        let full = ServiceResult::with_message(StatusCode::BAD_NOT_FOUND, "missing")
            .additional_info("browse")
            .inner(ServiceResult::new(StatusCode::BAD_NODE_ID_UNKNOWN));

        let mut previous: Option<ServiceResult> = None;
        for level in [
            DiagnosticsLevel::None,
            DiagnosticsLevel::Status,
            DiagnosticsLevel::Information,
            DiagnosticsLevel::Verbose,
        ] {
            let filtered = full.clone().filtered(level);
            filtered.assert_within_level(level);
            if let Some(previous) = &previous {
                previous.assert_subset_of(&filtered);
            }
            previous = Some(filtered);
        }
    }
}
