// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA status codes.
//!
//! Only the codes the node services produce or commonly receive from a server
//! are named here. Unknown codes still round-trip as raw `u32` values; their
//! symbolic name falls back to the severity class (`Good`, `Uncertain`, `Bad`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-bit OPC UA status code.
///
/// The two most significant bits carry the severity: `00` good, `01`
/// uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

macro_rules! status_codes {
    ($( $(#[$doc:meta])* $konst:ident = $value:expr, $name:literal; )*) => {
        impl StatusCode {
            $(
                $(#[$doc])*
                pub const $konst: StatusCode = StatusCode($value);
            )*
        }

        const STATUS_CODE_NAMES: &[(u32, &str)] = &[
            $( ($value, $name), )*
        ];
    };
}

status_codes! {
    /// The operation succeeded.
    GOOD = 0x0000_0000, "Good";
    /// The operation was uncertain.
    UNCERTAIN = 0x4000_0000, "Uncertain";
    /// The operation failed.
    BAD = 0x8000_0000, "Bad";
    /// An unexpected error occurred.
    BAD_UNEXPECTED_ERROR = 0x8001_0000, "BadUnexpectedError";
    /// An internal error occurred as a result of a programming or configuration error.
    BAD_INTERNAL_ERROR = 0x8002_0000, "BadInternalError";
    /// Not enough memory to complete the operation.
    BAD_OUT_OF_MEMORY = 0x8003_0000, "BadOutOfMemory";
    /// An operating system resource is not available.
    BAD_RESOURCE_UNAVAILABLE = 0x8004_0000, "BadResourceUnavailable";
    /// A low level communication error occurred.
    BAD_COMMUNICATION_ERROR = 0x8005_0000, "BadCommunicationError";
    /// Encoding halted because of invalid data in the objects being serialized.
    BAD_ENCODING_ERROR = 0x8006_0000, "BadEncodingError";
    /// Decoding halted because of invalid data in the stream.
    BAD_DECODING_ERROR = 0x8007_0000, "BadDecodingError";
    /// The operation timed out.
    BAD_TIMEOUT = 0x800A_0000, "BadTimeout";
    /// The server does not support the requested service.
    BAD_SERVICE_UNSUPPORTED = 0x800B_0000, "BadServiceUnsupported";
    /// The operation was cancelled because the application is shutting down.
    BAD_SHUTDOWN = 0x800C_0000, "BadShutdown";
    /// The operation could not complete because the client is not connected.
    BAD_SERVER_NOT_CONNECTED = 0x800D_0000, "BadServerNotConnected";
    /// There was nothing to do because the client passed a list of operations with no elements.
    BAD_NOTHING_TO_DO = 0x800F_0000, "BadNothingToDo";
    /// The request could not be processed because it specified too many operations.
    BAD_TOO_MANY_OPERATIONS = 0x8010_0000, "BadTooManyOperations";
    /// The extension object cannot be (de)serialized because the data type id is not recognized.
    BAD_DATA_TYPE_ID_UNKNOWN = 0x8011_0000, "BadDataTypeIdUnknown";
    /// User does not have permission to perform the requested operation.
    BAD_USER_ACCESS_DENIED = 0x801F_0000, "BadUserAccessDenied";
    /// The request was cancelled by the client.
    BAD_REQUEST_CANCELLED_BY_CLIENT = 0x802C_0000, "BadRequestCancelledByClient";
    /// The syntax of the node id is not valid.
    BAD_NODE_ID_INVALID = 0x8033_0000, "BadNodeIdInvalid";
    /// The node id refers to a node that does not exist in the server address space.
    BAD_NODE_ID_UNKNOWN = 0x8034_0000, "BadNodeIdUnknown";
    /// The attribute is not supported for the specified node.
    BAD_ATTRIBUTE_ID_INVALID = 0x8035_0000, "BadAttributeIdInvalid";
    /// The syntax of the index range parameter is invalid.
    BAD_INDEX_RANGE_INVALID = 0x8036_0000, "BadIndexRangeInvalid";
    /// No data exists within the range of indexes specified.
    BAD_INDEX_RANGE_NO_DATA = 0x8037_0000, "BadIndexRangeNoData";
    /// The data encoding is invalid.
    BAD_DATA_ENCODING_INVALID = 0x8038_0000, "BadDataEncodingInvalid";
    /// The access level does not allow reading or subscribing to the node.
    BAD_NOT_READABLE = 0x803A_0000, "BadNotReadable";
    /// The access level does not allow writing to the node.
    BAD_NOT_WRITABLE = 0x803B_0000, "BadNotWritable";
    /// The value was out of range.
    BAD_OUT_OF_RANGE = 0x803C_0000, "BadOutOfRange";
    /// The requested operation is not supported.
    BAD_NOT_SUPPORTED = 0x803D_0000, "BadNotSupported";
    /// A requested item was not found or a search operation ended without success.
    BAD_NOT_FOUND = 0x803E_0000, "BadNotFound";
    /// The object cannot be used because it has been deleted.
    BAD_OBJECT_DELETED = 0x803F_0000, "BadObjectDeleted";
    /// Requested operation is not implemented.
    BAD_NOT_IMPLEMENTED = 0x8040_0000, "BadNotImplemented";
    /// The continuation point provided is no longer valid.
    BAD_CONTINUATION_POINT_INVALID = 0x804A_0000, "BadContinuationPointInvalid";
    /// The operation could not be processed because all continuation points have been allocated.
    BAD_NO_CONTINUATION_POINTS = 0x804B_0000, "BadNoContinuationPoints";
    /// The reference type id does not refer to a valid reference type node.
    BAD_REFERENCE_TYPE_ID_INVALID = 0x804C_0000, "BadReferenceTypeIdInvalid";
    /// The browse direction is not valid.
    BAD_BROWSE_DIRECTION_INVALID = 0x804D_0000, "BadBrowseDirectionInvalid";
    /// The node class is not valid.
    BAD_NODE_CLASS_INVALID = 0x805F_0000, "BadNodeClassInvalid";
    /// The browse name is invalid.
    BAD_BROWSE_NAME_INVALID = 0x8060_0000, "BadBrowseNameInvalid";
    /// The type definition node id does not reference an appropriate type node.
    BAD_TYPE_DEFINITION_INVALID = 0x8063_0000, "BadTypeDefinitionInvalid";
    /// The requested path does not match any node.
    BAD_NO_MATCH = 0x806F_0000, "BadNoMatch";
    /// The server does not support writing the combination of value, status and timestamps.
    BAD_WRITE_NOT_SUPPORTED = 0x8073_0000, "BadWriteNotSupported";
    /// The value supplied for the attribute is not of the same type as the attribute's value.
    BAD_TYPE_MISMATCH = 0x8074_0000, "BadTypeMismatch";
    /// The method id does not refer to a method for the specified object.
    BAD_METHOD_INVALID = 0x8075_0000, "BadMethodInvalid";
    /// The client did not specify all of the input arguments for the method.
    BAD_ARGUMENTS_MISSING = 0x8076_0000, "BadArgumentsMissing";
    /// No data exists for the requested time range or event filter.
    BAD_NO_DATA = 0x809B_0000, "BadNoData";
    /// One or more arguments are invalid.
    BAD_INVALID_ARGUMENT = 0x80AB_0000, "BadInvalidArgument";
    /// The operation cannot be completed because the object is closed or in an invalid state.
    BAD_INVALID_STATE = 0x80AF_0000, "BadInvalidState";
    /// The client specified too many input arguments for the method.
    BAD_TOO_MANY_ARGUMENTS = 0x80E5_0000, "BadTooManyArguments";
}

impl StatusCode {
    /// Creates a status code from its raw value.
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns the code without the info bits.
    #[inline]
    pub const fn code(self) -> u32 {
        self.0 & 0xFFFF_0000
    }

    /// Returns `true` when the severity is good.
    #[inline]
    pub const fn is_good(self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` when the severity is uncertain.
    #[inline]
    pub const fn is_uncertain(self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` when the severity is bad.
    #[inline]
    pub const fn is_bad(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name of the code.
    pub fn name(self) -> &'static str {
        let code = self.code();
        STATUS_CODE_NAMES
            .iter()
            .find(|(value, _)| *value == code)
            .map(|(_, name)| *name)
            .unwrap_or_else(|| {
                if self.is_bad() {
                    "Bad"
                } else if self.is_uncertain() {
                    "Uncertain"
                } else {
                    "Good"
                }
            })
    }

    /// Looks up a status code by its symbolic name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        STATUS_CODE_NAMES
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|(value, _)| Self(*value))
    }
}

/// Returns the symbolic name for a raw status code value.
pub fn status_code_name(code: u32) -> &'static str {
    StatusCode(code).name()
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<StatusCode> for u32 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_values() {
        assert_eq!(StatusCode::BAD_NODE_ID_UNKNOWN.value(), 0x8034_0000);
        assert_eq!(StatusCode::BAD_NOT_FOUND.value(), 0x803E_0000);
        assert_eq!(StatusCode::BAD_NOT_SUPPORTED.value(), 0x803D_0000);
        assert_eq!(StatusCode::BAD_INVALID_ARGUMENT.value(), 0x80AB_0000);
    }

    #[test]
    fn test_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::UNCERTAIN.is_uncertain());
        assert!(StatusCode::BAD_TYPE_MISMATCH.is_bad());
        assert!(!StatusCode::BAD_TYPE_MISMATCH.is_good());
    }

    #[test]
    fn test_names() {
        assert_eq!(status_code_name(0), "Good");
        assert_eq!(status_code_name(0x803A_0000), "BadNotReadable");
        assert_eq!(status_code_name(0x803B_0000), "BadNotWritable");
        // info bits are ignored for the lookup
        assert_eq!(status_code_name(0x8034_0400), "BadNodeIdUnknown");
        assert_eq!(status_code_name(0x80FF_0000), "Bad");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            StatusCode::from_name("badcontinuationpointinvalid"),
            Some(StatusCode::BAD_CONTINUATION_POINT_INVALID)
        );
        assert_eq!(StatusCode::from_name("NoSuchCode"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            StatusCode::BAD_NOT_FOUND.to_string(),
            "BadNotFound (0x803E0000)"
        );
    }
}
