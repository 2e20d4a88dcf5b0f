//! LDAP result codes.
//!
//! Standard codes follow RFC 4511 and the common client API extensions (80-123), plus the
//! sync-refresh code from RFC 4533. Codes 200-206 are raised by this client itself and never
//! appear on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric outcome of a directory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(i32);

impl ResultCode {
    /// Sentinel used when a failure signal carries no numeric code.
    pub const UNKNOWN: Self = Self(-1);

    /// The operation completed successfully.
    pub const SUCCESS: Self = Self(0);
    /// Operations error.
    pub const OPERATIONS_ERROR: Self = Self(1);
    /// Protocol error.
    pub const PROTOCOL_ERROR: Self = Self(2);
    /// Time limit exceeded.
    pub const TIME_LIMIT_EXCEEDED: Self = Self(3);
    /// Size limit exceeded.
    pub const SIZE_LIMIT_EXCEEDED: Self = Self(4);
    /// Compare evaluated to false.
    pub const COMPARE_FALSE: Self = Self(5);
    /// Compare evaluated to true.
    pub const COMPARE_TRUE: Self = Self(6);
    /// Authentication method not supported.
    pub const AUTH_METHOD_NOT_SUPPORTED: Self = Self(7);
    /// Strong authentication required.
    pub const STRONG_AUTH_REQUIRED: Self = Self(8);
    /// Referral returned.
    pub const REFERRAL: Self = Self(10);
    /// Administrative limit exceeded.
    pub const ADMIN_LIMIT_EXCEEDED: Self = Self(11);
    /// Unavailable critical extension.
    pub const UNAVAILABLE_CRITICAL_EXTENSION: Self = Self(12);
    /// Confidentiality required.
    pub const CONFIDENTIALITY_REQUIRED: Self = Self(13);
    /// SASL bind in progress.
    pub const SASL_BIND_IN_PROGRESS: Self = Self(14);
    /// No such attribute.
    pub const NO_SUCH_ATTRIBUTE: Self = Self(16);
    /// Undefined attribute type.
    pub const UNDEFINED_ATTRIBUTE_TYPE: Self = Self(17);
    /// Inappropriate matching.
    pub const INAPPROPRIATE_MATCHING: Self = Self(18);
    /// Constraint violation.
    pub const CONSTRAINT_VIOLATION: Self = Self(19);
    /// Attribute or value exists.
    pub const ATTRIBUTE_OR_VALUE_EXISTS: Self = Self(20);
    /// Invalid attribute syntax.
    pub const INVALID_ATTRIBUTE_SYNTAX: Self = Self(21);
    /// No such object.
    pub const NO_SUCH_OBJECT: Self = Self(32);
    /// Alias problem.
    pub const ALIAS_PROBLEM: Self = Self(33);
    /// Invalid DN syntax.
    pub const INVALID_DN_SYNTAX: Self = Self(34);
    /// Entry is a leaf.
    pub const IS_LEAF: Self = Self(35);
    /// Alias dereferencing problem.
    pub const ALIAS_DEREFERENCING_PROBLEM: Self = Self(36);
    /// Inappropriate authentication.
    pub const INAPPROPRIATE_AUTHENTICATION: Self = Self(48);
    /// Invalid credentials.
    pub const INVALID_CREDENTIALS: Self = Self(49);
    /// Insufficient access rights.
    pub const INSUFFICIENT_ACCESS_RIGHTS: Self = Self(50);
    /// Server busy.
    pub const BUSY: Self = Self(51);
    /// Server unavailable.
    pub const UNAVAILABLE: Self = Self(52);
    /// Server unwilling to perform.
    pub const UNWILLING_TO_PERFORM: Self = Self(53);
    /// Loop detected.
    pub const LOOP_DETECT: Self = Self(54);
    /// Sort control missing.
    pub const SORT_CONTROL_MISSING: Self = Self(60);
    /// Result offset range error.
    pub const OFFSET_RANGE_ERROR: Self = Self(61);
    /// Naming violation.
    pub const NAMING_VIOLATION: Self = Self(64);
    /// Object class violation.
    pub const OBJECT_CLASS_VIOLATION: Self = Self(65);
    /// Not allowed on non-leaf.
    pub const NOT_ALLOWED_ON_NON_LEAF: Self = Self(66);
    /// Not allowed on RDN.
    pub const NOT_ALLOWED_ON_RDN: Self = Self(67);
    /// Entry already exists.
    pub const ENTRY_ALREADY_EXISTS: Self = Self(68);
    /// Object class modifications prohibited.
    pub const OBJECT_CLASS_MODS_PROHIBITED: Self = Self(69);
    /// Results too large.
    pub const RESULTS_TOO_LARGE: Self = Self(70);
    /// Affects multiple DSAs.
    pub const AFFECTS_MULTIPLE_DSAS: Self = Self(71);
    /// Virtual list view error.
    pub const VIRTUAL_LIST_VIEW_ERROR: Self = Self(76);
    /// Other.
    pub const OTHER: Self = Self(80);
    /// Server down.
    pub const SERVER_DOWN: Self = Self(81);
    /// Local error.
    pub const LOCAL_ERROR: Self = Self(82);
    /// Encoding error.
    pub const ENCODING_ERROR: Self = Self(83);
    /// Decoding error.
    pub const DECODING_ERROR: Self = Self(84);
    /// Timeout while waiting for the server.
    pub const TIMEOUT: Self = Self(85);
    /// Unknown authentication method.
    pub const AUTH_UNKNOWN: Self = Self(86);
    /// Filter error.
    pub const FILTER_ERROR: Self = Self(87);
    /// User canceled.
    pub const USER_CANCELED: Self = Self(88);
    /// Invalid parameter; also used for precondition failures raised by this client.
    pub const PARAM_ERROR: Self = Self(89);
    /// Out of memory.
    pub const NO_MEMORY: Self = Self(90);
    /// Connect error.
    pub const CONNECT_ERROR: Self = Self(91);
    /// Feature not supported.
    pub const NOT_SUPPORTED: Self = Self(92);
    /// Control not found.
    pub const CONTROL_NOT_FOUND: Self = Self(93);
    /// No results returned.
    pub const NO_RESULTS_RETURNED: Self = Self(94);
    /// More results to return.
    pub const MORE_RESULTS_TO_RETURN: Self = Self(95);
    /// Client loop.
    pub const CLIENT_LOOP: Self = Self(96);
    /// Referral limit exceeded.
    pub const REFERRAL_LIMIT_EXCEEDED: Self = Self(97);
    /// Invalid response.
    pub const INVALID_RESPONSE: Self = Self(100);
    /// Ambiguous response.
    pub const AMBIGUOUS_RESPONSE: Self = Self(101);
    /// TLS not supported.
    pub const TLS_NOT_SUPPORTED: Self = Self(112);
    /// Intermediate response.
    pub const INTERMEDIATE_RESPONSE: Self = Self(113);
    /// Unknown type.
    pub const UNKNOWN_TYPE: Self = Self(114);
    /// Operation canceled.
    pub const CANCELED: Self = Self(118);
    /// No such operation.
    pub const NO_SUCH_OPERATION: Self = Self(119);
    /// Too late to cancel.
    pub const TOO_LATE: Self = Self(120);
    /// Cannot cancel.
    pub const CANNOT_CANCEL: Self = Self(121);
    /// Assertion failed.
    pub const ASSERTION_FAILED: Self = Self(122);
    /// Authorization denied.
    pub const AUTHORIZATION_DENIED: Self = Self(123);
    /// Sync refresh required (RFC 4533).
    pub const SYNC_REFRESH_REQUIRED: Self = Self(4096);

    /// Network failure.
    pub const NETWORK: Self = Self(200);
    /// Filter compilation failure.
    pub const FILTER_COMPILE: Self = Self(201);
    /// Filter decompilation failure.
    pub const FILTER_DECOMPILE: Self = Self(202);
    /// Debugging error.
    pub const DEBUGGING: Self = Self(203);
    /// Unexpected message.
    pub const UNEXPECTED_MESSAGE: Self = Self(204);
    /// Unexpected response.
    pub const UNEXPECTED_RESPONSE: Self = Self(205);
    /// Empty password rejected before contacting the server.
    pub const EMPTY_PASSWORD: Self = Self(206);

    /// Wraps a raw numeric code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Returns the raw numeric code.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Returns true for codes raised by this client rather than a server (200-206).
    #[must_use]
    pub const fn is_client_local(self) -> bool {
        self.0 >= 200 && self.0 <= 206
    }

    /// Human description of the code, or `""` if the code is not in the table.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self.0 {
            0 => "Success",
            1 => "Operations Error",
            2 => "Protocol Error",
            3 => "Time Limit Exceeded",
            4 => "Size Limit Exceeded",
            5 => "Compare False",
            6 => "Compare True",
            7 => "Auth Method Not Supported",
            8 => "Strong Auth Required",
            10 => "Referral",
            11 => "Admin Limit Exceeded",
            12 => "Unavailable Critical Extension",
            13 => "Confidentiality Required",
            14 => "Sasl Bind In Progress",
            16 => "No Such Attribute",
            17 => "Undefined Attribute Type",
            18 => "Inappropriate Matching",
            19 => "Constraint Violation",
            20 => "Attribute Or Value Exists",
            21 => "Invalid Attribute Syntax",
            32 => "No Such Object",
            33 => "Alias Problem",
            34 => "Invalid DN Syntax",
            35 => "Is Leaf",
            36 => "Alias Dereferencing Problem",
            48 => "Inappropriate Authentication",
            49 => "Invalid Credentials",
            50 => "Insufficient Access Rights",
            51 => "Busy",
            52 => "Unavailable",
            53 => "Unwilling To Perform",
            54 => "Loop Detect",
            60 => "Sort Control Missing",
            61 => "Result Offset Range Error",
            64 => "Naming Violation",
            65 => "Object Class Violation",
            66 => "Not Allowed On Non Leaf",
            67 => "Not Allowed On RDN",
            68 => "Entry Already Exists",
            69 => "Object Class Mods Prohibited",
            70 => "Results Too Large",
            71 => "Affects Multiple DSAs",
            76 => "Failed because of a problem related to the virtual list view",
            80 => "Other",
            81 => "Cannot establish a connection",
            82 => "An error occurred",
            83 => "LDAP encountered an error while encoding",
            84 => "LDAP encountered an error while decoding",
            85 => "LDAP timeout while waiting for a response from the server",
            86 => "The auth method requested in a bind request is unknown",
            87 => "An error occurred while encoding the given search filter",
            88 => "The user canceled the operation",
            89 => "An invalid parameter was specified",
            90 => "Out of memory error",
            91 => "A connection to the server could not be established",
            92 => "An attempt has been made to use a feature not supported LDAP",
            93 => "The controls required to perform the requested operation were not found",
            94 => "No results were returned from the server",
            95 => "There are more results in the chain of results",
            96 => "A loop has been detected. For example when following referrals",
            97 => "The referral hop limit has been exceeded",
            100 => "Invalid Response",
            101 => "Ambiguous Response",
            112 => "Tls Not Supported",
            113 => "Intermediate Response",
            114 => "Unknown Type",
            118 => "Operation was canceled",
            119 => "Server has no knowledge of the operation requested for cancellation",
            120 => "Too late to cancel the outstanding operation",
            121 => "The identified operation does not support cancellation or the cancel operation cannot be performed",
            122 => "An assertion control given in the LDAP operation evaluated to false causing the operation to not be performed",
            123 => "Authorization Denied",
            4096 => "Refresh Required",
            200 => "Network Error",
            201 => "Filter Compile Error",
            202 => "Filter Decompile Error",
            203 => "Debugging Error",
            204 => "Unexpected Message",
            205 => "Unexpected Response",
            206 => "Empty password not allowed by the client",
            _ => "",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_descriptions() {
        assert_eq!(ResultCode::SUCCESS.description(), "Success");
        assert_eq!(ResultCode::INVALID_CREDENTIALS.description(), "Invalid Credentials");
        assert_eq!(ResultCode::NO_SUCH_OBJECT.description(), "No Such Object");
        assert_eq!(ResultCode::SYNC_REFRESH_REQUIRED.description(), "Refresh Required");
        assert_eq!(
            ResultCode::EMPTY_PASSWORD.description(),
            "Empty password not allowed by the client"
        );
    }

    #[test]
    fn test_unknown_code_has_empty_description() {
        assert_eq!(ResultCode::UNKNOWN.description(), "");
        assert_eq!(ResultCode::new(9).description(), "");
        assert_eq!(ResultCode::new(207).description(), "");
    }

    #[test]
    fn test_client_local_range() {
        assert!(ResultCode::NETWORK.is_client_local());
        assert!(ResultCode::EMPTY_PASSWORD.is_client_local());
        assert!(!ResultCode::PARAM_ERROR.is_client_local());
        assert!(!ResultCode::new(207).is_client_local());
    }

    #[test]
    fn test_every_client_local_code_is_described() {
        for code in 200..=206 {
            assert!(!ResultCode::new(code).description().is_empty(), "code {code}");
        }
    }

    #[test]
    fn test_display_and_conversions() {
        assert_eq!(ResultCode::INVALID_CREDENTIALS.to_string(), "49");
        assert_eq!(ResultCode::from(32), ResultCode::NO_SUCH_OBJECT);
        assert_eq!(i32::from(ResultCode::NETWORK), 200);
    }
}
