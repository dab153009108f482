//! Identifiers
//!
//! Two kinds of identifier are generated here:
//!
//! - **Request ids** follow the TypeID format (`req_<base32 uuidv7>`) and are
//!   attached to every HTTP request for log correlation.
//! - **Document ids** are 24 lowercase hex characters, the shape open311
//!   clients already expect for `_id` values. They lead with the UUIDv7
//!   millisecond timestamp, so ids from different milliseconds sort by
//!   creation time. Ids created within the same millisecond have no defined
//!   order.
//!
//! ```rust
//! use open311_service::ids::{new_document_id, RequestId};
//!
//! let request_id = RequestId::new();
//! assert!(request_id.as_str().starts_with("req_"));
//!
//! let id = new_document_id();
//! assert_eq!(id.len(), 24);
//! ```

use std::fmt;
use std::str::FromStr;

use http::Request;
use mti::prelude::*;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};
use uuid::Uuid;

/// Length of a generated document id
pub const DOCUMENT_ID_LEN: usize = 24;

/// Generate a new 24-hex document id
///
/// Keeps the 48-bit millisecond timestamp of a UUIDv7 followed by its last
/// six random bytes. The sub-millisecond counter bytes are dropped.
pub fn new_document_id() -> String {
    let bytes = Uuid::now_v7().into_bytes();
    bytes[..6]
        .iter()
        .chain(&bytes[10..])
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Whether `value` has the shape of a generated document id
pub fn is_document_id(value: &str) -> bool {
    value.len() == DOCUMENT_ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Request identifier for tracing, `req_` prefixed
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// The prefix used for request IDs
    pub const PREFIX: &'static str = "req";

    /// Creates a new time-sortable request ID
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Returns the request ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the prefix portion of the ID.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = RequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mti = MagicTypeId::from_str(s).map_err(RequestIdError::Parse)?;

        if mti.prefix().as_str() != Self::PREFIX {
            return Err(RequestIdError::InvalidPrefix {
                expected: Self::PREFIX.to_string(),
                actual: mti.prefix().as_str().to_string(),
            });
        }

        Ok(Self(mti))
    }
}

/// Error type for request ID parsing.
#[derive(Debug, thiserror::Error)]
pub enum RequestIdError {
    /// The ID could not be parsed as a valid TypeID.
    #[error("failed to parse request ID: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The prefix was not the expected value.
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix.
        expected: String,
        /// The actual prefix found.
        actual: String,
    },
}

/// Generates [`RequestId`]s for `tower_http::request_id::SetRequestIdLayer`
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(id.as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
