//! Document store error types
//!
//! Structured errors for backing-store operations, carrying the operation,
//! the failure category, and the collection/document involved.
//!
//! # Example
//!
//! ```rust
//! use open311_service::store::{StoreError, StoreErrorKind};
//!
//! let error = StoreError::not_found("servicerequests", "5c1f5e6b9d1a3b0017a1c2d3");
//! assert!(matches!(error.kind, StoreErrorKind::NotFound));
//! assert!(error.document_id.is_some());
//! ```

use std::fmt;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Establishing the store connection
    Connect,
    /// Declaring a collection and its constraints
    Define,
    /// Finding documents matching a filter
    Find,
    /// Finding a single document by id
    FindById,
    /// Counting documents matching a filter
    Count,
    /// Inserting a new document
    Insert,
    /// Persisting an existing document
    Save,
    /// Liveness probe against the store
    Ping,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Define => write!(f, "define"),
            Self::Find => write!(f, "find"),
            Self::FindById => write!(f, "find_by_id"),
            Self::Count => write!(f, "count"),
            Self::Insert => write!(f, "insert"),
            Self::Save => write!(f, "save"),
            Self::Ping => write!(f, "ping"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Document was not found
    NotFound,
    /// Unique or referential constraint violated
    ConstraintViolation,
    /// Document failed the collection's validation rules
    ValidationFailed,
    /// Query could not be interpreted or executed
    QueryFailed,
    /// Failed to connect to the store
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Serialization or deserialization error
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The collection involved (e.g., "servicerequests")
    pub collection: Option<String>,
    /// The `_id` of the document involved
    pub document_id: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(
        operation: StoreOperation,
        kind: StoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            collection: None,
            document_id: None,
        }
    }

    /// Create a "not found" error with document context
    pub fn not_found(collection: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            operation: StoreOperation::FindById,
            kind: StoreErrorKind::NotFound,
            message: "Document not found".to_string(),
            collection: Some(collection.into()),
            document_id: Some(document_id.into()),
        }
    }

    /// Create a validation failed error
    ///
    /// ```rust
    /// use open311_service::store::{StoreError, StoreOperation};
    ///
    /// let error = StoreError::validation_failed(StoreOperation::Save, "Path `name` is required");
    /// assert_eq!(error.operation, StoreOperation::Save);
    /// ```
    pub fn validation_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ValidationFailed, message)
    }

    /// Create a constraint violation error
    pub fn constraint_violation(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConstraintViolation, message)
    }

    /// Create a query failed error
    pub fn query_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::QueryFailed, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::Connect,
            StoreErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Create a serialization error
    pub fn serialization(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::SerializationError, message)
    }

    /// Attach the collection name
    #[must_use]
    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Attach the document id
    #[must_use]
    pub fn for_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Override the operation
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the store rejected the document's content, as opposed to
    /// failing to run the operation at all
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ValidationFailed | StoreErrorKind::ConstraintViolation
        )
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.collection, &self.document_id) {
            (Some(collection), Some(id)) => write!(f, " [{}: {}]", collection, id)?,
            (Some(collection), None) => write!(f, " [{}]", collection)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(StoreOperation::Find, err.to_string())
    }
}

impl From<regex::Error> for StoreError {
    fn from(err: regex::Error) -> Self {
        Self::query_failed(StoreOperation::Find, format!("Invalid regular expression: {}", err))
    }
}

#[cfg(feature = "surrealdb")]
impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        let text = err.to_string();
        let lower = text.to_lowercase();
        let kind = if lower.contains("already contains")
            || lower.contains("already exists")
            || lower.contains("unique")
        {
            StoreErrorKind::ConstraintViolation
        } else if lower.contains("must conform to") || lower.contains("assert") {
            StoreErrorKind::ValidationFailed
        } else if lower.contains("timeout") || lower.contains("timed out") {
            StoreErrorKind::Timeout
        } else if lower.contains("connect")
            || lower.contains("refused")
            || lower.contains("network")
        {
            StoreErrorKind::ConnectionFailed
        } else if lower.contains("parse") || lower.contains("invalid") {
            StoreErrorKind::QueryFailed
        } else {
            StoreErrorKind::Other
        };
        Self::new(StoreOperation::Find, kind, text)
    }
}
