//! Facade error types
//!
//! Every facade operation fails with a [`FacadeError`] carrying the
//! operation, the failure category, and the resource involved. The category
//! decides the HTTP status when the error is returned from a handler.
//!
//! # Example
//!
//! ```rust
//! use open311_service::facade::{FacadeError, FacadeErrorKind};
//!
//! let error = FacadeError::not_found("ServiceRequest", "000000000000000000000000");
//! assert_eq!(error.kind, FacadeErrorKind::NotFound);
//! assert_eq!(error.kind.status_code().as_u16(), 404);
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::store::{StoreError, StoreErrorKind};

/// Result type for facade operations
pub type FacadeResult<T> = std::result::Result<T, FacadeError>;

/// Operation being performed when the facade error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacadeOperation {
    /// Paginated listing
    List,
    /// Free-text search
    Search,
    /// Loading a single resource
    Show,
    /// Applying a partial update
    Update,
    /// Expanding relations
    Populate,
}

impl fmt::Display for FacadeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Search => write!(f, "search"),
            Self::Show => write!(f, "show"),
            Self::Update => write!(f, "update"),
            Self::Populate => write!(f, "populate"),
        }
    }
}

/// Category of facade error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacadeErrorKind {
    /// The identifier does not resolve to a stored resource
    NotFound,
    /// The store rejected a write
    ValidationFailed,
    /// The request could not be interpreted
    BadRequest,
    /// The store could not be reached or timed out
    StoreUnavailable,
    /// The store failed while running the operation
    StoreFailure,
}

impl fmt::Display for FacadeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::StoreUnavailable => write!(f, "store_unavailable"),
            Self::StoreFailure => write!(f, "store_failure"),
        }
    }
}

impl FacadeErrorKind {
    /// HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationFailed | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        self.to_string().to_uppercase()
    }
}

/// Structured facade error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeError {
    /// The operation being performed when the error occurred
    pub operation: FacadeOperation,
    /// The category of error
    pub kind: FacadeErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The resource type involved (e.g., "ServiceRequest")
    pub resource: Option<String>,
    /// The identifier of the resource involved
    pub resource_id: Option<String>,
}

impl FacadeError {
    /// Create a new facade error
    pub fn new(
        operation: FacadeOperation,
        kind: FacadeErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            resource: None,
            resource_id: None,
        }
    }

    /// A resource that does not exist
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            operation: FacadeOperation::Show,
            kind: FacadeErrorKind::NotFound,
            message: "Resource not found".to_string(),
            resource: Some(resource.into()),
            resource_id: Some(id.into()),
        }
    }

    /// A route naming a resource type nobody registered
    pub fn unknown_resource(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(
            FacadeOperation::List,
            FacadeErrorKind::NotFound,
            format!("Unknown resource '{}'", key),
        )
    }

    /// Query parameters or a body that could not be coerced
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(FacadeOperation::List, FacadeErrorKind::BadRequest, message)
    }

    /// Attach the resource type
    #[must_use]
    pub fn for_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attach the resource identifier
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: FacadeOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Translate a store error raised during `operation`
    pub fn from_store(operation: FacadeOperation, err: StoreError) -> Self {
        Self::from(err).with_operation(operation)
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, FacadeErrorKind::StoreUnavailable)
    }
}

impl fmt::Display for FacadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Facade {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(resource), Some(id)) = (&self.resource, &self.resource_id) {
            write!(f, " [{}: {}]", resource, id)?;
        }
        Ok(())
    }
}

impl std::error::Error for FacadeError {}

impl From<StoreError> for FacadeError {
    fn from(err: StoreError) -> Self {
        let kind = match err.kind {
            StoreErrorKind::NotFound => FacadeErrorKind::NotFound,
            StoreErrorKind::ValidationFailed | StoreErrorKind::ConstraintViolation => {
                FacadeErrorKind::ValidationFailed
            }
            StoreErrorKind::QueryFailed => FacadeErrorKind::BadRequest,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout => {
                FacadeErrorKind::StoreUnavailable
            }
            StoreErrorKind::SerializationError | StoreErrorKind::Other => {
                FacadeErrorKind::StoreFailure
            }
        };

        // Internal details stay in the logs
        let message = match kind {
            FacadeErrorKind::StoreUnavailable => {
                tracing::warn!(error = %err, "Store unavailable");
                "Service temporarily unavailable".to_string()
            }
            FacadeErrorKind::StoreFailure => {
                tracing::error!(error = %err, "Store failure");
                "An internal error occurred".to_string()
            }
            _ => err.message,
        };

        Self {
            operation: FacadeOperation::List,
            kind,
            message,
            resource: None,
            resource_id: err.document_id,
        }
    }
}

/// Response body for facade errors
#[derive(Debug, Serialize, Deserialize)]
struct FacadeErrorResponse {
    error: String,
    code: String,
    status: u16,
    operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl IntoResponse for FacadeError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                resource = ?self.resource,
                id = ?self.resource_id,
                retriable = self.is_retriable(),
                "Request failed: {}", self.message
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                kind = %self.kind,
                resource = ?self.resource,
                id = ?self.resource_id,
                "Request rejected: {}", self.message
            );
        }

        let body = FacadeErrorResponse {
            error: self.message,
            code: self.kind.error_code(),
            status: status.as_u16(),
            operation: self.operation.to_string(),
            resource: self.resource,
            id: self.resource_id,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreOperation;

    #[test]
    fn test_status_codes() {
        assert_eq!(FacadeErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(FacadeErrorKind::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(FacadeErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            FacadeErrorKind::StoreUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            FacadeErrorKind::StoreFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(FacadeErrorKind::StoreFailure.error_code(), "STORE_FAILURE");
    }

    #[test]
    fn test_store_rejection_becomes_validation_error() {
        let err =
            StoreError::validation_failed(StoreOperation::Save, "Missing required field(s): name")
                .for_document("abc");
        let error = FacadeError::from_store(FacadeOperation::Update, err);
        assert_eq!(error.kind, FacadeErrorKind::ValidationFailed);
        assert_eq!(error.operation, FacadeOperation::Update);
        assert_eq!(error.message, "Missing required field(s): name");
        assert_eq!(error.resource_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_internal_store_details_hidden() {
        let err = StoreError::connection_failed("tcp connect to 10.0.0.4 refused");
        let error = FacadeError::from(err);
        assert_eq!(error.kind, FacadeErrorKind::StoreUnavailable);
        assert!(error.is_retriable());
        assert!(!error.message.contains("10.0.0.4"));

        let err = StoreError::serialization(StoreOperation::Find, "bad row");
        let error = FacadeError::from(err);
        assert_eq!(error.kind, FacadeErrorKind::StoreFailure);
        assert_eq!(error.message, "An internal error occurred");
    }

    #[test]
    fn test_display() {
        let error = FacadeError::not_found("Priority", "p1");
        assert_eq!(
            error.to_string(),
            "Facade not_found error during show: Resource not found [Priority: p1]"
        );
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = FacadeError::not_found("Status", "s1").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["status"], 404);
        assert_eq!(body["resource"], "Status");
        assert_eq!(body["id"], "s1");
        assert_eq!(body["operation"], "show");
    }
}
