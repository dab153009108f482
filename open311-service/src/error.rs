//! Startup and infrastructure error types
//!
//! Request handling fails with [`FacadeError`](crate::facade::FacadeError),
//! which maps itself onto an HTTP response. [`Error`] covers everything that
//! can go wrong while the service is being assembled or served: loading
//! configuration, connecting to and preparing the store, building the
//! resource registry, and binding the listener.

use thiserror::Error;

use crate::facade::RegistryError;
use crate::store::StoreError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Document store error
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Resource registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_displays_unchanged() {
        let err: Error = StoreError::connection_failed("refused").into();
        assert_eq!(
            err.to_string(),
            "Store connection_failed error during connect: refused"
        );
    }

    #[test]
    fn test_registry_error_wrapped() {
        let err: Error = RegistryError::Duplicate("Status".to_string()).into();
        assert!(err.to_string().starts_with("Registry error:"));
        assert!(matches!(err, Error::Registry(_)));
    }

    #[test]
    fn test_config_error_boxed() {
        let err: Error = figment::Error::from("missing field `name`".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
    }
}
