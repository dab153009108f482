//! # open311-service
//!
//! Service-request tracking backend in the Open311 style. Citizens and
//! operators report issues that move through jurisdictions, service groups,
//! services, priorities and statuses until resolved.
//!
//! Every resource type shares one list/search/show/edit contract, the
//! [resource facade](facade), over a pluggable [document store](store).
//!
//! ## Features
//!
//! - **Resource facade**: free-text search, paginated listing with totals,
//!   field selection, relation populate, partial updates
//! - **Document stores**: in-process (default) or SurrealDB (`surrealdb` feature)
//! - **Middleware stack**: request ids, sensitive header masking, panic
//!   recovery, body size limits, compression, CORS, timeouts
//! - **Health checks**: liveness and readiness probes
//! - **Graceful shutdown**: SIGTERM and SIGINT
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use open311_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let state = AppState::new(config.clone(), store, open311_registry()?).await?;
//!
//!     Server::new(config).serve(router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod facade;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

/// Commonly used items
pub mod prelude {
    pub use crate::config::{Config, QueryConfig, StoreConfig};
    pub use crate::domain::open311_registry;
    pub use crate::error::{Error, Result};
    pub use crate::facade::{
        FacadeError, FacadeErrorKind, FacadeOperation, FacadeResult, LoadOptions, QueryMode,
        QueryPlan, ResourceFacade, ResourceQuery, ResourceRegistry, ResourceType, ResultEnvelope,
    };
    pub use crate::health::{health, readiness};
    pub use crate::ids::{MakeTypedRequestId, RequestId, RequestIdError};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::routes::router;
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::store::{Document, DocumentStore, MemoryStore, StoreError, StoreErrorKind};

    #[cfg(feature = "surrealdb")]
    pub use crate::store::SurrealStore;

    pub use axum::{
        extract::{Path, Query, State},
        routing::{get, patch},
        Json, Router,
    };
    pub use serde::{Deserialize, Serialize};
    pub use tokio;
    pub use tracing::{debug, error, info, warn};
}
