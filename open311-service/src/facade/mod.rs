//! Resource query facade
//!
//! The shared list/search/show/edit contract every resource type exposes
//! over its backing collection:
//!
//! - [`QueryPlan::build`] turns a [`ResourceQuery`] into a normalized plan
//! - [`ResourceFacade::list`] runs the plan as a free-text search or a
//!   paginated listing and wraps the records in a [`ResultEnvelope`]
//! - [`ResourceFacade::show`] loads one resource by id
//! - [`ResourceFacade::edit`] applies a partial update and returns the
//!   reloaded document
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use open311_service::facade::{
//!     QueryDefaults, ResourceFacade, ResourceQuery, ResourceRegistry, ResourceType,
//! };
//! use open311_service::store::{DocumentStore, MemoryStore};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let mut registry = ResourceRegistry::new();
//! registry.register(ResourceType::new("Priority").searchable(["name"])).unwrap();
//!
//! let store = Arc::new(MemoryStore::new());
//! store
//!     .insert("priorities", json!({ "name": "High" }).as_object().cloned().unwrap())
//!     .await
//!     .unwrap();
//!
//! let facade = ResourceFacade::new(store, Arc::new(registry), QueryDefaults::default());
//! let priority = facade.resource("priorities").unwrap().clone();
//! let envelope = facade.list(&priority, ResourceQuery::new()).await.unwrap();
//! assert_eq!(envelope.count(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod envelope;
mod error;
mod loader;
mod params;
mod plan;
mod populate;
mod registry;
mod search;
mod update;

use std::sync::Arc;

pub use envelope::ResultEnvelope;
pub use error::{FacadeError, FacadeErrorKind, FacadeOperation, FacadeResult};
pub use params::{LoadOptions, LoadParams, QueryParams, ResourceQuery};
pub use plan::{QueryDefaults, QueryMode, QueryPlan, DEFAULT_LIMIT, MAX_LIMIT};
pub use registry::{pluralize, RegistryError, Relation, ResourceRegistry, ResourceType};
pub use search::{search_predicate, suffix_pattern};
pub use update::merge_updates;

use crate::store::{Document, DocumentStore};

/// List/search/show/edit over registered resource types
///
/// Holds no per-request state; every call reads the store afresh.
pub struct ResourceFacade<S> {
    store: Arc<S>,
    registry: Arc<ResourceRegistry>,
    defaults: QueryDefaults,
}

impl<S> Clone for ResourceFacade<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            defaults: self.defaults,
        }
    }
}

impl<S> std::fmt::Debug for ResourceFacade<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFacade")
            .field("resources", &self.registry.len())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> ResourceFacade<S> {
    /// Create a facade over `store` for the types in `registry`
    pub fn new(store: Arc<S>, registry: Arc<ResourceRegistry>, defaults: QueryDefaults) -> Self {
        Self {
            store,
            registry,
            defaults,
        }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The resource registry
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Resolve a route segment (plural key) to its resource type
    pub fn resource(&self, key: &str) -> FacadeResult<&ResourceType> {
        self.registry
            .by_key(key)
            .ok_or_else(|| FacadeError::unknown_resource(key))
    }

    /// List or search `resource`
    ///
    /// Searches when the query carries a term and the type has searchable
    /// fields; lists otherwise.
    #[tracing::instrument(skip(self, resource, query), fields(resource = resource.name()))]
    pub async fn list(
        &self,
        resource: &ResourceType,
        query: ResourceQuery,
    ) -> FacadeResult<ResultEnvelope> {
        let plan = QueryPlan::build(resource, query, self.defaults);
        tracing::debug!(
            mode = %plan.mode,
            skip = plan.skip,
            limit = plan.limit,
            "Executing query plan"
        );
        search::execute(self.store.as_ref(), &self.registry, resource, plan).await
    }

    /// Load one resource by id
    #[tracing::instrument(skip(self, resource, options), fields(resource = resource.name()))]
    pub async fn show(
        &self,
        resource: &ResourceType,
        id: &str,
        options: &LoadOptions,
    ) -> FacadeResult<Document> {
        loader::load(self.store.as_ref(), &self.registry, resource, id, options).await
    }

    /// Merge `updates` onto the stored resource and return the reloaded state
    #[tracing::instrument(skip(self, resource, updates), fields(resource = resource.name()))]
    pub async fn edit(
        &self,
        resource: &ResourceType,
        id: &str,
        updates: Document,
    ) -> FacadeResult<Document> {
        update::apply(self.store.as_ref(), resource, id, updates).await
    }
}
