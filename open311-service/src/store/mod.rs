//! Document store abstraction
//!
//! Resources are persisted as JSON documents in named collections. The
//! [`DocumentStore`] trait is the only way the rest of the crate touches
//! persisted state:
//!
//! - [`MemoryStore`] keeps collections in process memory (the default)
//! - `SurrealStore` talks to SurrealDB (requires the `surrealdb` feature)
//!
//! Queries are described with [`FindOptions`]: a [`Filter`] tree, an optional
//! [`SortSpec`], a [`Pagination`] window and a [`Projection`].

mod document;
mod error;
mod memory;
mod query;
#[cfg(feature = "surrealdb")]
mod surreal;
mod traits;

pub use document::{
    compare_values, document_id, is_present, lookup, timestamp_now, values_equal, Document,
    CREATED_AT_FIELD, ID_FIELD, MANAGED_FIELDS, UPDATED_AT_FIELD,
};
pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use memory::MemoryStore;
pub use query::{
    CollectionSchema, Filter, FilterCondition, FilterOperator, FindOptions, OrderDirection,
    Pagination, Projection, SortSpec,
};
#[cfg(feature = "surrealdb")]
pub use surreal::{sanitize_connection_url, SurrealClient, SurrealStore};
pub use traits::{DocumentStore, StoreResult};
