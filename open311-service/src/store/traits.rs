//! Document store trait definition
//!
//! The store is the sole owner of persisted documents. Callers never cache
//! what it returns; every operation re-reads from the collection.
//!
//! Like the rest of the crate's async seams, the trait uses return-position
//! `impl Future` so implementations can be written as plain `async fn`.

use std::future::Future;

use super::document::Document;
use super::error::StoreError;
use super::query::{CollectionSchema, Filter, FindOptions, Projection};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A collection-oriented document database
///
/// # Example
///
/// ```rust,ignore
/// use open311_service::store::{DocumentStore, FindOptions, Pagination};
///
/// let window = FindOptions::new().with_window(Pagination::new(0, 10));
/// let documents = store.find("priorities", &window).await?;
/// let total = store.count("priorities", None).await?;
/// ```
pub trait DocumentStore: Send + Sync + 'static {
    /// Declare a collection and the constraints it enforces on write
    ///
    /// Calling this again for the same collection replaces its schema.
    fn define_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Find documents matching the options' filter, ordered and windowed
    ///
    /// A collection that holds no documents yields an empty list.
    fn find(
        &self,
        collection: &str,
        options: &FindOptions,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Count documents matching the filter (all documents when `None`)
    fn count(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Find a single document by `_id`
    ///
    /// Returns `Ok(None)` when no document has that id.
    fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        projection: Option<&Projection>,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Insert a new document
    ///
    /// Assigns an `_id` when missing and stamps `createdAt`/`updatedAt`.
    /// Returns the stored document.
    fn insert(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = StoreResult<Document>> + Send;

    /// Persist a full replacement of an existing document
    ///
    /// The document must carry the `_id` of a stored document. `createdAt`
    /// is preserved and `updatedAt` refreshed.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no document has that `_id`
    /// - `ValidationFailed` / `ConstraintViolation` when the collection
    ///   rejects the new content
    fn save(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = StoreResult<Document>> + Send;

    /// Check that the store is reachable
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
