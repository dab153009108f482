//! Partial update applier
//!
//! Three steps run strictly in order: find the stored document, merge the
//! supplied fields onto it and save, then reload the canonical state. A
//! failing step stops the sequence; nothing already committed is undone.

use super::error::{FacadeError, FacadeErrorKind, FacadeOperation, FacadeResult};
use super::registry::ResourceType;
use crate::store::{Document, DocumentStore, MANAGED_FIELDS};

/// Overwrite each top-level field named in `updates` onto `existing`
///
/// Store-managed fields (`_id`, `createdAt`, `updatedAt`) are skipped.
pub fn merge_updates(mut existing: Document, updates: Document) -> Document {
    for (field, value) in updates {
        if MANAGED_FIELDS.contains(&field.as_str()) {
            tracing::debug!(field = %field, "Skipping store-managed field");
            continue;
        }
        existing.insert(field, value);
    }
    existing
}

pub(crate) async fn apply<S: DocumentStore>(
    store: &S,
    resource: &ResourceType,
    id: &str,
    updates: Document,
) -> FacadeResult<Document> {
    let context = |error: FacadeError| error.for_resource(resource.name()).with_id(id);

    let existing = store
        .find_by_id(resource.collection(), id, None)
        .await
        .map_err(|e| context(FacadeError::from_store(FacadeOperation::Update, e)))?
        .ok_or_else(|| {
            FacadeError::not_found(resource.name(), id).with_operation(FacadeOperation::Update)
        })?;

    let fields: Vec<String> = updates.keys().cloned().collect();
    let merged = merge_updates(existing, updates);

    store
        .save(resource.collection(), merged)
        .await
        .map_err(|e| {
            let error = FacadeError::from_store(FacadeOperation::Update, e);
            if error.kind == FacadeErrorKind::ValidationFailed {
                tracing::info!(
                    resource = resource.name(),
                    id,
                    "Update rejected: {}", error.message
                );
            }
            context(error)
        })?;

    let reloaded = store
        .find_by_id(resource.collection(), id, None)
        .await
        .map_err(|e| context(FacadeError::from_store(FacadeOperation::Update, e)))?
        .ok_or_else(|| {
            FacadeError::not_found(resource.name(), id).with_operation(FacadeOperation::Update)
        })?;

    tracing::info!(resource = resource.name(), id, ?fields, "Resource updated");
    Ok(reloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, CREATED_AT_FIELD, UPDATED_AT_FIELD};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn requests() -> ResourceType {
        ResourceType::new("ServiceRequest").required(["description"])
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let resource = requests();
        store
            .define_collection(resource.collection(), resource.schema())
            .await
            .unwrap();
        store
            .insert(
                "servicerequests",
                doc(json!({
                    "_id": "5c1f5e6b9d1a3b0017a1c2d3",
                    "code": "HQ0001",
                    "description": "Water pipe leak",
                    "status": "Open",
                    "reporter": { "name": "Asha", "phone": "255714000000" }
                })),
            )
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_merge_skips_managed_fields() {
        let existing = doc(json!({ "_id": "a", "createdAt": "then", "name": "x" }));
        let merged = merge_updates(
            existing,
            doc(json!({ "_id": "b", "createdAt": "now", "updatedAt": "now", "name": "y" })),
        );
        assert_eq!(merged, doc(json!({ "_id": "a", "createdAt": "then", "name": "y" })));
    }

    #[tokio::test]
    async fn test_partial_update_preserves_other_fields() {
        let store = seeded().await;
        let id = "5c1f5e6b9d1a3b0017a1c2d3";
        let before = store.find_by_id("servicerequests", id, None).await.unwrap().unwrap();

        let after = apply(&store, &requests(), id, doc(json!({ "status": "Closed" })))
            .await
            .unwrap();

        assert_eq!(after["status"], "Closed");
        assert_eq!(after["_id"], id);
        for (field, value) in &before {
            if field != "status" && field != UPDATED_AT_FIELD {
                assert_eq!(after.get(field), Some(value), "field {field} changed");
            }
        }
        assert_eq!(after.get(CREATED_AT_FIELD), before.get(CREATED_AT_FIELD));
    }

    #[tokio::test]
    async fn test_nested_object_replaced_whole() {
        let store = seeded().await;
        let id = "5c1f5e6b9d1a3b0017a1c2d3";
        let after = apply(&store, &requests(), id, doc(json!({ "reporter": { "name": "Juma" } })))
            .await
            .unwrap();
        assert_eq!(after["reporter"], json!({ "name": "Juma" }));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = seeded().await;
        let err = apply(
            &store,
            &requests(),
            "000000000000000000000000",
            doc(json!({ "status": "Closed" })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, FacadeErrorKind::NotFound);
        assert_eq!(err.operation, FacadeOperation::Update);
    }

    #[tokio::test]
    async fn test_rejected_write_is_validation_error() {
        let store = seeded().await;
        let id = "5c1f5e6b9d1a3b0017a1c2d3";
        let err = apply(&store, &requests(), id, doc(json!({ "description": null })))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FacadeErrorKind::ValidationFailed);
        assert!(err.message.contains("description"));
        assert_eq!(err.resource_id.as_deref(), Some(id));

        let stored = store.find_by_id("servicerequests", id, None).await.unwrap().unwrap();
        assert_eq!(stored["description"], "Water pipe leak");
    }
}
