//! Single-resource loader

use super::error::{FacadeError, FacadeOperation, FacadeResult};
use super::params::LoadOptions;
use super::populate::populate;
use super::registry::{ResourceRegistry, ResourceType};
use crate::store::{Document, DocumentStore};

/// Fetch one resource by id, applying select and populate
///
/// Absence is reported as `NotFound`, never as an empty success.
pub(crate) async fn load<S: DocumentStore>(
    store: &S,
    registry: &ResourceRegistry,
    resource: &ResourceType,
    id: &str,
    options: &LoadOptions,
) -> FacadeResult<Document> {
    let found = store
        .find_by_id(resource.collection(), id, options.select.as_ref())
        .await
        .map_err(|e| {
            FacadeError::from_store(FacadeOperation::Show, e)
                .for_resource(resource.name())
                .with_id(id)
        })?;

    let Some(document) = found else {
        tracing::debug!(resource = resource.name(), id, "Resource not found");
        return Err(FacadeError::not_found(resource.name(), id));
    };

    match &options.populate {
        Some(names) => {
            let mut documents = [document];
            populate(store, registry, resource, &mut documents, names).await?;
            let [document] = documents;
            Ok(document)
        }
        None => Ok(document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::FacadeErrorKind;
    use crate::store::{MemoryStore, Projection};
    use serde_json::json;

    fn registry() -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        registry
            .register(ResourceType::new("Service").relation("group", "ServiceGroup"))
            .and_then(|r| r.register(ResourceType::new("ServiceGroup")))
            .unwrap();
        registry
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(
                "servicegroups",
                json!({ "_id": "g1", "name": "Water" }).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();
        store
            .insert(
                "services",
                json!({ "_id": "s1", "code": "LK", "name": "Leakage", "group": "g1" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let registry = registry();
        let store = seeded().await;
        let resource = registry.get("Service").unwrap();

        let err = load(&store, &registry, resource, "000000000000000000000000", &LoadOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FacadeErrorKind::NotFound);
        assert_eq!(err.resource.as_deref(), Some("Service"));
        assert_eq!(err.resource_id.as_deref(), Some("000000000000000000000000"));
    }

    #[tokio::test]
    async fn test_select_and_populate() {
        let registry = registry();
        let store = seeded().await;
        let resource = registry.get("Service").unwrap();

        let options = LoadOptions::new()
            .with_select(Projection::parse("name group").unwrap())
            .with_populate(["group"]);
        let document = load(&store, &registry, resource, "s1", &options).await.unwrap();

        assert_eq!(document["_id"], "s1");
        assert!(!document.contains_key("code"));
        assert_eq!(document["group"]["name"], "Water");
    }

    #[tokio::test]
    async fn test_repeated_loads_are_identical() {
        let registry = registry();
        let store = seeded().await;
        let resource = registry.get("Service").unwrap();

        let first = load(&store, &registry, resource, "s1", &LoadOptions::new()).await.unwrap();
        let second = load(&store, &registry, resource, "s1", &LoadOptions::new()).await.unwrap();
        assert_eq!(first, second);
    }
}
