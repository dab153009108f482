//! Application state management

use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    facade::{ResourceFacade, ResourceRegistry},
    store::DocumentStore,
};

/// Application state shared across handlers
///
/// Generic over the document store so the same routes serve the in-process
/// store and SurrealDB.
pub struct AppState<S> {
    config: Arc<Config>,
    facade: ResourceFacade<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            facade: self.facade.clone(),
        }
    }
}

impl<S> std::fmt::Debug for AppState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.config.service.name)
            .field("facade", &self.facade)
            .finish()
    }
}

impl<S: DocumentStore> AppState<S> {
    /// Assemble state over `store`
    ///
    /// Checks that every relation in `registry` names a registered type, then
    /// declares each type's collection and constraints on the store.
    pub async fn new(config: Config, store: Arc<S>, registry: ResourceRegistry) -> Result<Self> {
        registry.validate()?;
        registry.define_collections(store.as_ref()).await?;

        let defaults = config.query_defaults();
        Ok(Self {
            config: Arc::new(config),
            facade: ResourceFacade::new(store, Arc::new(registry), defaults),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resource facade
    pub fn facade(&self) -> &ResourceFacade<S> {
        &self.facade
    }

    /// The backing store
    pub fn store(&self) -> &Arc<S> {
        self.facade.store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::facade::ResourceType;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_new_defines_collections() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(ResourceType::new("Status").unique(["name"]))
            .unwrap();
        let store = Arc::new(MemoryStore::new());

        let state = AppState::new(Config::default(), Arc::clone(&store), registry)
            .await
            .unwrap();

        assert_eq!(store.collection_names(), vec!["statuses".to_string()]);
        assert_eq!(state.facade().registry().len(), 1);
        assert_eq!(state.config().service.name, "open311-service");
    }

    #[tokio::test]
    async fn test_dangling_relation_rejected() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(ResourceType::new("Service").relation("group", "ServiceGroup"))
            .unwrap();

        let err = AppState::new(Config::default(), Arc::new(MemoryStore::new()), registry)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
    }
}
