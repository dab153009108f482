//! Resource type registry
//!
//! Each resource type is declared once at startup with its searchable
//! fields, relations and write constraints. The registry is immutable once
//! built and is shared behind an `Arc`.
//!
//! ```rust
//! use open311_service::facade::{ResourceRegistry, ResourceType};
//!
//! let mut registry = ResourceRegistry::new();
//! registry
//!     .register(ResourceType::new("Priority").searchable(["name"]).required(["name"]))
//!     .unwrap();
//!
//! let priority = registry.by_key("priorities").unwrap();
//! assert_eq!(priority.name(), "Priority");
//! assert_eq!(priority.collection(), "priorities");
//! ```

use std::collections::BTreeMap;

use crate::store::{CollectionSchema, DocumentStore, StoreResult};

/// Errors raised while assembling the registry
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two resource types share a name or plural key
    #[error("resource type '{0}' is already registered")]
    Duplicate(String),

    /// A relation points at a resource type nobody registered
    #[error("relation '{field}' on '{resource}' targets unknown resource type '{target}'")]
    UnknownTarget {
        /// Declaring resource type
        resource: String,
        /// Relation field
        field: String,
        /// Missing target type
        target: String,
    },
}

/// A field holding the id (or ids) of another resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Field holding the reference
    pub field: String,
    /// Name of the referenced resource type
    pub target: String,
}

/// Lower-case, pluralized form of a resource type name
///
/// ```rust
/// use open311_service::facade::pluralize;
///
/// assert_eq!(pluralize("ServiceRequest"), "servicerequests");
/// assert_eq!(pluralize("Priority"), "priorities");
/// assert_eq!(pluralize("Status"), "statuses");
/// ```
pub fn pluralize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars().rev();
    let last = chars.next();
    let before_last = chars.next();

    match (before_last, last) {
        (Some(c), Some('y')) if !"aeiou".contains(c) => {
            format!("{}ies", &lower[..lower.len() - 1])
        }
        (_, Some('s' | 'x' | 'z')) => format!("{}es", lower),
        (Some('c' | 's'), Some('h')) => format!("{}es", lower),
        _ => format!("{}s", lower),
    }
}

/// Declaration of one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    name: String,
    key: String,
    collection: String,
    searchable: Vec<String>,
    relations: Vec<Relation>,
    schema: CollectionSchema,
}

impl ResourceType {
    /// Declare a resource type by display name
    ///
    /// The envelope key and the collection both default to the pluralized,
    /// lower-cased name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = pluralize(&name);
        Self {
            collection: key.clone(),
            key,
            name,
            searchable: Vec::new(),
            relations: Vec::new(),
            schema: CollectionSchema::default(),
        }
    }

    /// Store documents in a differently named collection
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Fields eligible for free-text search
    #[must_use]
    pub fn searchable<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.searchable.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declare that `field` references resources of type `target`
    #[must_use]
    pub fn relation(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push(Relation {
            field: field.into(),
            target: target.into(),
        });
        self
    }

    /// Fields the store must see present on every write
    #[must_use]
    pub fn required<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.schema.required.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Fields whose values must be unique across the collection
    #[must_use]
    pub fn unique<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.schema.unique.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Display name (e.g., "ServiceRequest")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Envelope key and route segment (e.g., "servicerequests")
    pub fn plural_key(&self) -> &str {
        &self.key
    }

    /// Backing collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Searchable field set
    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable
    }

    /// Declared relations
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Relation declared on `field`, if any
    pub fn relation_for(&self, field: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.field == field)
    }

    /// Write constraints for the backing collection
    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }
}

/// All registered resource types, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    types: BTreeMap<String, ResourceType>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource type
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the name or plural key is taken.
    pub fn register(&mut self, resource: ResourceType) -> Result<&mut Self, RegistryError> {
        let clash = self.types.values().any(|existing| {
            existing.name == resource.name || existing.key == resource.key
        });
        if clash {
            return Err(RegistryError::Duplicate(resource.name));
        }
        self.types.insert(resource.name.clone(), resource);
        Ok(self)
    }

    /// Check that every relation targets a registered type
    pub fn validate(&self) -> Result<(), RegistryError> {
        for resource in self.types.values() {
            for relation in &resource.relations {
                if !self.types.contains_key(&relation.target) {
                    return Err(RegistryError::UnknownTarget {
                        resource: resource.name.clone(),
                        field: relation.field.clone(),
                        target: relation.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a resource type by display name
    pub fn get(&self, name: &str) -> Option<&ResourceType> {
        self.types.get(name)
    }

    /// Look up a resource type by plural key (route segment)
    pub fn by_key(&self, key: &str) -> Option<&ResourceType> {
        self.types.values().find(|r| r.key == key)
    }

    /// Iterate over registered resource types in name order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.values()
    }

    /// Number of registered resource types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no resource types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Declare every registered collection on the store
    pub async fn define_collections<S: DocumentStore>(&self, store: &S) -> StoreResult<()> {
        for resource in self.types.values() {
            store
                .define_collection(&resource.collection, &resource.schema)
                .await?;
        }
        tracing::info!(count = self.types.len(), "Resource collections defined");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("Jurisdiction"), "jurisdictions");
        assert_eq!(pluralize("ServiceGroup"), "servicegroups");
        assert_eq!(pluralize("Priority"), "priorities");
        assert_eq!(pluralize("Status"), "statuses");
        assert_eq!(pluralize("Day"), "days");
        assert_eq!(pluralize("Box"), "boxes");
        assert_eq!(pluralize("Branch"), "branches");
        assert_eq!(pluralize("Changelog"), "changelogs");
    }

    #[test]
    fn test_resource_type_builder() {
        let resource = ResourceType::new("ServiceRequest")
            .searchable(["code", "description"])
            .relation("status", "Status")
            .required(["description"])
            .unique(["code"]);

        assert_eq!(resource.plural_key(), "servicerequests");
        assert_eq!(resource.collection(), "servicerequests");
        assert_eq!(resource.searchable_fields(), ["code", "description"]);
        assert_eq!(resource.relation_for("status").unwrap().target, "Status");
        assert!(resource.relation_for("service").is_none());
        assert_eq!(resource.schema().required, vec!["description".to_string()]);
        assert_eq!(resource.schema().unique, vec!["code".to_string()]);

        let renamed = ResourceType::new("Status").with_collection("request_statuses");
        assert_eq!(renamed.plural_key(), "statuses");
        assert_eq!(renamed.collection(), "request_statuses");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ResourceRegistry::new();
        registry.register(ResourceType::new("Status")).unwrap();
        let err = registry.register(ResourceType::new("Status")).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("Status".to_string()));
    }

    #[test]
    fn test_validate_relation_targets() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(ResourceType::new("ServiceRequest").relation("status", "Status"))
            .unwrap();
        assert!(matches!(
            registry.validate(),
            Err(RegistryError::UnknownTarget { .. })
        ));

        registry.register(ResourceType::new("Status")).unwrap();
        assert!(registry.validate().is_ok());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.by_key("statuses").unwrap().name(), "Status");
    }

    #[tokio::test]
    async fn test_define_collections() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(ResourceType::new("Status"))
            .and_then(|r| r.register(ResourceType::new("Priority")))
            .unwrap();

        let store = MemoryStore::new();
        registry.define_collections(&store).await.unwrap();
        assert_eq!(store.collection_names(), vec!["priorities", "statuses"]);
    }
}
