//! Relation expansion
//!
//! Populating a relation replaces the stored reference (an id, or an array
//! of ids) with the referenced documents. References that no longer resolve
//! are left as raw ids. Names that are not declared relations of the
//! resource type are ignored.

use std::collections::HashMap;

use serde_json::Value;

use super::error::{FacadeError, FacadeOperation, FacadeResult};
use super::registry::{Relation, ResourceRegistry, ResourceType};
use crate::store::{
    document_id, Document, DocumentStore, Filter, FilterCondition, FilterOperator, FindOptions,
    ID_FIELD,
};

/// Expand `names` on every document in place
pub(crate) async fn populate<S: DocumentStore>(
    store: &S,
    registry: &ResourceRegistry,
    resource: &ResourceType,
    documents: &mut [Document],
    names: &[String],
) -> FacadeResult<()> {
    if documents.is_empty() {
        return Ok(());
    }

    for name in names {
        let Some(relation) = resource.relation_for(name) else {
            tracing::debug!(
                resource = resource.name(),
                populate = %name,
                "Ignoring unknown relation"
            );
            continue;
        };
        let Some(target) = registry.get(&relation.target) else {
            tracing::debug!(
                resource = resource.name(),
                target = %relation.target,
                "Relation target not registered"
            );
            continue;
        };

        let ids = referenced_ids(documents, relation);
        if ids.is_empty() {
            continue;
        }

        let filter = Filter::condition(FilterCondition::new(
            ID_FIELD,
            FilterOperator::In,
            Value::Array(ids.into_iter().map(Value::String).collect()),
        ));
        let referenced = store
            .find(target.collection(), &FindOptions::new().with_filter(Some(filter)))
            .await
            .map_err(|e| {
                FacadeError::from_store(FacadeOperation::Populate, e)
                    .for_resource(target.name())
            })?;

        let by_id: HashMap<String, Document> = referenced
            .into_iter()
            .filter_map(|doc| document_id(&doc).map(str::to_string).map(|id| (id, doc)))
            .collect();

        tracing::debug!(
            resource = resource.name(),
            relation = %relation.field,
            resolved = by_id.len(),
            "Relation populated"
        );

        for document in documents.iter_mut() {
            if let Some(value) = document.get_mut(&relation.field) {
                replace_references(value, &by_id);
            }
        }
    }

    Ok(())
}

/// Distinct ids referenced by `relation` across the documents, in first-seen order
fn referenced_ids(documents: &[Document], relation: &Relation) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: &str| {
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    };

    for document in documents {
        match document.get(&relation.field) {
            Some(Value::String(id)) => push(id.as_str()),
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).for_each(&mut push),
            _ => {}
        }
    }
    ids
}

fn replace_references(value: &mut Value, by_id: &HashMap<String, Document>) {
    match value {
        Value::String(id) => {
            if let Some(referenced) = by_id.get(id.as_str()) {
                *value = Value::Object(referenced.clone());
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                replace_references(item, by_id);
            }
        }
        _ => {}
    }
}
