//! In-process document store
//!
//! Collections live in a concurrent map keyed by collection name; each
//! collection keeps its documents in insertion order, which is the natural
//! order returned when a query carries no sort. Nothing is persisted across
//! restarts.

use std::cmp::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use regex::Regex;
use serde_json::Value;

use super::document::{
    compare_values, document_id, lookup, prepare_insert, prepare_save, values_equal, Document,
};
use super::error::{StoreError, StoreOperation};
use super::query::{CollectionSchema, Filter, FilterOperator, FindOptions, Projection, SortSpec};
use super::traits::{DocumentStore, StoreResult};

#[derive(Debug, Default)]
struct Collection {
    schema: CollectionSchema,
    documents: Vec<Document>,
}

impl Collection {
    fn check_unique(&self, document: &Document, operation: StoreOperation) -> StoreResult<()> {
        let id = document_id(document);
        for field in &self.schema.unique {
            let Some(value) = lookup(document, field).filter(|v| !v.is_null()) else {
                continue;
            };
            let duplicate = self.documents.iter().any(|other| {
                document_id(other) != id
                    && lookup(other, field).is_some_and(|existing| values_equal(existing, value))
            });
            if duplicate {
                return Err(StoreError::constraint_violation(
                    operation,
                    format!("Duplicate value for unique field '{}': {}", field, value),
                ));
            }
        }
        Ok(())
    }
}

/// Document store backed by process memory
///
/// Cloning is cheap and clones share the same collections.
///
/// ```rust
/// use open311_service::store::{DocumentStore, MemoryStore};
/// use serde_json::json;
///
/// # tokio_test_block(async {
/// let store = MemoryStore::new();
/// let doc = json!({ "name": "Open" }).as_object().cloned().unwrap();
/// let stored = store.insert("statuses", doc).await.unwrap();
/// assert!(stored.contains_key("_id"));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of collections currently held
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}

impl DocumentStore for MemoryStore {
    async fn define_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> StoreResult<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .schema = schema.clone();
        tracing::debug!(
            collection,
            required = ?schema.required,
            unique = ?schema.unique,
            "Collection defined"
        );
        Ok(())
    }

    async fn find(&self, collection: &str, options: &FindOptions) -> StoreResult<Vec<Document>> {
        let matcher = compile(options.filter.as_ref())
            .map_err(|e| e.with_operation(StoreOperation::Find).in_collection(collection))?;

        let mut matched: Vec<Document> = match self.collections.get(collection) {
            Some(entry) => entry
                .documents
                .iter()
                .filter(|doc| matcher.as_ref().is_none_or(|m| m.matches(doc)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if let Some(sort) = options.sort.as_ref().filter(|s| !s.is_empty()) {
            sort_documents(&mut matched, sort);
        }

        let windowed: Vec<Document> = match options.window {
            Some(window) => matched
                .into_iter()
                .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
                .collect(),
            None => matched,
        };

        Ok(match &options.projection {
            Some(projection) => windowed.into_iter().map(|d| projection.apply(d)).collect(),
            None => windowed,
        })
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> StoreResult<u64> {
        let matcher = compile(filter)
            .map_err(|e| e.with_operation(StoreOperation::Count).in_collection(collection))?;

        let total = match self.collections.get(collection) {
            Some(entry) => entry
                .documents
                .iter()
                .filter(|doc| matcher.as_ref().is_none_or(|m| m.matches(doc)))
                .count(),
            None => 0,
        };
        Ok(total as u64)
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        projection: Option<&Projection>,
    ) -> StoreResult<Option<Document>> {
        let found = self.collections.get(collection).and_then(|entry| {
            entry
                .documents
                .iter()
                .find(|doc| document_id(doc) == Some(id))
                .cloned()
        });
        Ok(match (found, projection) {
            (Some(doc), Some(projection)) => Some(projection.apply(doc)),
            (found, _) => found,
        })
    }

    async fn insert(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let document = prepare_insert(document);
        let mut entry = self.collections.entry(collection.to_string()).or_default();

        let id = document_id(&document).unwrap_or_default().to_string();
        if entry.documents.iter().any(|doc| document_id(doc) == Some(id.as_str())) {
            return Err(StoreError::constraint_violation(
                StoreOperation::Insert,
                format!("Duplicate _id '{}'", id),
            )
            .in_collection(collection)
            .for_document(id));
        }

        entry
            .schema
            .check_required(&document, StoreOperation::Insert)
            .and_then(|()| entry.check_unique(&document, StoreOperation::Insert))
            .map_err(|e| e.in_collection(collection).for_document(id.as_str()))?;

        entry.documents.push(document.clone());
        Ok(document)
    }

    async fn save(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let id = document_id(&document)
            .ok_or_else(|| {
                StoreError::validation_failed(StoreOperation::Save, "Document has no _id")
                    .in_collection(collection)
            })?
            .to_string();

        let mut entry = self.collections.get_mut(collection).ok_or_else(|| {
            StoreError::not_found(collection, id.as_str()).with_operation(StoreOperation::Save)
        })?;

        let position = entry
            .documents
            .iter()
            .position(|doc| document_id(doc) == Some(id.as_str()))
            .ok_or_else(|| {
                StoreError::not_found(collection, id.as_str()).with_operation(StoreOperation::Save)
            })?;

        let document = prepare_save(document, &entry.documents[position]);
        entry
            .schema
            .check_required(&document, StoreOperation::Save)
            .and_then(|()| entry.check_unique(&document, StoreOperation::Save))
            .map_err(|e| e.in_collection(collection).for_document(id.as_str()))?;

        entry.documents[position] = document.clone();
        Ok(document)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn sort_documents(documents: &mut [Document], sort: &SortSpec) {
    documents.sort_by(|a, b| {
        for (field, direction) in sort.keys() {
            let ordering = compare_values(lookup(a, field), lookup(b, field));
            let ordering = match direction {
                super::query::OrderDirection::Ascending => ordering,
                super::query::OrderDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Filter tree with its patterns compiled
enum Matcher {
    Condition {
        field: String,
        operator: FilterOperator,
        operand: Value,
        pattern: Option<Regex>,
    },
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
}

fn compile(filter: Option<&Filter>) -> StoreResult<Option<Matcher>> {
    filter
        .map(|f| f.normalize().and_then(|normalized| Matcher::build(&normalized)))
        .transpose()
}

impl Matcher {
    fn build(filter: &Filter) -> StoreResult<Self> {
        Ok(match filter {
            Filter::Criteria(_) => Self::build(&filter.normalize()?)?,
            Filter::Condition(condition) => {
                let pattern = match condition.operator {
                    FilterOperator::Matches => {
                        Some(Regex::new(condition.value.as_str().unwrap_or_default())?)
                    }
                    _ => None,
                };
                Self::Condition {
                    field: condition.field.clone(),
                    operator: condition.operator,
                    operand: condition.value.clone(),
                    pattern,
                }
            }
            Filter::All(children) => {
                Self::All(children.iter().map(Self::build).collect::<StoreResult<_>>()?)
            }
            Filter::Any(children) => {
                Self::Any(children.iter().map(Self::build).collect::<StoreResult<_>>()?)
            }
        })
    }

    fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All(children) => children.iter().all(|m| m.matches(document)),
            Self::Any(children) => children.iter().any(|m| m.matches(document)),
            Self::Condition {
                field,
                operator,
                operand,
                pattern,
            } => condition_matches(lookup(document, field), *operator, operand, pattern.as_ref()),
        }
    }
}

/// Apply `test` to a value, fanning out over array elements
fn any_element(value: &Value, test: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => test(value) || items.iter().any(test),
        other => test(other),
    }
}

fn equals(value: Option<&Value>, operand: &Value) -> bool {
    match value {
        Some(value) => any_element(value, |v| values_equal(v, operand)),
        None => operand.is_null(),
    }
}

fn comparable(left: &Value, right: &Value) -> bool {
    matches!(
        (left, right),
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_))
    )
}

fn condition_matches(
    value: Option<&Value>,
    operator: FilterOperator,
    operand: &Value,
    pattern: Option<&Regex>,
) -> bool {
    let ordered = |accept: fn(Ordering) -> bool| {
        value.is_some_and(|value| {
            any_element(value, |v| {
                comparable(v, operand) && accept(compare_values(Some(v), Some(operand)))
            })
        })
    };

    match operator {
        FilterOperator::Equal => equals(value, operand),
        FilterOperator::NotEqual => !equals(value, operand),
        FilterOperator::GreaterThan => ordered(|o| o == Ordering::Greater),
        FilterOperator::GreaterThanOrEqual => ordered(|o| o != Ordering::Less),
        FilterOperator::LessThan => ordered(|o| o == Ordering::Less),
        FilterOperator::LessThanOrEqual => ordered(|o| o != Ordering::Greater),
        FilterOperator::In => operand
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| equals(value, c))),
        FilterOperator::NotIn => !operand
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| equals(value, c))),
        FilterOperator::Exists => {
            let wanted = operand.as_bool().unwrap_or_else(|| operand.as_i64() != Some(0));
            value.is_some() == wanted
        }
        FilterOperator::Matches => match (value, pattern) {
            (Some(value), Some(pattern)) => {
                any_element(value, |v| v.as_str().is_some_and(|s| pattern.is_match(s)))
            }
            _ => false,
        },
    }
}
