//! Search strategy: free-text search or paginated listing
//!
//! The two paths report different metadata. Listing counts the matching
//! records and derives the page count from them. Searching echoes the
//! request window back as `pages = skip` and `count = limit`; clients of
//! the search endpoint depend on that shape, so it is kept.

use super::envelope::ResultEnvelope;
use super::error::{FacadeError, FacadeOperation, FacadeResult};
use super::plan::{QueryMode, QueryPlan};
use super::populate::populate;
use super::registry::{ResourceRegistry, ResourceType};
use crate::store::{DocumentStore, Filter, FilterCondition, FindOptions};

/// Case-insensitive, suffix-anchored pattern for a search term
///
/// The term is matched literally; regex metacharacters are escaped.
///
/// ```rust
/// use open311_service::facade::suffix_pattern;
///
/// assert_eq!(suffix_pattern("leak"), "(?i)leak$");
/// assert_eq!(suffix_pattern("a.b"), r"(?i)a\.b$");
/// ```
pub fn suffix_pattern(term: &str) -> String {
    format!("(?i){}$", regex::escape(term))
}

/// OR across the searchable fields of a suffix match on `term`
pub fn search_predicate(fields: &[String], term: &str) -> Filter {
    let pattern = suffix_pattern(term);
    Filter::any(
        fields
            .iter()
            .map(|field| {
                Filter::condition(FilterCondition::matches(field.as_str(), pattern.as_str()))
            })
            .collect(),
    )
}

/// Run a plan against the resource's collection
pub(crate) async fn execute<S: DocumentStore>(
    store: &S,
    registry: &ResourceRegistry,
    resource: &ResourceType,
    plan: QueryPlan,
) -> FacadeResult<ResultEnvelope> {
    match plan.mode {
        QueryMode::Search => search(store, registry, resource, plan).await,
        QueryMode::List => list(store, registry, resource, plan).await,
    }
}

async fn search<S: DocumentStore>(
    store: &S,
    registry: &ResourceRegistry,
    resource: &ResourceType,
    plan: QueryPlan,
) -> FacadeResult<ResultEnvelope> {
    let term = plan.term.as_deref().unwrap_or_default();
    let mut filter = search_predicate(resource.searchable_fields(), term);
    if let Some(criteria) = plan.criteria.clone() {
        filter = filter.and(Filter::Criteria(criteria));
    }

    let options = FindOptions::new()
        .with_filter(Some(filter))
        .with_sort(plan.sort.clone())
        .with_projection(plan.select.clone())
        .with_window(plan.window());

    let mut records = store
        .find(resource.collection(), &options)
        .await
        .map_err(|e| {
            FacadeError::from_store(FacadeOperation::Search, e).for_resource(resource.name())
        })?;

    if let Some(names) = &plan.populate {
        populate(store, registry, resource, &mut records, names).await?;
    }

    tracing::debug!(
        resource = resource.name(),
        term,
        returned = records.len(),
        "Search completed"
    );

    Ok(ResultEnvelope::new(
        resource.plural_key(),
        records,
        plan.skip,
        plan.limit,
    ))
}

async fn list<S: DocumentStore>(
    store: &S,
    registry: &ResourceRegistry,
    resource: &ResourceType,
    plan: QueryPlan,
) -> FacadeResult<ResultEnvelope> {
    let filter = plan.criteria.clone().map(Filter::Criteria);
    let window = plan.window();
    let options = FindOptions::new()
        .with_filter(filter.clone())
        .with_sort(plan.sort.clone())
        .with_projection(plan.select.clone())
        .with_window(window);

    let (total, mut records) = futures::try_join!(
        store.count(resource.collection(), filter.as_ref()),
        store.find(resource.collection(), &options),
    )
    .map_err(|e| FacadeError::from_store(FacadeOperation::List, e).for_resource(resource.name()))?;

    if let Some(names) = &plan.populate {
        populate(store, registry, resource, &mut records, names).await?;
    }

    let pages = window.page_count(total);
    tracing::debug!(
        resource = resource.name(),
        total,
        pages,
        returned = records.len(),
        "List completed"
    );

    Ok(ResultEnvelope::new(resource.plural_key(), records, pages, total))
}
