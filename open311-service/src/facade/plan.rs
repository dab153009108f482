//! Criteria builder: query description to normalized plan

use std::fmt;

use serde_json::{Map, Value};

use super::params::ResourceQuery;
use super::registry::ResourceType;
use crate::store::{Pagination, Projection, SortSpec};

/// Default number of records per page
pub const DEFAULT_LIMIT: u64 = 10;

/// Largest page a client may request
pub const MAX_LIMIT: u64 = 100;

/// Window defaults applied while planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDefaults {
    /// Limit used when the request names none (or zero)
    pub default_limit: u64,
    /// Upper bound on any requested limit
    pub max_limit: u64,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// Which execution path a plan takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Free-text search across the searchable field set
    Search,
    /// Paginated listing with true totals
    List,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::List => write!(f, "list"),
        }
    }
}

/// Normalized plan consumed by the search strategy
///
/// Criteria, sort, select and populate stay `None` when the request did
/// not name them.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Execution path
    pub mode: QueryMode,
    /// Trimmed search term (present only in search mode)
    pub term: Option<String>,
    /// Filter criteria, passed through unchecked
    pub criteria: Option<Map<String, Value>>,
    /// Result ordering
    pub sort: Option<SortSpec>,
    /// Field selection
    pub select: Option<Projection>,
    /// Relations to expand
    pub populate: Option<Vec<String>>,
    /// Records to skip
    pub skip: u64,
    /// Page size, always greater than zero
    pub limit: u64,
}

impl QueryPlan {
    /// Build the plan for `query` against `resource`
    ///
    /// Search mode requires both a non-empty term and a non-empty searchable
    /// field set; everything else lists.
    ///
    /// ```rust
    /// use open311_service::facade::{
    ///     QueryDefaults, QueryMode, QueryPlan, ResourceQuery, ResourceType,
    /// };
    ///
    /// let defaults = QueryDefaults::default();
    /// let requests = ResourceType::new("ServiceRequest").searchable(["description"]);
    /// let plan = QueryPlan::build(&requests, ResourceQuery::new().with_term("leak"), defaults);
    /// assert_eq!(plan.mode, QueryMode::Search);
    ///
    /// let statuses = ResourceType::new("Status");
    /// let plan = QueryPlan::build(&statuses, ResourceQuery::new().with_term("open"), defaults);
    /// assert_eq!(plan.mode, QueryMode::List);
    /// assert_eq!((plan.skip, plan.limit), (0, 10));
    /// ```
    pub fn build(resource: &ResourceType, query: ResourceQuery, defaults: QueryDefaults) -> Self {
        // Whitespace only decides emptiness; the term itself is matched as given
        let term = query.term.filter(|t| !t.trim().is_empty());

        let mode = if term.is_some() && !resource.searchable_fields().is_empty() {
            QueryMode::Search
        } else {
            QueryMode::List
        };

        let limit = match query.limit {
            None | Some(0) => defaults.default_limit.max(1),
            Some(limit) => limit.min(defaults.max_limit.max(1)),
        };

        Self {
            term: term.filter(|_| mode == QueryMode::Search),
            mode,
            criteria: query.criteria,
            sort: query.sort,
            select: query.select,
            populate: query.populate,
            skip: query.skip.unwrap_or(0),
            limit,
        }
    }

    /// The offset/limit window
    pub fn window(&self) -> Pagination {
        Pagination::new(self.skip, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requests() -> ResourceType {
        ResourceType::new("ServiceRequest").searchable(["code", "description"])
    }

    #[test]
    fn test_search_mode_requires_term_and_fields() {
        let defaults = QueryDefaults::default();

        let plan =
            QueryPlan::build(&requests(), ResourceQuery::new().with_term(" leak "), defaults);
        assert_eq!(plan.mode, QueryMode::Search);
        assert_eq!(plan.term.as_deref(), Some(" leak "));

        let plan = QueryPlan::build(&requests(), ResourceQuery::new().with_term("   "), defaults);
        assert_eq!(plan.mode, QueryMode::List);
        assert!(plan.term.is_none());

        let plan = QueryPlan::build(&requests(), ResourceQuery::new(), defaults);
        assert_eq!(plan.mode, QueryMode::List);

        let plan = QueryPlan::build(
            &ResourceType::new("Priority"),
            ResourceQuery::new().with_term("high"),
            defaults,
        );
        assert_eq!(plan.mode, QueryMode::List);
        assert!(plan.term.is_none());
    }

    #[test]
    fn test_absent_directives_stay_absent() {
        let plan = QueryPlan::build(&requests(), ResourceQuery::new(), QueryDefaults::default());
        assert!(plan.criteria.is_none());
        assert!(plan.sort.is_none());
        assert!(plan.select.is_none());
        assert!(plan.populate.is_none());
        assert_eq!(plan.window(), Pagination::new(0, DEFAULT_LIMIT));
    }

    #[test]
    fn test_criteria_pass_through_unchanged() {
        let criteria = json!({ "code": { "$near": 1 } }).as_object().cloned().unwrap();
        let plan = QueryPlan::build(
            &requests(),
            ResourceQuery::new().with_criteria(criteria.clone()),
            QueryDefaults::default(),
        );
        assert_eq!(plan.criteria, Some(criteria));
    }

    #[test]
    fn test_limit_coercion() {
        let defaults = QueryDefaults {
            default_limit: 25,
            max_limit: 50,
        };
        let plan = QueryPlan::build(&requests(), ResourceQuery::new().with_limit(0), defaults);
        assert_eq!(plan.limit, 25);

        let plan = QueryPlan::build(&requests(), ResourceQuery::new().with_limit(500), defaults);
        assert_eq!(plan.limit, 50);

        let plan = QueryPlan::build(
            &requests(),
            ResourceQuery::new().with_skip(4).with_limit(2),
            defaults,
        );
        assert_eq!((plan.skip, plan.limit), (4, 2));
    }
}
