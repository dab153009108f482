//! Query descriptions and query-string coercion
//!
//! [`ResourceQuery`] is the typed description the facade works from.
//! [`QueryParams`] is what arrives on the wire: every value is a string, so
//! conversion coerces numbers, decodes the JSON `query` criteria, and splits
//! the `select`/`populate` lists.
//!
//! ```rust
//! use open311_service::facade::{QueryParams, ResourceQuery};
//!
//! let params = QueryParams {
//!     q: Some("leak".to_string()),
//!     query: Some(r#"{"status": "Open"}"#.to_string()),
//!     sort: Some("-createdAt".to_string()),
//!     limit: Some("5".to_string()),
//!     ..QueryParams::default()
//! };
//! let query = ResourceQuery::try_from(params).unwrap();
//! assert_eq!(query.term.as_deref(), Some("leak"));
//! assert_eq!(query.limit, Some(5));
//! assert!(query.criteria.is_some());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::FacadeError;
use crate::store::{Projection, SortSpec};

/// Typed description of a list or search request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceQuery {
    /// Free-text search term
    pub term: Option<String>,
    /// Filter criteria in mongo style (`{"field": value}` / `{"field": {"$op": value}}`)
    pub criteria: Option<Map<String, Value>>,
    /// Result ordering
    pub sort: Option<SortSpec>,
    /// Field selection
    pub select: Option<Projection>,
    /// Relations to expand
    pub populate: Option<Vec<String>>,
    /// Number of records to skip
    pub skip: Option<u64>,
    /// Maximum number of records to return
    pub limit: Option<u64>,
}

impl ResourceQuery {
    /// Create an empty query (first page, default limit)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text term
    #[must_use]
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    /// Set the filter criteria
    #[must_use]
    pub fn with_criteria(mut self, criteria: Map<String, Value>) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Set the ordering
    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the field selection
    #[must_use]
    pub fn with_select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }

    /// Set the relations to expand
    #[must_use]
    pub fn with_populate<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.populate = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the offset
    #[must_use]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Select/populate directives for single-resource loads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Field selection
    pub select: Option<Projection>,
    /// Relations to expand
    pub populate: Option<Vec<String>>,
}

impl LoadOptions {
    /// Load the document as stored
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field selection
    #[must_use]
    pub fn with_select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }

    /// Set the relations to expand
    #[must_use]
    pub fn with_populate<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.populate = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Raw list/search query-string parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryParams {
    /// Free-text search term
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// JSON-encoded filter criteria
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Sort string (`-createdAt name`) or JSON object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Space/comma separated field selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    /// Space/comma separated relation names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<String>,
    /// Number of records to skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
    /// Maximum number of records to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

/// Raw show query-string parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadParams {
    /// Space/comma separated field selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    /// Space/comma separated relation names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<String>,
}

/// Treat empty and whitespace-only parameters as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_count(name: &str, value: Option<String>) -> Result<Option<u64>, FacadeError> {
    non_empty(value)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|_| {
                FacadeError::bad_request(format!(
                    "Query parameter '{}' must be a non-negative integer, got '{}'",
                    name, raw
                ))
            })
        })
        .transpose()
}

fn parse_criteria(value: Option<String>) -> Result<Option<Map<String, Value>>, FacadeError> {
    non_empty(value)
        .map(|raw| match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(criteria)) => Ok(criteria),
            Ok(_) => Err(FacadeError::bad_request(
                "Query parameter 'query' must be a JSON object",
            )),
            Err(e) => Err(FacadeError::bad_request(format!(
                "Query parameter 'query' is not valid JSON: {}",
                e
            ))),
        })
        .transpose()
}

fn parse_list(value: Option<String>) -> Option<Vec<String>> {
    non_empty(value).map(|raw| {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

impl TryFrom<QueryParams> for ResourceQuery {
    type Error = FacadeError;

    fn try_from(params: QueryParams) -> Result<Self, Self::Error> {
        let sort = non_empty(params.sort)
            .map(|raw| SortSpec::parse(&raw).map_err(FacadeError::bad_request))
            .transpose()?;

        Ok(Self {
            term: non_empty(params.q),
            criteria: parse_criteria(params.query)?,
            sort,
            select: params.select.as_deref().and_then(Projection::parse),
            populate: parse_list(params.populate),
            skip: parse_count("skip", params.skip)?,
            limit: parse_count("limit", params.limit)?,
        })
    }
}

impl From<LoadParams> for LoadOptions {
    fn from(params: LoadParams) -> Self {
        Self {
            select: params.select.as_deref().and_then(Projection::parse),
            populate: parse_list(params.populate),
        }
    }
}
