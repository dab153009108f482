//! Filtering, ordering, projection and windowing types for store queries
//!
//! Filters arrive either as typed [`FilterCondition`]s built in code (the
//! free-text search predicate) or as raw mongo-style criteria supplied by
//! clients. Raw criteria are carried unchanged until execution, where
//! [`Filter::normalize`] interprets them; malformed criteria therefore fail
//! at execution time with a `QueryFailed` store error.
//!
//! # Example
//!
//! ```rust
//! use open311_service::store::{Filter, FilterCondition, Pagination, SortSpec};
//!
//! let filter = Filter::any(vec![
//!     Filter::condition(FilterCondition::matches("code", "(?i)leak$")),
//!     Filter::condition(FilterCondition::matches("description", "(?i)leak$")),
//! ]);
//! let sort = SortSpec::parse("-createdAt code").unwrap();
//! let window = Pagination::new(0, 10);
//! # let _ = (filter, sort, window);
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::document::{Document, ID_FIELD};
use super::error::{StoreError, StoreOperation};

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Ordered list of sort keys
///
/// Accepts the two shapes clients send: a space/comma separated string
/// where a leading `-` means descending (`"-createdAt code"`), or a JSON
/// object mapping field to `1`/`-1` (or `"asc"`/`"desc"`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    keys: Vec<(String, OrderDirection)>,
}

impl SortSpec {
    /// Parse either the string or JSON-object form
    ///
    /// ```rust
    /// use open311_service::store::{OrderDirection, SortSpec};
    ///
    /// let spec = SortSpec::parse("-createdAt, name").unwrap();
    /// assert_eq!(spec.keys()[0], ("createdAt".to_string(), OrderDirection::Descending));
    ///
    /// let spec = SortSpec::parse(r#"{"weight": -1}"#).unwrap();
    /// assert_eq!(spec.keys()[0].1, OrderDirection::Descending);
    /// ```
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        if trimmed.starts_with('{') {
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| format!("Invalid sort object: {}", e))?;
            return Self::from_value(&value);
        }

        let keys = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| match token.strip_prefix('-') {
                Some(field) => (field.to_string(), OrderDirection::Descending),
                None => (
                    token.trim_start_matches('+').to_string(),
                    OrderDirection::Ascending,
                ),
            })
            .collect();
        Ok(Self { keys })
    }

    /// Build from a JSON object (`{"field": 1 | -1 | "asc" | "desc"}`)
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "Sort must be an object".to_string())?;

        let mut keys = Vec::with_capacity(object.len());
        for (field, direction) in object {
            let direction = match direction {
                Value::Number(n) if n.as_i64() == Some(-1) => OrderDirection::Descending,
                Value::Number(n) if n.as_i64() == Some(1) => OrderDirection::Ascending,
                Value::String(s) if matches!(s.as_str(), "desc" | "descending" | "-1") => {
                    OrderDirection::Descending
                }
                Value::String(s) if matches!(s.as_str(), "asc" | "ascending" | "1") => {
                    OrderDirection::Ascending
                }
                other => return Err(format!("Invalid sort direction for '{}': {}", field, other)),
            };
            keys.push((field.clone(), direction));
        }
        Ok(Self { keys })
    }

    /// The sort keys in priority order
    pub fn keys(&self) -> &[(String, OrderDirection)] {
        &self.keys
    }

    /// Whether no keys are set
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromStr for SortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Offset/limit window over query results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Number of pages needed to hold `total` results at this limit
    ///
    /// ```rust
    /// use open311_service::store::Pagination;
    ///
    /// assert_eq!(Pagination::new(0, 2).page_count(5), 3);
    /// assert_eq!(Pagination::new(0, 10).page_count(0), 0);
    /// ```
    #[must_use]
    pub fn page_count(&self, total: u64) -> u64 {
        let limit = self.limit.max(1);
        total.div_ceil(limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
        }
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (`$eq`)
    Equal,
    /// Not equal to (`$ne`)
    NotEqual,
    /// Greater than (`$gt`)
    GreaterThan,
    /// Greater than or equal to (`$gte`)
    GreaterThanOrEqual,
    /// Less than (`$lt`)
    LessThan,
    /// Less than or equal to (`$lte`)
    LessThanOrEqual,
    /// Value is in a list (`$in`)
    In,
    /// Value is not in a list (`$nin`)
    NotIn,
    /// Field presence (`$exists`)
    Exists,
    /// Regular expression match (`$regex`)
    Matches,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "$eq"),
            Self::NotEqual => write!(f, "$ne"),
            Self::GreaterThan => write!(f, "$gt"),
            Self::GreaterThanOrEqual => write!(f, "$gte"),
            Self::LessThan => write!(f, "$lt"),
            Self::LessThanOrEqual => write!(f, "$lte"),
            Self::In => write!(f, "$in"),
            Self::NotIn => write!(f, "$nin"),
            Self::Exists => write!(f, "$exists"),
            Self::Matches => write!(f, "$regex"),
        }
    }
}

impl FilterOperator {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "$eq" => Self::Equal,
            "$ne" => Self::NotEqual,
            "$gt" => Self::GreaterThan,
            "$gte" => Self::GreaterThanOrEqual,
            "$lt" => Self::LessThan,
            "$lte" => Self::LessThanOrEqual,
            "$in" => Self::In,
            "$nin" => Self::NotIn,
            "$exists" => Self::Exists,
            "$regex" => Self::Matches,
            _ => return None,
        })
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// Dotted field path
    pub field: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Operand; a pattern string for [`FilterOperator::Matches`]
    pub value: Value,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Equal, value)
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value)
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value)
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value)
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThan, value)
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value)
    }

    /// `field` matches the regular expression `pattern`
    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Matches, Value::String(pattern.into()))
    }
}

/// Boolean filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Raw client criteria, interpreted at execution time
    Criteria(Map<String, Value>),
    /// A single comparison
    Condition(FilterCondition),
    /// Every child must match (an empty list matches everything)
    All(Vec<Filter>),
    /// At least one child must match (an empty list matches nothing)
    Any(Vec<Filter>),
}

impl Filter {
    /// Wrap a condition
    pub fn condition(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }

    /// Conjunction of filters
    pub fn all(filters: Vec<Filter>) -> Self {
        Self::All(filters)
    }

    /// Disjunction of filters
    pub fn any(filters: Vec<Filter>) -> Self {
        Self::Any(filters)
    }

    /// AND another filter on top of this one
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::All(mut filters) => {
                filters.push(other);
                Self::All(filters)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Expand raw criteria into typed conditions
    ///
    /// The result contains no [`Filter::Criteria`] nodes. Unknown operators,
    /// non-array `$in` operands and invalid patterns are reported as
    /// `QueryFailed`.
    pub fn normalize(&self) -> Result<Filter, StoreError> {
        match self {
            Self::Criteria(criteria) => normalize_criteria(criteria),
            Self::Condition(condition) => {
                validate_condition(condition)?;
                Ok(Self::Condition(condition.clone()))
            }
            Self::All(filters) => filters
                .iter()
                .map(Filter::normalize)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::All),
            Self::Any(filters) => filters
                .iter()
                .map(Filter::normalize)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Any),
        }
    }
}

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::query_failed(StoreOperation::Find, message)
}

fn normalize_criteria(criteria: &Map<String, Value>) -> Result<Filter, StoreError> {
    let mut filters = Vec::with_capacity(criteria.len());

    for (key, value) in criteria {
        match key.as_str() {
            "$and" | "$or" => {
                let branches = value
                    .as_array()
                    .ok_or_else(|| invalid(format!("{} expects an array of criteria", key)))?;
                let branches = branches
                    .iter()
                    .map(|branch| {
                        branch
                            .as_object()
                            .ok_or_else(|| invalid(format!("{} branches must be objects", key)))
                            .and_then(normalize_criteria)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                filters.push(if key == "$and" {
                    Filter::All(branches)
                } else {
                    Filter::Any(branches)
                });
            }
            operator if operator.starts_with('$') => {
                return Err(invalid(format!("Unknown top-level operator '{}'", operator)));
            }
            field => filters.extend(normalize_field(field, value)?),
        }
    }

    Ok(Filter::All(filters))
}

fn normalize_field(field: &str, value: &Value) -> Result<Vec<Filter>, StoreError> {
    let operators = match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
        other => {
            return Ok(vec![Filter::Condition(FilterCondition::eq(field, other.clone()))]);
        }
    };

    let options = operators.get("$options").and_then(Value::as_str).unwrap_or("");
    let mut filters = Vec::with_capacity(operators.len());

    for (token, operand) in operators {
        if token == "$options" {
            continue;
        }
        let operator = FilterOperator::from_token(token)
            .ok_or_else(|| invalid(format!("Unknown operator '{}' on field '{}'", token, field)))?;

        let operand = if operator == FilterOperator::Matches {
            let pattern = operand
                .as_str()
                .ok_or_else(|| invalid(format!("$regex on '{}' expects a string", field)))?;
            if options.contains('i') && !pattern.starts_with("(?i)") {
                Value::String(format!("(?i){}", pattern))
            } else {
                Value::String(pattern.to_string())
            }
        } else {
            operand.clone()
        };

        let condition = FilterCondition::new(field, operator, operand);
        validate_condition(&condition)?;
        filters.push(Filter::Condition(condition));
    }

    Ok(filters)
}

fn validate_condition(condition: &FilterCondition) -> Result<(), StoreError> {
    match condition.operator {
        FilterOperator::In | FilterOperator::NotIn if !condition.value.is_array() => Err(invalid(
            format!("{} on '{}' expects an array", condition.operator, condition.field),
        )),
        FilterOperator::Exists if !condition.value.is_boolean() && !condition.value.is_number() => {
            Err(invalid(format!(
                "$exists on '{}' expects a boolean",
                condition.field
            )))
        }
        FilterOperator::Matches => {
            let pattern = condition.value.as_str().ok_or_else(|| {
                invalid(format!("$regex on '{}' expects a string", condition.field))
            })?;
            regex::Regex::new(pattern)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Field selection applied to returned documents
///
/// Inclusions keep only the named top-level fields (plus `_id`);
/// exclusions (`-field`) remove fields, including nested paths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Projection {
    /// Parse `"name code -description"` style selections
    ///
    /// Returns `None` when the selection names no fields.
    ///
    /// ```rust
    /// use open311_service::store::Projection;
    ///
    /// let projection = Projection::parse("name,code -_id").unwrap();
    /// assert_eq!(projection.included(), ["name", "code"]);
    /// assert_eq!(projection.excluded(), ["_id"]);
    /// assert!(Projection::parse("  ").is_none());
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let mut projection = Self::default();
        for token in input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            match token.strip_prefix('-') {
                Some(field) if !field.is_empty() => projection.exclude.push(field.to_string()),
                Some(_) => {}
                None => projection
                    .include
                    .push(token.trim_start_matches('+').to_string()),
            }
        }
        (!projection.include.is_empty() || !projection.exclude.is_empty()).then_some(projection)
    }

    /// Fields explicitly selected
    pub fn included(&self) -> &[String] {
        &self.include
    }

    /// Fields explicitly removed
    pub fn excluded(&self) -> &[String] {
        &self.exclude
    }

    /// Apply the selection to a document
    pub fn apply(&self, mut document: Document) -> Document {
        if !self.include.is_empty() {
            let mut selected = Document::new();
            if let Some(id) = document.remove(ID_FIELD) {
                selected.insert(ID_FIELD.to_string(), id);
            }
            for path in &self.include {
                let top = path.split('.').next().unwrap_or(path);
                if let Some(value) = document.remove(top) {
                    selected.insert(top.to_string(), value);
                }
            }
            document = selected;
        }

        for path in &self.exclude {
            remove_path(&mut document, path);
        }
        document
    }
}

fn remove_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = document.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

/// Options for a multi-document find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Restrict results to matching documents
    pub filter: Option<Filter>,
    /// Result ordering; natural (insertion) order when absent
    pub sort: Option<SortSpec>,
    /// Offset/limit window; all results when absent
    pub window: Option<Pagination>,
    /// Field selection
    pub projection: Option<Projection>,
}

impl FindOptions {
    /// Find everything in natural order
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter
    #[must_use]
    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    /// Set the ordering
    #[must_use]
    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    /// Set the window
    #[must_use]
    pub fn with_window(mut self, window: Pagination) -> Self {
        self.window = Some(window);
        self
    }

    /// Set the projection
    #[must_use]
    pub fn with_projection(mut self, projection: Option<Projection>) -> Self {
        self.projection = projection;
        self
    }
}

/// Constraints a collection enforces on write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSchema {
    /// Fields that must be present and non-empty
    pub required: Vec<String>,
    /// Fields whose values must be unique across the collection
    pub unique: Vec<String>,
}

impl CollectionSchema {
    /// Reject documents missing a required field
    pub fn check_required(
        &self,
        document: &Document,
        operation: StoreOperation,
    ) -> Result<(), StoreError> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|field| !super::document::is_present(super::document::lookup(document, field)))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::validation_failed(
                operation,
                format!("Missing required field(s): {}", missing.join(", ")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn criteria(value: Value) -> Filter {
        Filter::Criteria(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_sort_string_form() {
        let spec = SortSpec::parse("-createdAt  code,+name").unwrap();
        assert_eq!(
            spec.keys(),
            &[
                ("createdAt".to_string(), OrderDirection::Descending),
                ("code".to_string(), OrderDirection::Ascending),
                ("name".to_string(), OrderDirection::Ascending),
            ]
        );
    }

    #[test]
    fn test_sort_object_form() {
        let spec = SortSpec::parse(r#"{"weight": -1, "name": "asc"}"#).unwrap();
        assert_eq!(spec.keys().len(), 2);
        assert_eq!(spec.keys()[0], ("weight".to_string(), OrderDirection::Descending));
        assert_eq!(spec.keys()[1], ("name".to_string(), OrderDirection::Ascending));

        assert!(SortSpec::parse(r#"{"weight": 5}"#).is_err());
        assert!(SortSpec::parse("{not json").is_err());
    }

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(Pagination::new(0, 2).page_count(5), 3);
        assert_eq!(Pagination::new(4, 2).page_count(4), 2);
        assert_eq!(Pagination::new(0, 10).page_count(10), 1);
        assert_eq!(Pagination::default().limit, 10);
    }

    #[test]
    fn test_normalize_equality_and_operators() {
        let filter = criteria(json!({
            "status": "Open",
            "weight": { "$gte": 2, "$lt": 9 }
        }))
        .normalize()
        .unwrap();

        let Filter::All(children) = filter else {
            panic!("expected conjunction");
        };
        assert_eq!(children.len(), 3);
        assert!(children.contains(&Filter::Condition(FilterCondition::eq("status", "Open"))));
        assert!(children.contains(&Filter::Condition(FilterCondition::gte("weight", 2))));
        assert!(children.contains(&Filter::Condition(FilterCondition::lt("weight", 9))));
    }

    #[test]
    fn test_normalize_regex_options() {
        let filter = criteria(json!({ "name": { "$regex": "^water", "$options": "i" } }))
            .normalize()
            .unwrap();
        assert_eq!(
            filter,
            Filter::All(vec![Filter::Condition(FilterCondition::matches(
                "name",
                "(?i)^water"
            ))])
        );
    }

    #[test]
    fn test_normalize_or_branches() {
        let filter = criteria(json!({ "$or": [{ "code": "A" }, { "code": "B" }] }))
            .normalize()
            .unwrap();
        let Filter::All(children) = filter else {
            panic!("expected conjunction");
        };
        assert!(matches!(&children[0], Filter::Any(branches) if branches.len() == 2));
    }

    #[test]
    fn test_normalize_rejects_malformed_criteria() {
        assert!(criteria(json!({ "name": { "$near": 1 } })).normalize().is_err());
        assert!(criteria(json!({ "$where": "1" })).normalize().is_err());
        assert!(criteria(json!({ "code": { "$in": "A" } })).normalize().is_err());
        assert!(criteria(json!({ "code": { "$regex": "(" } })).normalize().is_err());
        assert!(criteria(json!({ "$or": "x" })).normalize().is_err());
    }

    #[test]
    fn test_embedded_object_is_equality() {
        let filter = criteria(json!({ "location": { "type": "Point" } }))
            .normalize()
            .unwrap();
        assert_eq!(
            filter,
            Filter::All(vec![Filter::Condition(FilterCondition::eq(
                "location",
                json!({ "type": "Point" })
            ))])
        );
    }

    #[test]
    fn test_and_flattens_conjunction() {
        let a = Filter::condition(FilterCondition::eq("a", 1));
        let b = Filter::condition(FilterCondition::eq("b", 2));
        let c = Filter::condition(FilterCondition::eq("c", 3));
        let combined = Filter::all(vec![a.clone()]).and(b.clone()).and(c.clone());
        assert_eq!(combined, Filter::All(vec![a, b, c]));
    }

    #[test]
    fn test_projection_include_keeps_id() {
        let projection = Projection::parse("name").unwrap();
        let doc = json!({ "_id": "1", "name": "Water", "code": "W" })
            .as_object()
            .cloned()
            .unwrap();
        let projected = projection.apply(doc);
        assert_eq!(Value::Object(projected), json!({ "_id": "1", "name": "Water" }));
    }

    #[test]
    fn test_projection_nested_exclusion() {
        let projection = Projection::parse("-reporter.phone -code").unwrap();
        let doc = json!({
            "_id": "1",
            "code": "W",
            "reporter": { "name": "Asha", "phone": "255" }
        })
        .as_object()
        .cloned()
        .unwrap();
        let projected = projection.apply(doc);
        assert_eq!(
            Value::Object(projected),
            json!({ "_id": "1", "reporter": { "name": "Asha" } })
        );
    }
}
