//! SurrealDB document store
//!
//! Supports runtime protocol selection via URL scheme:
//! - `ws://` / `wss://` - WebSocket connections
//! - `http://` / `https://` - HTTP connections
//! - `mem://` - In-memory database (for testing)
//!
//! Each collection maps to a schemaless table whose record id is the
//! document's `_id`. Filters are translated into SurrealQL with every
//! operand passed as a bound parameter; projections are applied after
//! the rows come back.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::document::{document_id, prepare_insert, prepare_save, Document};
use super::error::{StoreError, StoreErrorKind, StoreOperation};
use super::query::{
    CollectionSchema, Filter, FilterCondition, FilterOperator, FindOptions, OrderDirection,
    Projection, SortSpec,
};
use super::traits::{DocumentStore, StoreResult};
use crate::config::StoreConfig;

/// SurrealDB client type alias using the `Any` engine for runtime protocol selection
pub type SurrealClient = surrealdb::Surreal<surrealdb::engine::any::Any>;

/// Document store backed by SurrealDB
#[derive(Clone)]
pub struct SurrealStore {
    client: Arc<SurrealClient>,
}

impl std::fmt::Debug for SurrealStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealStore").finish_non_exhaustive()
    }
}

impl SurrealStore {
    /// Connect using the store configuration, retrying with exponential backoff
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let client = create_client_with_retries(config, config.max_retries).await?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Wrap an already connected client
    pub fn from_client(client: Arc<SurrealClient>) -> Self {
        Self { client }
    }

    async fn select(
        &self,
        statement: Statement,
        operation: StoreOperation,
    ) -> StoreResult<Vec<Document>> {
        let mut response = statement
            .bind_to(self.client.query(statement.sql.as_str()))
            .await
            .and_then(|response| response.check())
            .map_err(|e| StoreError::from(e).with_operation(operation))?;

        let rows: Vec<Value> = response
            .take(0)
            .map_err(|e| StoreError::from(e).with_operation(operation))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(document) => Some(document),
                _ => None,
            })
            .collect())
    }

    async fn execute(&self, statement: Statement, operation: StoreOperation) -> StoreResult<()> {
        statement
            .bind_to(self.client.query(statement.sql.as_str()))
            .await
            .and_then(|response| response.check())
            .map_err(|e| StoreError::from(e).with_operation(operation))?;
        Ok(())
    }
}

impl DocumentStore for SurrealStore {
    async fn define_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> StoreResult<()> {
        let sql = define_statements(collection, schema)
            .map_err(|e| e.with_operation(StoreOperation::Define))?;
        self.execute(Statement::new(sql), StoreOperation::Define)
            .await
            .map_err(|e| e.in_collection(collection))?;
        tracing::debug!(collection, "SurrealDB table defined");
        Ok(())
    }

    async fn find(&self, collection: &str, options: &FindOptions) -> StoreResult<Vec<Document>> {
        let statement = select_statement(collection, options)
            .map_err(|e| e.with_operation(StoreOperation::Find).in_collection(collection))?;
        let rows = self
            .select(statement, StoreOperation::Find)
            .await
            .map_err(|e| e.in_collection(collection))?;

        Ok(match &options.projection {
            Some(projection) => rows.into_iter().map(|d| projection.apply(d)).collect(),
            None => rows,
        })
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct CountRow {
            total: u64,
        }

        let statement = count_statement(collection, filter)
            .map_err(|e| e.with_operation(StoreOperation::Count).in_collection(collection))?;

        let mut response = statement
            .bind_to(self.client.query(statement.sql.as_str()))
            .await
            .and_then(|response| response.check())
            .map_err(|e| {
                StoreError::from(e)
                    .with_operation(StoreOperation::Count)
                    .in_collection(collection)
            })?;

        let rows: Vec<CountRow> = response.take(0).map_err(|e| {
            StoreError::from(e)
                .with_operation(StoreOperation::Count)
                .in_collection(collection)
        })?;

        Ok(rows.first().map_or(0, |row| row.total))
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        projection: Option<&Projection>,
    ) -> StoreResult<Option<Document>> {
        let statement = Statement::new("SELECT * OMIT id FROM type::thing($tb, $id)")
            .bind("tb", collection)
            .bind("id", id);
        let found = self
            .select(statement, StoreOperation::FindById)
            .await
            .map_err(|e| e.in_collection(collection).for_document(id))?
            .into_iter()
            .next();

        Ok(match (found, projection) {
            (Some(doc), Some(projection)) => Some(projection.apply(doc)),
            (found, _) => found,
        })
    }

    async fn insert(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let document = prepare_insert(document);
        let id = document_id(&document).unwrap_or_default().to_string();

        let statement = Statement::new("CREATE type::thing($tb, $id) CONTENT $doc RETURN NONE")
            .bind("tb", collection)
            .bind("id", id.as_str())
            .bind("doc", Value::Object(document.clone()));
        self.execute(statement, StoreOperation::Insert)
            .await
            .map_err(|e| e.in_collection(collection).for_document(id))?;

        Ok(document)
    }

    async fn save(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let id = document_id(&document)
            .ok_or_else(|| {
                StoreError::validation_failed(StoreOperation::Save, "Document has no _id")
                    .in_collection(collection)
            })?
            .to_string();

        let stored = self
            .find_by_id(collection, &id, None)
            .await
            .map_err(|e| e.with_operation(StoreOperation::Save))?
            .ok_or_else(|| {
                StoreError::not_found(collection, id.as_str()).with_operation(StoreOperation::Save)
            })?;

        let document = prepare_save(document, &stored);
        let statement = Statement::new("UPDATE type::thing($tb, $id) CONTENT $doc RETURN NONE")
            .bind("tb", collection)
            .bind("id", id.as_str())
            .bind("doc", Value::Object(document.clone()));
        self.execute(statement, StoreOperation::Save)
            .await
            .map_err(|e| e.in_collection(collection).for_document(id))?;

        Ok(document)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .health()
            .await
            .map_err(|e| StoreError::from(e).with_operation(StoreOperation::Ping))
    }
}

/// A SurrealQL statement plus its bound parameters
#[derive(Debug, Clone, PartialEq)]
struct Statement {
    sql: String,
    params: Vec<(String, Value)>,
}

impl Statement {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    fn bind_to<'r, C: surrealdb::Connection>(
        &self,
        mut query: surrealdb::method::Query<'r, C>,
    ) -> surrealdb::method::Query<'r, C> {
        for (name, value) in &self.params {
            query = query.bind((name.clone(), value.clone()));
        }
        query
    }
}

/// Accumulates bound operands while a filter is translated
#[derive(Default)]
struct Translator {
    params: Vec<(String, Value)>,
}

impl Translator {
    fn param(&mut self, value: Value) -> String {
        let name = format!("p{}", self.params.len());
        self.params.push((name.clone(), value));
        format!("${}", name)
    }

    fn filter(&mut self, filter: &Filter) -> StoreResult<String> {
        Ok(match filter {
            Filter::Criteria(_) => self.filter(&filter.normalize()?)?,
            Filter::Condition(condition) => self.condition(condition)?,
            Filter::All(children) if children.is_empty() => "true".to_string(),
            Filter::Any(children) if children.is_empty() => "false".to_string(),
            Filter::All(children) => self.join(children, " AND ")?,
            Filter::Any(children) => self.join(children, " OR ")?,
        })
    }

    fn join(&mut self, children: &[Filter], separator: &str) -> StoreResult<String> {
        let parts = children
            .iter()
            .map(|child| self.filter(child))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(format!("({})", parts.join(separator)))
    }

    fn condition(&mut self, condition: &FilterCondition) -> StoreResult<String> {
        let field = field_path(&condition.field)?;

        if condition.operator == FilterOperator::Exists {
            let wanted = condition
                .value
                .as_bool()
                .unwrap_or_else(|| condition.value.as_i64() != Some(0));
            return Ok(if wanted {
                format!("{} != NONE", field)
            } else {
                format!("{} = NONE", field)
            });
        }

        let operand = self.param(condition.value.clone());
        let equal = |field: &str, operand: &str| {
            format!(
                "({field} = {operand} OR (type::is::array({field}) AND {field} CONTAINS {operand}))"
            )
        };
        let member = |field: &str, operand: &str| {
            format!(
                "({field} IN {operand} OR \
                 (type::is::array({field}) AND {field} CONTAINSANY {operand}))"
            )
        };

        Ok(match condition.operator {
            FilterOperator::Equal => equal(&field, &operand),
            FilterOperator::NotEqual => format!("!{}", equal(&field, &operand)),
            FilterOperator::GreaterThan => format!("{} > {}", field, operand),
            FilterOperator::GreaterThanOrEqual => format!("{} >= {}", field, operand),
            FilterOperator::LessThan => format!("{} < {}", field, operand),
            FilterOperator::LessThanOrEqual => format!("{} <= {}", field, operand),
            FilterOperator::In => member(&field, &operand),
            FilterOperator::NotIn => format!("!{}", member(&field, &operand)),
            FilterOperator::Matches => {
                format!("string::matches(<string> ({} ?? ''), {})", field, operand)
            }
            FilterOperator::Exists => unreachable!("handled above"),
        })
    }
}

/// Check that a name can be spliced into SurrealQL as an identifier
fn identifier(name: &str) -> StoreResult<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::query_failed(
            StoreOperation::Find,
            format!("Invalid identifier '{}'", name),
        ))
    }
}

/// Render a dotted document path as a SurrealQL idiom
///
/// `reporter.phone` becomes `` `reporter`.`phone` `` and numeric segments
/// become array indexes (`attachments.0` becomes `` `attachments`[0] ``).
fn field_path(path: &str) -> StoreResult<String> {
    let mut rendered = String::new();
    for (position, segment) in path.split('.').enumerate() {
        if segment.is_empty() || segment.contains('`') {
            return Err(StoreError::query_failed(
                StoreOperation::Find,
                format!("Invalid field path '{}'", path),
            ));
        }
        if position > 0 && segment.chars().all(|c| c.is_ascii_digit()) {
            rendered.push_str(&format!("[{}]", segment));
        } else {
            if position > 0 {
                rendered.push('.');
            }
            rendered.push_str(&format!("`{}`", segment));
        }
    }
    Ok(rendered)
}

fn order_clause(sort: &SortSpec) -> StoreResult<String> {
    let keys = sort
        .keys()
        .iter()
        .map(|(field, direction)| {
            let direction = match direction {
                OrderDirection::Ascending => "ASC",
                OrderDirection::Descending => "DESC",
            };
            field_path(field).map(|field| format!("{} {}", field, direction))
        })
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(format!(" ORDER BY {}", keys.join(", ")))
}

fn select_statement(collection: &str, options: &FindOptions) -> StoreResult<Statement> {
    let mut translator = Translator::default();
    let mut sql = String::from("SELECT * OMIT id FROM type::table($tb)");

    if let Some(filter) = &options.filter {
        sql.push_str(" WHERE ");
        sql.push_str(&translator.filter(filter)?);
    }
    if let Some(sort) = options.sort.as_ref().filter(|s| !s.is_empty()) {
        sql.push_str(&order_clause(sort)?);
    }
    if let Some(window) = options.window {
        sql.push_str(" LIMIT $limit START $start");
        translator.params.push(("limit".to_string(), Value::from(window.limit)));
        translator.params.push(("start".to_string(), Value::from(window.offset)));
    }

    let mut statement = Statement::new(sql).bind("tb", collection);
    statement.params.extend(translator.params);
    Ok(statement)
}

fn count_statement(collection: &str, filter: Option<&Filter>) -> StoreResult<Statement> {
    let mut translator = Translator::default();
    let mut sql = String::from("SELECT count() AS total FROM type::table($tb)");
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(&translator.filter(filter)?);
    }
    sql.push_str(" GROUP ALL");

    let mut statement = Statement::new(sql).bind("tb", collection);
    statement.params.extend(translator.params);
    Ok(statement)
}

fn define_statements(collection: &str, schema: &CollectionSchema) -> StoreResult<String> {
    let table = identifier(collection)?;
    let mut sql = format!("DEFINE TABLE IF NOT EXISTS {} SCHEMALESS;", table);

    for field in &schema.required {
        sql.push_str(&format!(
            " DEFINE FIELD OVERWRITE {} ON {} \
             ASSERT $value != NONE AND $value != NULL AND $value != '';",
            field_path(field)?,
            table
        ));
    }
    for field in &schema.unique {
        let index = format!("{}_{}_unique", table, field.replace('.', "_"));
        sql.push_str(&format!(
            " DEFINE INDEX OVERWRITE {} ON {} FIELDS {} UNIQUE;",
            identifier(&index)?,
            table,
            field_path(field)?
        ));
    }
    Ok(sql)
}

/// Create a SurrealDB client with configurable retries
///
/// Uses exponential backoff strategy for retries
async fn create_client_with_retries(
    config: &StoreConfig,
    max_retries: u32,
) -> StoreResult<SurrealClient> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_client(config).await {
            Ok(client) => {
                if attempt > 0 {
                    tracing::info!(
                        "SurrealDB connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "SurrealDB connected: url={}, ns={}, db={}",
                        sanitize_connection_url(&config.url),
                        config.namespace,
                        config.database
                    );
                }
                return Ok(client);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to SurrealDB after {} attempts: {}",
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = retry_delay(base_delay, attempt);
                tracing::warn!(
                    "SurrealDB connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Backoff before retry number `attempt` (1-based): `base * 2^(attempt - 1)`, saturating
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Attempt to create a SurrealDB client (single try)
async fn try_create_client(config: &StoreConfig) -> StoreResult<SurrealClient> {
    let url_safe = sanitize_connection_url(&config.url);
    tracing::debug!("Connecting to SurrealDB: {}", url_safe);

    let client = surrealdb::engine::any::connect(config.url.as_str())
        .await
        .map_err(|e| {
            connect_error(format!("Failed to connect to SurrealDB at '{}'", url_safe), &e)
        })?;

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client
            .signin(surrealdb::opt::auth::Root {
                username,
                password,
            })
            .await
            .map_err(|e| {
                connect_error(
                    format!("Failed to authenticate with SurrealDB at '{}'", url_safe),
                    &e,
                )
            })?;
    }

    client
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| {
            connect_error(
                format!(
                    "Failed to select namespace '{}' / database '{}' on SurrealDB at '{}'",
                    config.namespace, config.database, url_safe
                ),
                &e,
            )
        })?;

    Ok(client)
}

fn connect_error(context: String, err: &surrealdb::Error) -> StoreError {
    StoreError::new(
        StoreOperation::Connect,
        StoreErrorKind::ConnectionFailed,
        format!("{}: {} ({})", context, categorize_surrealdb_error(err), err),
    )
}

/// Sanitize connection URL for safe logging (remove credentials if present)
pub fn sanitize_connection_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..=scheme_end + 2];
            let after_at = &url[at_pos..];
            return format!("{}***{}", scheme, after_at);
        }
    }
    url.to_string()
}

/// Categorize SurrealDB connection errors for operator guidance
fn categorize_surrealdb_error(err: &surrealdb::Error) -> &'static str {
    let err_str = err.to_string().to_lowercase();

    if err_str.contains("auth") || err_str.contains("credentials") || err_str.contains("signin") {
        "authentication error, check credentials"
    } else if err_str.contains("connect")
        || err_str.contains("network")
        || err_str.contains("dns")
        || err_str.contains("refused")
    {
        "network connection error, check connectivity"
    } else if err_str.contains("permission") || err_str.contains("denied") {
        "permission error, check database permissions"
    } else if err_str.contains("timeout") {
        "connection timeout"
    } else {
        "connection error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::CREATED_AT_FIELD;
    use crate::store::query::Pagination;
    use serde_json::json;

    fn mem_config() -> StoreConfig {
        StoreConfig {
            url: "mem://".to_string(),
            namespace: "test".to_string(),
            database: "test".to_string(),
            username: None,
            password: None,
            max_retries: 0,
            retry_delay_secs: 1,
        }
    }

    #[test]
    fn test_sanitize_connection_url() {
        assert_eq!(sanitize_connection_url("mem://"), "mem://");
        let sanitized = sanitize_connection_url("ws://user:pass@localhost:8000");
        assert!(sanitized.contains("***"));
        assert!(sanitized.contains("localhost:8000"));
        assert!(!sanitized.contains("pass"));
    }

    #[test]
    fn test_retry_delay_doubles_and_saturates() {
        let base = Duration::from_secs(2);
        assert_eq!(retry_delay(base, 1), Duration::from_secs(2));
        assert_eq!(retry_delay(base, 3), Duration::from_secs(8));
        assert_eq!(retry_delay(base, 40), Duration::from_secs(2 * u64::from(u32::MAX)));
        assert_eq!(retry_delay(Duration::from_secs(u64::MAX), 2), Duration::MAX);
    }

    #[test]
    fn test_field_path_rendering() {
        assert_eq!(field_path("name").unwrap(), "`name`");
        assert_eq!(field_path("reporter.phone").unwrap(), "`reporter`.`phone`");
        assert_eq!(field_path("attachments.0.name").unwrap(), "`attachments`[0].`name`");
        assert!(field_path("bad`name").is_err());
        assert!(field_path("a..b").is_err());
    }

    #[test]
    fn test_select_statement_binds_every_operand() {
        let filter = Filter::any(vec![
            Filter::condition(FilterCondition::matches("code", "(?i)leak$")),
            Filter::condition(FilterCondition::matches("description", "(?i)leak$")),
        ])
        .and(Filter::condition(FilterCondition::gte("weight", 2)));
        let options = FindOptions::new()
            .with_filter(Some(filter))
            .with_sort(Some(SortSpec::parse("-createdAt").unwrap()))
            .with_window(Pagination::new(4, 2));

        let statement = select_statement("servicerequests", &options).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * OMIT id FROM type::table($tb) WHERE \
             ((string::matches(<string> (`code` ?? ''), $p0) OR \
             string::matches(<string> (`description` ?? ''), $p1)) AND `weight` >= $p2) \
             ORDER BY `createdAt` DESC LIMIT $limit START $start"
        );
        let names: Vec<&str> = statement.params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["tb", "p0", "p1", "p2", "limit", "start"]);
        assert!(statement.params.contains(&("start".to_string(), json!(4))));
    }

    #[test]
    fn test_exists_binds_nothing() {
        let filter = Filter::Criteria(doc(json!({ "color": { "$exists": true } })));
        let statement = count_statement("statuses", Some(&filter)).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT count() AS total FROM type::table($tb) WHERE (`color` != NONE) GROUP ALL"
        );
        assert_eq!(statement.params.len(), 1);
    }

    #[test]
    fn test_malformed_criteria_rejected_before_query() {
        let filter = Filter::Criteria(doc(json!({ "code": { "$near": 1 } })));
        let err = count_statement("statuses", Some(&filter)).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::QueryFailed);
    }

    #[test]
    fn test_define_statements() {
        let schema = CollectionSchema {
            required: vec!["name".to_string()],
            unique: vec!["code".to_string()],
        };
        let sql = define_statements("jurisdictions", &schema).unwrap();
        assert!(sql.starts_with("DEFINE TABLE IF NOT EXISTS jurisdictions SCHEMALESS;"));
        assert!(sql.contains("DEFINE FIELD OVERWRITE `name` ON jurisdictions ASSERT"));
        let index = "DEFINE INDEX OVERWRITE jurisdictions_code_unique ON jurisdictions \
                     FIELDS `code` UNIQUE;";
        assert!(sql.contains(index));

        assert!(define_statements("bad-name", &schema).is_err());
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> SurrealStore {
        let store = SurrealStore::connect(&mem_config()).await.unwrap();
        let schema = CollectionSchema {
            required: vec!["description".to_string()],
            unique: vec!["code".to_string()],
        };
        store.define_collection("servicerequests", &schema).await.unwrap();

        let requests = [
            ("r1", "HQ0001", "Water pipe leak", 3),
            ("r2", "HQ0002", "Pipe leaking near the school", 1),
            ("r3", "HQ0003", "Roof LEAK", 2),
        ];
        for (id, code, description, weight) in requests {
            store
                .insert(
                    "servicerequests",
                    doc(json!({
                        "_id": id,
                        "code": code,
                        "description": description,
                        "weight": weight,
                        "status": "Open"
                    })),
                )
                .await
                .unwrap();
        }
        store
    }

    fn ids(documents: &[Document]) -> Vec<&str> {
        documents.iter().filter_map(document_id).collect()
    }

    #[tokio::test]
    async fn test_find_sorts_and_windows() {
        let store = seeded().await;
        let options = FindOptions::new()
            .with_sort(Some(SortSpec::parse("-weight").unwrap()))
            .with_window(Pagination::new(0, 2));
        let found = store.find("servicerequests", &options).await.unwrap();
        assert_eq!(ids(&found), vec!["r1", "r3"]);

        let options = options.with_window(Pagination::new(2, 2));
        let found = store.find("servicerequests", &options).await.unwrap();
        assert_eq!(ids(&found), vec!["r2"]);
    }

    #[tokio::test]
    async fn test_find_and_count_with_suffix_filter() {
        let store = seeded().await;
        let filter = Filter::any(vec![Filter::condition(FilterCondition::matches(
            "description",
            "(?i)leak$",
        ))]);

        let options = FindOptions::new()
            .with_filter(Some(filter.clone()))
            .with_sort(Some(SortSpec::parse("code").unwrap()));
        let found = store.find("servicerequests", &options).await.unwrap();
        assert_eq!(ids(&found), vec!["r1", "r3"]);

        assert_eq!(store.count("servicerequests", Some(&filter)).await.unwrap(), 2);
        assert_eq!(store.count("servicerequests", None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_table_is_empty() {
        let store = SurrealStore::connect(&mem_config()).await.unwrap();
        assert_eq!(store.count("changelogs", None).await.unwrap(), 0);
        let found = store.find("changelogs", &FindOptions::new()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_id_with_projection() {
        let store = seeded().await;
        let found = store.find_by_id("servicerequests", "r2", None).await.unwrap().unwrap();
        assert_eq!(found["code"], "HQ0002");
        assert!(found.contains_key(CREATED_AT_FIELD));

        let projection = Projection::parse("code").unwrap();
        let found = store
            .find_by_id("servicerequests", "r2", Some(&projection))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["_id"], "r2");
        assert!(!found.contains_key("description"));

        let missing = store.find_by_id("servicerequests", "nope", None).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_save_preserves_created_at() {
        let store = seeded().await;
        let mut stored = store.find_by_id("servicerequests", "r1", None).await.unwrap().unwrap();
        let created = stored[CREATED_AT_FIELD].clone();

        stored.insert("status".to_string(), json!("Closed"));
        stored.insert(CREATED_AT_FIELD.to_string(), json!("1970-01-01T00:00:00Z"));
        store.save("servicerequests", stored).await.unwrap();

        let reloaded = store.find_by_id("servicerequests", "r1", None).await.unwrap().unwrap();
        assert_eq!(reloaded["status"], "Closed");
        assert_eq!(reloaded[CREATED_AT_FIELD], created);
    }

    #[tokio::test]
    async fn test_duplicate_unique_field_is_constraint_violation() {
        let store = seeded().await;
        let err = store
            .insert(
                "servicerequests",
                doc(json!({ "code": "HQ0001", "description": "Another leak" })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ConstraintViolation);
        assert_eq!(err.operation, StoreOperation::Insert);
        assert_eq!(store.count("servicerequests", None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_validation_failure() {
        let store = seeded().await;
        let err = store
            .insert("servicerequests", doc(json!({ "code": "HQ0009" })))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_rejected_save_leaves_row_unchanged() {
        let store = seeded().await;
        let mut stored = store.find_by_id("servicerequests", "r1", None).await.unwrap().unwrap();
        stored.insert("description".to_string(), serde_json::Value::Null);

        let err = store.save("servicerequests", stored).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ValidationFailed);
        assert_eq!(err.document_id.as_deref(), Some("r1"));

        let reloaded = store.find_by_id("servicerequests", "r1", None).await.unwrap().unwrap();
        assert_eq!(reloaded["description"], "Water pipe leak");
    }

    #[tokio::test]
    async fn test_save_unknown_id_is_not_found() {
        let store = seeded().await;
        let err = store
            .save("servicerequests", doc(json!({ "_id": "nope", "description": "x" })))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert_eq!(err.operation, StoreOperation::Save);
    }

    #[tokio::test]
    async fn test_mem_connection() {
        let store = SurrealStore::connect(&mem_config()).await;
        assert!(store.is_ok(), "Failed to connect to in-memory SurrealDB: {:?}", store.err());
        assert!(store.unwrap().ping().await.is_ok());
    }
}
