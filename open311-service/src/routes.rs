//! HTTP routes
//!
//! Every registered resource type is served under its plural key:
//!
//! | Method        | Path                  | Facade call |
//! |---------------|-----------------------|-------------|
//! | `GET`         | `/v1/{resource}`      | list/search |
//! | `GET`         | `/v1/{resource}/{id}` | show        |
//! | `PATCH`/`PUT` | `/v1/{resource}/{id}` | edit        |
//!
//! plus `/health` and `/ready` probes.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::{
    facade::{
        FacadeError, FacadeOperation, FacadeResult, LoadParams, QueryParams, ResourceQuery,
        ResultEnvelope,
    },
    health::{health, readiness},
    state::AppState,
    store::{Document, DocumentStore},
};

/// Build the application router over `state`
pub fn router<S: DocumentStore>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/{resource}", get(list_resources::<S>))
        .route(
            "/{resource}/{id}",
            get(show_resource::<S>)
                .patch(update_resource::<S>)
                .put(update_resource::<S>),
        );

    Router::new()
        .route("/health", get(health::<S>))
        .route("/ready", get(readiness::<S>))
        .nest("/v1", api)
        .with_state(state)
}

/// `GET /v1/{resource}`
async fn list_resources<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> FacadeResult<ResultEnvelope> {
    let facade = state.facade();
    let resource = facade.resource(&key)?;
    let Query(params) = params
        .map_err(|e| FacadeError::bad_request(e.body_text()).for_resource(resource.name()))?;
    let query = ResourceQuery::try_from(params).map_err(|e| e.for_resource(resource.name()))?;
    facade.list(resource, query).await
}

/// `GET /v1/{resource}/{id}`
async fn show_resource<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((key, id)): Path<(String, String)>,
    params: Result<Query<LoadParams>, QueryRejection>,
) -> FacadeResult<Json<Document>> {
    let facade = state.facade();
    let resource = facade
        .resource(&key)
        .map_err(|e| e.with_operation(FacadeOperation::Show))?;
    let Query(params) = params.map_err(|e| {
        FacadeError::bad_request(e.body_text())
            .with_operation(FacadeOperation::Show)
            .for_resource(resource.name())
    })?;
    let document = facade.show(resource, &id, &params.into()).await?;
    Ok(Json(document))
}

/// `PATCH|PUT /v1/{resource}/{id}`
async fn update_resource<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((key, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> FacadeResult<Json<Document>> {
    let facade = state.facade();
    let resource = facade
        .resource(&key)
        .map_err(|e| e.with_operation(FacadeOperation::Update))?;
    let rejected = |message: String| {
        FacadeError::bad_request(message)
            .with_operation(FacadeOperation::Update)
            .for_resource(resource.name())
            .with_id(id.as_str())
    };

    let Json(body) = body.map_err(|e| rejected(e.body_text()))?;
    let Value::Object(updates) = body else {
        return Err(rejected("Request body must be a JSON object".to_string()));
    };

    let document = facade.edit(resource, &id, updates).await?;
    Ok(Json(document))
}
