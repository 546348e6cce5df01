//! # API REST
//!
//! REST API implementation for MedUX.
//!
//! Handles:
//! - HTTP endpoints with axum over the generic admin site
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, API key on writes)
//!
//! Uses `medux-core` for storage and the model registry.

#![warn(rust_2018_idioms)]

pub mod error;

use axum::{
    extract::{Path as AxumPath, Query, Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use fhir::Id;
use medux_core::config::{namespace_from_env_value, resolve_data_dir};
use medux_core::{AdminSite, CoreConfig, CoreResult, Store};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ErrorRes, FieldErrorRes};

/// Header carrying the API key on write requests.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Application state for the REST API server
///
/// Shared by every request handler: the startup configuration, the record store and the
/// admin site that maps model names onto stored types.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub store: Arc<Store>,
    pub site: Arc<AdminSite>,
}

impl AppState {
    /// Open the store under `cfg` and serve the models registered on `site`.
    pub fn new(cfg: Arc<CoreConfig>, site: AdminSite) -> CoreResult<Self> {
        let store = Store::open(cfg.clone())?;
        Ok(Self {
            cfg,
            store: Arc::new(store),
            site: Arc::new(site),
        })
    }
}

/// Resolve the core configuration from `MEDUX_DATA_DIR`, `MEDUX_NAMESPACE` and
/// `MEDUX_API_KEY`.
pub fn config_from_env() -> anyhow::Result<CoreConfig> {
    let data_dir = resolve_data_dir(std::env::var("MEDUX_DATA_DIR").ok());
    let namespace = namespace_from_env_value(std::env::var("MEDUX_NAMESPACE").ok())?;
    let api_key = std::env::var("MEDUX_API_KEY").ok();
    Ok(CoreConfig::new(data_dir, namespace, api_key)?)
}

#[derive(Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ModelsRes {
    pub models: Vec<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveParams {
    /// Literal reference, `Type/id` or an absolute URL under this server's base URL.
    pub reference: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_models,
        model_schema,
        list_records,
        create_record,
        get_record,
        update_record,
        delete_record,
        resolve,
    ),
    components(schemas(HealthRes, ModelsRes, ErrorRes, FieldErrorRes))
)]
pub struct ApiDoc;

/// Build the REST router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin", get(list_models))
        .route("/admin/:model", get(list_records).post(create_record))
        .route("/admin/:model/_schema", get(model_schema))
        .route(
            "/admin/:model/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/resolve", get(resolve))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the REST API until the server stops.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Reject write requests without the configured API key. Reads are open.
async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let is_read = matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    );
    if let (false, Some(expected)) = (is_read, state.cfg.api_key()) {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        match provided {
            None => return ApiError::Unauthorized("Missing x-api-key header").into_response(),
            Some(key) if key != expected => {
                return ApiError::Unauthorized("Invalid API key").into_response();
            }
            Some(_) => {}
        }
    }
    next.run(request).await
}

fn parse_id(id: &str) -> Result<Id, ApiError> {
    Id::new(id).map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "MedUX REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Registered model names", body = ModelsRes)
    )
)]
/// List the models registered on the admin site, in registration order.
#[axum::debug_handler]
async fn list_models(State(state): State<AppState>) -> Json<ModelsRes> {
    Json(ModelsRes {
        models: state
            .site
            .registered()
            .into_iter()
            .map(str::to_owned)
            .collect(),
    })
}

#[utoipa::path(
    get,
    path = "/admin/{model}/_schema",
    params(("model" = String, Path, description = "Model name, e.g. ValueSet")),
    responses(
        (status = 200, description = "Field descriptions", body = Object),
        (status = 404, description = "Unknown model", body = ErrorRes)
    )
)]
/// Describe the fields of a model: type, cardinality, length limit, choices and link
/// targets.
#[axum::debug_handler]
async fn model_schema(
    State(state): State<AppState>,
    AxumPath(model): AxumPath<String>,
) -> Result<Json<medux_core::ModelSchema>, ApiError> {
    Ok(Json(state.site.require(&model)?.schema()))
}

#[utoipa::path(
    get,
    path = "/admin/{model}",
    params(("model" = String, Path, description = "Model name, e.g. ValueSet")),
    responses(
        (status = 200, description = "Every record of the model, sorted by id", body = [Object]),
        (status = 404, description = "Unknown model", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List every record of a model.
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    AxumPath(model): AxumPath<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let admin = state.site.require(&model)?;
    Ok(Json(admin.list(&state.store)?))
}

#[utoipa::path(
    post,
    path = "/admin/{model}",
    params(("model" = String, Path, description = "Model name, e.g. ValueSet")),
    request_body = Object,
    responses(
        (status = 201, description = "Record created", body = Object),
        (status = 400, description = "Invalid record", body = ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 404, description = "Unknown model", body = ErrorRes),
        (status = 409, description = "Duplicate id or unique key", body = ErrorRes)
    )
)]
/// Create a record. A missing id is generated.
#[axum::debug_handler]
async fn create_record(
    State(state): State<AppState>,
    AxumPath(model): AxumPath<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let admin = state.site.require(&model)?;
    let created = admin.create(&state.store, body)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/admin/{model}/{id}",
    params(
        ("model" = String, Path, description = "Model name, e.g. ValueSet"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "The record", body = Object),
        (status = 404, description = "Unknown model or record", body = ErrorRes),
        (status = 500, description = "Stored record is unreadable", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_record(
    State(state): State<AppState>,
    AxumPath((model, id)): AxumPath<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let admin = state.site.require(&model)?;
    let id = parse_id(&id)?;
    Ok(Json(admin.get(&state.store, &id)?))
}

#[utoipa::path(
    put,
    path = "/admin/{model}/{id}",
    params(
        ("model" = String, Path, description = "Model name, e.g. ValueSet"),
        ("id" = String, Path, description = "Record id")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Record updated", body = Object),
        (status = 400, description = "Invalid record", body = ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 404, description = "Unknown model or record", body = ErrorRes),
        (status = 409, description = "Stale version or unique key clash", body = ErrorRes)
    )
)]
/// Replace a record. The version increments and `meta.created` is kept.
#[axum::debug_handler]
async fn update_record(
    State(state): State<AppState>,
    AxumPath((model, id)): AxumPath<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let admin = state.site.require(&model)?;
    let id = parse_id(&id)?;
    Ok(Json(admin.update(&state.store, &id, body)?))
}

#[utoipa::path(
    delete,
    path = "/admin/{model}/{id}",
    params(
        ("model" = String, Path, description = "Model name, e.g. ValueSet"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 404, description = "Unknown model or record", body = ErrorRes),
        (status = 409, description = "A protected link points at the record, or detaching would invalidate a referrer", body = ErrorRes)
    )
)]
/// Delete a record, applying the on-delete policy of every link pointing at it.
#[axum::debug_handler]
async fn delete_record(
    State(state): State<AppState>,
    AxumPath((model, id)): AxumPath<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let admin = state.site.require(&model)?;
    let id = parse_id(&id)?;
    let deleted = admin.delete(&state.store, &id)?;
    if deleted.len() > 1 {
        tracing::info!("delete of {}/{} cascaded to {} records", model, id, deleted.len() - 1);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/resolve",
    params(ResolveParams),
    responses(
        (status = 200, description = "The referenced record", body = Object),
        (status = 400, description = "Not a local reference", body = ErrorRes),
        (status = 404, description = "Unknown type or record", body = ErrorRes)
    )
)]
/// Dereference a literal reference to the stored record.
#[axum::debug_handler]
async fn resolve(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.store.resolve_literal(&params.reference)?))
}
