use std::path::PathBuf;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use netarm_provider::{read_data_source, registry, run, Operation};
use netarm_reconciler::{destroy, reconcile, ReconcileReport, ReconcileRequest};
use netarm_schema::ResourceData;
use netarm_store::{ResourceAddress, ResourceState};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::state::AppState;

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ready(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.list().await?;
    Ok(StatusCode::OK)
}

// ── Schemas ───────────────────────────────────────────────────────────────────

pub async fn list_schemas() -> Json<Value> {
    Json(registry::schemas())
}

pub async fn get_schema(Path(type_name): Path<String>) -> Result<Json<Value>, ApiError> {
    let resource = registry::resource(&type_name).ok().map(|r| r.schema().describe());
    let data_source = registry::data_source(&type_name).ok().map(|d| d.schema().describe());
    if resource.is_none() && data_source.is_none() {
        return Err(ApiError::not_found(format!("unknown resource type {:?}", type_name)));
    }
    Ok(Json(json!({ "resource": resource, "data_source": data_source })))
}

// ── Resource lifecycle ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConfigBody {
    #[serde(default)]
    pub config: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct StateBody {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub id: String,
    pub config: Map<String, Value>,
    /// Attributes as last read; drives change detection.
    #[serde(default)]
    pub prior: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ImportBody {
    pub id: String,
}

pub async fn validate_resource(
    Path(type_name): Path<String>,
    Json(body): Json<ConfigBody>,
) -> Result<Json<Value>, ApiError> {
    let resource = registry::resource(&type_name)?;
    resource.check(&body.config)?;
    Ok(Json(json!({ "valid": true })))
}

pub async fn create_resource(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    Json(body): Json<ConfigBody>,
) -> Result<Json<ResourceData>, ApiError> {
    let resource = registry::resource(&type_name)?;
    resource.check(&body.config)?;
    let mut config = body.config;
    resource.schema().apply_defaults(&mut config);

    let mut data = ResourceData::new(config);
    run(resource.as_ref(), Operation::Create, &mut data, &state.meta).await?;
    Ok(Json(data))
}

/// A `null` ID in the response means the remote object is gone.
pub async fn read_resource(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    Json(body): Json<StateBody>,
) -> Result<Json<ResourceData>, ApiError> {
    let resource = registry::resource(&type_name)?;
    let mut data = ResourceData::new(body.attributes);
    data.set_id(body.id);
    run(resource.as_ref(), Operation::Read, &mut data, &state.meta).await?;
    Ok(Json(data))
}

pub async fn update_resource(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<ResourceData>, ApiError> {
    let resource = registry::resource(&type_name)?;
    resource.check(&body.config)?;
    let mut config = body.config;
    resource.schema().apply_defaults(&mut config);

    let mut data = ResourceData::new(config).with_prior(body.prior);
    data.set_id(body.id);
    run(resource.as_ref(), Operation::Update, &mut data, &state.meta).await?;
    Ok(Json(data))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    Json(body): Json<StateBody>,
) -> Result<StatusCode, ApiError> {
    let resource = registry::resource(&type_name)?;
    let mut data = ResourceData::new(body.attributes);
    data.set_id(body.id);
    run(resource.as_ref(), Operation::Delete, &mut data, &state.meta).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn import_resource(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    Json(body): Json<ImportBody>,
) -> Result<Json<ResourceData>, ApiError> {
    let resource = registry::resource(&type_name)?;
    let data = resource.import(&body.id, &state.meta).await?;
    Ok(Json(data))
}

pub async fn read_data(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    Json(body): Json<ConfigBody>,
) -> Result<Json<ResourceData>, ApiError> {
    let source = registry::data_source(&type_name)?;
    source.check(&body.config)?;
    let mut data = ResourceData::new(body.config);
    read_data_source(source.as_ref(), &mut data, &state.meta).await?;
    Ok(Json(data))
}

// ── Reconcile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReconcileBody {
    pub config_dir: PathBuf,
}

pub async fn post_plan(
    State(state): State<AppState>,
    Json(body): Json<ReconcileBody>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let req = ReconcileRequest { config_dir: body.config_dir, dry_run: true };
    let report = reconcile(req, state.store.as_ref(), &state.meta).await?;
    Ok(Json(report))
}

pub async fn post_apply(
    State(state): State<AppState>,
    Json(body): Json<ReconcileBody>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let req = ReconcileRequest { config_dir: body.config_dir, dry_run: false };
    let report = reconcile(req, state.store.as_ref(), &state.meta).await?;
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct DestroyBody {
    #[serde(default)]
    pub dry_run: bool,
}

pub async fn post_destroy(
    State(state): State<AppState>,
    Json(body): Json<DestroyBody>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let report = destroy(state.store.as_ref(), &state.meta, body.dry_run).await?;
    Ok(Json(report))
}

// ── State & events ────────────────────────────────────────────────────────────

pub async fn list_state(State(state): State<AppState>) -> Result<Json<Vec<ResourceState>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub address: Option<String>,
    pub limit: Option<u32>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(q): Query<EventsQuery>,
) -> Result<Json<Value>, ApiError> {
    let address = q.address.as_deref().map(str::parse::<ResourceAddress>).transpose()?;
    let events = state.store.list_events(address.as_ref(), q.limit.unwrap_or(100)).await?;
    Ok(Json(json!(events)))
}
