use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use utoipa::{OpenApi, ToSchema};

use crate::bulletin::{NormalizedMeasurement, StationRecord};
use crate::coordinates::StationLocation;
use crate::corpus::{AssemblyReport, StationFailure};
use crate::services::climate_service::{
    FilterOptions, HeatmapResponse, HeatmapRow, Metric, QueryError, RecordFilter, RecordQuery,
    StationMapEntry, TrendPoint, TrendQuery, TrendResponse,
};
use crate::services::ClimateService;
use crate::utils;

#[derive(Clone)]
pub struct AppState {
    pub climate_service: ClimateService,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub snapshot_loaded: bool,
    pub records: Option<usize>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    pub refreshed_at: DateTime<Utc>,
    pub report: AssemblyReport,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_stations,
        get_filters,
        get_records,
        get_records_csv,
        get_trends,
        get_heatmap,
        get_map,
        refresh
    ),
    components(schemas(
        HealthResponse,
        RefreshResponse,
        AssemblyReport,
        StationFailure,
        StationLocation,
        StationRecord,
        NormalizedMeasurement,
        FilterOptions,
        Metric,
        TrendPoint,
        TrendResponse,
        HeatmapRow,
        HeatmapResponse,
        StationMapEntry
    )),
    tags((name = "climate", description = "UK historic station climate data"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/stations", get(get_stations))
        .route("/filters", get(get_filters))
        .route("/records", get(get_records))
        .route("/records.csv", get(get_records_csv))
        .route("/trends", get(get_trends))
        .route("/heatmap/{station}", get(get_heatmap))
        .route("/map", get(get_map))
        .route("/refresh", post(refresh))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

fn query_error_status(e: &QueryError) -> StatusCode {
    match e {
        QueryError::InvalidStation(_) | QueryError::InvertedYearRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        QueryError::UnknownStation(_) => StatusCode::NOT_FOUND,
        QueryError::Export(_) | QueryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn snapshot_failed(e: QueryError) -> StatusCode {
    error!("Failed to load climate snapshot: {}", e);
    query_error_status(&e)
}

fn parse_filter(query: &RecordQuery) -> Result<RecordFilter, StatusCode> {
    RecordFilter::from_query(query).map_err(|e| {
        warn!("Rejected record query: {}", e);
        query_error_status(&e)
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "climate",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let snapshot = state.climate_service.peek().await;
    let response = HealthResponse {
        status: "healthy".to_string(),
        snapshot_loaded: snapshot.is_some(),
        records: snapshot.as_ref().map(|s| s.corpus.len()),
        refreshed_at: snapshot.as_ref().map(|s| s.refreshed_at),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/stations",
    tag = "climate",
    responses(
        (status = 200, description = "One location row per configured station", body = [StationLocation]),
        (status = 500, description = "Snapshot could not be assembled")
    )
)]
#[instrument(skip(state))]
async fn get_stations(State(state): State<AppState>) -> Result<Json<Vec<StationLocation>>, StatusCode> {
    let locations = state
        .climate_service
        .locations()
        .await
        .map_err(snapshot_failed)?;
    info!("Retrieved {} station locations", locations.len());
    Ok(Json(locations))
}

#[utoipa::path(
    get,
    path = "/api/v1/filters",
    tag = "climate",
    responses(
        (status = 200, description = "Stations and year bounds present in the corpus", body = FilterOptions),
        (status = 500, description = "Snapshot could not be assembled")
    )
)]
#[instrument(skip(state))]
async fn get_filters(State(state): State<AppState>) -> Result<Json<FilterOptions>, StatusCode> {
    let options = state
        .climate_service
        .filter_options()
        .await
        .map_err(snapshot_failed)?;
    Ok(Json(options))
}

#[utoipa::path(
    get,
    path = "/api/v1/records",
    tag = "climate",
    params(RecordQuery),
    responses(
        (status = 200, description = "Filtered station records", body = [StationRecord]),
        (status = 400, description = "Invalid station list or year range")
    )
)]
#[instrument(skip(state))]
async fn get_records(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<StationRecord>>, StatusCode> {
    let filter = parse_filter(&query)?;
    let records = state
        .climate_service
        .records(&filter)
        .await
        .map_err(snapshot_failed)?;
    info!("Retrieved {} records", records.len());
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/v1/records.csv",
    tag = "climate",
    params(RecordQuery),
    responses(
        (status = 200, description = "Filtered station records as CSV", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid station list or year range")
    )
)]
#[instrument(skip(state))]
async fn get_records_csv(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let filter = parse_filter(&query)?;
    let csv = state
        .climate_service
        .records_csv(&filter)
        .await
        .map_err(|e| {
            error!("Failed to render CSV export: {}", e);
            query_error_status(&e)
        })?;

    debug!("Rendered CSV export, size: {} bytes", csv.len());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"filtered_climate.csv\"",
            ),
        ],
        csv,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/trends",
    tag = "climate",
    params(TrendQuery),
    responses(
        (status = 200, description = "Annual mean per station", body = TrendResponse),
        (status = 400, description = "Invalid query")
    )
)]
#[instrument(skip(state))]
async fn get_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, StatusCode> {
    let filter = parse_filter(&query.record_query())?;
    let trend = state
        .climate_service
        .annual_trend(&filter, query.metric)
        .await
        .map_err(snapshot_failed)?;
    info!("Computed {} trend points for {:?}", trend.points.len(), query.metric);
    Ok(Json(trend))
}

#[utoipa::path(
    get,
    path = "/api/v1/heatmap/{station}",
    tag = "climate",
    params(("station" = String, Path, description = "Station ID"), RecordQuery),
    responses(
        (status = 200, description = "Monthly mean temperature grid", body = HeatmapResponse),
        (status = 400, description = "Invalid query"),
        (status = 404, description = "Station not in corpus")
    )
)]
#[instrument(skip(state), fields(station = %station))]
async fn get_heatmap(
    State(state): State<AppState>,
    Path(station): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<HeatmapResponse>, StatusCode> {
    let station = utils::normalize_station_id(&station).map_err(|e| {
        warn!("Rejected station {}: {}", station, e);
        StatusCode::BAD_REQUEST
    })?;
    let filter = parse_filter(&query)?;

    let heatmap = state
        .climate_service
        .monthly_heatmap(&filter, &station)
        .await
        .map_err(|e| {
            warn!("Heatmap unavailable: {}", e);
            query_error_status(&e)
        })?;

    info!("Built heatmap with {} years for {}", heatmap.rows.len(), station);
    Ok(Json(heatmap))
}

#[utoipa::path(
    get,
    path = "/api/v1/map",
    tag = "climate",
    params(RecordQuery),
    responses(
        (status = 200, description = "Station mean temperature with coordinates", body = [StationMapEntry]),
        (status = 400, description = "Invalid query")
    )
)]
#[instrument(skip(state))]
async fn get_map(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<StationMapEntry>>, StatusCode> {
    let filter = parse_filter(&query)?;
    let entries = state
        .climate_service
        .station_map(&filter)
        .await
        .map_err(snapshot_failed)?;
    Ok(Json(entries))
}

#[utoipa::path(
    post,
    path = "/api/v1/refresh",
    tag = "climate",
    responses(
        (status = 200, description = "Corpus reassembled", body = RefreshResponse),
        (status = 500, description = "Snapshot could not be assembled")
    )
)]
#[instrument(skip(state))]
async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, StatusCode> {
    info!("Manual refresh requested");
    let snapshot = state
        .climate_service
        .refresh()
        .await
        .map_err(snapshot_failed)?;
    Ok(Json(RefreshResponse {
        refreshed_at: snapshot.refreshed_at,
        report: snapshot.report.clone(),
    }))
}
