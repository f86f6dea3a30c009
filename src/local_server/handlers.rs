//! HTTP route handlers
//!
//! Implements the `/api/sensor-data` and `/api/analytics` endpoints. Each
//! handler locks the store for one query, then runs the analytics on the
//! owned readings after the lock is released.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::analytics::{
    self, calculator, comparison, health, ComparisonPreset, FuelMetrics, FuelPricing, HealthScore,
    PeriodComparison, StatsResult, TimeWindow,
};
use crate::error::AppError;
use crate::export::{self, ExportSheet};
use crate::models::{IngestPayload, SensorReading};
use crate::storage::{Database, StorageError};

/// Default page size of the paginated listing
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
/// Default number of points in a series
pub const DEFAULT_SERIES_LIMIT: i64 = 200;
/// Upper bound on points in a series
pub const MAX_SERIES_LIMIT: i64 = 1000;

/// Shared state
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub pricing: FuelPricing,
}

impl AppState {
    /// Run one store operation under the lock
    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, StorageError>,
    ) -> Result<T, AppError> {
        let db = self.db.lock().map_err(|_| StorageError::LockError)?;
        Ok(f(&db)?)
    }

    fn readings_in(&self, window: &TimeWindow) -> Result<Vec<SensorReading>, AppError> {
        self.with_db(|db| db.query_range(window))
    }
}

/// Raw query pairs in request order
///
/// A key given more than once resolves to its first occurrence.
#[derive(Debug, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Integer value, or `default` when absent or unparseable
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(default)
    }

    fn window(&self) -> TimeWindow {
        analytics::parse_window(self.get("start"), self.get("end"))
    }

    fn resolved(&self) -> analytics::ResolvedRange {
        analytics::resolve(self.get("range"), self.get("start"), self.get("end"), Utc::now())
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

/// Pagination block of the listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize)]
pub struct PaginatedReadings {
    pub data: Vec<SensorReading>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub data: Vec<SensorReading>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: usize,
    pub range: Option<TimeWindow>,
}

/// Period comparison with the health and fuel picture of the current period
#[derive(Debug, Serialize)]
pub struct ComparisonReport {
    #[serde(flatten)]
    pub comparison: PeriodComparison,
    pub health: Option<HealthScore>,
    pub fuel: Option<FuelMetrics>,
}

/// GET /api/health
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "message": "EMSys API is running",
            "timestamp": Utc::now(),
        })),
    )
}

/// POST /api/sensor-data
///
/// Validates and stores one reading; responds 201 with the stored row.
pub async fn create_reading(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<SensorReading>), AppError> {
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let reading = payload.validate()?;

    let saved = state.with_db(|db| db.insert_reading(&reading))?;
    tracing::debug!(id = saved.id, alert = saved.alert_status, "stored sensor reading");

    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/sensor-data
///
/// Newest first, `?page&limit&start&end`.
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<PaginatedReadings>, AppError> {
    let params = QueryParams::from(pairs);
    let page = params.int_or("page", 1).max(1) as usize;
    let limit = params.int_or("limit", DEFAULT_PAGE_LIMIT).max(1) as usize;
    let window = params.window();

    let result = state.with_db(|db| db.list_readings(&window, page, limit))?;
    let total_pages = result.total_pages(limit);

    Ok(Json(PaginatedReadings {
        data: result.readings,
        pagination: Pagination {
            page,
            limit,
            total: result.total,
            total_pages,
        },
    }))
}

/// GET /api/sensor-data/latest
pub async fn latest_reading(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SensorReading>, AppError> {
    state
        .with_db(|db| db.latest_reading())?
        .map(Json)
        .ok_or_else(|| AppError::not_found("No data available"))
}

/// GET /api/sensor-data/stats
///
/// `?range&start&end`; an empty window yields the zero result.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<StatsResult>, AppError> {
    let resolved = QueryParams::from(pairs).resolved();
    let readings = state.readings_in(&resolved.window)?;

    Ok(Json(calculator::aggregate(
        &readings,
        resolved.window,
        resolved.time_range,
    )))
}

/// GET /api/sensor-data/series
///
/// Oldest first, `?start&end&limit`.
pub async fn series(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SeriesResponse>, AppError> {
    let params = QueryParams::from(pairs);
    let limit = params
        .int_or("limit", DEFAULT_SERIES_LIMIT)
        .clamp(1, MAX_SERIES_LIMIT) as usize;
    let window = params.window();

    let data = state.with_db(|db| db.query_series(&window, Some(limit)))?;
    Ok(Json(SeriesResponse { data }))
}

/// GET /api/sensor-data/export
///
/// CSV attachment of the `data` (default), `summary` or `charts` sheet.
pub async fn export_readings(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let params = QueryParams::from(pairs);
    let sheet = match params.get("sheet") {
        None => ExportSheet::default(),
        Some(name) => ExportSheet::from_name(name)
            .ok_or_else(|| AppError::Validation(format!("Unknown sheet: {}", name)))?,
    };

    let readings = state.readings_in(&params.window())?;
    if readings.is_empty() {
        return Err(AppError::not_found("No data to export"));
    }

    let now = Utc::now();
    let body = export::render(sheet, &readings, now)
        .map_err(|e| AppError::internal(format!("Failed to export sensor data: {}", e)))?;
    let disposition = format!("attachment; filename=\"{}\"", export::export_filename(now));
    tracing::info!(rows = readings.len(), ?sheet, "exported sensor data");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// DELETE /api/sensor-data
///
/// `?start&end`; without bounds every reading is removed.
pub async fn delete_readings(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<DeleteResponse>, AppError> {
    let window = QueryParams::from(pairs).window();

    let deleted_count = state.with_db(|db| db.delete_readings(&window))?;
    tracing::info!(deleted_count, ?window, "deleted sensor data");

    Ok(Json(DeleteResponse {
        deleted_count,
        range: (!window.is_unbounded()).then_some(window),
    }))
}

/// GET /api/analytics/health
pub async fn analytics_health(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<HealthScore>, AppError> {
    let resolved = QueryParams::from(pairs).resolved();
    let readings = state.readings_in(&resolved.window)?;

    Ok(Json(health::score(&readings)?))
}

/// GET /api/analytics/fuel
///
/// `?range&start&end&price`; a positive `price` overrides the configured one.
pub async fn analytics_fuel(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<FuelMetrics>, AppError> {
    let params = QueryParams::from(pairs);
    let mut pricing = state.pricing;
    if let Some(price) = params
        .get("price")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0)
    {
        pricing.price_per_liter = price;
    }

    let resolved = params.resolved();
    let readings = state.readings_in(&resolved.window)?;

    Ok(Json(calculator::fuel_metrics(&readings, pricing)?))
}

/// GET /api/analytics/comparison
///
/// `?preset=today-yesterday|week-week|month-month`
pub async fn analytics_comparison(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ComparisonReport>, AppError> {
    let params = QueryParams::from(pairs);
    let preset = match params.get("preset") {
        Some(name) => ComparisonPreset::from_name(name).unwrap_or_else(|| {
            tracing::debug!(preset = name, "unknown comparison preset, using default");
            ComparisonPreset::default()
        }),
        None => ComparisonPreset::default(),
    };

    let windows = comparison::comparison_windows(preset, Utc::now());
    let (current, previous) = state.with_db(|db| {
        Ok((
            db.query_range(&windows.current)?,
            db.query_range(&windows.previous)?,
        ))
    })?;

    Ok(Json(ComparisonReport {
        comparison: comparison::compare_periods(preset, windows, &current, &previous),
        health: health::score(&current).ok(),
        fuel: calculator::fuel_metrics(&current, state.pricing).ok(),
    }))
}

