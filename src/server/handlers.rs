use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::HelperConfig;
use crate::error::RegionError;
use crate::helper::{HelperState, RefreshOutcome};
use crate::location::{Coordinate, LocationFix, LocationSource};
use crate::region::{regions_near, NearbyRegion, Region};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── GET /api/regions ────────────────────────────────────────────

pub async fn regions(State(state): State<Arc<AppState>>) -> Json<Vec<Region>> {
    Json(state.helper.store().regions())
}

// ─── GET /api/nearby ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Serialize)]
pub struct NearbyItem {
    pub id: u64,
    pub name: String,
    pub distance_miles: f64,
    pub oba_base_url: Option<String>,
}

impl From<NearbyRegion> for NearbyItem {
    fn from(n: NearbyRegion) -> Self {
        Self {
            distance_miles: (n.distance_miles() * 10.0).round() / 10.0,
            id: n.region.id,
            name: n.region.name,
            oba_base_url: n.region.oba_base_url,
        }
    }
}

#[derive(Serialize)]
pub struct NearbyResponse {
    pub lat: f64,
    pub lon: f64,
    pub radius_miles: f64,
    pub regions: Vec<NearbyItem>,
}

pub async fn nearby(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>, ApiError> {
    let start = Instant::now();

    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'lat' or 'lon' parameter"));
    };
    let location = Coordinate::new(lat, lon).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let config = match params.radius {
        Some(r) if !(r.is_finite() && r > 0.0) => {
            return Err(api_error(StatusCode::BAD_REQUEST, "'radius' must be a positive number of miles"));
        }
        Some(r) => HelperConfig {
            radius_miles: r,
            ..state.helper.config().clone()
        },
        None => state.helper.config().clone(),
    };

    let regions: Vec<NearbyItem> = regions_near(&state.helper.store().regions(), location, &config)
        .into_iter()
        .map(NearbyItem::from)
        .collect();

    debug!(
        location = %location,
        found = regions.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/nearby"
    );

    Ok(Json(NearbyResponse {
        lat,
        lon,
        radius_miles: config.radius_miles,
        regions,
    }))
}

// ─── GET /api/status ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub state: HelperState,
    pub location: Option<Coordinate>,
    pub current_region: Option<Region>,
    pub nearby: Vec<NearbyItem>,
    pub needs_region_selection: bool,
    pub region_count: usize,
    pub fetched_at: Option<DateTime<Utc>>,
}

fn status_of(state: &AppState) -> StatusResponse {
    let store = state.helper.store();
    StatusResponse {
        state: state.helper.state(),
        location: state.helper.last_location().map(|f| f.coordinate),
        current_region: store.current_region(),
        nearby: state.helper.nearby_regions().into_iter().map(NearbyItem::from).collect(),
        needs_region_selection: state.selection.is_needed(),
        region_count: store.regions().len(),
        fetched_at: store.fetched_at(),
    }
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(status_of(&state))
}

// ─── POST /api/location ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct LocationBody {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LocationBody>,
) -> Result<Json<StatusResponse>, ApiError> {
    let coordinate =
        Coordinate::new(body.lat, body.lon).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut fix = LocationFix::new(coordinate, LocationSource::Manual);
    fix.accuracy_m = body.accuracy_m;
    state.provider.update(fix);

    if state.helper.state() == HelperState::Steady {
        state.selection.clear();
    }
    Ok(Json(status_of(&state)))
}

// ─── POST /api/refresh ───────────────────────────────────────────

pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<RefreshOutcome>, ApiError> {
    let helper = Arc::clone(&state.helper);
    let result = tokio::task::spawn_blocking(move || helper.refresh_data())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match result {
        Ok(outcome) => {
            if state.helper.state() == HelperState::Steady {
                state.selection.clear();
            }
            Ok(Json(outcome))
        }
        Err(e @ RegionError::Store(_)) => {
            warn!(error = %e, "Refresh could not be saved");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => Err(api_error(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}
