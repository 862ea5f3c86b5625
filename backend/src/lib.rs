pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod gpx_export;
pub mod interpolator;
pub mod models;
pub mod routes;
pub mod tracking;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    routing::get,
};
use chrono::NaiveDate;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::data::FleetStore;
use crate::error::TrackerError;
use crate::gpx_export::encode_route_as_gpx;
use crate::models::{
    ApiError, CargoItem, LocateQuery, LocateResponse, RouteGeometry, VesselPosition, VesselRow,
};
use crate::routes::{Route, RouteTable};
use crate::tracking::{fleet_positions, fleet_table};

#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub fleet: Arc<FleetStore>,
    pub inland_transit_days: u64,
    /// Date the positions are estimated for, [`local_today`] in production.
    pub today: fn() -> NaiveDate,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/vessels", get(vessels_handler))
        .route("/api/positions", get(positions_handler))
        .route("/api/routes", get(routes_handler))
        .route("/api/routes/:name", get(route_handler))
        .route("/api/locate", get(locate_handler))
        .route("/vessel/:vessel_id", get(contents_handler))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .with_state(state)
}

pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// GET /api/vessels - fleet overview table
async fn vessels_handler(State(state): State<AppState>) -> ApiResult<Vec<VesselRow>> {
    let fleet = state.fleet.snapshot().await.map_err(internal_error)?;
    Ok(Json(fleet_table(&fleet.vessels, state.inland_transit_days)))
}

/// GET /api/positions - estimated position of every vessel
async fn positions_handler(State(state): State<AppState>) -> ApiResult<Vec<VesselPosition>> {
    let fleet = state.fleet.snapshot().await.map_err(internal_error)?;
    let today = (state.today)();
    let positions = fleet_positions(&state.routes, &fleet.vessels, today);
    tracing::debug!("estimated {} vessel positions for {today}", positions.len());
    Ok(Json(positions))
}

/// GET /api/routes - every configured lane, without GPX
async fn routes_handler(State(state): State<AppState>) -> ApiResult<Vec<RouteGeometry>> {
    let geometries = state
        .routes
        .routes()
        .iter()
        .map(|route| geometry(route, None))
        .collect();
    Ok(Json(geometries))
}

/// GET /api/routes/:name - one lane with its GPX track
async fn route_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<RouteGeometry> {
    let route = state
        .routes
        .route(&name)
        .ok_or_else(|| not_found(format!("Route {name} not found")))?;
    let gpx_base64 = encode_route_as_gpx(route).map_err(internal_error)?;
    Ok(Json(geometry(route, Some(gpx_base64))))
}

/// GET /api/locate?origin=..&fraction=.. - position at a completion fraction
async fn locate_handler(
    State(state): State<AppState>,
    Query(query): Query<LocateQuery>,
) -> ApiResult<LocateResponse> {
    match state
        .routes
        .locate(&query.origin, query.fraction)
        .map_err(internal_error)?
    {
        Some((route, position)) => Ok(Json(LocateResponse {
            origin: query.origin,
            route: route.name().to_string(),
            fraction: query.fraction,
            position,
        })),
        None => Err(not_found(format!("No route from origin {}", query.origin))),
    }
}

/// GET /vessel/:vessel_id - cargo manifest, empty for unknown vessels
async fn contents_handler(
    State(state): State<AppState>,
    Path(vessel_id): Path<String>,
) -> ApiResult<Vec<CargoItem>> {
    let fleet = state.fleet.snapshot().await.map_err(internal_error)?;
    let contents = fleet.contents(&vessel_id).map_err(internal_error)?;
    Ok(Json(contents.to_vec()))
}

fn geometry(route: &Route, gpx_base64: Option<String>) -> RouteGeometry {
    RouteGeometry {
        name: route.name().to_string(),
        path: route.waypoints().to_vec(),
        distance_km: route.length_km(),
        gpx_base64,
    }
}

fn internal_error(err: impl Into<TrackerError>) -> (StatusCode, Json<ApiError>) {
    let err = err.into();
    tracing::error!("request failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}

fn not_found(message: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::NOT_FOUND, Json(ApiError { message }))
}
