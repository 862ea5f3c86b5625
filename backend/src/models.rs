use serde::{Deserialize, Serialize};

pub use shared::{
    ApiError, CargoItem, Coordinate, LocateResponse, Quantity, RouteGeometry, VesselPosition,
    VesselRow,
};

/// Query of `GET /api/locate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LocateQuery {
    pub origin: String,
    pub fraction: f64,
}
