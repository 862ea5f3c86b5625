use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Linear interpolation in lat/lon space, `t = 0` is `self`.
    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// One row of the fleet overview table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselRow {
    pub vessel_name: String,
    pub start_date: NaiveDate,
    pub dest_date: NaiveDate,
    pub delhi_date: NaiveDate,
    pub vessel_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselPosition {
    pub vessel_id: String,
    pub vessel_name: String,
    pub initial_port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// `None` when the origin port has no configured route.
    pub current_position: Option<Coordinate>,
}

/// A manifest line. Keys match the column names the map page reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoItem {
    #[serde(rename = "Item Name")]
    pub item_name: String,
    #[serde(rename = "Quantity")]
    pub quantity: Quantity,
}

/// A manifest quantity cell, passed through as written: a number, free text
/// such as `"20 pallets"`, or an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Amount(f64),
    Text(String),
    #[default]
    Blank,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteGeometry {
    pub name: String,
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpx_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateResponse {
    pub origin: String,
    pub route: String,
    pub fraction: f64,
    pub position: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
