use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{self, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    geo::total_distance_km,
    interpolator::{interpolate, InterpolationError},
    models::Coordinate,
};

const BUILTIN_ROUTES: &str = include_str!("../data/routes.json");

#[derive(Debug, thiserror::Error)]
pub enum RouteConfigError {
    #[error("failed to read route file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid route definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("route `{route}` needs at least 2 waypoints, got {count}")]
    TooFewWaypoints { route: String, count: usize },
    #[error("route `{route}` repeats waypoint {index}")]
    RepeatedWaypoint { route: String, index: usize },
    #[error("route `{route}` has an out-of-range coordinate at index {index}")]
    InvalidCoordinate { route: String, index: usize },
    #[error("route `{0}` is defined more than once")]
    DuplicateRoute(String),
    #[error("origin `{origin}` maps to unknown route `{route}`")]
    UnknownRoute { origin: String, route: String },
    #[error("departure anchor for `{0}` is out of range")]
    InvalidAnchor(String),
}

/// On-disk layout of the route configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteFile {
    pub routes: Vec<RouteRecord>,
    /// Origin port -> route name.
    pub origins: HashMap<String, String>,
    /// Origin port -> literal port position shown before departure.
    #[serde(default)]
    pub departure_anchors: HashMap<String, (f64, f64)>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteRecord {
    pub name: String,
    /// `[lat, lon]` pairs in travel order.
    pub waypoints: Vec<(f64, f64)>,
}

/// A named polyline with at least two waypoints and no repeated neighbours.
#[derive(Clone, Debug)]
pub struct Route {
    name: String,
    waypoints: Vec<Coordinate>,
    length_km: f64,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        waypoints: Vec<Coordinate>,
    ) -> Result<Self, RouteConfigError> {
        let name = name.into();
        if waypoints.len() < 2 {
            return Err(RouteConfigError::TooFewWaypoints {
                route: name,
                count: waypoints.len(),
            });
        }
        if let Some(index) = waypoints.iter().position(|c| !c.is_valid()) {
            return Err(RouteConfigError::InvalidCoordinate { route: name, index });
        }
        if let Some(index) = waypoints.windows(2).position(|w| w[0] == w[1]) {
            return Err(RouteConfigError::RepeatedWaypoint {
                route: name,
                index: index + 1,
            });
        }

        let length_km = total_distance_km(&waypoints);
        Ok(Self {
            name,
            waypoints,
            length_km,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn waypoints(&self) -> &[Coordinate] {
        &self.waypoints
    }

    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    pub fn position_at(&self, fraction: f64) -> Result<Coordinate, InterpolationError> {
        interpolate(&self.waypoints, fraction)
    }
}

/// Read-only lookup tables built once at startup and shared between
/// request handlers.
#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
    origins: HashMap<String, String>,
    anchors: HashMap<String, Coordinate>,
}

impl RouteTable {
    /// The China to India lanes shipped with the service.
    pub fn builtin() -> Result<Self, RouteConfigError> {
        Self::from_reader(BUILTIN_ROUTES.as_bytes())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RouteConfigError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, RouteConfigError> {
        let route_file: RouteFile = serde_json::from_reader(reader)?;
        Self::from_route_file(route_file)
    }

    pub fn from_route_file(route_file: RouteFile) -> Result<Self, RouteConfigError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(route_file.routes.len());
        for record in route_file.routes {
            if !seen.insert(record.name.clone()) {
                return Err(RouteConfigError::DuplicateRoute(record.name));
            }
            let waypoints = record.waypoints.into_iter().map(Coordinate::from).collect();
            routes.push(Route::new(record.name, waypoints)?);
        }

        let mut origins = HashMap::with_capacity(route_file.origins.len());
        for (origin, route) in route_file.origins {
            if !seen.contains(&route) {
                return Err(RouteConfigError::UnknownRoute { origin, route });
            }
            origins.insert(normalize_origin(&origin), route);
        }

        let mut anchors = HashMap::with_capacity(route_file.departure_anchors.len());
        for (origin, point) in route_file.departure_anchors {
            let coord = Coordinate::from(point);
            if !coord.is_valid() {
                return Err(RouteConfigError::InvalidAnchor(origin));
            }
            anchors.insert(normalize_origin(&origin), coord);
        }

        tracing::debug!(
            routes = routes.len(),
            origins = origins.len(),
            anchors = anchors.len(),
            "route table loaded"
        );

        Ok(Self {
            routes,
            origins,
            anchors,
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    /// Route name for an origin port, matched case-insensitively.
    /// `None` means the origin is not served by any configured route.
    pub fn select_route(&self, origin: &str) -> Option<&str> {
        self.origins.get(&normalize_origin(origin)).map(String::as_str)
    }

    /// Where a vessel from `origin` is shown while it has not left port yet.
    pub fn departure_anchor(&self, origin: &str) -> Option<Coordinate> {
        self.anchors.get(&normalize_origin(origin)).copied()
    }

    /// `select_route` followed by interpolation along the selected route.
    pub fn locate(
        &self,
        origin: &str,
        fraction: f64,
    ) -> Result<Option<(&Route, Coordinate)>, InterpolationError> {
        let Some(route) = self.select_route(origin).and_then(|name| self.route(name)) else {
            return Ok(None);
        };
        let position = route.position_at(fraction)?;
        Ok(Some((route, position)))
    }
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::builtin().expect("builtin routes")
    }

    fn route_file(json: serde_json::Value) -> Result<RouteTable, RouteConfigError> {
        RouteTable::from_reader(json.to_string().as_bytes())
    }

    #[test]
    fn builtin_table_has_both_lanes() {
        let table = table();
        let names: Vec<_> = table.routes().iter().map(Route::name).collect();
        assert_eq!(names, ["orange", "blue"]);
        assert_eq!(table.route("orange").unwrap().waypoints().len(), 26);
        assert_eq!(table.route("blue").unwrap().waypoints().len(), 21);
    }

    #[test]
    fn builtin_lanes_end_near_mumbai() {
        let table = table();
        for route in table.routes() {
            let last = route.waypoints()[route.waypoints().len() - 1];
            assert!((last.lat - 18.95).abs() < 0.05, "{}: {last:?}", route.name());
            assert!((last.lon - 72.86).abs() < 0.05, "{}: {last:?}", route.name());
            assert!(route.length_km() > 5_000.0 && route.length_km() < 10_000.0);
        }
    }

    #[test]
    fn select_route_is_case_insensitive() {
        let table = table();
        assert_eq!(table.select_route("Ningbo"), Some("orange"));
        assert_eq!(table.select_route("SHENZHEN"), Some("blue"));
        assert_eq!(table.select_route(" shenzhen "), Some("blue"));
        assert_eq!(table.select_route("Mumbai"), None);
        assert_eq!(table.select_route(""), None);
    }

    #[test]
    fn departure_anchors_are_port_positions() {
        let table = table();
        assert_eq!(
            table.departure_anchor("NINGBO"),
            Some(Coordinate::new(30.051067, 121.717758))
        );
        assert_eq!(
            table.departure_anchor("Shenzhen"),
            Some(Coordinate::new(22.552016, 113.836183))
        );
        assert_eq!(table.departure_anchor("Mumbai"), None);
    }

    #[test]
    fn locate_combines_selection_and_interpolation() {
        let table = table();
        let (route, position) = table.locate("ningbo", 0.0).unwrap().unwrap();
        assert_eq!(route.name(), "orange");
        assert_eq!(position, route.waypoints()[0]);

        let (route, position) = table.locate("Shenzhen", 2.0).unwrap().unwrap();
        assert_eq!(route.name(), "blue");
        assert_eq!(position, route.waypoints()[route.waypoints().len() - 1]);

        assert!(table.locate("Mumbai", 0.5).unwrap().is_none());
    }

    #[test]
    fn builtin_lane_positions_are_stable() {
        let table = table();
        let orange = table.route("orange").unwrap();
        assert!((orange.length_km() - 8910.558739918413).abs() < 1e-6);
        let mid = orange.position_at(0.5).unwrap();
        assert!((mid.lat - 2.6447652142706586).abs() < 1e-9);
        assert!((mid.lon - 101.40030882816309).abs() < 1e-9);

        let blue = table.route("blue").unwrap();
        assert!((blue.length_km() - 7601.19256147873).abs() < 1e-6);
        let quarter = blue.position_at(0.25).unwrap();
        assert!((quarter.lat - 6.622336089338012).abs() < 1e-9);
        assert!((quarter.lon - 107.6600211617811).abs() < 1e-9);
    }

    #[test]
    fn rejects_single_waypoint_route() {
        let err = route_file(serde_json::json!({
            "routes": [{"name": "stub", "waypoints": [[1.0, 2.0]]}],
            "origins": {}
        }))
        .unwrap_err();
        assert!(matches!(err, RouteConfigError::TooFewWaypoints { count: 1, .. }));
    }

    #[test]
    fn rejects_repeated_waypoint() {
        let err = route_file(serde_json::json!({
            "routes": [{"name": "loop", "waypoints": [[1.0, 2.0], [1.0, 2.0], [3.0, 4.0]]}],
            "origins": {}
        }))
        .unwrap_err();
        assert!(matches!(err, RouteConfigError::RepeatedWaypoint { index: 1, .. }));
    }

    #[test]
    fn rejects_out_of_range_waypoint() {
        let err = route_file(serde_json::json!({
            "routes": [{"name": "bad", "waypoints": [[1.0, 2.0], [95.0, 4.0]]}],
            "origins": {}
        }))
        .unwrap_err();
        assert!(matches!(err, RouteConfigError::InvalidCoordinate { index: 1, .. }));
    }

    #[test]
    fn rejects_origin_for_missing_route() {
        let err = route_file(serde_json::json!({
            "routes": [{"name": "red", "waypoints": [[1.0, 2.0], [3.0, 4.0]]}],
            "origins": {"Kolkata": "green"}
        }))
        .unwrap_err();
        assert!(matches!(err, RouteConfigError::UnknownRoute { .. }));
    }

    #[test]
    fn rejects_duplicate_route_names() {
        let err = route_file(serde_json::json!({
            "routes": [
                {"name": "red", "waypoints": [[1.0, 2.0], [3.0, 4.0]]},
                {"name": "red", "waypoints": [[5.0, 6.0], [7.0, 8.0]]}
            ],
            "origins": {}
        }))
        .unwrap_err();
        assert!(matches!(err, RouteConfigError::DuplicateRoute(name) if name == "red"));
    }

    #[test]
    fn anchors_are_optional() {
        let table = route_file(serde_json::json!({
            "routes": [{"name": "red", "waypoints": [[1.0, 2.0], [3.0, 4.0]]}],
            "origins": {"Chennai": "red"}
        }))
        .unwrap();
        assert_eq!(table.select_route("chennai"), Some("red"));
        assert_eq!(table.departure_anchor("chennai"), None);
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        std::fs::write(&path, BUILTIN_ROUTES).unwrap();
        let table = RouteTable::from_file(&path).unwrap();
        assert_eq!(table.routes().len(), 2);

        let missing = RouteTable::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(RouteConfigError::Io(_))));
    }
}
