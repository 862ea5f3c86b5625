use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::{Point, Rect, coord};
use gpx::{Gpx, GpxVersion, Metadata, Track, TrackSegment, Waypoint};

use crate::error::TrackerError;
use crate::models::Coordinate;
use crate::routes::Route;

/// Encode a sea lane as a GPX 1.1 document, base64 encoded.
///
/// The document metadata names the lane and carries its length and bounding
/// box; the single track holds every waypoint, numbered in travel order.
pub fn encode_route_as_gpx(route: &Route) -> Result<String, TrackerError> {
    let waypoints = route.waypoints();
    let summary = format!(
        "{} sea lane, {:.1} km over {} waypoints",
        route.name(),
        route.length_km(),
        waypoints.len()
    );

    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("vessel_tracker".into()),
        metadata: Some(Metadata {
            name: Some(route.name().into()),
            description: Some(summary.clone()),
            bounds: lane_bounds(waypoints),
            ..Default::default()
        }),
        tracks: vec![Track {
            name: Some(route.name().into()),
            description: Some(summary),
            type_: Some("sea lane".into()),
            segments: vec![lane_segment(route.name(), waypoints)],
            ..Default::default()
        }],
        ..Default::default()
    };

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn lane_segment(name: &str, waypoints: &[Coordinate]) -> TrackSegment {
    let mut segment = TrackSegment::new();
    let count = waypoints.len();
    segment
        .points
        .extend(waypoints.iter().enumerate().map(|(idx, coord)| {
            let mut point = Waypoint::new(Point::new(coord.lon, coord.lat));
            point.name = Some(format!("{name} {}/{count}", idx + 1));
            point
        }));
    segment
}

fn lane_bounds(waypoints: &[Coordinate]) -> Option<Rect<f64>> {
    let first = waypoints.first()?;
    let (mut min, mut max) = (*first, *first);
    for c in waypoints {
        min = Coordinate::new(min.lat.min(c.lat), min.lon.min(c.lon));
        max = Coordinate::new(max.lat.max(c.lat), max.lon.max(c.lon));
    }
    Some(Rect::new(
        coord! { x: min.lon, y: min.lat },
        coord! { x: max.lon, y: max.lat },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteTable;

    fn decode(route: &Route) -> Gpx {
        let encoded = encode_route_as_gpx(route).unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        gpx::read(decoded.as_slice()).unwrap()
    }

    #[test]
    fn blue_lane_track_follows_every_waypoint() {
        let table = RouteTable::builtin().unwrap();
        let blue = table.route("blue").unwrap();
        let gpx = decode(blue);

        assert_eq!(gpx.tracks.len(), 1);
        assert_eq!(gpx.tracks[0].name.as_deref(), Some("blue"));
        let points = &gpx.tracks[0].segments[0].points;
        assert_eq!(points.len(), blue.waypoints().len());

        // Shenzhen departure, then the Mumbai approach.
        assert!((points[0].point().y() - 22.552016).abs() < 1e-6);
        assert!((points[0].point().x() - 113.836183).abs() < 1e-6);
        let last = blue.waypoints()[blue.waypoints().len() - 1];
        assert!((points[points.len() - 1].point().y() - last.lat).abs() < 1e-6);
        assert!((points[points.len() - 1].point().x() - last.lon).abs() < 1e-6);
    }

    #[test]
    fn lane_metadata_describes_length_and_waypoints() {
        let table = RouteTable::builtin().unwrap();
        let orange = table.route("orange").unwrap();
        let gpx = decode(orange);

        let metadata = gpx.metadata.expect("metadata");
        assert_eq!(metadata.name.as_deref(), Some("orange"));
        let description = metadata.description.unwrap_or_default();
        assert!(description.contains("8910.6 km"), "{description}");
        assert!(description.contains("26 waypoints"), "{description}");

        // Orange runs from Ningbo (30.05 N, 121.7 E) down to Mumbai (72.9 E).
        let bounds = metadata.bounds.expect("bounds");
        assert!(bounds.max().y > 30.0 && bounds.min().y < 3.0);
        assert!(bounds.min().x < 73.0 && bounds.max().x > 121.0);

        let points = &gpx.tracks[0].segments[0].points;
        assert_eq!(points[0].name.as_deref(), Some("orange 1/26"));
        assert_eq!(points[25].name.as_deref(), Some("orange 26/26"));
    }
}
