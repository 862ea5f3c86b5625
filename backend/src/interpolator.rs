use crate::{
    geo::{haversine_km, total_distance_km},
    models::Coordinate,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("route has no waypoints")]
    EmptyRoute,
}

/// Estimate the position reached after covering `fraction` of the route's
/// great-circle length.
///
/// # Algorithm
///
/// ```text
/// target = fraction * total_distance_km(route)
///
/// for each segment (start, end) with length seg:
///     if accumulated + seg >= target:
///         t = (target - accumulated) / seg
///         return start + (end - start) * t      // linear in lat/lon
///     accumulated += seg
///
/// return route[last]
/// ```
///
/// The position inside a segment is interpolated linearly in lat/lon rather
/// than along the great circle. Fractions outside `[0, 1]` are clamped to the
/// route endpoints, they are never extrapolated.
///
/// # Returns
/// - `Err(EmptyRoute)` when `route` is empty
/// - the only waypoint when the route has zero length
pub fn interpolate(
    route: &[Coordinate],
    fraction: f64,
) -> Result<Coordinate, InterpolationError> {
    let first = *route.first().ok_or(InterpolationError::EmptyRoute)?;
    let last = route[route.len() - 1];

    let total = total_distance_km(route);
    if total == 0.0 {
        return Ok(first);
    }

    let target = fraction * total;
    if target <= 0.0 {
        return Ok(first);
    }

    let mut accumulated = 0.0;
    for window in route.windows(2) {
        let (start, end) = (window[0], window[1]);
        let segment = haversine_km(start, end);

        if accumulated + segment >= target {
            // Only reachable with repeated waypoints, which route tables reject.
            if segment == 0.0 {
                return Ok(start);
            }
            let t = (target - accumulated) / segment;
            return Ok(start.interpolate(end, t));
        }

        accumulated += segment;
    }

    tracing::trace!(fraction, total, "target beyond route length, using last waypoint");
    Ok(last)
}
