use chrono::{Days, NaiveDate};
use rayon::prelude::*;

use crate::{
    data::VesselRecord,
    interpolator::InterpolationError,
    models::{Coordinate, VesselPosition, VesselRow},
    routes::RouteTable,
};

/// Days between unloading at the destination port and delivery in Delhi.
pub const DEFAULT_INLAND_TRANSIT_DAYS: u64 = 8;

/// Scheduled departure and arrival of one voyage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Journey {
    pub start: NaiveDate,
    pub dest: NaiveDate,
}

impl Journey {
    pub fn total_days(&self) -> i64 {
        (self.dest - self.start).num_days()
    }

    /// Negative before departure, larger than `total_days` once overdue.
    pub fn elapsed_days(&self, today: NaiveDate) -> i64 {
        (today - self.start).num_days()
    }

    pub fn has_departed(&self, today: NaiveDate) -> bool {
        self.start <= today
    }

    /// Elapsed share of the scheduled journey. A journey scheduled to arrive
    /// on its departure day counts as complete once it has departed.
    pub fn fraction(&self, today: NaiveDate) -> f64 {
        let total = self.total_days();
        let elapsed = self.elapsed_days(today);
        if total <= 0 {
            return if elapsed >= 0 { 1.0 } else { 0.0 };
        }
        elapsed as f64 / total as f64
    }

    pub fn delhi_date(&self, inland_transit_days: u64) -> NaiveDate {
        self.dest
            .checked_add_days(Days::new(inland_transit_days))
            .unwrap_or(NaiveDate::MAX)
    }
}

impl VesselRecord {
    pub fn journey(&self) -> Journey {
        Journey {
            start: self.start_date,
            dest: self.dest_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionEstimate {
    /// Not departed yet, shown at the literal port position.
    InPort(Coordinate),
    UnderWay { route: String, position: Coordinate },
    /// The origin port is not served by any route.
    Unknown,
}

impl PositionEstimate {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::InPort(position) | Self::UnderWay { position, .. } => Some(*position),
            Self::Unknown => None,
        }
    }

    pub fn route(&self) -> Option<&str> {
        match self {
            Self::UnderWay { route, .. } => Some(route.as_str()),
            _ => None,
        }
    }
}

/// Estimate where `vessel` is on `today`.
///
/// Vessels that have not departed are pinned to their origin's departure
/// anchor when one is configured. Otherwise the elapsed fraction of the
/// schedule is mapped onto the route selected by the origin port.
pub fn estimate_position(
    routes: &RouteTable,
    vessel: &VesselRecord,
    today: NaiveDate,
) -> Result<PositionEstimate, InterpolationError> {
    let journey = vessel.journey();

    if !journey.has_departed(today) {
        if let Some(anchor) = routes.departure_anchor(&vessel.initial_port) {
            return Ok(PositionEstimate::InPort(anchor));
        }
    }

    let fraction = journey.fraction(today);
    match routes.locate(&vessel.initial_port, fraction)? {
        Some((route, position)) => Ok(PositionEstimate::UnderWay {
            route: route.name().to_string(),
            position,
        }),
        None => {
            tracing::warn!(
                "no route for vessel {} from {:?}",
                vessel.vessel_id,
                vessel.initial_port
            );
            Ok(PositionEstimate::Unknown)
        }
    }
}

/// Positions of the whole fleet. A vessel whose position cannot be computed
/// is reported without one; it never affects the others.
pub fn fleet_positions(
    routes: &RouteTable,
    vessels: &[VesselRecord],
    today: NaiveDate,
) -> Vec<VesselPosition> {
    vessels
        .par_iter()
        .map(|vessel| {
            let estimate = estimate_position(routes, vessel, today).unwrap_or_else(|err| {
                tracing::warn!("position of vessel {} unavailable: {err}", vessel.vessel_id);
                PositionEstimate::Unknown
            });
            VesselPosition {
                vessel_id: vessel.vessel_id.clone(),
                vessel_name: vessel.vessel_name.clone(),
                initial_port: vessel.initial_port.clone(),
                route: estimate.route().map(str::to_string),
                current_position: estimate.coordinate(),
            }
        })
        .collect()
}

/// Rows of the fleet overview table, in document order.
pub fn fleet_table(vessels: &[VesselRecord], inland_transit_days: u64) -> Vec<VesselRow> {
    vessels
        .iter()
        .map(|vessel| VesselRow {
            vessel_name: vessel.vessel_name.clone(),
            start_date: vessel.start_date,
            dest_date: vessel.dest_date,
            delhi_date: vessel.journey().delhi_date(inland_transit_days),
            vessel_id: vessel.vessel_id.clone(),
        })
        .collect()
}
