use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crate::{
    data::{DEFAULT_REFRESH_INTERVAL, FleetSourceConfig},
    tracking::DEFAULT_INLAND_TRANSIT_DAYS,
};

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DETAILS_PATH: &str = "data/vessel_details.json";
const DEFAULT_CONTENTS_PATH: &str = "data/vessel_contents.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Service settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `TRACKER_ADDR`
    pub addr: SocketAddr,
    /// `ROUTES_JSON`; the built-in lanes are used when unset.
    pub routes_path: Option<PathBuf>,
    /// `VESSEL_DETAILS_PATH`, `VESSEL_CONTENTS_PATH`, `VESSEL_DETAILS_URL`,
    /// `VESSEL_CONTENTS_URL` and `REFRESH_INTERVAL_SECS`
    pub fleet: FleetSourceConfig,
    /// `INLAND_TRANSIT_DAYS`
    pub inland_transit_days: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let addr = parse_var("TRACKER_ADDR", var("TRACKER_ADDR"), DEFAULT_ADDR)?;
        let refresh_secs: u64 = parse_var(
            "REFRESH_INTERVAL_SECS",
            var("REFRESH_INTERVAL_SECS"),
            &DEFAULT_REFRESH_INTERVAL.as_secs().to_string(),
        )?;
        let inland_transit_days = parse_var(
            "INLAND_TRANSIT_DAYS",
            var("INLAND_TRANSIT_DAYS"),
            &DEFAULT_INLAND_TRANSIT_DAYS.to_string(),
        )?;

        let fleet = FleetSourceConfig {
            details_path: var("VESSEL_DETAILS_PATH")
                .unwrap_or_else(|| DEFAULT_DETAILS_PATH.to_string())
                .into(),
            contents_path: var("VESSEL_CONTENTS_PATH")
                .unwrap_or_else(|| DEFAULT_CONTENTS_PATH.to_string())
                .into(),
            details_url: var("VESSEL_DETAILS_URL"),
            contents_url: var("VESSEL_CONTENTS_URL"),
            refresh_interval: Duration::from_secs(refresh_secs),
        };

        Ok(Self {
            addr,
            routes_path: var("ROUTES_JSON").map(PathBuf::from),
            fleet,
            inland_transit_days,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<T, ConfigError> {
    let value = value.unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError::InvalidValue { var: name, value })
}
