use thiserror::Error;

use crate::{data::DataError, interpolator::InterpolationError};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("fleet data unavailable: {0}")]
    Data(#[from] DataError),
    #[error("position estimate failed: {0}")]
    Interpolation(#[from] InterpolationError),
}
