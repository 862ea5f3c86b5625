use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{CargoItem, Quantity};

/// Minimum delay between two downloads of the fleet documents.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid fleet document {path:?}: {source}")]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("failed to download {url}: {source}")]
    Download { source: reqwest::Error, url: String },
    #[error("vessel contents unavailable: {0}")]
    ManifestUnavailable(String),
}

/// One scheduled voyage, as listed in the vessel details document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    #[serde(alias = "Vessel ID", deserialize_with = "vessel_id")]
    pub vessel_id: String,
    #[serde(alias = "Vessel Name")]
    pub vessel_name: String,
    #[serde(alias = "Initial Port")]
    pub initial_port: String,
    #[serde(alias = "Start Date")]
    pub start_date: NaiveDate,
    #[serde(alias = "Dest. Date")]
    pub dest_date: NaiveDate,
}

/// One manifest line of the vessel contents document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoRecord {
    #[serde(alias = "Vessel ID", deserialize_with = "vessel_id")]
    pub vessel_id: String,
    #[serde(alias = "Item Name")]
    pub item_name: String,
    #[serde(alias = "Quantity", default)]
    pub quantity: Quantity,
}

/// Spreadsheet exports carry numeric IDs, hand-written documents use strings.
fn vessel_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id.trim().to_string(),
        RawId::Integer(id) => id.to_string(),
        RawId::Float(id) if id.fract() == 0.0 => format!("{id:.0}"),
        RawId::Float(id) => id.to_string(),
    })
}

type Manifest = HashMap<String, Vec<CargoItem>>;

/// Everything loaded from one refresh of the fleet documents.
///
/// The schedule and the manifest are independent: a contents document that
/// cannot be read only makes [`FleetData::contents`] fail.
#[derive(Debug, Clone)]
pub struct FleetData {
    pub vessels: Vec<VesselRecord>,
    manifest: Result<Manifest, String>,
}

impl FleetData {
    pub fn new(vessels: Vec<VesselRecord>, cargo: Vec<CargoRecord>) -> Self {
        Self {
            vessels,
            manifest: Ok(group_by_vessel(cargo)),
        }
    }

    pub fn from_slices(details: &[u8], contents: &[u8]) -> Result<Self, serde_json::Error> {
        let vessels = serde_json::from_slice(details)?;
        let cargo = serde_json::from_slice(contents)?;
        Ok(Self::new(vessels, cargo))
    }

    /// Load both documents. Only the details document is required.
    pub async fn read_from_paths(details: &Path, contents: &Path) -> Result<Self, DataError> {
        let vessels = read_json(details).await?;
        let manifest = read_json(contents)
            .await
            .map(group_by_vessel)
            .map_err(|err| {
                tracing::warn!("vessel contents not loaded: {err}");
                err.to_string()
            });
        Ok(Self { vessels, manifest })
    }

    pub fn has_manifest(&self) -> bool {
        self.manifest.is_ok()
    }

    /// Manifest of a vessel in document order; unknown IDs have no cargo.
    pub fn contents(&self, vessel_id: &str) -> Result<&[CargoItem], DataError> {
        let manifest = self
            .manifest
            .as_ref()
            .map_err(|reason| DataError::ManifestUnavailable(reason.clone()))?;
        Ok(manifest
            .get(vessel_id.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }
}

fn group_by_vessel(cargo: Vec<CargoRecord>) -> Manifest {
    let mut manifest = Manifest::new();
    for record in cargo {
        manifest.entry(record.vessel_id).or_default().push(CargoItem {
            item_name: record.item_name,
            quantity: record.quantity,
        });
    }
    manifest
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DataError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_slice(&bytes).map_err(|source| DataError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

/// Where the fleet documents live and how often they are refreshed.
#[derive(Debug, Clone)]
pub struct FleetSourceConfig {
    pub details_path: PathBuf,
    pub contents_path: PathBuf,
    /// When set, the local file is replaced by a fresh download on refresh.
    pub details_url: Option<String>,
    pub contents_url: Option<String>,
    pub refresh_interval: Duration,
}

impl FleetSourceConfig {
    pub fn local(details_path: impl Into<PathBuf>, contents_path: impl Into<PathBuf>) -> Self {
        Self {
            details_path: details_path.into(),
            contents_path: contents_path.into(),
            details_url: None,
            contents_url: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

#[derive(Default)]
struct Cached {
    data: Option<Arc<FleetData>>,
    refreshed_at: Option<Instant>,
}

/// Cached fleet snapshot, reloaded at most once per refresh interval.
pub struct FleetStore {
    config: FleetSourceConfig,
    client: reqwest::Client,
    cached: Mutex<Cached>,
}

impl FleetStore {
    pub fn new(config: FleetSourceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            cached: Mutex::new(Cached::default()),
        }
    }

    /// Current fleet data, refreshing it first when the interval has elapsed.
    ///
    /// A failed download keeps the previous local file, and a failed reload
    /// keeps serving the previous snapshot when there is one. A broken
    /// contents document keeps the previous manifest next to the new schedule.
    pub async fn snapshot(&self) -> Result<Arc<FleetData>, DataError> {
        let mut cached = self.cached.lock().await;

        if let (Some(data), Some(at)) = (&cached.data, cached.refreshed_at) {
            if at.elapsed() < self.config.refresh_interval {
                tracing::debug!("fleet data refreshed {:?} ago, reusing", at.elapsed());
                return Ok(Arc::clone(data));
            }
        }

        self.download_all().await;
        cached.refreshed_at = Some(Instant::now());

        let loaded =
            FleetData::read_from_paths(&self.config.details_path, &self.config.contents_path).await;
        match loaded {
            Ok(mut data) => {
                if !data.has_manifest() {
                    if let Some(previous) = cached.data.as_ref().filter(|p| p.has_manifest()) {
                        tracing::warn!("keeping previous vessel contents");
                        data.manifest = previous.manifest.clone();
                    }
                }
                tracing::info!(vessels = data.vessels.len(), "fleet data loaded");
                let data = Arc::new(data);
                cached.data = Some(Arc::clone(&data));
                Ok(data)
            }
            Err(err) => match &cached.data {
                Some(previous) => {
                    tracing::warn!("keeping previous fleet data: {err}");
                    Ok(Arc::clone(previous))
                }
                None => Err(err),
            },
        }
    }

    async fn download_all(&self) {
        let targets = [
            (&self.config.details_url, &self.config.details_path),
            (&self.config.contents_url, &self.config.contents_path),
        ];
        for (url, path) in targets {
            let Some(url) = url else { continue };
            match self.download(url, path).await {
                Ok(bytes) => tracing::info!("downloaded {bytes} bytes from {url} to {path:?}"),
                Err(err) => tracing::warn!("{err}, using existing {path:?}"),
            }
        }
    }

    async fn download(&self, url: &str, path: &Path) -> Result<usize, DataError> {
        let download_error = |source| DataError::Download {
            source,
            url: url.to_string(),
        };
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(download_error)?
            .bytes()
            .await
            .map_err(download_error)?;

        // Write beside the target and rename so readers never see a partial file.
        let partial = path.with_extension("part");
        let io_error = |source| DataError::Io {
            source,
            path: path.to_path_buf(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&partial, &body).await.map_err(io_error)?;
        tokio::fs::rename(&partial, path).await.map_err(io_error)?;
        Ok(body.len())
    }
}
