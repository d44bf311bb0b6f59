//! Geocode Cache Module
//! Flat CSV file mapping `full_address` to latitude/longitude.
//!
//! The file is read fully and rewritten fully. It is a convenience only:
//! anything unreadable is treated as an empty cache.

use crate::data::LatLon;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

const ADDRESS_COL: &str = "full_address";
const LATITUDE_COL: &str = "latitude";
const LONGITUDE_COL: &str = "longitude";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache CSV error: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Cache I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Cache missing column: {0}")]
    MissingColumn(&'static str),
}

/// Known positions keyed by formatted address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeCache {
    entries: HashMap<String, LatLon>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache, degrading to an empty cache on any problem.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No geocode cache at {}", path.display());
            return Self::new();
        }
        match Self::try_load(path) {
            Ok(cache) => {
                info!("Loaded {} cached positions from {}", cache.len(), path.display());
                cache
            }
            Err(e) => {
                warn!("Ignoring unreadable geocode cache {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    /// Strict load. Rows whose coordinates do not parse are dropped; for a
    /// repeated address the last row wins.
    pub fn try_load(path: &Path) -> Result<Self, CacheError> {
        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        let addresses = Self::text_values(&df, ADDRESS_COL)?;
        let latitudes = Self::text_values(&df, LATITUDE_COL)?;
        let longitudes = Self::text_values(&df, LONGITUDE_COL)?;

        let mut entries = HashMap::new();
        for ((address, lat), lon) in addresses.into_iter().zip(latitudes).zip(longitudes) {
            let (Some(address), Some(lat), Some(lon)) = (address, lat, lon) else {
                continue;
            };
            let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) else {
                continue;
            };
            let position = LatLon::new(lat, lon);
            if position.is_valid() {
                entries.insert(address, position);
            }
        }
        Ok(Self { entries })
    }

    /// Column looked up by trimmed, lower-cased header name.
    fn text_values(df: &DataFrame, name: &'static str) -> Result<Vec<Option<String>>, CacheError> {
        let column = df
            .get_columns()
            .iter()
            .find(|c| c.name().trim().to_lowercase() == name)
            .ok_or(CacheError::MissingColumn(name))?;
        let as_text = column.cast(&DataType::String)?;
        let ca = as_text.str()?;
        Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    pub fn get(&self, address: &str) -> Option<LatLon> {
        self.entries.get(address).copied()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union with freshly geocoded positions; new values replace old ones.
    pub fn merge(&mut self, fresh: HashMap<String, LatLon>) {
        self.entries.extend(fresh);
    }

    /// Rewrite the whole cache file, rows ordered by address.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let mut rows: Vec<(&String, &LatLon)> = self.entries.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));

        let mut df = DataFrame::new(vec![
            Column::new(
                ADDRESS_COL.into(),
                rows.iter().map(|(a, _)| a.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                LATITUDE_COL.into(),
                rows.iter().map(|(_, p)| p.latitude).collect::<Vec<_>>(),
            ),
            Column::new(
                LONGITUDE_COL.into(),
                rows.iter().map(|(_, p)| p.longitude).collect::<Vec<_>>(),
            ),
        ])?;

        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;
        debug!("Wrote {} cached positions to {}", self.len(), path.display());
        Ok(())
    }
}
