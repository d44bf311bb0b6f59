//! Geocoder Module
//! Address lookup through OpenStreetMap Nominatim, rate limited and best-effort.

use crate::data::LatLon;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const USER_AGENT: &str = "co_state_assets_explorer";

/// Minimum spacing between two Nominatim requests.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
/// Extra attempts after a transient failure.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Pause after a transient failure before the next attempt.
pub const DEFAULT_ERROR_WAIT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Geocoder returned HTTP status {0}")]
    Status(u16),
    #[error("Invalid geocoder URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid coordinate in response: {0}")]
    InvalidCoordinate(String),
}

impl GeocodeError {
    /// Network failures, throttling and server errors are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            GeocodeError::Http(_) => true,
            GeocodeError::Status(code) => *code == 429 || *code >= 500,
            GeocodeError::Url(_) | GeocodeError::InvalidCoordinate(_) => false,
        }
    }
}

/// Free-text address lookup. `Ok(None)` means the provider had no match.
pub trait Geocoder {
    fn geocode(&self, address: &str) -> Result<Option<LatLon>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Blocking client for the Nominatim search API.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: Url,
}

impl NominatimGeocoder {
    pub fn new(endpoint: &str) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    fn search_url(&self, address: &str) -> Result<Url, GeocodeError> {
        Ok(Url::parse_with_params(
            self.endpoint.as_str(),
            &[("q", address), ("format", "jsonv2"), ("limit", "1")],
        )?)
    }

    fn first_position(places: &[NominatimPlace]) -> Result<Option<LatLon>, GeocodeError> {
        let Some(place) = places.first() else {
            return Ok(None);
        };
        let latitude: f64 = place
            .lat
            .trim()
            .parse()
            .map_err(|_| GeocodeError::InvalidCoordinate(place.lat.clone()))?;
        let longitude: f64 = place
            .lon
            .trim()
            .parse()
            .map_err(|_| GeocodeError::InvalidCoordinate(place.lon.clone()))?;
        Ok(Some(LatLon::new(latitude, longitude)))
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<LatLon>, GeocodeError> {
        let url = self.search_url(address)?;
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        let places: Vec<NominatimPlace> = response.json()?;
        Self::first_position(&places)
    }
}

/// Wraps a geocoder so that successive calls are at least `min_delay` apart.
///
/// A transient failure is retried up to `max_retries` times, waiting
/// `error_wait` before each new attempt. Misses (`Ok(None)`) are final.
pub struct RateLimiter<G> {
    inner: G,
    min_delay: Duration,
    max_retries: u32,
    error_wait: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl<G: Geocoder> RateLimiter<G> {
    pub fn new(inner: G, min_delay: Duration) -> Self {
        Self {
            inner,
            min_delay,
            max_retries: DEFAULT_MAX_RETRIES,
            error_wait: DEFAULT_ERROR_WAIT,
            last_call: Mutex::new(None),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, error_wait: Duration) -> Self {
        self.max_retries = max_retries;
        self.error_wait = error_wait;
        self
    }
}

impl<G: Geocoder> Geocoder for RateLimiter<G> {
    fn geocode(&self, address: &str) -> Result<Option<LatLon>, GeocodeError> {
        let mut last_call = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let max_attempts = self.max_retries + 1;
        let mut attempts = 0;

        loop {
            attempts += 1;
            if let Some(last) = *last_call {
                let elapsed = last.elapsed();
                if elapsed < self.min_delay {
                    thread::sleep(self.min_delay - elapsed);
                }
            }
            let result = self.inner.geocode(address);
            *last_call = Some(Instant::now());

            match result {
                Err(e) if e.is_transient() && attempts < max_attempts => {
                    warn!(
                        "Geocoding {} failed (attempt {}/{}): {}",
                        address, attempts, max_attempts, e
                    );
                    thread::sleep(self.error_wait);
                }
                other => return other,
            }
        }
    }
}

/// Look up each distinct address once.
///
/// Blank addresses are skipped. Failures and misses leave the address out of
/// the result. `progress(done, total)` is called after every lookup. The run
/// stops early, keeping what already resolved, once `cancelled()` is true.
pub fn geocode_addresses<G, I, S>(
    geocoder: &G,
    addresses: I,
    mut progress: impl FnMut(usize, usize),
    cancelled: impl Fn() -> bool,
) -> HashMap<String, LatLon>
where
    G: Geocoder + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let unique: Vec<String> = addresses
        .into_iter()
        .map(|a| a.as_ref().to_string())
        .filter(|a| !a.trim().is_empty() && seen.insert(a.clone()))
        .collect();

    let total = unique.len().max(1);
    let mut results = HashMap::new();
    info!("Geocoding {} addresses", unique.len());

    for (idx, address) in unique.into_iter().enumerate() {
        if cancelled() {
            info!("Geocoding cancelled after {} of {} addresses", idx, total);
            break;
        }
        match geocoder.geocode(&address) {
            Ok(Some(position)) if position.is_valid() => {
                results.insert(address, position);
            }
            Ok(Some(position)) => {
                warn!("Discarding out-of-range position {:?} for {}", position, address);
            }
            Ok(None) => debug!("No geocoding match for {}", address),
            Err(e) => warn!("Geocoding failed for {}: {}", address, e),
        }
        progress(idx + 1, total);
    }

    results
}
