//! Geo module - geocoding, geocode cache and map enrichment

mod cache;
mod enrich;
mod geocoder;

pub use enrich::{ensure_latlon, Enrichment};
pub use geocoder::{
    NominatimGeocoder, RateLimiter, DEFAULT_ERROR_WAIT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY,
    NOMINATIM_SEARCH_URL,
};
