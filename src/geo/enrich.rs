//! Map enrichment: attach positions to facility records using the cache first
//! and the geocoder for whatever is still missing.

use crate::data::{FacilityRecord, MapPoint};
use crate::geo::cache::GeocodeCache;
use crate::geo::geocoder::{geocode_addresses, Geocoder};
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of placing a set of records on the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub points: Vec<MapPoint>,
    /// Records whose position came straight from the cache file.
    pub from_cache: usize,
    /// Distinct addresses resolved by the geocoder in this run.
    pub newly_geocoded: usize,
    /// Records left without a position.
    pub unresolved: usize,
}

/// Resolve positions for `records`, updating the cache file at `cache_path`
/// with anything newly geocoded. Cache write failures are logged and ignored.
/// Once `cancelled()` is true no further lookups are made.
pub fn ensure_latlon<G: Geocoder + ?Sized>(
    records: &[FacilityRecord],
    cache_path: &Path,
    geocoder: &G,
    progress: impl FnMut(usize, usize),
    cancelled: impl Fn() -> bool,
) -> Enrichment {
    let mut cache = GeocodeCache::load(cache_path);
    if cache.is_empty() {
        debug!("Geocode cache is empty; every address needs a lookup");
    }

    let missing: Vec<&str> = records
        .iter()
        .filter(|r| !cache.contains(&r.full_address))
        .map(|r| r.full_address.as_str())
        .collect();
    let from_cache = records.len() - missing.len();

    let mut newly_geocoded = 0;
    if !missing.is_empty() {
        let fresh = geocode_addresses(geocoder, missing, progress, cancelled);
        newly_geocoded = fresh.len();
        if !fresh.is_empty() {
            cache.merge(fresh);
            if let Err(e) = cache.save(cache_path) {
                warn!("Could not update geocode cache {}: {}", cache_path.display(), e);
            }
        }
    }

    let points: Vec<MapPoint> = records
        .iter()
        .filter_map(|record| {
            cache.get(&record.full_address).map(|position| MapPoint {
                record: record.clone(),
                position,
            })
        })
        .collect();
    let unresolved = records.len() - points.len();

    info!(
        "Placed {} of {} facilities on the map ({} cached, {} newly geocoded)",
        points.len(),
        records.len(),
        from_cache,
        newly_geocoded
    );

    Enrichment {
        points,
        from_cache,
        newly_geocoded,
        unresolved,
    }
}
