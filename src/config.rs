//! Command-line configuration.

use crate::data::FacilityFilter;
use crate::geo::{DEFAULT_ERROR_WAIT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY, NOMINATIM_SEARCH_URL};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "facilities_explorer")]
#[command(about = "Browse, filter, chart, and map state-owned facilities")]
pub struct Args {
    /// Facility CSV with id, name, address, city, state and zip columns
    #[arg(long, default_value = "resources/assets.csv")]
    pub assets: PathBuf,

    /// Geocode cache CSV (full_address, latitude, longitude)
    #[arg(long, default_value = "resources/assets_geocoded.csv")]
    pub geocode_cache: PathBuf,

    /// Nominatim search endpoint
    #[arg(long, default_value = NOMINATIM_SEARCH_URL)]
    pub nominatim_url: String,

    /// Minimum delay between geocoding requests, in milliseconds
    #[arg(long, default_value_t = DEFAULT_MIN_DELAY.as_millis() as u64)]
    pub min_delay_ms: u64,

    /// Extra attempts for a geocoding request that failed transiently
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Wait after a failed geocoding request before retrying, in milliseconds
    #[arg(long, default_value_t = DEFAULT_ERROR_WAIT.as_millis() as u64)]
    pub error_wait_ms: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Write the filtered CSV to this path and exit without opening a window
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Keep only these cities (headless export; repeatable)
    #[arg(long = "city")]
    pub cities: Vec<String>,

    /// Keep only these ZIP codes (headless export; repeatable)
    #[arg(long = "zip")]
    pub zips: Vec<String>,

    /// Search name/address contains (headless export)
    #[arg(long, default_value = "")]
    pub search: String,
}

impl Args {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn error_wait(&self) -> Duration {
        Duration::from_millis(self.error_wait_ms)
    }

    /// Headless filter: start from everything selected and narrow to the
    /// cities/ZIPs given on the command line.
    pub fn filter_for(&self, all: FacilityFilter) -> FacilityFilter {
        let mut filter = all;
        if !self.cities.is_empty() {
            filter.cities = self.cities.iter().cloned().collect();
        }
        if !self.zips.is_empty() {
            filter.zips = self.zips.iter().cloned().collect();
        }
        filter.query = self.search.clone();
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["facilities_explorer"]);
        assert_eq!(args.assets, PathBuf::from("resources/assets.csv"));
        assert_eq!(args.geocode_cache, PathBuf::from("resources/assets_geocoded.csv"));
        assert_eq!(args.min_delay(), Duration::from_secs(1));
        assert_eq!(args.max_retries, 2);
        assert_eq!(args.error_wait(), Duration::from_secs(5));
        assert!(args.export.is_none());
    }

    #[test]
    fn test_filter_for_narrows_selection() {
        let args = Args::parse_from([
            "facilities_explorer",
            "--export",
            "out.csv",
            "--city",
            "Denver",
            "--city",
            "Golden",
            "--search",
            "lab",
        ]);
        let all = FacilityFilter {
            cities: BTreeSet::from(["Denver".into(), "Golden".into(), "Pueblo".into()]),
            zips: BTreeSet::from(["80202".into()]),
            query: String::new(),
        };

        let filter = args.filter_for(all);
        assert_eq!(filter.cities, BTreeSet::from(["Denver".into(), "Golden".into()]));
        assert_eq!(filter.zips, BTreeSet::from(["80202".into()]));
        assert_eq!(filter.query, "lab");
    }
}
