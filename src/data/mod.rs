//! Data module - facility table loading, filtering and export

mod export;
mod loader;
mod processor;
mod record;

pub use export::{write_csv, DEFAULT_EXPORT_NAME};
pub use loader::{read_facilities, FacilityLoader};
pub use processor::{DataProcessor, FacilityFilter};
pub use record::{CategoryCount, FacilityRecord, LatLon, MapPoint};
