//! Facility Record Module
//! Row types shared by the table, the charts and the map.

/// Columns every input CSV must provide, in report order.
pub const REQUIRED_COLUMNS: [&str; 6] = ["id", "name", "address", "city", "state", "zip"];

/// Derived column holding the geocodable address string.
pub const FULL_ADDRESS_COL: &str = "full_address";

/// One row of the facility dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FacilityRecord {
    pub id: Option<i64>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub full_address: String,
}

/// A geocoded position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A facility placed on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub record: FacilityRecord,
    pub position: LatLon,
}

/// Bar chart entry: number of facilities sharing a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}
