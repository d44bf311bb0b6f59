//! Data Processor Module
//! Filtering, aggregation and row extraction over the facility table.

use crate::data::record::{CategoryCount, FacilityRecord, FULL_ADDRESS_COL};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Sidebar filter state: selected cities, selected ZIPs and a search string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacilityFilter {
    pub cities: BTreeSet<String>,
    pub zips: BTreeSet<String>,
    pub query: String,
}

impl FacilityFilter {
    /// Filter with every city and ZIP selected and no search text.
    pub fn select_all(df: &DataFrame) -> Self {
        Self {
            cities: DataProcessor::distinct_values(df, "city").into_iter().collect(),
            zips: DataProcessor::distinct_values(df, "zip").into_iter().collect(),
            query: String::new(),
        }
    }

    /// Lower-cased, trimmed search needle, `None` when the search box is blank.
    fn needle(&self) -> Option<String> {
        let query = self.query.trim();
        (!query.is_empty()).then(|| query.to_lowercase())
    }

    fn row_matches(
        cities: &BTreeSet<String>,
        zips: &BTreeSet<String>,
        needle: Option<&str>,
        [city, zip]: [&str; 2],
        searchable: [&str; 3],
    ) -> bool {
        if !cities.contains(city) || !zips.contains(zip) {
            return false;
        }
        match needle {
            Some(needle) => searchable
                .iter()
                .any(|text| text.to_lowercase().contains(needle)),
            None => true,
        }
    }

    /// Keep the rows of `df` that pass the filter.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let cities = DataProcessor::text_column(df, "city")?;
        let zips = DataProcessor::text_column(df, "zip")?;
        let names = DataProcessor::text_column(df, "name")?;
        let addresses = DataProcessor::text_column(df, "address")?;
        let full_addresses = DataProcessor::text_column(df, FULL_ADDRESS_COL)?;
        let needle = self.needle();

        let mask: Vec<bool> = (0..df.height())
            .into_par_iter()
            .map(|i| {
                Self::row_matches(
                    &self.cities,
                    &self.zips,
                    needle.as_deref(),
                    [cities[i].as_str(), zips[i].as_str()],
                    [
                        names[i].as_str(),
                        addresses[i].as_str(),
                        full_addresses[i].as_str(),
                    ],
                )
            })
            .collect();

        let mask = BooleanChunked::from_slice("mask".into(), &mask);
        Ok(df.filter(&mask)?)
    }
}

/// Handles table-level transformations used by the dashboard.
pub struct DataProcessor;

impl DataProcessor {
    /// Values of a text column, nulls as empty strings.
    pub fn text_column(df: &DataFrame, column: &str) -> Result<Vec<String>, ProcessorError> {
        let as_text = df.column(column)?.cast(&DataType::String)?;
        let ca = as_text.str()?;
        Ok(ca
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect())
    }

    fn id_column(df: &DataFrame) -> Result<Vec<Option<i64>>, ProcessorError> {
        let ids = df.column("id")?.cast(&DataType::Int64)?;
        Ok(ids.i64()?.into_iter().collect())
    }

    /// Sorted distinct non-empty values of a column (filter options).
    pub fn distinct_values(df: &DataFrame, column: &str) -> Vec<String> {
        Self::text_column(df, column)
            .map(|values| {
                values
                    .into_iter()
                    .filter(|v| !v.is_empty())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count facilities with a non-null id per distinct value of `column`.
    ///
    /// Ordered by count descending, then label ascending.
    pub fn count_by(df: &DataFrame, column: &str) -> Result<Vec<CategoryCount>, ProcessorError> {
        let labels = Self::text_column(df, column)?;
        let ids = Self::id_column(df)?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for (label, id) in labels.into_iter().zip(ids) {
            *counts.entry(label).or_insert(0) += usize::from(id.is_some());
        }

        let mut counts: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(label, count)| CategoryCount { label, count })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        Ok(counts)
    }

    /// Rows of the table as records, in table order.
    pub fn records(df: &DataFrame) -> Result<Vec<FacilityRecord>, ProcessorError> {
        let ids = Self::id_column(df)?;
        let names = Self::text_column(df, "name")?;
        let addresses = Self::text_column(df, "address")?;
        let cities = Self::text_column(df, "city")?;
        let states = Self::text_column(df, "state")?;
        let zips = Self::text_column(df, "zip")?;
        let full_addresses = Self::text_column(df, FULL_ADDRESS_COL)?;

        let records = ids
            .into_iter()
            .zip(names)
            .zip(addresses)
            .zip(cities)
            .zip(states)
            .zip(zips)
            .zip(full_addresses)
            .map(
                |((((((id, name), address), city), state), zip), full_address)| FacilityRecord {
                    id,
                    name,
                    address,
                    city,
                    state,
                    zip,
                    full_address,
                },
            )
            .collect();
        Ok(records)
    }

    /// Records ordered by name for the table view.
    pub fn sorted_by_name(mut records: Vec<FacilityRecord>) -> Vec<FacilityRecord> {
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::normalize;

    fn sample() -> DataFrame {
        let raw = df! {
            "id" => ["1", "2", "3", "4", ""],
            "name" => ["State Capitol", "Records Center", "Motor Pool", "Annex", "Garage"],
            "address" => ["200 E Colfax Ave", "1001 E 62nd Ave", "5 Fleet Way", "7 Main St", "1 Garage Ln"],
            "city" => ["Denver", "Denver", "Pueblo", "Golden", "Pueblo"],
            "state" => ["CO", "CO", "CO", "CO", "CO"],
            "zip" => ["80203", "80216", "81003", "80401", "81003"],
        }
        .unwrap();
        normalize(&raw).unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        DataProcessor::text_column(df, "name").unwrap()
    }

    #[test]
    fn test_select_all_keeps_everything() {
        let df = sample();
        let filter = FacilityFilter::select_all(&df);

        assert_eq!(
            filter.cities.iter().cloned().collect::<Vec<_>>(),
            vec!["Denver", "Golden", "Pueblo"]
        );
        assert_eq!(filter.apply(&df).unwrap().height(), 5);
    }

    #[test]
    fn test_city_and_zip_predicates() {
        let df = sample();
        let mut filter = FacilityFilter::select_all(&df);
        filter.cities.remove("Pueblo");
        filter.zips.remove("80216");

        let filtered = filter.apply(&df).unwrap();
        assert_eq!(names(&filtered), vec!["State Capitol", "Annex"]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_and_address() {
        let df = sample();
        let mut filter = FacilityFilter::select_all(&df);

        filter.query = "  CAPITOL ".to_string();
        assert_eq!(names(&filter.apply(&df).unwrap()), vec!["State Capitol"]);

        filter.query = "fleet".to_string();
        assert_eq!(names(&filter.apply(&df).unwrap()), vec!["Motor Pool"]);

        // Matches the derived full address only.
        filter.query = "golden, co".to_string();
        assert_eq!(names(&filter.apply(&df).unwrap()), vec!["Annex"]);
    }

    #[test]
    fn test_search_is_literal() {
        let df = sample();
        let mut filter = FacilityFilter::select_all(&df);
        filter.query = "e.*ave".to_string();

        assert_eq!(filter.apply(&df).unwrap().height(), 0);
    }

    #[test]
    fn test_empty_selection_filters_everything() {
        let df = sample();
        let mut filter = FacilityFilter::select_all(&df);
        filter.cities.clear();

        assert_eq!(filter.apply(&df).unwrap().height(), 0);
    }

    #[test]
    fn test_count_by_ignores_null_ids() {
        let df = sample();
        let counts = DataProcessor::count_by(&df, "city").unwrap();

        assert_eq!(
            counts,
            vec![
                CategoryCount { label: "Denver".into(), count: 2 },
                CategoryCount { label: "Golden".into(), count: 1 },
                CategoryCount { label: "Pueblo".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_count_by_keeps_all_null_group() {
        let raw = df! {
            "id" => ["1", ""],
            "name" => ["State Capitol", "Aurora Depot"],
            "address" => ["200 E Colfax Ave", "1 Depot Rd"],
            "city" => ["Denver", "Aurora"],
            "state" => ["CO", "CO"],
            "zip" => ["80203", "80010"],
        }
        .unwrap();
        let df = normalize(&raw).unwrap();

        assert_eq!(
            DataProcessor::count_by(&df, "city").unwrap(),
            vec![
                CategoryCount { label: "Denver".into(), count: 1 },
                CategoryCount { label: "Aurora".into(), count: 0 },
            ]
        );
    }

    #[test]
    fn test_records_and_sort() {
        let df = sample();
        let records = DataProcessor::sorted_by_name(DataProcessor::records(&df).unwrap());

        let ordered: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            ordered,
            vec!["Annex", "Garage", "Motor Pool", "Records Center", "State Capitol"]
        );
        assert_eq!(records[0].full_address, "7 Main St, Golden, CO 80401");
        assert_eq!(records[1].id, None);
    }
}
