//! CSV Data Loader Module
//! Loads the facility CSV with Polars and normalizes it into the facility table.

use crate::data::record::{FULL_ADDRESS_COL, REQUIRED_COLUMNS};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Could not find CSV at {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("CSV missing required columns: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("No data loaded")]
    NoData,
}

/// Holds the normalized facility table and where it came from.
pub struct FacilityLoader {
    df: Option<DataFrame>,
    file_path: Option<PathBuf>,
}

impl Default for FacilityLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FacilityLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            file_path: None,
        }
    }

    /// Load and normalize a facility CSV, replacing any previous table.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        let df = read_facilities(file_path)?;
        self.file_path = Some(file_path.to_path_buf());
        self.df = Some(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Get the number of facilities in the table.
    pub fn row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    pub fn dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    /// Set the table directly (used by background loading)
    pub fn set_dataframe(&mut self, df: DataFrame, file_path: PathBuf) {
        self.df = Some(df);
        self.file_path = Some(file_path);
    }
}

/// Read a facility CSV from disk and normalize it.
///
/// Every cell is read as text so that ZIP codes keep their leading zeros
/// and ids can be coerced the same way regardless of how they were written.
pub fn read_facilities(file_path: &Path) -> Result<DataFrame, LoaderError> {
    if !file_path.is_file() {
        return Err(LoaderError::FileNotFound(file_path.to_path_buf()));
    }

    let raw = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    debug!(
        "Read {} rows, {} columns from {}",
        raw.height(),
        raw.width(),
        file_path.display()
    );

    let df = normalize(&raw)?;
    info!("Loaded {} facilities from {}", df.height(), file_path.display());
    Ok(df)
}

/// Normalize column names and values of a raw facility table.
///
/// Output keeps the input column order (names trimmed and lower-cased) and
/// appends the derived `full_address` column.
pub fn normalize(raw: &DataFrame) -> Result<DataFrame, LoaderError> {
    let mut named: Vec<(String, Vec<Option<String>>)> = Vec::with_capacity(raw.width());
    for column in raw.get_columns() {
        let name = column.name().trim().to_lowercase();
        if name == FULL_ADDRESS_COL {
            continue;
        }
        named.push((name, text_values(column)?));
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !named.iter().any(|(name, _)| name == *required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns(missing));
    }

    let height = raw.height();
    let field = |key: &str| -> Vec<String> {
        named
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, values)| {
                values
                    .iter()
                    .map(|v| v.clone().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_else(|| vec![String::new(); height])
    };

    let ids: Vec<Option<i64>> = field("id").iter().map(|v| parse_id(v)).collect();
    let zips: Vec<String> = field("zip").iter().map(|v| normalize_zip(v)).collect();
    let states: Vec<String> = field("state").iter().map(|v| v.to_uppercase()).collect();
    let addresses = field("address");
    let cities = field("city");

    let full_addresses: Vec<String> = (0..height)
        .map(|i| format_full_address(&addresses[i], &cities[i], &states[i], &zips[i]))
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(named.len() + 1);
    for (name, values) in &named {
        let column = match name.as_str() {
            "id" => Column::new(name.as_str().into(), ids.clone()),
            "zip" => Column::new(name.as_str().into(), zips.clone()),
            "state" => Column::new(name.as_str().into(), states.clone()),
            "name" | "address" | "city" => Column::new(name.as_str().into(), field(name)),
            _ => Column::new(name.as_str().into(), values.clone()),
        };
        columns.push(column);
    }
    columns.push(Column::new(FULL_ADDRESS_COL.into(), full_addresses));

    Ok(DataFrame::new(columns)?)
}

/// Cell values of any column as optional text.
fn text_values(column: &Column) -> Result<Vec<Option<String>>, PolarsError> {
    let as_text = column.cast(&DataType::String)?;
    let ca = as_text.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Coerce an id cell to an integer; integral floats like `7.0` are accepted.
pub fn parse_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

/// Strip non-digits and left-pad with zeros to five characters.
pub fn normalize_zip(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    format!("{:0>5}", digits)
}

/// `"{address}, {city}, {state} {zip}"` with every part trimmed.
pub fn format_full_address(address: &str, city: &str, state: &str, zip: &str) -> String {
    format!(
        "{}, {}, {} {}",
        address.trim(),
        city.trim(),
        state.trim(),
        zip.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn str_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_zip_padding() {
        assert_eq!(normalize_zip("802"), "00802");
        assert_eq!(normalize_zip("80202-1234"), "802021234");
        assert_eq!(normalize_zip(" 80 202 "), "80202");
        assert_eq!(normalize_zip(""), "00000");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id(" 7.0 "), Some(7));
        assert_eq!(parse_id("7.5"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("nan"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn test_full_address_trims_parts() {
        assert_eq!(
            format_full_address(" 1 Main St ", "Denver ", "CO", "80202"),
            "1 Main St, Denver, CO 80202"
        );
    }

    #[test]
    fn test_read_normalizes_columns_and_values() {
        let file = write_csv(
            " ID ,Name,ADDRESS,City,State,Zip,Agency\n\
             1,Capitol,200 E Colfax Ave,Denver,co,80203,Legislature\n\
             2.0,Lab,1 Lab Rd,Golden,Co,8401,\n\
             x,Depot,9 Rail St ,Pueblo,CO,81003-55,DOT\n",
        );

        let df = read_facilities(file.path()).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["id", "name", "address", "city", "state", "zip", "agency", "full_address"]
        );

        let ids: Vec<Option<i64>> = df.column("id").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some(1), Some(2), None]);

        assert_eq!(
            str_column(&df, "state"),
            vec![Some("CO".into()), Some("CO".into()), Some("CO".into())]
        );
        assert_eq!(
            str_column(&df, "zip"),
            vec![Some("80203".into()), Some("08401".into()), Some("8100355".into())]
        );
        assert_eq!(
            str_column(&df, "full_address")[2],
            Some("9 Rail St, Pueblo, CO 8100355".to_string())
        );
        assert_eq!(str_column(&df, "agency")[1], None);
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let file = write_csv("id,name,city\n1,Capitol,Denver\n");

        let err = read_facilities(file.path()).unwrap_err();
        match &err {
            LoaderError::MissingColumns(missing) => {
                assert_eq!(missing, &vec!["address", "state", "zip"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            r#"CSV missing required columns: ["address", "state", "zip"]"#
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.csv");

        let err = read_facilities(&path).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound(_)));
        assert!(err.to_string().starts_with("Could not find CSV at"));
    }

    #[test]
    fn test_loader_tracks_table() {
        let file = write_csv("id,name,address,city,state,zip\n1,A,1 A St,Denver,CO,80202\n");
        let mut loader = FacilityLoader::new();
        assert_eq!(loader.row_count(), 0);

        loader.load_csv(file.path()).unwrap();
        assert_eq!(loader.row_count(), 1);
        assert_eq!(loader.file_path().map(|p| p.as_path()), Some(file.path()));
    }
}
