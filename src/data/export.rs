//! CSV Export Module
//! Serializes the filtered facility table for download.

use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Default file name offered by the download dialog.
pub const DEFAULT_EXPORT_NAME: &str = "assets_filtered.csv";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Failed to save file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Encode a table as UTF-8 CSV with a header row.
pub fn to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>, ExportError> {
    let mut buf: Vec<u8> = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;
    Ok(buf)
}

/// Write a table to `path` as CSV.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    let bytes = to_csv_bytes(df)?;
    fs::write(path, &bytes)?;
    info!("Exported {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::normalize;

    #[test]
    fn test_csv_bytes_include_derived_column() {
        let raw = df! {
            "id" => ["1"],
            "name" => ["Capitol, East Wing"],
            "address" => ["200 E Colfax Ave"],
            "city" => ["Denver"],
            "state" => ["co"],
            "zip" => ["80203"],
        }
        .unwrap();
        let df = normalize(&raw).unwrap();

        let text = String::from_utf8(to_csv_bytes(&df).unwrap()).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("id,name,address,city,state,zip,full_address")
        );
        assert_eq!(
            lines.next(),
            Some(r#"1,"Capitol, East Wing",200 E Colfax Ave,Denver,CO,80203,"200 E Colfax Ave, Denver, CO 80203""#)
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_write_csv_to_file() {
        let raw = df! {
            "id" => ["5"],
            "name" => ["Lab"],
            "address" => ["1 Lab Rd"],
            "city" => ["Golden"],
            "state" => ["CO"],
            "zip" => ["8401"],
        }
        .unwrap();
        let df = normalize(&raw).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_EXPORT_NAME);

        write_csv(&df, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("08401"));
        assert!(written.starts_with("id,name,"));
    }
}
