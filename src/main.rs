//! Facilities Explorer - browse, filter, chart, map and export state-owned facilities
//!
//! Loads a facility CSV, filters it by city, ZIP and search text, charts
//! facility counts, optionally geocodes addresses onto a map and exports the
//! filtered rows.

mod charts;
mod config;
mod data;
mod geo;
mod gui;

use anyhow::{Context, Result};
use clap::Parser;
use config::Args;
use data::{write_csv, DataProcessor, FacilityFilter, FacilityLoader};
use eframe::egui;
use gui::ExplorerApp;
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(output) = args.export.clone() {
        return export_headless(&args, &output);
    }

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 700.0])
            .with_title("CO State Assets Explorer"),
        ..Default::default()
    };

    info!("Starting explorer for {}", args.assets.display());

    // Run the application
    eframe::run_native(
        "CO State Assets Explorer",
        options,
        Box::new(move |cc| Ok(Box::new(ExplorerApp::new(cc, args)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run window: {e}"))
}

/// Filter and export without a window, printing the two count tables.
fn export_headless(args: &Args, output: &Path) -> Result<()> {
    let mut loader = FacilityLoader::new();
    let df = loader.load_csv(&args.assets)?;
    let exported = export_filtered(df, args, output)?;
    println!("\nWrote {} rows to {}", exported, output.display());
    Ok(())
}

/// Apply the command-line filters to `df`, print the summary and write the
/// filtered rows to `output`. Returns the number of rows written.
fn export_filtered(df: &DataFrame, args: &Args, output: &Path) -> Result<usize> {
    let filter = args.filter_for(FacilityFilter::select_all(df));
    let filtered = filter.apply(df)?;

    println!(
        "Showing {} of {} facilities after applying filters.",
        filtered.height(),
        df.height()
    );
    for (title, column) in [("City", "city"), ("ZIP", "zip")] {
        println!("\nFacilities by {}", title);
        for entry in DataProcessor::count_by(&filtered, column)? {
            println!("  {:<30} {:>5}", entry.label, entry.count);
        }
    }

    write_csv(&filtered, output)
        .with_context(|| format!("Failed to export {}", output.display()))?;
    Ok(filtered.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_facilities;
    use std::fs;

    #[test]
    fn test_export_filtered_writes_matching_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("assets.csv");
        fs::write(
            &input,
            "ID,Name,Address,City,State,Zip,Agency\n\
             1,State Capitol,200 E Colfax Ave,Denver,co,80203,CDOT\n\
             2,Records Center,1001 E 62nd Ave,Denver,CO,80216,DPA\n\
             3,Motor Pool,5 Fleet Way,Pueblo,CO,81003,DPA\n\
             4,Capitol Annex,1375 Sherman St,Denver,CO,80203,DPA\n",
        )
        .unwrap();
        let output = dir.path().join("assets_filtered.csv");
        let df = read_facilities(&input).unwrap();

        let args = Args::parse_from([
            "facilities_explorer",
            "--export",
            "unused.csv",
            "--city",
            "Denver",
            "--zip",
            "80203",
            "--search",
            "CAPITOL",
        ]);
        let written = export_filtered(&df, &args, &output).unwrap();

        assert_eq!(written, 2);
        let csv = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,name,address,city,state,zip,agency,full_address");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,State Capitol,200 E Colfax Ave,Denver,CO,80203,CDOT,"));
        assert!(lines[1].ends_with("\"200 E Colfax Ave, Denver, CO 80203\""));
        assert!(lines[2].starts_with("4,Capitol Annex,"));
    }

    #[test]
    fn test_export_filtered_without_flags_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("assets.csv");
        fs::write(
            &input,
            "id,name,address,city,state,zip\n\
             1,State Capitol,200 E Colfax Ave,Denver,CO,80203\n\
             2,Motor Pool,5 Fleet Way,Pueblo,CO,81003\n",
        )
        .unwrap();
        let output = dir.path().join("out.csv");
        let df = read_facilities(&input).unwrap();

        let args = Args::parse_from(["facilities_explorer", "--export", "out.csv"]);
        assert_eq!(export_filtered(&df, &args, &output).unwrap(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 3);
    }
}
