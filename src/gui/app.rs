//! Facilities Explorer Main Application
//! Main window with the filter sidebar and the dashboard sections.

use crate::charts::BarChartData;
use crate::config::Args;
use crate::data::{
    read_facilities, write_csv, DataProcessor, FacilityFilter, FacilityLoader,
    DEFAULT_EXPORT_NAME,
};
use crate::geo::{ensure_latlon, Enrichment, NominatimGeocoder, RateLimiter};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction, MapState, MapView, TableView};
use egui::{Color32, RichText, SidePanel};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// CSV loading result from background thread
enum LoadResult {
    Progress(String),
    Complete { df: DataFrame, path: PathBuf },
    Error(String),
}

/// Geocoding result from background thread
enum GeocodeResult {
    Progress { generation: u64, done: usize, total: usize },
    Complete { generation: u64, enrichment: Enrichment },
    Unavailable(String),
}

/// Main application window.
pub struct ExplorerApp {
    args: Args,
    loader: FacilityLoader,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    map_view: MapView,
    table_view: TableView,

    /// Current filtered table
    filtered: Option<DataFrame>,
    /// Hard failure shown instead of the dashboard
    load_error: Option<String>,

    // Async CSV loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,

    // Async geocoding; `generation` bumps on every filter change and is shared
    // with the running geocoding thread so an outdated run stops early
    geocode_rx: Option<Receiver<GeocodeResult>>,
    is_geocoding: bool,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    geocode_pending: bool,
}

impl ExplorerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, args: Args) -> Self {
        Self::with_args(args)
    }

    fn with_args(args: Args) -> Self {
        let mut app = Self {
            map_view: MapView::new(args.geocode_cache.clone()),
            args,
            loader: FacilityLoader::new(),
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            table_view: TableView::new(),
            filtered: None,
            load_error: None,
            load_rx: None,
            is_loading: false,
            geocode_rx: None,
            is_geocoding: false,
            generation: 0,
            current_generation: Arc::new(AtomicU64::new(0)),
            geocode_pending: false,
        };
        let assets = app.args.assets.clone();
        app.start_loading(assets);
        app
    }

    /// Load a facility CSV in a background thread
    fn start_loading(&mut self, path: PathBuf) {
        if self.is_loading {
            info!("Ignoring {} while another CSV is loading", path.display());
            self.control_panel
                .set_progress(0.0, "Still loading the previous CSV; try again when it finishes");
            return;
        }

        self.control_panel.csv_path = Some(path.clone());
        self.control_panel.set_progress(0.0, "Loading CSV file...");
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress("Reading CSV file...".to_string()));

            match read_facilities(&path) {
                Ok(df) => {
                    let _ = tx.send(LoadResult::Complete { df, path });
                }
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                }
            }
        });
    }

    /// Handle CSV file selection
    fn handle_browse_csv(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.start_loading(path);
        }
    }

    /// Check for CSV loading results
    fn check_load_results(&mut self) {
        let rx = self.load_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    LoadResult::Progress(status) => {
                        self.control_panel.set_progress(0.0, &status);
                    }
                    LoadResult::Complete { df, path } => {
                        let total = df.height();
                        let filter = FacilityFilter::select_all(&df);
                        self.loader.set_dataframe(df, path);
                        self.control_panel.update_options(total, filter);
                        self.control_panel
                            .set_progress(100.0, &format!("Loaded {} facilities", total));
                        self.load_error = None;
                        self.is_loading = false;
                        should_keep_receiver = false;
                        self.apply_filters();
                    }
                    LoadResult::Error(message) => {
                        error!("{}", message);
                        self.control_panel
                            .set_progress(0.0, &format!("Error: {}", message));
                        self.load_error = Some(message);
                        self.is_loading = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.load_rx = Some(rx);
            }
        }
    }

    /// Recompute the filtered table and every view derived from it
    fn apply_filters(&mut self) {
        let Some(df) = self.loader.dataframe() else {
            return;
        };

        let derived = self.control_panel.filter.apply(df).and_then(|filtered| {
            let by_city = DataProcessor::count_by(&filtered, "city")?;
            let by_zip = DataProcessor::count_by(&filtered, "zip")?;
            let rows = DataProcessor::sorted_by_name(DataProcessor::records(&filtered)?);
            Ok((filtered, by_city, by_zip, rows))
        });

        match derived {
            Ok((filtered, by_city, by_zip, rows)) => {
                self.chart_viewer.set_chart_data(
                    BarChartData::new("city", "City", by_city),
                    BarChartData::new("zip", "ZIP", by_zip),
                );
                self.table_view.set_rows(rows);
                self.filtered = Some(filtered);
            }
            Err(e) => {
                warn!("Filtering failed: {}", e);
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
                self.chart_viewer.clear();
                self.table_view.set_rows(Vec::new());
                self.filtered = None;
            }
        }

        self.generation += 1;
        self.current_generation.store(self.generation, Ordering::Relaxed);
        if self.map_view.enabled {
            self.geocode_pending = true;
        }
    }

    /// Start map enrichment for the current filtered rows
    fn start_geocoding(&mut self) {
        self.geocode_pending = false;
        let records = self.table_view.rows.clone();
        let cache_path = self.args.geocode_cache.clone();
        let endpoint = self.args.nominatim_url.clone();
        let min_delay = self.args.min_delay();
        let max_retries = self.args.max_retries;
        let error_wait = self.args.error_wait();
        let generation = self.generation;
        let current_generation = Arc::clone(&self.current_generation);

        let (tx, rx) = channel();
        self.geocode_rx = Some(rx);
        self.is_geocoding = true;
        self.map_view.state = MapState::Geocoding { done: 0, total: 0 };

        thread::spawn(move || {
            let geocoder = match NominatimGeocoder::new(&endpoint) {
                Ok(geocoder) => {
                    RateLimiter::new(geocoder, min_delay).with_retries(max_retries, error_wait)
                }
                Err(e) => {
                    let _ = tx.send(GeocodeResult::Unavailable(e.to_string()));
                    return;
                }
            };

            let progress_tx = tx.clone();
            let enrichment = ensure_latlon(
                &records,
                &cache_path,
                &geocoder,
                |done, total| {
                    let _ = progress_tx.send(GeocodeResult::Progress {
                        generation,
                        done,
                        total,
                    });
                },
                || current_generation.load(Ordering::Relaxed) != generation,
            );
            let _ = tx.send(GeocodeResult::Complete {
                generation,
                enrichment,
            });
        });
    }

    /// Check for geocoding results
    fn check_geocode_results(&mut self) {
        let rx = self.geocode_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    GeocodeResult::Progress {
                        generation,
                        done,
                        total,
                    } => {
                        if generation == self.generation {
                            self.map_view.state = MapState::Geocoding { done, total };
                        }
                    }
                    GeocodeResult::Complete {
                        generation,
                        enrichment,
                    } => {
                        if generation == self.generation {
                            self.map_view.state = MapState::Ready(enrichment);
                        }
                        self.is_geocoding = false;
                        should_keep_receiver = false;
                    }
                    GeocodeResult::Unavailable(reason) => {
                        warn!("Geocoding not available: {}", reason);
                        self.map_view.state = MapState::Unavailable(reason);
                        self.is_geocoding = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.geocode_rx = Some(rx);
            }
        }
    }

    /// Save the filtered table where the user chooses
    fn handle_download(&mut self) {
        let Some(filtered) = &self.filtered else {
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(DEFAULT_EXPORT_NAME)
            .save_file()
        else {
            return; // User cancelled
        };

        match write_csv(filtered, &path) {
            Ok(()) => {
                info!("Saved filtered CSV to {}", path.display());
                let status = format!("Complete! Saved {} rows", filtered.height());
                self.control_panel.set_progress(100.0, &status);
            }
            Err(e) => {
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }

    fn show_dashboard(&mut self, ui: &mut egui::Ui) {
        let total = self.loader.row_count();
        let shown = self.filtered.as_ref().map(|df| df.height()).unwrap_or(0);
        ui.label(
            RichText::new(format!(
                "Showing {} of {} facilities after applying filters.",
                shown, total
            ))
            .strong(),
        );
        ui.add_space(10.0);

        self.chart_viewer.show(ui);
        ui.add_space(15.0);
        ui.separator();

        if self.map_view.show(ui) {
            self.geocode_pending = true;
            ui.ctx().request_repaint();
        }
        ui.add_space(15.0);
        ui.separator();

        if self.table_view.show(ui) {
            self.handle_download();
        }
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();
        self.check_geocode_results();

        if self.geocode_pending && self.map_view.enabled && !self.is_geocoding {
            self.start_geocoding();
        }

        // Request repaint while background work is running
        if self.is_loading || self.is_geocoding || self.geocode_pending {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::FiltersChanged => self.apply_filters(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Colorado State-owned Facilities Explorer");
            let source = self
                .loader
                .file_path()
                .or(self.control_panel.csv_path.as_ref())
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            ui.label(
                RichText::new(format!(
                    "Browse, filter, chart, and map facilities from {}",
                    source
                ))
                .color(Color32::GRAY),
            );
            ui.add_space(10.0);

            if let Some(message) = &self.load_error {
                ui.label(
                    RichText::new(message)
                        .size(16.0)
                        .color(Color32::from_rgb(220, 53, 69)),
                );
                return;
            }

            if self.loader.dataframe().is_none() {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("No Data").size(20.0));
                });
                return;
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| self.show_dashboard(ui));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    const SAMPLE_CSV: &str = "id,name,address,city,state,zip\n1,Capitol,200 E Colfax Ave,Denver,CO,80203\n";

    fn app_for(path: &std::path::Path) -> ExplorerApp {
        let assets = path.to_string_lossy().to_string();
        ExplorerApp::with_args(Args::parse_from(["facilities_explorer", "--assets", &assets]))
    }

    #[test]
    fn test_browse_while_loading_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("assets.csv");
        fs::write(&first, SAMPLE_CSV).unwrap();

        let mut app = app_for(&first);
        assert!(app.is_loading);

        app.start_loading(dir.path().join("other.csv"));

        assert_eq!(app.control_panel.csv_path.as_deref(), Some(first.as_path()));
        assert!(app.control_panel.status.contains("Still loading"));
    }

    #[test]
    fn test_outdated_geocoding_progress_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&dir.path().join("missing.csv"));
        app.generation = 2;
        app.map_view.state = MapState::Geocoding { done: 0, total: 0 };

        let (tx, rx) = channel();
        app.geocode_rx = Some(rx);
        app.is_geocoding = true;
        tx.send(GeocodeResult::Progress { generation: 1, done: 5, total: 9 })
            .unwrap();
        tx.send(GeocodeResult::Progress { generation: 2, done: 1, total: 3 })
            .unwrap();
        tx.send(GeocodeResult::Progress { generation: 1, done: 6, total: 9 })
            .unwrap();
        app.check_geocode_results();

        assert!(matches!(
            app.map_view.state,
            MapState::Geocoding { done: 1, total: 3 }
        ));
        assert!(app.is_geocoding);
    }

    #[test]
    fn test_filter_change_cancels_running_geocoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&dir.path().join("missing.csv"));
        let csv = dir.path().join("assets.csv");
        fs::write(&csv, SAMPLE_CSV).unwrap();
        app.loader.set_dataframe(read_facilities(&csv).unwrap(), csv);

        let observed = Arc::clone(&app.current_generation);
        let running = observed.load(Ordering::Relaxed);
        app.apply_filters();

        assert_ne!(observed.load(Ordering::Relaxed), running);
        assert_eq!(observed.load(Ordering::Relaxed), app.generation);
    }
}
