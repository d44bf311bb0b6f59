//! Map View Widget
//! Opt-in geocoding and the facility scatter map.

use crate::charts::ChartPlotter;
use crate::geo::Enrichment;
use egui::{Color32, RichText};
use std::path::PathBuf;

/// What the map section is currently showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MapState {
    #[default]
    Idle,
    Geocoding {
        done: usize,
        total: usize,
    },
    Ready(Enrichment),
    Unavailable(String),
}

pub struct MapView {
    pub enabled: bool,
    pub state: MapState,
    pub cache_path: PathBuf,
}

impl MapView {
    pub fn new(cache_path: PathBuf) -> Self {
        Self {
            enabled: false,
            state: MapState::Idle,
            cache_path,
        }
    }

    /// Draw the map section; returns true when the checkbox was just turned on.
    pub fn show(&mut self, ui: &mut egui::Ui) -> bool {
        let mut turned_on = false;

        ui.label(RichText::new("Map").size(16.0).strong());
        egui::CollapsingHeader::new("Show map")
            .default_open(false)
            .show(ui, |ui| {
                if ui
                    .checkbox(&mut self.enabled, "Enable geocoding and map")
                    .changed()
                    && self.enabled
                {
                    turned_on = true;
                }

                if !self.enabled {
                    ui.label(
                        RichText::new(
                            "Enable to geocode addresses and visualize points on a map.",
                        )
                        .color(Color32::from_rgb(0, 123, 255)),
                    );
                    return;
                }

                match &self.state {
                    MapState::Idle => {
                        ui.spinner();
                    }
                    MapState::Geocoding { done, total } => {
                        let fraction = *done as f32 / (*total).max(1) as f32;
                        ui.add(
                            egui::ProgressBar::new(fraction)
                                .text(format!("Geocoding {}/{}", done, total))
                                .animate(true),
                        );
                    }
                    MapState::Unavailable(reason) => {
                        Self::warning(
                            ui,
                            &format!("Geocoding not available ({reason}); showing data without map."),
                        );
                    }
                    MapState::Ready(enrichment) if enrichment.points.is_empty() => {
                        Self::warning(ui, "No points could be geocoded.");
                    }
                    MapState::Ready(enrichment) => {
                        ChartPlotter::draw_map(ui, &enrichment.points);
                        ui.label(
                            RichText::new(format!(
                                "Geocoding via OpenStreetMap Nominatim; cached locally to {}",
                                self.cache_path.display()
                            ))
                            .size(11.0)
                            .color(Color32::GRAY),
                        );
                        if enrichment.unresolved > 0 {
                            ui.label(
                                RichText::new(format!(
                                    "{} facilities could not be placed",
                                    enrichment.unresolved
                                ))
                                .size(11.0)
                                .color(Color32::GRAY),
                            );
                        }
                    }
                }
            });

        turned_on
    }

    fn warning(ui: &mut egui::Ui, text: &str) {
        ui.label(RichText::new(format!("⚠ {text}")).color(Color32::from_rgb(255, 193, 7)));
    }
}
