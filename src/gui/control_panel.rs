//! Control Panel Widget
//! Left side panel with the data source, overview and filter controls.

use crate::data::FacilityFilter;
use egui::{Color32, RichText, ScrollArea};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Left side control panel with file selection and filters.
pub struct ControlPanel {
    pub csv_path: Option<PathBuf>,
    pub total_facilities: usize,
    pub city_options: Vec<String>,
    pub zip_options: Vec<String>,
    pub filter: FacilityFilter,
    pub progress: f32,
    pub status: String,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            csv_path: None,
            total_facilities: 0,
            city_options: Vec::new(),
            zip_options: Vec::new(),
            filter: FacilityFilter::default(),
            progress: 0.0,
            status: "Ready".to_string(),
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset options after a CSV load; every city and ZIP starts selected.
    pub fn update_options(&mut self, total: usize, filter: FacilityFilter) {
        self.total_facilities = total;
        self.city_options = filter.cities.iter().cloned().collect();
        self.zip_options = filter.zips.iter().cloned().collect();
        self.filter = filter;
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📍 State Assets")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== CSV File Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .csv_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());

                    ui.label(RichText::new(&path_text).size(12.0).color(
                        if self.csv_path.is_some() {
                            Color32::WHITE
                        } else {
                            Color32::GRAY
                        },
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseCsv;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Overview =====
        ui.label(RichText::new("Overview").size(14.0).strong());
        ui.label(RichText::new("Total facilities").size(11.0).color(Color32::GRAY));
        ui.label(RichText::new(self.total_facilities.to_string()).size(24.0));

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Filters =====
        ui.label(RichText::new("🔧 Filters").size(14.0).strong());
        ui.add_space(8.0);

        ui.label("City");
        if Self::multiselect(ui, "city_filter", &self.city_options, &mut self.filter.cities) {
            action = ControlPanelAction::FiltersChanged;
        }

        ui.add_space(10.0);

        ui.label("ZIP");
        if Self::multiselect(ui, "zip_filter", &self.zip_options, &mut self.filter.zips) {
            action = ControlPanelAction::FiltersChanged;
        }

        ui.add_space(10.0);

        ui.label("Search name/address contains");
        if ui.text_edit_singleline(&mut self.filter.query).changed() {
            action = ControlPanelAction::FiltersChanged;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Status").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Complete") || self.status.starts_with("Loaded") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Checkbox list with Select All / Clear All. Returns true when the
    /// selection changed.
    fn multiselect(
        ui: &mut egui::Ui,
        id: &str,
        options: &[String],
        selected: &mut BTreeSet<String>,
    ) -> bool {
        let mut changed = false;

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt(id)
                    .max_height(120.0)
                    .show(ui, |ui| {
                        for option in options {
                            let mut on = selected.contains(option);
                            if ui.checkbox(&mut on, option).changed() {
                                if on {
                                    selected.insert(option.clone());
                                } else {
                                    selected.remove(option);
                                }
                                changed = true;
                            }
                        }
                    });
            });

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            if ui.small_button("Select All").clicked() {
                selected.extend(options.iter().cloned());
                changed = true;
            }
            if ui.small_button("Clear All").clicked() {
                selected.clear();
                changed = true;
            }
        });

        changed
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    FiltersChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_options_selects_everything() {
        let mut panel = ControlPanel::new();
        let filter = FacilityFilter {
            cities: BTreeSet::from(["Denver".to_string(), "Aurora".to_string()]),
            zips: BTreeSet::from(["80202".to_string()]),
            query: String::new(),
        };

        panel.update_options(3, filter.clone());

        assert_eq!(panel.total_facilities, 3);
        assert_eq!(panel.city_options, vec!["Aurora", "Denver"]);
        assert_eq!(panel.filter, filter);
    }
}
