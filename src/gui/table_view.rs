//! Table View Widget
//! Filtered facilities sorted by name, with the CSV download button.

use crate::data::FacilityRecord;
use egui::{RichText, ScrollArea};

const TABLE_HEIGHT: f32 = 400.0;
const HEADERS: [&str; 6] = ["id", "name", "address", "city", "state", "zip"];

#[derive(Default)]
pub struct TableView {
    /// Rows already sorted by name
    pub rows: Vec<FacilityRecord>,
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rows(&mut self, rows: Vec<FacilityRecord>) {
        self.rows = rows;
    }

    /// Draw the table; returns true when "Download filtered CSV" was clicked.
    pub fn show(&self, ui: &mut egui::Ui) -> bool {
        ui.label(RichText::new("Table").size(16.0).strong());
        ui.add_space(5.0);

        ScrollArea::both()
            .id_salt("facility_table")
            .max_height(TABLE_HEIGHT)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                egui::Grid::new("facility_table_grid")
                    .striped(true)
                    .min_col_width(55.0)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        for header in HEADERS {
                            ui.label(RichText::new(header).strong());
                        }
                        ui.end_row();

                        for row in &self.rows {
                            ui.label(row.id.map(|id| id.to_string()).unwrap_or_default());
                            ui.label(&row.name);
                            ui.label(&row.address);
                            ui.label(&row.city);
                            ui.label(&row.state);
                            ui.label(&row.zip);
                            ui.end_row();
                        }
                    });
            });

        ui.add_space(8.0);
        ui.button("⬇ Download filtered CSV").clicked()
    }
}
