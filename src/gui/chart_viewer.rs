//! Chart Viewer Widget
//! "Facilities by City" and "Facilities by ZIP" side by side.

use crate::charts::{BarChartData, ChartPlotter};
use egui::RichText;

const CHART_SPACING: f32 = 15.0;

#[derive(Default)]
pub struct ChartViewer {
    pub by_city: BarChartData,
    pub by_zip: BarChartData,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.by_city = BarChartData::default();
        self.by_zip = BarChartData::default();
    }

    pub fn set_chart_data(&mut self, by_city: BarChartData, by_zip: BarChartData) {
        self.by_city = by_city;
        self.by_zip = by_zip;
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let column_width = ((ui.available_width() - CHART_SPACING) / 2.0).max(200.0);

        ui.horizontal_top(|ui| {
            for (title, data) in [
                ("Facilities by City", &self.by_city),
                ("Facilities by ZIP", &self.by_zip),
            ] {
                ui.vertical(|ui| {
                    ui.set_width(column_width);
                    ui.label(RichText::new(title).size(16.0).strong());
                    ui.add_space(5.0);
                    ChartPlotter::draw_count_chart(ui, data);
                });
                ui.add_space(CHART_SPACING);
            }
        });
    }
}
