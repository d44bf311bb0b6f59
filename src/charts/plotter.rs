//! Chart Plotter Module
//! Count bar charts and the facility map using egui_plot.

use crate::data::{CategoryCount, MapPoint};
use egui::Color32;
use egui_plot::{Bar, BarChart, GridMark, Plot, PlotPoints, Points};

pub const BAR_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
pub const POINT_COLOR: Color32 = Color32::from_rgb(231, 76, 60); // Red

/// Height of each bar chart in points
const CHART_HEIGHT: f32 = 400.0;
const MAP_HEIGHT: f32 = 450.0;

/// Data behind one "Facilities by ..." chart.
#[derive(Debug, Clone, Default)]
pub struct BarChartData {
    /// Unique plot id, also used as the value axis title
    pub id: String,
    pub axis_label: String,
    /// Largest first
    pub counts: Vec<CategoryCount>,
}

impl BarChartData {
    pub fn new(id: &str, axis_label: &str, counts: Vec<CategoryCount>) -> Self {
        Self {
            id: id.to_string(),
            axis_label: axis_label.to_string(),
            counts,
        }
    }

    /// Vertical slot of the i-th entry; the first entry sits at the top.
    pub fn slot(&self, index: usize) -> f64 {
        (self.counts.len() - 1 - index) as f64
    }

    /// Category shown at a vertical position, if any.
    pub fn label_at(&self, value: f64) -> Option<&str> {
        let rounded = value.round();
        if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
            return None;
        }
        let slot = rounded as usize;
        if slot >= self.counts.len() {
            return None;
        }
        self.counts
            .get(self.counts.len() - 1 - slot)
            .map(|c| c.label.as_str())
    }
}

/// Draws dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Horizontal bar chart, one bar per category, largest at the top.
    pub fn draw_count_chart(ui: &mut egui::Ui, data: &BarChartData) {
        if data.counts.is_empty() {
            ui.label("No facilities to chart");
            return;
        }

        let bars: Vec<Bar> = data
            .counts
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Bar::new(data.slot(i), c.count as f64)
                    .name(&c.label)
                    .width(0.7)
            })
            .collect();

        let slots: Vec<f64> = (0..data.counts.len()).map(|i| i as f64).collect();
        let labels = data.clone();

        Plot::new(format!("bars_{}", data.id))
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .x_axis_label("Count")
            .y_axis_label(data.axis_label.clone())
            .include_x(0.0)
            .y_grid_spacer(move |_input| {
                slots
                    .iter()
                    .map(|&value| GridMark {
                        value,
                        step_size: 1.0,
                    })
                    .collect()
            })
            .y_axis_formatter(move |mark, _range| {
                labels.label_at(mark.value).unwrap_or_default().to_string()
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .horizontal()
                        .color(BAR_COLOR)
                        .name(&data.axis_label)
                        .element_formatter(Box::new(|bar, _chart| {
                            format!("{}: {}", bar.name, bar.value)
                        })),
                );
            });
    }

    /// Scatter of geocoded facilities: x = longitude, y = latitude.
    pub fn draw_map(ui: &mut egui::Ui, points: &[MapPoint]) {
        let coords: Vec<[f64; 2]> = points
            .iter()
            .map(|p| [p.position.longitude, p.position.latitude])
            .collect();
        let hover_points: Vec<([f64; 2], String)> = points
            .iter()
            .zip(coords.iter())
            .map(|(p, &xy)| (xy, p.record.name.clone()))
            .collect();

        Plot::new("facility_map")
            .height(MAP_HEIGHT)
            .data_aspect(1.0)
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .label_formatter(move |_name, value| {
                match Self::nearest_name(&hover_points, [value.x, value.y]) {
                    Some(name) => format!("{}\n{:.5}, {:.5}", name, value.y, value.x),
                    None => format!("{:.5}, {:.5}", value.y, value.x),
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(coords.iter().copied()))
                        .radius(4.0)
                        .color(POINT_COLOR)
                        .name("Facilities"),
                );
            });
    }

    /// Name of the point closest to `at`, within a small hover radius (degrees).
    pub fn nearest_name(points: &[([f64; 2], String)], at: [f64; 2]) -> Option<&str> {
        const HOVER_RADIUS: f64 = 0.02;
        points
            .iter()
            .map(|(xy, name)| {
                let dx = xy[0] - at[0];
                let dy = xy[1] - at[1];
                (dx * dx + dy * dy, name)
            })
            .filter(|(d2, _)| *d2 <= HOVER_RADIUS * HOVER_RADIUS)
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, name)| name.as_str())
    }
}
