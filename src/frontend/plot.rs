//! Plot rendering for stored readings
//!
//! Two stacked egui_plot charts share an X axis of seconds since the first
//! stored reading: gas concentration on top, alert level below.

use crate::config::RuntimeSettings;
use crate::types::Reading;
use egui::{Color32, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotBounds, PlotPoints};

/// Plot series derived from a store snapshot
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReadingSeries {
    /// `[seconds, gas_ppm]`
    pub gas: Vec<[f64; 2]>,
    /// `[seconds, alert_level]`
    pub alert: Vec<[f64; 2]>,
}

impl ReadingSeries {
    pub fn from_readings(readings: &[Reading]) -> Self {
        let Some(first) = readings.first() else {
            return Self::default();
        };
        let origin = first.timestamp;

        let mut series = Self {
            gas: Vec::with_capacity(readings.len()),
            alert: Vec::with_capacity(readings.len()),
        };
        for reading in readings {
            let t = (reading.timestamp - origin).num_microseconds().unwrap_or(0) as f64 / 1e6;
            series.gas.push([t, reading.gas_ppm]);
            series.alert.push([t, reading.alert_level as f64]);
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.gas.is_empty()
    }

    /// Time span covered, in seconds
    pub fn duration(&self) -> f64 {
        match (self.gas.first(), self.gas.last()) {
            (Some(first), Some(last)) => last[0] - first[0],
            _ => 0.0,
        }
    }
}

/// Stacked gas/alert plots
pub struct ReadingsPlot {
    pub line_width: f32,
    pub gas_color: Color32,
    pub alert_color: Color32,
}

impl Default for ReadingsPlot {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            gas_color: Color32::from_rgb(80, 160, 255),
            alert_color: Color32::from_rgb(255, 90, 90),
        }
    }
}

impl ReadingsPlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, ui: &mut Ui, readings: &[Reading], settings: &RuntimeSettings) {
        let series = ReadingSeries::from_readings(readings);
        if series.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.weak("No data yet");
            });
            return;
        }

        let height = ((ui.available_height() - 8.0) / 2.0).max(120.0);
        let span = series.duration().max(1.0);

        let gas_plot = Plot::new("gas_ppm_plot")
            .height(height)
            .x_axis_label("Time (s)")
            .y_axis_label("Gas PPM")
            .legend(Legend::default().position(Corner::RightTop))
            .auto_bounds([!settings.follow_latest, settings.autoscale_y]);

        gas_plot.show(ui, |plot_ui| {
            if settings.follow_latest {
                let (y_min, y_max) = match (settings.autoscale_y, settings.y_range) {
                    (false, Some(range)) => range,
                    _ => value_range(&series.gas),
                };
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([0.0, y_min], [span, y_max]));
            } else if let (false, Some((lo, hi))) = (settings.autoscale_y, settings.y_range) {
                let bounds = plot_ui.plot_bounds();
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [bounds.min()[0], lo],
                    [bounds.max()[0], hi],
                ));
            }
            plot_ui.line(
                Line::new("Gas PPM", PlotPoints::from(series.gas.clone()))
                    .color(self.gas_color)
                    .width(self.line_width),
            );
        });

        ui.add_space(8.0);

        let alert_plot = Plot::new("alert_level_plot")
            .height(height)
            .x_axis_label("Time (s)")
            .y_axis_label("Alert Level")
            .legend(Legend::default().position(Corner::RightTop))
            .auto_bounds([!settings.follow_latest, false]);

        alert_plot.show(ui, |plot_ui| {
            let (_, top) = value_range(&series.alert);
            let x = if settings.follow_latest {
                [0.0, span]
            } else {
                let bounds = plot_ui.plot_bounds();
                [bounds.min()[0], bounds.max()[0]]
            };
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([x[0], -0.5], [x[1], top.max(3.5)]));
            plot_ui.line(
                Line::new("Alert Level", PlotPoints::from(series.alert.clone()))
                    .color(self.alert_color)
                    .width(self.line_width),
            );
        });
    }
}

/// Y range covering all points with a small margin
fn value_range(points: &[[f64; 2]]) -> (f64, f64) {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[1]), hi.max(p[1]))
        });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let margin = ((max - min) * 0.1).max(1.0);
    (min - margin, max + margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};

    #[test]
    fn test_series_relative_time() {
        let t0 = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let readings = vec![
            Reading::at(t0, 100.0, 0, 9.8),
            Reading::at(t0 + Duration::milliseconds(500), 110.0, 1, 9.8),
            Reading::at(t0 + Duration::seconds(2), 130.0, 2, 9.8),
        ];
        let series = ReadingSeries::from_readings(&readings);
        assert_eq!(series.gas, vec![[0.0, 100.0], [0.5, 110.0], [2.0, 130.0]]);
        assert_eq!(series.alert, vec![[0.0, 0.0], [0.5, 1.0], [2.0, 2.0]]);
        assert_eq!(series.duration(), 2.0);
    }

    #[test]
    fn test_empty_series() {
        let series = ReadingSeries::from_readings(&[]);
        assert!(series.is_empty());
        assert_eq!(series.duration(), 0.0);
    }

    #[test]
    fn test_value_range_margin() {
        assert_eq!(value_range(&[]), (0.0, 1.0));
        let (lo, hi) = value_range(&[[0.0, 100.0], [1.0, 200.0]]);
        assert_eq!((lo, hi), (90.0, 210.0));
        // Flat data still gets a visible band
        assert_eq!(value_range(&[[0.0, 5.0]]), (4.0, 6.0));
    }
}
