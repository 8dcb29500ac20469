//! Status bar panel: bottom bar showing connection, line counters and the
//! latest reading.

use egui::{Color32, RichText, Ui};

use crate::frontend::panels::alert_color;
use crate::frontend::topics::Topics;
use crate::types::ConnectionStatus;

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub topics: &'a Topics,
    pub port: &'a str,
    pub stored_readings: usize,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection status dot + port ===
        let (status_color, status_text) = match ctx.topics.status.connection {
            ConnectionStatus::Connected => (Color32::GREEN, "Connected"),
            ConnectionStatus::Disconnected => (Color32::GRAY, "Disconnected"),
        };
        ui.colored_label(status_color, "●");
        let connected = ctx.topics.status.connection == ConnectionStatus::Connected;
        let port_display = if ctx.port.is_empty() || !connected {
            status_text.to_string()
        } else {
            format!("{}: {}", status_text, ctx.port)
        };
        ui.label(RichText::new(port_display).small());

        ui.separator();

        let stats = &ctx.topics.stats;
        ui.label(RichText::new(format!("Lines: {}", stats.lines_received)).small());

        ui.separator();

        ui.label(RichText::new(format!("Readings: {}", ctx.stored_readings)).small());

        ui.separator();

        // === Malformed lines ===
        let malformed_color = if stats.lines_malformed > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            malformed_color,
            RichText::new(format!("Malformed: {}", stats.lines_malformed)).small(),
        );

        if stats.write_failures > 0 || stats.dropped_notifications > 0 {
            ui.separator();
            ui.colored_label(
                Color32::LIGHT_RED,
                RichText::new(format!(
                    "Write failures: {}  Dropped: {}",
                    stats.write_failures, stats.dropped_notifications
                ))
                .small(),
            );
        }

        // === Latest reading (right-aligned) ===
        if let Some(reading) = &ctx.topics.latest_reading {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(
                    alert_color(reading.alert()),
                    RichText::new(format!("{:.2} ppm ({})", reading.gas_ppm, reading.alert()))
                        .small(),
                );
            });
        }
    });
}
