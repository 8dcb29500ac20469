//! Panel components for the operator window
//!
//! Each panel renders one area of the window and returns the actions the
//! operator triggered. Enable/disable decisions come from the session's
//! [`Capabilities`], never from the panel's own idea of the state.
//!
//! # Panels
//!
//! - [`ConnectionPanel`] - Port and baud selection, connect/disconnect
//! - [`CalibrationPanel`] - Gas type, start/stop, progress, save/export/clear
//! - [`ResultsPanel`] - R0 results block
//! - [`ReadingsTable`] - Most recent readings

use crate::config::{AppConfig, SUPPORTED_BAUD_RATES};
use crate::frontend::state::AppAction;
use crate::frontend::topics::{NoticeKind, Topics};
use crate::types::{AlertLevel, CalibrationState, Capabilities, GasType, Reading};
use egui::{Color32, RichText, Ui};

/// Text shown for absent optional fields
pub const MISSING_VALUE: &str = "--";

pub struct ConnectionPanel;

impl ConnectionPanel {
    pub fn render(
        ui: &mut Ui,
        topics: &Topics,
        port: &mut String,
        baud_rate: &mut u32,
    ) -> Vec<AppAction> {
        let mut actions = Vec::new();
        let caps = topics.status.capabilities;

        ui.heading("Connection");
        egui::Grid::new("connection_grid")
            .num_columns(2)
            .spacing([8.0, 6.0])
            .show(ui, |ui| {
                ui.label("Port:");
                ui.horizontal(|ui| {
                    ui.add_enabled_ui(caps.can_connect, |ui| {
                        let selected = if port.is_empty() {
                            "Select a port".to_string()
                        } else {
                            port.clone()
                        };
                        egui::ComboBox::from_id_salt("port_select")
                            .selected_text(selected)
                            .width(180.0)
                            .show_ui(ui, |ui| {
                                for info in &topics.available_ports {
                                    ui.selectable_value(port, info.name.clone(), info.to_string());
                                }
                            });
                    });
                    if ui.small_button("⟳").on_hover_text("Refresh ports").clicked() {
                        actions.push(AppAction::RefreshPorts);
                    }
                });
                ui.end_row();

                ui.label("Baud:");
                ui.add_enabled_ui(caps.can_connect, |ui| {
                    egui::ComboBox::from_id_salt("baud_select")
                        .selected_text(baud_rate.to_string())
                        .show_ui(ui, |ui| {
                            for rate in SUPPORTED_BAUD_RATES {
                                ui.selectable_value(baud_rate, rate, rate.to_string());
                            }
                        });
                });
                ui.end_row();
            });

        ui.horizontal(|ui| {
            if caps.can_disconnect {
                if ui.button("🔌 Disconnect").clicked() {
                    actions.push(AppAction::Disconnect);
                }
            } else if ui
                .add_enabled(caps.can_connect, egui::Button::new("🔌 Connect"))
                .clicked()
            {
                actions.push(AppAction::Connect {
                    port: port.clone(),
                    baud_rate: *baud_rate,
                });
            }
        });

        actions
    }
}

pub struct CalibrationPanel;

impl CalibrationPanel {
    pub fn render(ui: &mut Ui, topics: &Topics, config: &mut AppConfig) -> Vec<AppAction> {
        let mut actions = Vec::new();
        let caps = topics.status.capabilities;

        ui.heading("Calibration");
        egui::Grid::new("calibration_grid")
            .num_columns(2)
            .spacing([8.0, 6.0])
            .show(ui, |ui| {
                ui.label("Gas type:");
                egui::ComboBox::from_id_salt("gas_type_select")
                    .selected_text(config.calibration.gas_type.to_string())
                    .show_ui(ui, |ui| {
                        for gas in GasType::ALL {
                            ui.selectable_value(
                                &mut config.calibration.gas_type,
                                gas,
                                gas.to_string(),
                            );
                        }
                    });
                ui.end_row();

                ui.label("Samples:");
                ui.add(
                    egui::DragValue::new(&mut config.calibration.target_samples)
                        .range(1..=10_000),
                );
                ui.end_row();
            });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(caps.can_start_calibration, egui::Button::new("▶ Start"))
                .clicked()
            {
                actions.push(AppAction::StartCalibration);
            }
            if ui
                .add_enabled(caps.can_stop_calibration, egui::Button::new("⏹ Stop"))
                .clicked()
            {
                actions.push(AppAction::StopCalibration);
            }
        });

        ui.add(
            egui::ProgressBar::new((topics.status.progress / 100.0).clamp(0.0, 1.0) as f32)
                .show_percentage(),
        );
        ui.label(status_label(topics.status.calibration));

        ui.separator();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(caps.can_save_calibration, egui::Button::new("💾 Save Calibration"))
                .clicked()
            {
                actions.push(AppAction::SaveCalibration(None));
            }
            if ui
                .add_enabled(caps.can_export, egui::Button::new("📄 Export CSV"))
                .clicked()
            {
                actions.push(AppAction::ExportCsv(None));
            }
            if ui.button("🗑 Clear Data").clicked() {
                actions.push(AppAction::ClearData);
            }
        });

        if let Some(notice) = &topics.notice {
            let color = match notice.kind {
                NoticeKind::Info => Color32::LIGHT_GREEN,
                NoticeKind::Error => Color32::LIGHT_RED,
            };
            ui.colored_label(color, &notice.text);
        }

        actions
    }
}

fn status_label(state: CalibrationState) -> RichText {
    match state {
        CalibrationState::Idle => RichText::new("Ready"),
        CalibrationState::Running => RichText::new("Calibrating...").color(Color32::YELLOW),
        CalibrationState::Completed => RichText::new("Calibration completed").color(Color32::GREEN),
        CalibrationState::Failed => RichText::new("Calibration failed").color(Color32::RED),
    }
}

pub struct ResultsPanel;

impl ResultsPanel {
    pub fn render(ui: &mut Ui, topics: &Topics) {
        ui.heading("Results");
        match &topics.calibration_result {
            Some(result) => {
                ui.label(RichText::new(result.summary()).monospace());
            }
            None => {
                ui.weak("No calibration results yet");
            }
        }
    }
}

pub struct ReadingsTable;

impl ReadingsTable {
    pub const HEADERS: [&'static str; 7] = [
        "Time",
        "Raw",
        "Voltage",
        "Resistance",
        "Gas PPM",
        "Alert",
        "R0",
    ];

    /// Render the newest `rows` readings, oldest first
    pub fn render(ui: &mut Ui, readings: &[Reading], rows: usize) {
        ui.heading("Recent Readings");
        egui::ScrollArea::vertical()
            .id_salt("readings_table_scroll")
            .max_height(260.0)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                egui::Grid::new("readings_table")
                    .striped(true)
                    .num_columns(Self::HEADERS.len())
                    .show(ui, |ui| {
                        for header in Self::HEADERS {
                            ui.label(RichText::new(header).strong());
                        }
                        ui.end_row();

                        for reading in recent(readings, rows) {
                            let cells = table_row(reading);
                            for (i, cell) in cells.iter().enumerate() {
                                if i == 5 {
                                    ui.colored_label(alert_color(reading.alert()), cell);
                                } else {
                                    ui.label(RichText::new(cell).monospace());
                                }
                            }
                            ui.end_row();
                        }
                    });
            });
    }
}

/// The last `rows` readings in arrival order
pub fn recent(readings: &[Reading], rows: usize) -> &[Reading] {
    &readings[readings.len().saturating_sub(rows)..]
}

/// Display cells for one reading, in [`ReadingsTable::HEADERS`] order
pub fn table_row(reading: &Reading) -> [String; 7] {
    let optional = |v: Option<f64>| {
        v.map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    };
    [
        reading.timestamp.format("%H:%M:%S").to_string(),
        optional(reading.raw_value),
        optional(reading.voltage),
        optional(reading.resistance),
        format!("{:.2}", reading.gas_ppm),
        reading.alert_level.to_string(),
        format!("{:.2}", reading.r0_value),
    ]
}

pub fn alert_color(level: AlertLevel) -> Color32 {
    match level {
        AlertLevel::Safe => Color32::GREEN,
        AlertLevel::Warning => Color32::YELLOW,
        AlertLevel::Danger => Color32::from_rgb(255, 140, 0),
        AlertLevel::Critical => Color32::RED,
        AlertLevel::Unknown(_) => Color32::GRAY,
    }
}

/// Whether an action is currently allowed; used to ignore stale clicks
pub fn action_allowed(action: &AppAction, caps: &Capabilities) -> bool {
    match action {
        AppAction::Connect { .. } => caps.can_connect,
        AppAction::Disconnect => caps.can_disconnect,
        AppAction::StartCalibration => caps.can_start_calibration,
        AppAction::StopCalibration => caps.can_stop_calibration,
        AppAction::SaveCalibration(_) => caps.can_save_calibration,
        AppAction::ExportCsv(_) => caps.can_export,
        AppAction::ClearData | AppAction::RefreshPorts => true,
    }
}
