//! Frontend module for egui UI
//!
//! This module provides the operator window using eframe/egui. It receives
//! notifications from the backend through crossbeam channels, reads readings
//! from the shared sample store, and turns button presses into backend
//! commands.
//!
//! # Layout
//!
//! - Left side panel: connection, calibration controls, results
//! - Central panel: gas/alert plots and the recent-readings table
//! - Bottom bar: connection and line statistics
//!
//! # Main Types
//!
//! - [`CalibrationApp`] - Main application state implementing [`eframe::App`]
//! - [`Topics`] - Backend state as last published
//! - [`ReadingsPlot`] - Plot rendering with egui_plot

mod panels;
mod plot;
pub mod state;
pub mod status_bar;
pub mod topics;

pub use panels::*;
pub use plot::{ReadingSeries, ReadingsPlot};
pub use state::AppAction;
pub use topics::{Notice, NoticeKind, Topics};

use crate::backend::FrontendReceiver;
use crate::config::{settings::RuntimeSettings, AppConfig, AppState};
use crate::error::CalibrationError;
use crate::export::{export_readings, CalibrationReport};
use crate::types::{ConnectionStatus, Reading};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Repaint interval while connected; new readings arrive a few times per second
const LIVE_REPAINT: Duration = Duration::from_millis(100);

/// Main application state
pub struct CalibrationApp {
    frontend: FrontendReceiver,
    config: AppConfig,
    app_state: AppState,
    settings: RuntimeSettings,
    topics: Topics,
    plot: ReadingsPlot,
    /// Port picked in the connection panel
    selected_port: String,
    selected_baud: u32,
}

impl CalibrationApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        frontend: FrontendReceiver,
        config: AppConfig,
        app_state: AppState,
    ) -> Self {
        frontend.refresh_ports();

        Self {
            selected_port: config.serial.port.clone(),
            selected_baud: config.serial.baud_rate,
            frontend,
            config,
            app_state,
            settings: RuntimeSettings::default(),
            topics: Topics::new(),
            plot: ReadingsPlot::new(),
        }
    }

    /// Fold pending backend notifications into the topics
    fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();
        for msg in messages {
            self.topics.apply(msg, &self.config.calibration);
        }
        had_messages
    }

    /// Stable copy of the stored readings for this frame
    fn snapshot_readings(&self) -> Vec<Reading> {
        match self.frontend.store.read() {
            Ok(store) => store.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        if !action_allowed(&action, &self.topics.status.capabilities) {
            tracing::debug!("Ignoring stale action {:?}", action);
            return;
        }

        match action {
            AppAction::Connect { port, baud_rate } => {
                self.config.serial.port = port.clone();
                self.config.serial.baud_rate = baud_rate;
                self.app_state.update_last_connection(&port, baud_rate);
                self.frontend.connect(port, baud_rate);
            }
            AppAction::Disconnect => self.frontend.disconnect(),
            AppAction::StartCalibration => {
                self.app_state.last_gas_type = Some(self.config.calibration.gas_type);
                self.app_state.target_samples = Some(self.config.calibration.target_samples);
                self.frontend.start_calibration();
            }
            AppAction::StopCalibration => self.frontend.stop_calibration(),
            AppAction::ClearData => self.frontend.clear_data(),
            AppAction::RefreshPorts => self.frontend.refresh_ports(),
            AppAction::ExportCsv(path) => {
                let Some(path) =
                    path.or_else(|| self.pick_save_path("CSV files", "csv", "gas_readings.csv"))
                else {
                    return;
                };
                let result = export_readings(&path, &self.snapshot_readings());
                let result = result.map(|rows| format!("Exported {} readings", rows));
                self.report_file_result(result, &path);
            }
            AppAction::SaveCalibration(path) => {
                let Some(path) = path.or_else(|| {
                    self.pick_save_path("JSON files", "json", "calibration.json")
                }) else {
                    return;
                };
                let result = CalibrationReport::build(
                    &self.snapshot_readings(),
                    self.topics.last_r0,
                    self.config.calibration.gas_type,
                    &self.config.device,
                )
                .and_then(|report| report.save(&path))
                .map(|()| "Calibration data saved".to_string());
                self.report_file_result(result, &path);
            }
        }
    }

    fn pick_save_path(&self, filter: &str, extension: &str, default_name: &str) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .add_filter(filter, &[extension])
            .add_filter("All files", &["*"])
            .set_file_name(default_name);
        if let Some(dir) = &self.app_state.last_export_dir {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file()
    }

    fn report_file_result(&mut self, result: Result<String, CalibrationError>, path: &Path) {
        match result {
            Ok(message) => {
                self.app_state.update_export_dir(path);
                self.topics.notice = Some(Notice::info(format!(
                    "{} to {}",
                    message,
                    path.display()
                )));
            }
            Err(e) => {
                tracing::warn!("File export to {} failed: {}", path.display(), e);
                self.topics.notice = Some(Notice::error(e.to_string()));
            }
        }
    }
}

impl eframe::App for CalibrationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.process_backend_messages();

        if had_messages {
            ctx.request_repaint();
        } else if self.topics.status.connection == ConnectionStatus::Connected {
            ctx.request_repaint_after(LIVE_REPAINT);
        }

        let readings = self.snapshot_readings();
        let mut actions = Vec::new();

        // Menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Export CSV...").clicked() {
                        actions.push(AppAction::ExportCsv(None));
                        ui.close();
                    }
                    if ui.button("Save Calibration...").clicked() {
                        actions.push(AppAction::SaveCalibration(None));
                        ui.close();
                    }
                });
                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.settings.show_plots, "Show plots");
                    ui.checkbox(&mut self.settings.follow_latest, "Follow latest");
                    if ui
                        .checkbox(&mut self.settings.autoscale_y, "Autoscale Y")
                        .changed()
                        && self.settings.autoscale_y
                    {
                        self.settings.y_range = None;
                    }
                    ui.separator();
                    let mut dark = self.app_state.dark_mode;
                    if ui.checkbox(&mut dark, "Dark mode").changed() {
                        self.app_state.dark_mode = dark;
                        ctx.set_visuals(if dark {
                            egui::Visuals::dark()
                        } else {
                            egui::Visuals::light()
                        });
                    }
                });
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            status_bar::render_status_bar(
                ui,
                &status_bar::StatusBarContext {
                    topics: &self.topics,
                    port: &self.config.serial.port,
                    stored_readings: readings.len(),
                },
            );
        });

        // Controls
        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                actions.extend(ConnectionPanel::render(
                    ui,
                    &self.topics,
                    &mut self.selected_port,
                    &mut self.selected_baud,
                ));
                ui.separator();
                actions.extend(CalibrationPanel::render(ui, &self.topics, &mut self.config));
                ui.separator();
                ResultsPanel::render(ui, &self.topics);
            });

        // Data
        egui::CentralPanel::default().show(ctx, |ui| {
            ReadingsTable::render(ui, &readings, self.config.collection.table_rows);
            if self.settings.show_plots {
                ui.separator();
                self.plot.render(ui, &readings, &self.settings);
            }
        });

        for action in actions {
            self.handle_action(action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.frontend.shutdown();

        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}
