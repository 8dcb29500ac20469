//! BantayGas Calibration Tool - Main Entry Point
//!
//! Desktop tool for calibrating a gas-sensor device over a serial link.

use anyhow::Context;
use gascal_rs::{
    backend::SerialBackend,
    config::{ensure_log_dir, AppConfig, AppState, LOG_FILE_PREFIX},
    frontend::CalibrationApp,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const APP_TITLE: &str = "BantayGas Calibration Tool";

/// Console logging plus a daily-rolling log file in the app data directory.
///
/// The returned guard flushes the file writer on drop and must outlive the app.
fn init_logging() -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gascal_rs=debug"));

    let (file_layer, guard) = match ensure_log_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("File logging disabled: {}", e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn main() -> eframe::Result<()> {
    let _log_guard = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            None
        }
    };

    tracing::info!("Starting {}", APP_TITLE);

    // Restore last port, baud rate and gas type
    let app_state = AppState::load_or_default();
    let config = app_state.apply_to(AppConfig::default());

    let (backend, frontend) = SerialBackend::new(config.clone());
    let backend_handle = std::thread::Builder::new()
        .name("serial-backend".into())
        .spawn(move || backend.run());
    let backend_handle = match backend_handle {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!("Failed to spawn backend thread: {}", e);
            None
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title(APP_TITLE),
        ..Default::default()
    };

    let result = eframe::run_native(
        APP_TITLE,
        native_options,
        Box::new(|cc| {
            if app_state.dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }

            Ok(Box::new(CalibrationApp::new(cc, frontend, config, app_state)))
        }),
    );

    // The app sent Shutdown in on_exit; wait for the worker to close the port
    tracing::info!("Shutting down...");
    if let Some(handle) = backend_handle {
        if handle.join().is_err() {
            tracing::error!("Backend thread panicked");
        }
    }

    result
}
