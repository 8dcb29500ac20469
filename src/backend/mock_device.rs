//! Simulated gas-sensor device for running without hardware
//!
//! [`MockDevice`] implements [`Transport`] and behaves like the firmware as
//! far as this tool can observe: it emits periodic telemetry, answers
//! `status`, runs a scripted calibration on `calibrate` and aborts it on
//! `stop`. A [`MockDeviceHandle`] lets tests inject arbitrary lines, inspect
//! written commands and simulate link failures.
//!
//! # Enabling
//!
//! Outside of unit tests the mock is only available with the `mock-device`
//! feature:
//!
//! ```bash
//! cargo run --features mock-device
//! ```
//!
//! and is opened by selecting the [`MOCK_PORT_NAME`] port.

use crate::backend::transport::{LineReader, Transport};
use crate::error::{CalibrationError, Result};
use crate::protocol::CalibrationOutcome;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Port name under which the mock device is listed
pub const MOCK_PORT_NAME: &str = "mock://device";

/// Prefix accepted by [`MockDevice::open`]
pub const MOCK_PORT_PREFIX: &str = "mock://";

/// Behaviour of the simulated firmware
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Interval between `Gas Level:` lines (`None` disables telemetry)
    pub telemetry_interval: Option<Duration>,
    /// Interval between calibration progress lines
    pub progress_interval: Duration,
    /// Percent added per progress line
    pub progress_step: u32,
    /// Baseline gas concentration for telemetry
    pub gas_ppm: f64,
    /// Alert code reported in telemetry
    pub alert_level: i32,
    /// R0 the device reports and settles on
    pub r0_value: f64,
    /// How a calibration run ends
    pub outcome: CalibrationOutcome,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            telemetry_interval: Some(Duration::from_millis(500)),
            progress_interval: Duration::from_millis(200),
            progress_step: 10,
            gas_ppm: 120.0,
            alert_level: 0,
            r0_value: 10.0,
            outcome: CalibrationOutcome::Success,
        }
    }
}

impl MockDeviceConfig {
    /// No telemetry, fast calibration; suited to tests
    pub fn quiet() -> Self {
        Self {
            telemetry_interval: None,
            progress_interval: Duration::from_millis(5),
            progress_step: 25,
            ..Self::default()
        }
    }

    pub fn with_outcome(mut self, outcome: CalibrationOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_telemetry(mut self, interval: Duration) -> Self {
        self.telemetry_interval = Some(interval);
        self
    }
}

#[derive(Debug)]
struct CalibrationRun {
    percent: u32,
    next_step: Instant,
}

#[derive(Debug)]
struct SimState {
    config: MockDeviceConfig,
    open: bool,
    outbox: VecDeque<String>,
    received: Vec<String>,
    telemetry_count: u64,
    last_telemetry: Instant,
    run: Option<CalibrationRun>,
    fail_writes: bool,
    link_lost: bool,
}

impl SimState {
    fn new(config: MockDeviceConfig) -> Self {
        Self {
            config,
            open: false,
            outbox: VecDeque::new(),
            received: Vec::new(),
            telemetry_count: 0,
            last_telemetry: Instant::now(),
            run: None,
            fail_writes: false,
            link_lost: false,
        }
    }

    fn reset(&mut self) {
        self.outbox.clear();
        self.telemetry_count = 0;
        self.last_telemetry = Instant::now();
        self.run = None;
        self.link_lost = false;
    }

    fn handle_command(&mut self, command: &str) {
        self.received.push(command.to_string());
        match command {
            "status" => {
                self.outbox.push_back("=== Gas Detector System Status ===".into());
                self.outbox.push_back("Sensor Count: 1".into());
                self.outbox.push_back("All Healthy: Yes".into());
            }
            "calibrate" => {
                self.outbox.push_back("Starting sensor calibration...".into());
                self.outbox
                    .push_back("Please ensure sensor is in clean air".into());
                self.run = Some(CalibrationRun {
                    percent: 0,
                    next_step: Instant::now() + self.config.progress_interval,
                });
            }
            "stop" => {
                if self.run.take().is_some() {
                    self.outbox.push_back("Calibration aborted".into());
                }
            }
            other => {
                self.outbox.push_back(format!("Unknown command: {}", other));
            }
        }
    }

    /// Queue whatever lines are due at `now`
    fn tick(&mut self, now: Instant) {
        if let Some(interval) = self.config.telemetry_interval {
            if now.duration_since(self.last_telemetry) >= interval {
                self.last_telemetry = now;
                self.telemetry_count += 1;
                let wobble = (self.telemetry_count % 5) as f64 * 0.5;
                self.outbox.push_back(format!(
                    "Gas Level: {:.2} ppm|Alert:{}|R0:{:.2}",
                    self.config.gas_ppm + wobble,
                    self.config.alert_level,
                    self.config.r0_value
                ));
            }
        }

        let Some(run) = self.run.as_mut() else {
            return;
        };
        if now < run.next_step {
            return;
        }
        run.percent = (run.percent + self.config.progress_step.max(1)).min(100);
        run.next_step = now + self.config.progress_interval;
        let percent = run.percent;
        self.outbox
            .push_back(format!("Calibration progress: {}%", percent));

        if percent >= 100 {
            self.run = None;
            match self.config.outcome {
                CalibrationOutcome::Success => {
                    self.outbox
                        .push_back("Calibration completed successfully".into());
                    self.outbox
                        .push_back(format!("R0 value: {:.2} kOhm", self.config.r0_value));
                    self.outbox.push_back("Confidence: 95.0%".into());
                }
                CalibrationOutcome::Failure => {
                    self.outbox
                        .push_back("Calibration failed: Insufficient valid samples".into());
                }
            }
        }
    }
}

fn lock(shared: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    // A panicking test thread must not wedge the others.
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated device implementing [`Transport`]
pub struct MockDevice {
    shared: Arc<Mutex<SimState>>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new(MockDeviceConfig::default())
    }
}

impl MockDevice {
    pub fn new(config: MockDeviceConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SimState::new(config))),
        }
    }

    /// Handle for injecting lines and inspecting traffic
    pub fn handle(&self) -> MockDeviceHandle {
        MockDeviceHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Transport for MockDevice {
    fn open(&mut self, port: &str, _baud_rate: u32) -> Result<Box<dyn LineReader>> {
        if !port.starts_with(MOCK_PORT_PREFIX) {
            return Err(CalibrationError::Transport(format!(
                "No such port: {}",
                port
            )));
        }
        let mut state = lock(&self.shared);
        state.reset();
        state.open = true;
        tracing::info!("Mock device opened on {}", port);
        Ok(Box::new(MockLineReader {
            shared: self.shared.clone(),
        }))
    }

    fn close(&mut self) {
        let mut state = lock(&self.shared);
        state.open = false;
        state.run = None;
    }

    fn is_open(&self) -> bool {
        lock(&self.shared).open
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut state = lock(&self.shared);
        if !state.open {
            return Err(CalibrationError::Transport("Port is not open".to_string()));
        }
        if state.fail_writes || state.link_lost {
            return Err(CalibrationError::Transport(
                "Mock device rejected write".to_string(),
            ));
        }
        state.handle_command(line.trim());
        Ok(())
    }
}

struct MockLineReader {
    shared: Arc<Mutex<SimState>>,
}

impl LineReader for MockLineReader {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut state = lock(&self.shared);
                if state.link_lost {
                    return Err(CalibrationError::Transport(
                        "Mock device link lost".to_string(),
                    ));
                }
                if state.open {
                    state.tick(Instant::now());
                    if let Some(line) = state.outbox.pop_front() {
                        return Ok(Some(line));
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(5)));
        }
    }
}

/// Test and demo control over a [`MockDevice`]
#[derive(Clone)]
pub struct MockDeviceHandle {
    shared: Arc<Mutex<SimState>>,
}

impl MockDeviceHandle {
    /// Queue a raw line as if the device printed it
    pub fn push_line(&self, line: impl Into<String>) {
        lock(&self.shared).outbox.push_back(line.into());
    }

    /// Commands written to the device so far, newline stripped
    pub fn received_commands(&self) -> Vec<String> {
        lock(&self.shared).received.clone()
    }

    /// Make subsequent writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.shared).fail_writes = fail;
    }

    /// Make the reader report a broken link
    pub fn lose_link(&self) {
        lock(&self.shared).link_lost = true;
    }

    pub fn is_calibrating(&self) -> bool {
        lock(&self.shared).run.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(reader: &mut dyn LineReader, timeout: Duration) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(Some(line)) = reader.read_line(timeout) {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_open_requires_mock_prefix() {
        let mut device = MockDevice::new(MockDeviceConfig::quiet());
        assert!(device.open("/dev/ttyUSB0", 115200).is_err());
        assert!(!device.is_open());
        assert!(device.open(MOCK_PORT_NAME, 115200).is_ok());
        assert!(device.is_open());
    }

    #[test]
    fn test_status_command() {
        let mut device = MockDevice::new(MockDeviceConfig::quiet());
        let mut reader = device.open(MOCK_PORT_NAME, 115200).unwrap();
        device.write_line("status").unwrap();
        let lines = drain(reader.as_mut(), Duration::from_millis(10));
        assert_eq!(lines[0], "=== Gas Detector System Status ===");
        assert_eq!(device.handle().received_commands(), vec!["status"]);
    }

    #[test]
    fn test_scripted_calibration_success() {
        let mut device = MockDevice::new(MockDeviceConfig::quiet());
        let mut reader = device.open(MOCK_PORT_NAME, 115200).unwrap();
        device.write_line("calibrate").unwrap();
        let lines = drain(reader.as_mut(), Duration::from_millis(50));
        assert!(lines.contains(&"Calibration progress: 25%".to_string()));
        assert!(lines.contains(&"Calibration progress: 100%".to_string()));
        assert!(lines.contains(&"Calibration completed successfully".to_string()));
        assert!(lines.contains(&"R0 value: 10.00 kOhm".to_string()));
        assert!(!device.handle().is_calibrating());
    }

    #[test]
    fn test_scripted_calibration_failure() {
        let config = MockDeviceConfig::quiet().with_outcome(CalibrationOutcome::Failure);
        let mut device = MockDevice::new(config);
        let mut reader = device.open(MOCK_PORT_NAME, 115200).unwrap();
        device.write_line("calibrate").unwrap();
        let lines = drain(reader.as_mut(), Duration::from_millis(50));
        assert!(lines.iter().any(|l| l.starts_with("Calibration failed")));
        assert!(!lines.iter().any(|l| l.starts_with("R0 value")));
    }

    #[test]
    fn test_stop_aborts_run() {
        let mut config = MockDeviceConfig::quiet();
        config.progress_interval = Duration::from_secs(60);
        let mut device = MockDevice::new(config);
        let _reader = device.open(MOCK_PORT_NAME, 115200).unwrap();
        device.write_line("calibrate").unwrap();
        assert!(device.handle().is_calibrating());
        device.write_line("stop").unwrap();
        assert!(!device.handle().is_calibrating());
    }

    #[test]
    fn test_telemetry_lines() {
        let config = MockDeviceConfig::quiet().with_telemetry(Duration::from_millis(1));
        let mut device = MockDevice::new(config);
        let mut reader = device.open(MOCK_PORT_NAME, 115200).unwrap();
        let line = reader.read_line(Duration::from_millis(100)).unwrap();
        assert!(line.is_some_and(|l| l.starts_with("Gas Level: ")));
    }

    #[test]
    fn test_failure_injection() {
        let mut device = MockDevice::new(MockDeviceConfig::quiet());
        let handle = device.handle();
        let mut reader = device.open(MOCK_PORT_NAME, 115200).unwrap();

        handle.set_fail_writes(true);
        assert!(device.write_line("status").is_err());
        handle.set_fail_writes(false);
        assert!(device.write_line("status").is_ok());

        handle.lose_link();
        assert!(reader.read_line(Duration::from_millis(5)).is_err());
    }

    #[test]
    fn test_write_after_close_fails() {
        let mut device = MockDevice::new(MockDeviceConfig::quiet());
        let _reader = device.open(MOCK_PORT_NAME, 115200).unwrap();
        device.close();
        assert!(device.write_line("status").is_err());
    }
}
