//! Runtime settings that can be modified during application execution
//!
//! These control how the operator window presents data and are not
//! persisted. Anything that should survive a restart belongs in
//! [`AppState`](super::AppState).

use serde::{Deserialize, Serialize};

/// Display toggles for the operator window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Show the gas and alert plots
    pub show_plots: bool,

    /// Keep the plot X axis pinned to the newest reading
    pub follow_latest: bool,

    /// Fit the Y axis to the visible data
    pub autoscale_y: bool,

    /// Y-axis bounds for the gas plot when not autoscaling
    pub y_range: Option<(f64, f64)>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            show_plots: true,
            follow_latest: true,
            autoscale_y: true,
            y_range: None,
        }
    }
}

impl RuntimeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_plots(&mut self) {
        self.show_plots = !self.show_plots;
    }

    pub fn toggle_follow_latest(&mut self) {
        self.follow_latest = !self.follow_latest;
    }

    /// Set a manual Y range, disabling autoscale. Reversed bounds are swapped.
    pub fn set_y_range(&mut self, min: f64, max: f64) {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.y_range = Some((lo, hi));
        self.autoscale_y = false;
    }

    pub fn toggle_autoscale_y(&mut self) {
        self.autoscale_y = !self.autoscale_y;
        if self.autoscale_y {
            self.y_range = None;
        }
    }
}
