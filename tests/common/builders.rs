//! Test data builders for creating test objects

use chrono::{DateTime, Duration, Local, TimeZone};
use gascal_rs::types::Reading;

/// Builder for creating test Readings
pub struct ReadingBuilder {
    timestamp: DateTime<Local>,
    gas_ppm: f64,
    alert_level: i32,
    r0_value: f64,
}

impl ReadingBuilder {
    pub fn new(gas_ppm: f64) -> Self {
        Self {
            timestamp: base_time(),
            gas_ppm,
            alert_level: 0,
            r0_value: 10.0,
        }
    }

    pub fn alert(mut self, alert_level: i32) -> Self {
        self.alert_level = alert_level;
        self
    }

    pub fn r0(mut self, r0_value: f64) -> Self {
        self.r0_value = r0_value;
        self
    }

    /// Offset from [`base_time`] in milliseconds
    pub fn after_ms(mut self, ms: i64) -> Self {
        self.timestamp = base_time() + Duration::milliseconds(ms);
        self
    }

    pub fn build(self) -> Reading {
        Reading::at(self.timestamp, self.gas_ppm, self.alert_level, self.r0_value)
    }
}

/// Fixed start time so exported timestamps are predictable
pub fn base_time() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 1, 10, 0, 0)
        .single()
        .expect("unambiguous local time")
}

/// `count` readings 500 ms apart with rising gas values
pub fn reading_series(count: usize) -> Vec<Reading> {
    (0..count)
        .map(|i| {
            ReadingBuilder::new(100.0 + i as f64 * 2.5)
                .alert((i % 4) as i32)
                .r0(9.75)
                .after_ms(i as i64 * 500)
                .build()
        })
        .collect()
}

/// A telemetry line as the firmware prints it
pub fn telemetry_line(gas_ppm: f64, alert_level: i32, r0_value: f64) -> String {
    format!(
        "Gas Level: {:.2} ppm|Alert:{}|R0:{:.2}",
        gas_ppm, alert_level, r0_value
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_builder() {
        let reading = ReadingBuilder::new(42.0).alert(3).r0(8.5).after_ms(1500).build();

        assert_eq!(reading.gas_ppm, 42.0);
        assert_eq!(reading.alert_level, 3);
        assert_eq!(reading.r0_value, 8.5);
        assert_eq!(reading.timestamp - base_time(), Duration::milliseconds(1500));
    }
}
