//! Read-side rate control for telemetry subscriptions

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often a subscriber wants to see the latest telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRate {
    /// Every published value
    Native,

    /// At most this many values per second, latest wins.
    /// Falls back to `Native` when at or above the source rate.
    Max(u32),
}

impl Default for UpdateRate {
    fn default() -> Self {
        UpdateRate::Max(10)
    }
}

impl UpdateRate {
    /// Resolve against the source frequency.
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if f64::from(hz) >= source_hz => UpdateRate::Native,
            other => other,
        }
    }

    /// Throttle period, if throttling applies at this source rate.
    pub fn throttle_interval(self, source_hz: f64) -> Option<Duration> {
        match self.normalize(source_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_at_or_above_source_are_native() {
        assert_eq!(UpdateRate::Max(200).normalize(15.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(15).normalize(15.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(0).normalize(15.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(5).normalize(15.0), UpdateRate::Max(5));
    }

    #[test]
    fn throttle_interval_only_when_slower_than_source() {
        assert_eq!(UpdateRate::Native.throttle_interval(200.0), None);
        assert_eq!(UpdateRate::Max(4).throttle_interval(200.0), Some(Duration::from_millis(250)));
    }
}
