//! Runtime configuration
//!
//! Every section has defaults, so an empty document is a valid config:
//!
//! ```rust
//! use dronewire::config::Config;
//!
//! let config = Config::from_yaml_str(
//!     "autopilot:\n  tick_interval_ms: 20\nplayback:\n  rate: 2.0\n",
//! )?;
//! assert_eq!(config.autopilot.tick_interval().as_millis(), 20);
//! assert!(config.video.resync_on_keyframe);
//! # Ok::<(), dronewire::DroneError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{PixelLayout, UpdateRate};
use crate::{DroneError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub autopilot: AutopilotConfig,
    pub playback: PlaybackConfig,
    pub video: VideoConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Control loop period
    pub tick_interval_ms: u64,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        // 50 Hz, several ticks per demo-mode navdata packet
        Self { tick_interval_ms: 20 }
    }
}

impl AutopilotConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Speed multiplier; 1.0 reproduces recorded timing
    pub rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Layout the video decoder must be configured to produce
    pub pixel_layout: PixelLayout,
    /// Skip predicted frames until a keyframe after a decode failure
    pub resync_on_keyframe: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self { pixel_layout: PixelLayout::Bgr24, resync_on_keyframe: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Rate for UI subscriptions
    pub ui_rate: UpdateRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "dronewire=info".to_string() }
    }
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            DroneError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.autopilot.tick_interval_ms == 0 {
            return Err(DroneError::config("autopilot.tick_interval_ms must be at least 1"));
        }
        let rate = self.playback.rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DroneError::config(format!(
                "playback.rate must be positive and finite, got {rate}"
            )));
        }
        Ok(())
    }
}
