//! Transport configuration
//!
//! The defaults below are read-only process-wide constants. A
//! [`TransportConfig`] overrides them per controller and can be loaded from JSON.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::error::{Result, TransportError};

/// Default tick rate in Hz.
pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// Default duration of `animate_to` when none is given.
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(120);

/// What the auto-driven ticker does after falling behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissedTicks {
    /// Fire at the next aligned interval, dropping the missed ones
    #[default]
    Skip,
    /// Fire missed ticks back to back until caught up
    Burst,
    /// Restart the schedule from the late firing
    Delay,
}

impl From<MissedTicks> for MissedTickBehavior {
    fn from(missed: MissedTicks) -> Self {
        match missed {
            MissedTicks::Skip => MissedTickBehavior::Skip,
            MissedTicks::Burst => MissedTickBehavior::Burst,
            MissedTicks::Delay => MissedTickBehavior::Delay,
        }
    }
}

/// Per-controller settings.
///
/// # Example
/// ```
/// use playhead::TransportConfig;
/// let config = TransportConfig::from_json_str(r#"{ "frame_rate": 100.0 }"#).unwrap();
/// assert_eq!(config.frame_interval().unwrap().as_millis(), 10);
/// assert_eq!(config.animation_duration().as_millis(), 120);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Ticks per second
    pub frame_rate: f64,

    /// Default `animate_to` duration in microseconds
    pub animation_duration_us: u64,

    /// Missed-tick policy for the auto-driven ticker
    pub missed_ticks: MissedTicks,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            animation_duration_us: DEFAULT_ANIMATION_DURATION.as_micros() as u64,
            missed_ticks: MissedTicks::default(),
        }
    }
}

/// Tick interval for `rate` ticks per second.
///
/// # Errors
/// [`TransportError::InvalidFrameRate`] unless the rate is finite, positive
/// and yields a non-zero interval that fits in a [`Duration`].
pub fn frame_interval_for(rate: f64) -> Result<Duration> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(TransportError::InvalidFrameRate { rate });
    }
    match Duration::try_from_secs_f64(1.0 / rate) {
        Ok(interval) if !interval.is_zero() => Ok(interval),
        _ => Err(TransportError::InvalidFrameRate { rate }),
    }
}

impl TransportConfig {
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Set the default `animate_to` duration, kept to microsecond precision.
    pub fn with_animation_duration(mut self, duration: Duration) -> Self {
        self.animation_duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        frame_interval_for(self.frame_rate)?;
        Ok(())
    }

    /// Interval between ticks.
    ///
    /// # Errors
    /// Same as [`validate`](TransportConfig::validate) for the frame rate.
    pub fn frame_interval(&self) -> Result<Duration> {
        frame_interval_for(self.frame_rate)
    }

    /// Default `animate_to` duration.
    pub fn animation_duration(&self) -> Duration {
        Duration::from_micros(self.animation_duration_us)
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TransportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.frame_rate, 60.0);
        assert_eq!(config.animation_duration(), Duration::from_millis(120));
        assert_eq!(config.missed_ticks, MissedTicks::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_frame_interval_at_60hz() {
        let interval = TransportConfig::default().frame_interval().unwrap();
        approx::assert_relative_eq!(interval.as_secs_f64(), 1.0 / 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_frame_rate_rejected() {
        let config = TransportConfig::default().with_frame_rate(0.0);
        assert!(matches!(
            config.validate(),
            Err(TransportError::InvalidFrameRate { .. })
        ));
        let config = TransportConfig::default().with_frame_rate(f64::INFINITY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_interval_rejected() {
        // 1e-300 Hz is positive and finite, but its interval overflows Duration.
        let config = TransportConfig::default().with_frame_rate(1e-300);
        assert!(matches!(
            config.validate(),
            Err(TransportError::InvalidFrameRate { .. })
        ));
        assert!(config.frame_interval().is_err());

        // Too fast to give a non-zero interval.
        let config = TransportConfig::default().with_frame_rate(1e300);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tiny_rate_rejected_from_json() {
        let err = TransportConfig::from_json_str(r#"{ "frame_rate": 1e-300 }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FRAME_RATE");
    }

    #[test]
    fn test_animation_duration_keeps_microseconds() {
        let config =
            TransportConfig::default().with_animation_duration(Duration::from_micros(500));
        assert_eq!(config.animation_duration_us, 500);
        assert_eq!(config.animation_duration(), Duration::from_micros(500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            TransportConfig::from_json_str(r#"{ "animation_duration_us": 400000, "missed_ticks": "burst" }"#)
                .unwrap();
        assert_eq!(config.frame_rate, DEFAULT_FRAME_RATE);
        assert_eq!(config.animation_duration(), Duration::from_millis(400));
        assert_eq!(config.missed_ticks, MissedTicks::Burst);
    }

    #[test]
    fn test_malformed_json() {
        let err = TransportConfig::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "frame_rate": 100.0 }}"#).unwrap();

        let config = TransportConfig::load(file.path()).unwrap();
        assert_eq!(config.frame_interval().unwrap(), Duration::from_millis(10));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TransportConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
