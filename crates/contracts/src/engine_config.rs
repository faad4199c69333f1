//! Gyro engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Gyro engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Frame synchronizer configuration
    #[serde(default)]
    #[validate(nested)]
    pub frame_sync: FrameSyncConfig,

    /// Sample aggregator configuration
    #[serde(default)]
    #[validate(nested)]
    pub aggregator: AggregatorConfig,

    /// Time correlator configuration
    #[serde(default)]
    #[validate(nested)]
    pub timesync: TimeSyncConfig,
}

/// Frame synchronizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FrameSyncConfig {
    /// Consecutive phase increments at one byte position required to lock
    #[validate(range(min = 1))]
    pub lock_threshold: u32,

    /// Log per-position lock statistics while acquiring
    pub verbose: bool,
}

impl Default for FrameSyncConfig {
    fn default() -> Self {
        Self {
            lock_threshold: 10,
            verbose: false,
        }
    }
}

/// Sample aggregator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Valid samples averaged per published record
    #[validate(range(min = 1))]
    pub nsamples: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { nsamples: 6 }
    }
}

/// Phase/host time correlation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TimeSyncConfig {
    /// Nominal device tick rate (Hz)
    #[validate(range(exclusive_min = 0.0))]
    pub nominal_rate_hz: f64,

    /// Ticks per phase cycle
    #[validate(range(min = 2, max = 4))]
    pub phase_wrap: u8,

    /// Tolerated fractional rate error before resync
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub rate_error: f64,

    /// Residual (seconds) that forces a resync
    #[validate(range(exclusive_min = 0.0))]
    pub reset_time_s: f64,

    /// Offset/drift filter tuning
    #[validate(nested)]
    pub adakf: AdaKFConfig,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            nominal_rate_hz: 989.0,
            phase_wrap: 4,
            rate_error: 0.05,
            reset_time_s: 0.1,
            adakf: AdaKFConfig::default(),
        }
    }
}


/// AdaKF (Adaptive Kalman Filter) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AdaKFConfig {
    /// Process noise (Q)
    #[validate(range(exclusive_min = 0.0))]
    pub process_noise: f64,
    /// Measurement noise (R)
    #[validate(range(exclusive_min = 0.0))]
    pub measurement_noise: f64,
    /// Residual window size for adaptive tuning
    #[validate(range(min = 1))]
    pub residual_window: usize,
    /// Expected interval (seconds) - used when an update carries no elapsed time
    pub expected_interval: Option<f64>,
}

impl Default for AdaKFConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-9,
            measurement_noise: 1e-6,
            residual_window: 20,
            expected_interval: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.frame_sync.lock_threshold, 10);
        assert!(!config.frame_sync.verbose);
        assert_eq!(config.aggregator.nsamples, 6);
        assert_eq!(config.timesync.nominal_rate_hz, 989.0);
        assert_eq!(config.timesync.phase_wrap, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"aggregator": {"nsamples": 12}}"#).unwrap();
        assert_eq!(config.aggregator.nsamples, 12);
        assert_eq!(config.frame_sync.lock_threshold, 10);
        assert_eq!(config.timesync.reset_time_s, 0.1);
    }

    #[test]
    fn range_violations_are_reported() {
        let mut config = EngineConfig::default();
        config.aggregator.nsamples = 0;
        config.timesync.rate_error = 1.5;
        let errors = config.validate().unwrap_err();
        let text = errors.to_string();
        assert!(text.contains("nsamples"), "unexpected errors: {text}");
        assert!(text.contains("rate_error"), "unexpected errors: {text}");
    }
}
