use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Motion-score thresholds. Calibrated for raw frame-difference magnitudes,
/// which is why the defaults are large.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum motion to count as a breath peak.
    pub breath_peak: f32,
    /// Mean below this triggers the no-breathing rule.
    pub no_motion: f32,
    /// Minimum mean for breathing detection.
    pub breathing_low: f32,
    /// Maximum mean for sleep movement.
    pub breathing_high: f32,
    /// Mean above this counts as active movement.
    pub movement: f32,
    /// High sustained movement (very active); also the spasm spike level.
    pub awake: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            breath_peak: 50_000.0,
            no_motion: 10_000.0,
            breathing_low: 10_000.0,
            breathing_high: 1_500_000.0,
            movement: 5_000_000.0,
            awake: 10_000_000.0,
        }
    }
}

/// Per-transition confirmation delays, in seconds. The whole table is
/// configuration so both observed variants of the hysteresis logic can be
/// expressed without code changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Entering a spasm.
    pub spasm_s: f64,
    /// Silence before the no-breathing alert.
    pub no_breathing_s: f64,
    /// Sustained movement before confirming awake.
    pub awake_s: f64,
    /// Calm period before confirming sleep when currently awake.
    pub sleep_s: f64,
    /// Deep <-> light phase change, either direction.
    pub phase_change_s: f64,
    /// Everything else.
    pub default_s: f64,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            spasm_s: 0.5,
            no_breathing_s: 12.0,
            awake_s: 8.0,
            sleep_s: 15.0,
            phase_change_s: 30.0,
            default_s: 3.0,
        }
    }
}

/// Time windows for the rolling analyses, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Sample buffer retention.
    pub buffer_s: f64,
    /// Trailing window for mean/stddev/ratio statistics.
    pub analysis_s: f64,
    /// Short window for spasm spike detection; also the spasm auto-revert
    /// timeout.
    pub spasm_s: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            buffer_s: 60.0,
            analysis_s: 10.0,
            spasm_s: 5.0,
        }
    }
}

/// Breath-peak analyzer tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathingConfig {
    /// Minimum seconds between breaths (60 bpm ceiling).
    pub min_interval_s: f64,
    /// Maximum seconds between breaths (12 bpm floor).
    pub max_interval_s: f64,
    /// Interval CV below this means deep sleep.
    pub low_variability: f64,
    /// Interval CV above this means light/REM sleep.
    pub high_variability: f64,
    /// Bounded history sizes, oldest evicted first.
    pub max_peaks: usize,
    pub max_intervals: usize,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            min_interval_s: 1.0,
            max_interval_s: 5.0,
            low_variability: 0.15,
            high_variability: 0.30,
            max_peaks: 100,
            max_intervals: 50,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    pub confirm: ConfirmConfig,
    pub windows: WindowConfig,
    pub breathing: BreathingConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.breathing.min_interval_s <= 0.0
            || self.breathing.max_interval_s <= self.breathing.min_interval_s
        {
            return Err(ConfigError::Validation(
                "breathing interval bounds must satisfy 0 < min < max".into(),
            ));
        }
        if self.windows.analysis_s > self.windows.buffer_s {
            return Err(ConfigError::Validation(
                "analysis window cannot exceed buffer retention".into(),
            ));
        }
        if self.breathing.low_variability >= self.breathing.high_variability {
            return Err(ConfigError::Validation(
                "variability bands must satisfy low < high".into(),
            ));
        }
        Ok(())
    }
}

/// Sparse, typed threshold overrides. Unknown keys in the source document are
/// dropped by serde at this boundary; recognized keys are enumerated below,
/// nothing is resolved by reflection.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ThresholdUpdate {
    pub no_motion_threshold: Option<f32>,
    #[serde(alias = "breathing_min")]
    pub breathing_low: Option<f32>,
    #[serde(alias = "breathing_max")]
    pub breathing_high: Option<f32>,
    pub movement_threshold: Option<f32>,
    pub awake_threshold: Option<f32>,
    pub confirm_spasm_seconds: Option<f64>,
    pub confirm_awake_seconds: Option<f64>,
    pub confirm_sleep_seconds: Option<f64>,
    pub confirm_no_breathing_seconds: Option<f64>,
    pub confirm_phase_change_seconds: Option<f64>,
    pub confirm_default_seconds: Option<f64>,
}

impl ThresholdUpdate {
    /// Apply the present fields onto `cfg`, leaving the rest untouched.
    pub fn apply_to(&self, cfg: &mut Config) {
        if let Some(v) = self.no_motion_threshold {
            cfg.thresholds.no_motion = v;
        }
        if let Some(v) = self.breathing_low {
            cfg.thresholds.breathing_low = v;
        }
        if let Some(v) = self.breathing_high {
            cfg.thresholds.breathing_high = v;
        }
        if let Some(v) = self.movement_threshold {
            cfg.thresholds.movement = v;
        }
        if let Some(v) = self.awake_threshold {
            cfg.thresholds.awake = v;
        }
        if let Some(v) = self.confirm_spasm_seconds {
            cfg.confirm.spasm_s = v;
        }
        if let Some(v) = self.confirm_awake_seconds {
            cfg.confirm.awake_s = v;
        }
        if let Some(v) = self.confirm_sleep_seconds {
            cfg.confirm.sleep_s = v;
        }
        if let Some(v) = self.confirm_no_breathing_seconds {
            cfg.confirm.no_breathing_s = v;
        }
        if let Some(v) = self.confirm_phase_change_seconds {
            cfg.confirm.phase_change_s = v;
        }
        if let Some(v) = self.confirm_default_seconds {
            cfg.confirm.default_s = v;
        }
    }

    /// True when no field is set (the update is a no-op).
    pub fn is_empty(&self) -> bool {
        self.no_motion_threshold.is_none()
            && self.breathing_low.is_none()
            && self.breathing_high.is_none()
            && self.movement_threshold.is_none()
            && self.awake_threshold.is_none()
            && self.confirm_spasm_seconds.is_none()
            && self.confirm_awake_seconds.is_none()
            && self.confirm_sleep_seconds.is_none()
            && self.confirm_no_breathing_seconds.is_none()
            && self.confirm_phase_change_seconds.is_none()
            && self.confirm_default_seconds.is_none()
    }
}
