//! Somni core: streaming sleep and motion state inference.
//!
//! The engine consumes a stream of per-frame motion scores and infers a
//! physiological state (deep sleep, light sleep, spasm, awake, no-breathing
//! alert) through a fixed pipeline: bounded sample buffer, breath peak
//! detection, rolling window statistics, priority-rule classification, and a
//! hysteresis transition controller with per-transition confirmation delays.
//! Session metrics, a 0-100 quality score, and structured reports are
//! derived on top.

pub mod breathing;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod engine;
pub mod history;
pub mod metrics;
pub mod quality;
pub mod report;
pub mod shared;
pub mod transitions;
pub mod window;

#[cfg(test)]
pub mod tests_proptest;
#[cfg(test)]
pub mod tests_scenarios;

// ============================================================================
// CURATED PUBLIC API EXPORTS
// ============================================================================

// Domain types and time helpers
pub use domain::{
    dt_sec, dt_us, now_ts_us, BreathPhase, EventRecord, SleepEvent, SleepEventKind, SleepState,
};

// Configuration
pub use config::{
    BreathingConfig, Config, ConfigError, ConfirmConfig, Thresholds, ThresholdUpdate, WindowConfig,
};

// Sample buffer
pub use buffer::{MotionBuffer, MotionSample};

// Breath peak analysis
pub use breathing::{BreathingAnalyzer, BreathingStats};

// Window statistics
pub use window::WindowAnalysis;

// Classification and hysteresis
pub use classifier::classify;
pub use transitions::{allowed_targets, Commit, TransitionController, TransitionReason};

// Session metrics and quality
pub use metrics::{SessionMetrics, SleepCycle};
pub use quality::{breakdown_description, quality_rating, sleep_quality};

// Snapshots and reports
pub use report::{format_duration_minutes, SleepReport, SleepStats};

// History contract
pub use history::{HistoryEntry, HistorySink, MemorySink};

// Engine (high-level orchestrator)
pub use engine::SleepEngine;
pub use shared::SharedEngine;
