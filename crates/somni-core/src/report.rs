//! Outward-facing snapshots: the flat stats view and the structured report.
//!
//! The report is composed from an already-taken [`SleepStats`] snapshot, so
//! no accessor re-enters the engine while it is being read.

use serde::{Deserialize, Serialize};

use crate::domain::{BreathPhase, SleepState};
use crate::quality::{breakdown_description, quality_rating};

/// Flat snapshot of the engine state, one value per stats field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepStats {
    // Current state
    pub current_state: SleepState,
    pub breathing_detected: bool,
    pub state_duration_seconds: u64,

    // Session summary
    pub session_duration_minutes: u64,
    pub session_duration_seconds: u64,

    // Sleep duration breakdown
    pub total_sleep_minutes: u64,
    pub total_sleep_seconds: u64,
    pub deep_sleep_minutes: u64,
    pub deep_sleep_seconds: u64,
    pub light_sleep_minutes: u64,
    pub light_sleep_seconds: u64,

    // Sleep quality
    pub sleep_quality_score: u8,
    pub deep_sleep_percent: u32,
    pub light_sleep_percent: u32,

    // Events
    pub wake_ups: u32,
    pub spasms: u32,
    pub sleep_cycles_completed: usize,

    // Breathing analysis
    pub breathing_rate_bpm: f64,
    pub breathing_variability: f64,
    pub breathing_phase: BreathPhase,
    pub breaths_detected: usize,

    // Motion analysis
    pub last_motion_score: f32,
    pub motion_mean: f32,
    pub motion_std: f32,

    // Misc
    pub events_count: usize,
    pub pending_transition: Option<SleepState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_sleep: String,
    pub quality_score: u8,
    pub quality_rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepBreakdown {
    pub deep_sleep: String,
    pub light_sleep: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsSummary {
    pub wake_ups: u32,
    pub spasms: u32,
    pub sleep_cycles: usize,
    pub average_cycle_minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathingSummary {
    pub average_rate_bpm: f64,
    pub status: String,
    /// Coefficient of variation as a percentage.
    pub variability: f64,
    pub current_phase: BreathPhase,
}

/// Structured session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepReport {
    /// Seconds since the Unix epoch.
    pub report_generated_at: f64,
    pub summary: ReportSummary,
    pub sleep_breakdown: SleepBreakdown,
    pub events_summary: EventsSummary,
    pub breathing: BreathingSummary,
    pub raw_stats: SleepStats,
}

/// "XhYm" from a minute count.
pub fn format_duration_minutes(total_minutes: u64) -> String {
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

fn breathing_status(bpm: f64) -> &'static str {
    if bpm <= 0.0 {
        "normal"
    } else if bpm < 25.0 {
        "slow"
    } else if bpm > 60.0 {
        "fast"
    } else {
        "normal"
    }
}

impl SleepReport {
    /// Build the report from a stats snapshot.
    pub fn from_stats(
        stats: SleepStats,
        average_cycle_minutes: Option<f64>,
        generated_at_us: i64,
    ) -> Self {
        SleepReport {
            report_generated_at: generated_at_us as f64 / 1_000_000.0,
            summary: ReportSummary {
                total_sleep: format_duration_minutes(stats.total_sleep_minutes),
                quality_score: stats.sleep_quality_score,
                quality_rating: quality_rating(stats.sleep_quality_score).to_string(),
            },
            sleep_breakdown: SleepBreakdown {
                deep_sleep: format!(
                    "{}m ({}%)",
                    stats.deep_sleep_minutes, stats.deep_sleep_percent
                ),
                light_sleep: format!(
                    "{}m ({}%)",
                    stats.light_sleep_minutes, stats.light_sleep_percent
                ),
                description: breakdown_description(stats.deep_sleep_percent).to_string(),
            },
            events_summary: EventsSummary {
                wake_ups: stats.wake_ups,
                spasms: stats.spasms,
                sleep_cycles: stats.sleep_cycles_completed,
                average_cycle_minutes,
            },
            breathing: BreathingSummary {
                average_rate_bpm: stats.breathing_rate_bpm,
                status: breathing_status(stats.breathing_rate_bpm).to_string(),
                variability: stats.breathing_variability * 100.0,
                current_phase: stats.breathing_phase,
            },
            raw_stats: stats,
        }
    }
}
