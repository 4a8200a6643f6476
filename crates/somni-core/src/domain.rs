use serde::{Deserialize, Serialize};

// ============================================================================
// STRICT TIME HELPERS — Prevent Wraparound
// ============================================================================

/// Compute a time delta with saturating subtraction. If the clock goes
/// backwards (now < last), returns 0 instead of wrapping to a huge value.
#[inline]
pub fn dt_us(now_us: i64, last_us: i64) -> u64 {
    if now_us >= last_us {
        (now_us - last_us) as u64
    } else {
        0
    }
}

/// Time delta in seconds. Convenience wrapper around [`dt_us`].
#[inline]
pub fn dt_sec(now_us: i64, last_us: i64) -> f64 {
    (dt_us(now_us, last_us) as f64) / 1_000_000.0
}

/// Current wall-clock timestamp in microseconds since the Unix epoch.
#[inline]
pub fn now_ts_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

// ============================================================================
// SLEEP STATES
// ============================================================================

/// Physiological states the engine can infer from the motion stream.
///
/// `Unknown` occurs only at session start; every other state is reached
/// through the validated transition table in [`crate::transitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepState {
    Unknown,
    /// No motion at all — alert condition.
    NoBreathing,
    /// Quiet / non-REM sleep: regular breathing.
    DeepSleep,
    /// Active / REM sleep: irregular breathing.
    LightSleep,
    /// Short high-amplitude excursion during sleep that is not a wake-up.
    Spasm,
    /// Sustained active movement.
    Awake,
}

impl SleepState {
    /// Stable wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SleepState::Unknown => "unknown",
            SleepState::NoBreathing => "no_breathing",
            SleepState::DeepSleep => "deep_sleep",
            SleepState::LightSleep => "light_sleep",
            SleepState::Spasm => "spasm",
            SleepState::Awake => "awake",
        }
    }

    /// True for the states that accrue sleep time (spasms count as sleep).
    pub fn is_asleep(self) -> bool {
        matches!(
            self,
            SleepState::DeepSleep | SleepState::LightSleep | SleepState::Spasm
        )
    }
}

/// Breathing-derived sleep phase, classified from interval variability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathPhase {
    Unknown,
    Deep,
    Light,
    Transitional,
}

impl BreathPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            BreathPhase::Unknown => "unknown",
            BreathPhase::Deep => "deep",
            BreathPhase::Light => "light",
            BreathPhase::Transitional => "transitional",
        }
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Discrete events raised when a transition commits. Closed sum type so that
/// every new event forces all match sites to be updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SleepEventKind {
    Spasm,
    WakeUp { sleep_duration_seconds: f64 },
    FellAsleep,
    PhaseChange { from: BreathPhase, to: BreathPhase },
    NoBreathingAlert,
}

impl SleepEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            SleepEventKind::Spasm => "spasm",
            SleepEventKind::WakeUp { .. } => "wake_up",
            SleepEventKind::FellAsleep => "fell_asleep",
            SleepEventKind::PhaseChange { .. } => "phase_change",
            SleepEventKind::NoBreathingAlert => "no_breathing_alert",
        }
    }
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepEvent {
    pub ts_us: i64,
    #[serde(flatten)]
    pub kind: SleepEventKind,
}

/// Outward-facing record shape: `{type, timestamp, data}` with the timestamp
/// in seconds and event-specific fields under `data`.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: f64,
    pub data: serde_json::Value,
}

impl SleepEvent {
    pub fn new(ts_us: i64, kind: SleepEventKind) -> Self {
        SleepEvent { ts_us, kind }
    }

    pub fn to_record(&self) -> EventRecord {
        let data = match &self.kind {
            SleepEventKind::WakeUp {
                sleep_duration_seconds,
            } => serde_json::json!({ "sleep_duration": sleep_duration_seconds }),
            SleepEventKind::PhaseChange { from, to } => {
                serde_json::json!({ "from": from.as_str(), "to": to.as_str() })
            }
            SleepEventKind::Spasm
            | SleepEventKind::FellAsleep
            | SleepEventKind::NoBreathingAlert => serde_json::json!({}),
        };
        EventRecord {
            kind: self.kind.name(),
            timestamp: self.ts_us as f64 / 1_000_000.0,
            data,
        }
    }
}
