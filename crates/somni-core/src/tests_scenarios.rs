//! End-to-end pipeline scenarios driven through the public engine API with
//! synthetic motion timelines.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Config, ThresholdUpdate};
use crate::domain::SleepState;
use crate::engine::SleepEngine;
use crate::history::{HistoryEntry, HistorySink};

const SEC: i64 = 1_000_000;

/// Drive the engine at 10 Hz from `from_s` to `to_s` with a per-tick score.
fn drive(engine: &mut SleepEngine, from_s: i64, to_s: i64, score: impl Fn(i64) -> f32) {
    for t in (from_s * 10)..(to_s * 10) {
        engine.update_at(score(t), t * SEC / 10);
    }
}

/// Quiet motion with breath peaks alternating 1.9s / 2.1s apart: ~30 bpm
/// with low but non-zero interval variability (deep-sleep breathing).
fn calm_breathing(t: i64) -> f32 {
    if t % 40 == 0 || t % 40 == 19 {
        100_000.0
    } else {
        20_000.0
    }
}

#[test]
fn silence_raises_the_no_breathing_alert_once() {
    let mut engine = SleepEngine::new(Config::default());
    engine.start_session_at(0);
    drive(&mut engine, 0, 15, |_| 0.0);

    assert_eq!(engine.current_state(), SleepState::NoBreathing);
    let events = engine.recent_events(10);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "no_breathing_alert");
    // Candidate pending since the first sample, committed at the 12s delay.
    assert!((events[0].timestamp - 12.0).abs() < 1e-9);

    // Continued silence must not re-emit the alert.
    drive(&mut engine, 15, 30, |_| 0.0);
    assert_eq!(engine.recent_events(10).len(), 1);
}

#[test]
fn calm_breathing_from_awake_falls_asleep() {
    let mut engine = SleepEngine::new(Config::default());
    engine.start_session_at(0);

    // Sustained movement: every sample above the movement threshold.
    drive(&mut engine, 0, 10, |_| 6_000_000.0);
    assert_eq!(engine.current_state(), SleepState::Awake);

    // Calm regular breathing. The phase needs five intervals before it reads
    // "deep", then the from-awake delay is 15s, so give it plenty of runway.
    drive(&mut engine, 10, 60, calm_breathing);
    assert_eq!(engine.current_state(), SleepState::DeepSleep);

    let events = engine.recent_events(10);
    assert!(events.iter().any(|e| e.kind == "fell_asleep"));
    let stats = engine.stats_at(60 * SEC);
    assert!(stats.deep_sleep_seconds > 0);
    assert_eq!(stats.wake_ups, 0);
}

#[test]
fn single_spike_during_deep_sleep_is_a_spasm_that_reverts() {
    let mut engine = SleepEngine::new(Config::default());
    engine.start_session_at(0);
    drive(&mut engine, 0, 120, calm_breathing);
    assert_eq!(engine.current_state(), SleepState::DeepSleep);

    // One sample above the spike threshold, between the regular ticks.
    engine.update_at(20_000_000.0, 120 * SEC + 50_000);
    drive(&mut engine, 121, 124, calm_breathing);
    let stats = engine.stats_at(124 * SEC);
    assert_eq!(stats.spasms, 1);
    assert_eq!(stats.wake_ups, 0);

    // After the 5s spasm window with no further spikes the state reverts to
    // deep sleep instead of waking up.
    drive(&mut engine, 124, 135, calm_breathing);
    assert_eq!(engine.current_state(), SleepState::DeepSleep);
    assert_eq!(engine.stats_at(135 * SEC).spasms, 1);
    let events = engine.recent_events(20);
    assert!(events.iter().any(|e| e.kind == "spasm"));
    assert!(!events.iter().any(|e| e.kind == "wake_up"));
}

#[test]
fn threshold_overrides_are_respected_by_classification() {
    // Baseline: sustained movement above the default thresholds is awake.
    let mut engine = SleepEngine::new(Config::default());
    engine.start_session_at(0);
    drive(&mut engine, 0, 10, |_| 6_000_000.0);
    assert_eq!(engine.current_state(), SleepState::Awake);

    // Same input with the movement gate raised out of reach: the awake
    // branch is never taken.
    let mut engine = SleepEngine::new(Config::default());
    let update: ThresholdUpdate = serde_json::from_str(
        r#"{"movement_threshold": 999999999.0, "awake_threshold": 999999999.0}"#,
    )
    .unwrap();
    engine.set_thresholds(&update);
    engine.start_session_at(0);
    drive(&mut engine, 0, 30, |_| 6_000_000.0);
    assert_ne!(engine.current_state(), SleepState::Awake);
    assert!(engine
        .recent_events(10)
        .iter()
        .all(|e| e.kind != "wake_up"));
}

#[derive(Clone, Default)]
struct VecSink(Arc<Mutex<Vec<HistoryEntry>>>);

impl HistorySink for VecSink {
    fn append(&mut self, entry: HistoryEntry) -> Result<(), String> {
        self.0.lock().push(entry);
        Ok(())
    }
}

#[test]
fn stopped_session_lands_in_history() {
    let sink = VecSink::default();
    let mut engine = SleepEngine::with_history(Config::default(), Box::new(sink.clone()));
    engine.start_session_at(0);
    drive(&mut engine, 0, 180, calm_breathing);

    let entry = engine.stop_session_at(180 * SEC).unwrap();
    let stored = sink.0.lock();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, entry.id);
    // Recorded duration is the accumulated sleep time, formatted like the
    // report summary.
    assert_eq!(
        stored[0].duration_seconds,
        stored[0].report.raw_stats.total_sleep_seconds
    );
    assert_eq!(
        stored[0].duration_formatted,
        stored[0].report.summary.total_sleep
    );
    assert_eq!(
        stored[0].quality_rating,
        stored[0].report.summary.quality_rating
    );
    assert!(stored[0].report.raw_stats.total_sleep_seconds >= 90);
}
