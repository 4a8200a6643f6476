//! The streaming engine: one motion score in, one inferred state out.
//!
//! Every update runs the same pipeline: record the sample, feed the breath
//! detector, recompute the window statistics, classify a candidate state, let
//! the transition controller confirm or reject it, then accrue session time
//! to whatever state is committed afterwards. All methods take explicit
//! timestamps (`*_at`) with wall-clock convenience wrappers on top, so the
//! whole pipeline is deterministic under test.

use uuid::Uuid;

use crate::breathing::BreathingAnalyzer;
use crate::buffer::MotionBuffer;
use crate::classifier::classify;
use crate::config::{Config, Thresholds, ThresholdUpdate};
use crate::domain::{dt_sec, now_ts_us, EventRecord, SleepState};
use crate::history::{HistoryEntry, HistorySink};
use crate::metrics::SessionMetrics;
use crate::quality::{quality_rating, sleep_quality};
use crate::report::{SleepReport, SleepStats};
use crate::transitions::TransitionController;
use crate::window::WindowAnalysis;

pub struct SleepEngine {
    cfg: Config,
    buffer: MotionBuffer,
    breathing: BreathingAnalyzer,
    transitions: TransitionController,
    metrics: SessionMetrics,
    session_id: Uuid,
    session_start_us: Option<i64>,
    last_update_us: Option<i64>,
    history: Option<Box<dyn HistorySink>>,
}

impl SleepEngine {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            buffer: MotionBuffer::new(),
            breathing: BreathingAnalyzer::new(),
            transitions: TransitionController::new(),
            metrics: SessionMetrics::new(),
            session_id: Uuid::new_v4(),
            session_start_us: None,
            last_update_us: None,
            history: None,
        }
    }

    pub fn with_history(cfg: Config, sink: Box<dyn HistorySink>) -> Self {
        let mut engine = Self::new(cfg);
        engine.history = Some(sink);
        engine
    }

    pub fn set_history_sink(&mut self, sink: Box<dyn HistorySink>) {
        self.history = Some(sink);
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.cfg.thresholds
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn current_state(&self) -> SleepState {
        self.transitions.current()
    }

    pub fn session_active(&self) -> bool {
        self.session_start_us.is_some()
    }

    /// Begin a new session at `ts_us`, discarding any in-progress one.
    pub fn start_session_at(&mut self, ts_us: i64) {
        self.buffer.clear();
        self.breathing.reset();
        self.transitions.reset();
        self.metrics.reset();
        self.session_id = Uuid::new_v4();
        self.session_start_us = Some(ts_us);
        self.last_update_us = None;
        log::info!("sleep session {} started", self.session_id);
    }

    pub fn start_session(&mut self) {
        self.start_session_at(now_ts_us());
    }

    /// Feed one motion score at an explicit timestamp. Starts a session
    /// implicitly on the first sample. Returns the committed state after the
    /// update.
    pub fn update_at(&mut self, score: f32, ts_us: i64) -> SleepState {
        if self.session_start_us.is_none() {
            self.start_session_at(ts_us);
        }

        self.buffer.push(ts_us, score, self.cfg.windows.buffer_s);

        if let Some(interval) =
            self.breathing
                .process(score, ts_us, &self.cfg.thresholds, &self.cfg.breathing)
        {
            log::debug!("breath interval {:.2}s", interval);
        }

        let analysis =
            WindowAnalysis::compute(&self.buffer, ts_us, &self.cfg.windows, &self.cfg.thresholds);
        let phase = self.breathing.phase(&self.cfg.breathing);
        let candidate = classify(self.transitions.current(), &analysis, phase, &self.cfg.thresholds);

        if let Some(commit) =
            self.transitions
                .observe(candidate, ts_us, &self.cfg.confirm, &self.cfg.windows)
        {
            self.metrics.on_commit(&commit);
        }

        self.metrics
            .accrue(self.transitions.current(), ts_us, self.last_update_us);
        self.last_update_us = Some(ts_us);
        self.transitions.current()
    }

    pub fn update(&mut self, score: f32) -> SleepState {
        self.update_at(score, now_ts_us())
    }

    /// End the session at `ts_us`: close any open sleep interval and, when
    /// at least a minute of sleep accumulated, persist a history entry whose
    /// duration is the accumulated sleep time. A failing history write is
    /// logged and does not abort teardown. The session data itself stays
    /// queryable until the next `start_session`.
    pub fn stop_session_at(&mut self, ts_us: i64) -> Option<HistoryEntry> {
        let start = self.session_start_us?;
        self.metrics.finalize(ts_us);
        log::info!(
            "sleep session {} stopped, total sleep {:.0}s",
            self.session_id,
            self.metrics.total_sleep_s
        );

        if self.metrics.total_sleep_s < 60.0 {
            return None;
        }
        let stats = self.stats_at(ts_us);
        let report = SleepReport::from_stats(stats, self.metrics.average_cycle_minutes(), ts_us);
        let entry = HistoryEntry {
            id: self.session_id,
            started_at_us: start,
            started_at: chrono::DateTime::from_timestamp_micros(start)
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            duration_seconds: self.metrics.total_sleep_s as u64,
            duration_formatted: report.summary.total_sleep.clone(),
            quality_score: report.summary.quality_score,
            quality_rating: report.summary.quality_rating.clone(),
            report,
        };
        if let Some(sink) = self.history.as_mut() {
            if let Err(e) = sink.append(entry.clone()) {
                log::error!("failed to persist session {}: {}", entry.id, e);
            }
        }
        Some(entry)
    }

    pub fn stop_session(&mut self) -> Option<HistoryEntry> {
        self.stop_session_at(now_ts_us())
    }

    /// Snapshot every stats field at an explicit time.
    pub fn stats_at(&self, now_us: i64) -> SleepStats {
        let bstats = self.breathing.stats(&self.cfg.breathing);
        let analysis =
            WindowAnalysis::compute(&self.buffer, now_us, &self.cfg.windows, &self.cfg.thresholds);

        let session_start = self.session_start_us.unwrap_or(now_us);
        let session_duration_s = dt_sec(now_us, session_start);
        // Zero until the first commit stamps a state start.
        let state_duration_s = self
            .transitions
            .state_start_us()
            .map(|s| dt_sec(now_us, s))
            .unwrap_or(0.0);

        let current = self.transitions.current();
        let total = self.metrics.total_sleep_s;

        SleepStats {
            current_state: current,
            // Detection tracks the committed state, not stale intervals.
            breathing_detected: matches!(
                current,
                SleepState::DeepSleep | SleepState::LightSleep
            ),
            state_duration_seconds: state_duration_s as u64,
            session_duration_minutes: (session_duration_s / 60.0) as u64,
            session_duration_seconds: session_duration_s as u64,
            total_sleep_minutes: (total / 60.0) as u64,
            total_sleep_seconds: total as u64,
            deep_sleep_minutes: (self.metrics.deep_sleep_s / 60.0) as u64,
            deep_sleep_seconds: self.metrics.deep_sleep_s as u64,
            light_sleep_minutes: (self.metrics.light_sleep_s / 60.0) as u64,
            light_sleep_seconds: self.metrics.light_sleep_s as u64,
            sleep_quality_score: sleep_quality(
                &self.metrics,
                session_duration_s,
                bstats.breathing_variability,
            ),
            deep_sleep_percent: self.metrics.deep_percent(),
            light_sleep_percent: self.metrics.light_percent(),
            wake_ups: self.metrics.wake_up_count,
            spasms: self.metrics.spasm_count,
            sleep_cycles_completed: self.metrics.sleep_cycles.len(),
            breathing_rate_bpm: bstats.breathing_rate_bpm,
            breathing_variability: bstats.breathing_variability,
            breathing_phase: bstats.sleep_phase,
            breaths_detected: bstats.breath_count,
            last_motion_score: self.buffer.latest_score(),
            motion_mean: analysis.mean,
            motion_std: analysis.std,
            events_count: self.metrics.events.len(),
            pending_transition: self.transitions.pending_target(),
        }
    }

    pub fn get_stats(&self) -> SleepStats {
        self.stats_at(now_ts_us())
    }

    /// Structured report, composed from a single stats snapshot.
    pub fn report_at(&self, now_us: i64) -> SleepReport {
        SleepReport::from_stats(
            self.stats_at(now_us),
            self.metrics.average_cycle_minutes(),
            now_us,
        )
    }

    pub fn report(&self) -> SleepReport {
        self.report_at(now_ts_us())
    }

    /// The most recent `count` events in outward record form, oldest first.
    pub fn recent_events(&self, count: usize) -> Vec<EventRecord> {
        self.metrics
            .recent_events(count)
            .iter()
            .map(|e| e.to_record())
            .collect()
    }

    /// Apply a sparse threshold/confirmation override mid-session.
    pub fn set_thresholds(&mut self, update: &ThresholdUpdate) {
        if update.is_empty() {
            return;
        }
        update.apply_to(&mut self.cfg);
        log::info!("thresholds updated: {:?}", self.cfg.thresholds);
    }

    /// Sink-equivalent of [`quality_rating`] for the current session.
    pub fn quality_rating_at(&self, now_us: i64) -> &'static str {
        quality_rating(self.stats_at(now_us).sleep_quality_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemorySink;

    const SEC: i64 = 1_000_000;

    /// Quiet motion with breath peaks alternating 1.9s / 2.1s apart (30 bpm,
    /// low but non-zero variability), at 10 Hz.
    fn breathe(engine: &mut SleepEngine, from_s: i64, to_s: i64) {
        for t in (from_s * 10)..(to_s * 10) {
            let ts = t * SEC / 10;
            let score = if t % 40 == 0 || t % 40 == 19 {
                100_000.0
            } else {
                20_000.0
            };
            engine.update_at(score, ts);
        }
    }

    #[test]
    fn first_update_starts_a_session() {
        let mut engine = SleepEngine::new(Config::default());
        assert!(!engine.session_active());
        engine.update_at(20_000.0, 0);
        assert!(engine.session_active());
        assert_eq!(engine.stats_at(0).session_duration_seconds, 0);
    }

    #[test]
    fn regular_breathing_settles_into_deep_sleep() {
        let mut engine = SleepEngine::new(Config::default());
        engine.start_session_at(0);
        breathe(&mut engine, 0, 120);
        assert_eq!(engine.current_state(), SleepState::DeepSleep);
        let stats = engine.stats_at(120 * SEC);
        assert!(stats.breathing_detected);
        assert_eq!(stats.breathing_phase, crate::domain::BreathPhase::Deep);
        assert!(stats.breathing_rate_bpm > 29.0 && stats.breathing_rate_bpm < 31.0);
        assert!(stats.deep_sleep_seconds > 0);
    }

    #[test]
    fn stop_session_persists_long_sessions_only() {
        let mut engine =
            SleepEngine::with_history(Config::default(), Box::<MemorySink>::default());
        engine.start_session_at(0);
        breathe(&mut engine, 0, 10);
        // Well under a minute of sleep: dropped.
        assert!(engine.stop_session_at(10 * SEC).is_none());

        engine.start_session_at(0);
        breathe(&mut engine, 0, 300);
        let entry = engine.stop_session_at(300 * SEC).unwrap();
        // The recorded duration is accumulated sleep, not wall-clock time.
        let stats = engine.stats_at(300 * SEC);
        assert_eq!(entry.duration_seconds, stats.total_sleep_seconds);
        assert_eq!(entry.duration_formatted, entry.report.summary.total_sleep);
        assert!(entry.duration_seconds >= 60);
    }

    #[test]
    fn stopped_session_stays_readable_until_the_next_start() {
        let mut engine = SleepEngine::new(Config::default());
        engine.start_session_at(0);
        breathe(&mut engine, 0, 120);
        engine.stop_session_at(120 * SEC);

        // Final metrics remain queryable after stop.
        let stats = engine.stats_at(120 * SEC);
        assert!(stats.total_sleep_seconds > 0);
        assert_eq!(stats.current_state, SleepState::DeepSleep);
        assert!(engine.session_active());

        // Only the next session start discards them.
        engine.start_session_at(121 * SEC);
        let stats = engine.stats_at(121 * SEC);
        assert_eq!(stats.total_sleep_seconds, 0);
        assert_eq!(stats.current_state, SleepState::Unknown);
    }

    #[test]
    fn breathing_detected_follows_the_committed_state() {
        let mut engine = SleepEngine::new(Config::default());
        engine.start_session_at(0);
        breathe(&mut engine, 0, 60);
        assert!(engine.stats_at(60 * SEC).breathing_detected);

        // Silence until the alert commits: the stale interval history still
        // yields a nonzero rate, but detection tracks the committed state.
        for t in 600..850 {
            engine.update_at(0.0, t * SEC / 10);
        }
        let stats = engine.stats_at(85 * SEC);
        assert_eq!(stats.current_state, SleepState::NoBreathing);
        assert!(stats.breathing_rate_bpm > 0.0);
        assert!(!stats.breathing_detected);
    }

    #[test]
    fn state_duration_counts_from_the_first_commit() {
        let mut engine = SleepEngine::new(Config::default());
        engine.start_session_at(0);
        for t in 0..20 {
            engine.update_at(20_000.0, t * SEC / 10);
        }
        // Nothing committed yet: duration stays zero, it does not count
        // from the session start.
        assert_eq!(engine.stats_at(2 * SEC).state_duration_seconds, 0);

        for t in 20..=100 {
            engine.update_at(20_000.0, t * SEC / 10);
        }
        assert_eq!(engine.current_state(), SleepState::LightSleep);
        // Committed at the 3s default delay, so 7s in state at t=10s.
        assert_eq!(engine.stats_at(10 * SEC).state_duration_seconds, 7);
    }

    #[test]
    fn stop_without_session_is_noop() {
        let mut engine = SleepEngine::new(Config::default());
        assert!(engine.stop_session_at(0).is_none());
    }

    #[test]
    fn threshold_update_changes_classification() {
        let mut engine = SleepEngine::new(Config::default());
        let update: ThresholdUpdate =
            serde_json::from_str(r#"{"awake_threshold": 1000.0}"#).unwrap();
        engine.set_thresholds(&update);
        assert_eq!(engine.thresholds().awake, 1000.0);
        // Untouched fields keep their defaults.
        assert_eq!(engine.thresholds().movement, 5_000_000.0);
    }

    #[test]
    fn recent_events_surface_in_record_form() {
        let mut engine = SleepEngine::new(Config::default());
        engine.start_session_at(0);
        breathe(&mut engine, 0, 60);
        let events = engine.recent_events(10);
        assert!(events.iter().any(|e| e.kind == "fell_asleep"));
    }
}
