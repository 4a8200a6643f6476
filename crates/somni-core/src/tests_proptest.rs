//! Property-based invariants over randomized inputs.

use proptest::prelude::*;

use crate::breathing::BreathingAnalyzer;
use crate::buffer::MotionBuffer;
use crate::config::{BreathingConfig, Config, ConfirmConfig, Thresholds, WindowConfig};
use crate::domain::SleepState;
use crate::engine::SleepEngine;
use crate::metrics::SessionMetrics;
use crate::quality::sleep_quality;
use crate::transitions::{allowed_targets, TransitionController};

const SEC: i64 = 1_000_000;

fn any_state() -> impl Strategy<Value = SleepState> {
    prop_oneof![
        Just(SleepState::Unknown),
        Just(SleepState::NoBreathing),
        Just(SleepState::DeepSleep),
        Just(SleepState::LightSleep),
        Just(SleepState::Spasm),
        Just(SleepState::Awake),
    ]
}

proptest! {
    /// The buffer never retains a sample older than the retention window
    /// relative to the newest ingest, for any gap pattern.
    #[test]
    fn buffer_respects_retention(gaps in prop::collection::vec(0i64..5 * SEC, 1..200)) {
        let mut buf = MotionBuffer::new();
        let mut ts = 0i64;
        for gap in gaps {
            ts += gap;
            buf.push(ts, 1.0, 60.0);
            let oldest = buf.oldest_ts_us().unwrap();
            prop_assert!(ts - oldest <= 60 * SEC);
        }
    }

    /// Whatever the score stream looks like, every recorded inter-peak
    /// interval lies inside the physiological bounds.
    #[test]
    fn recorded_intervals_stay_in_bounds(
        scores in prop::collection::vec(0f32..200_000.0, 1..500),
    ) {
        let mut analyzer = BreathingAnalyzer::new();
        let th = Thresholds::default();
        let cfg = BreathingConfig::default();
        for (i, score) in scores.iter().enumerate() {
            analyzer.process(*score, i as i64 * SEC / 10, &th, &cfg);
        }
        prop_assert!(analyzer
            .intervals()
            .all(|s| (cfg.min_interval_s..=cfg.max_interval_s).contains(&s)));
    }

    /// Every commit the controller produces is either a row of the
    /// transition table or one of the two documented remaps.
    #[test]
    fn commits_are_always_legal(
        candidates in prop::collection::vec((any_state(), 1u32..200), 1..100),
    ) {
        let confirm = ConfirmConfig::default();
        let windows = WindowConfig::default();
        let mut c = TransitionController::new();
        let mut now = 0i64;
        for (candidate, holds) in candidates {
            for _ in 0..holds {
                now += SEC;
                if let Some(commit) = c.observe(candidate, now, &confirm, &windows) {
                    let legal = allowed_targets(commit.from).contains(&commit.to)
                        || (commit.from == SleepState::Awake
                            && commit.to == SleepState::LightSleep)
                        || commit.from == SleepState::NoBreathing;
                    prop_assert!(legal, "illegal {:?} -> {:?}", commit.from, commit.to);
                    prop_assert_eq!(c.current(), commit.to);
                }
            }
        }
    }

    /// The quality score is bounded for arbitrary metric combinations.
    #[test]
    fn quality_score_is_bounded(
        deep in 0f64..100_000.0,
        light in 0f64..100_000.0,
        wake_ups in 0u32..500,
        spasms in 0u32..500,
        session_s in 0f64..200_000.0,
        variability in 0f64..5.0,
    ) {
        let metrics = SessionMetrics {
            deep_sleep_s: deep,
            light_sleep_s: light,
            total_sleep_s: deep + light,
            wake_up_count: wake_ups,
            spasm_count: spasms,
            ..Default::default()
        };
        let score = sleep_quality(&metrics, session_s, variability);
        prop_assert!(score <= 100);
    }

    /// Arbitrary score streams never break session accounting: accrued sleep
    /// cannot exceed the elapsed session time while the session is running.
    #[test]
    fn accrued_sleep_never_exceeds_session_time(
        scores in prop::collection::vec(0f32..30_000_000.0, 1..400),
    ) {
        let mut engine = SleepEngine::new(Config::default());
        engine.start_session_at(0);
        let mut ts = 0i64;
        for score in scores {
            ts += SEC / 10;
            engine.update_at(score, ts);
        }
        let stats = engine.stats_at(ts);
        prop_assert!(stats.total_sleep_seconds <= stats.session_duration_seconds + 1);
        prop_assert!(stats.deep_sleep_percent <= 100 && stats.light_sleep_percent <= 100);
    }
}
