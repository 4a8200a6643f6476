//! Sleep quality scoring: a bounded 0-100 heuristic over the accumulated
//! session metrics plus the current breathing variability.

use crate::metrics::SessionMetrics;

/// Compute the quality score. Returns 0 when the session or the accumulated
/// sleep is under a minute, there is simply not enough data to judge.
pub fn sleep_quality(metrics: &SessionMetrics, session_duration_s: f64, variability: f64) -> u8 {
    if session_duration_s < 60.0 || metrics.total_sleep_s < 60.0 {
        return 0;
    }

    let mut score: i32 = 100;

    // Deep sleep ratio, target band 0.35..0.60.
    let deep_ratio = metrics.deep_sleep_s / metrics.total_sleep_s.max(1.0);
    if deep_ratio < 0.20 {
        score -= 20;
    } else if deep_ratio < 0.35 {
        score -= 10;
    } else if deep_ratio > 0.60 {
        score -= 5;
    }

    // Fragmentation: about one wake-up per hour is expected.
    let expected_wakes = session_duration_s / 3600.0;
    let excess_wakes = (metrics.wake_up_count as f64 - expected_wakes).max(0.0);
    score -= ((excess_wakes * 10.0) as i32).min(30);

    // Excessive spasms indicate restless sleep.
    if metrics.spasm_count > 10 {
        score -= ((metrics.spasm_count - 10) as i32).min(10);
    }

    // Very irregular breathing right now.
    if variability > 0.4 {
        score -= 10;
    }

    score.clamp(0, 100) as u8
}

/// Human-readable rating for a score.
pub fn quality_rating(score: u8) -> &'static str {
    match score {
        85..=u8::MAX => "Excellent",
        70..=84 => "Good",
        50..=69 => "Fair",
        30..=49 => "Poor",
        _ => "Very Poor",
    }
}

/// Short description of the deep/light split for the report.
pub fn breakdown_description(deep_percent: u32) -> &'static str {
    if deep_percent >= 40 {
        "Good balance of deep and light sleep. Deep sleep promotes physical growth."
    } else if deep_percent >= 25 {
        "Normal sleep pattern. Cycling between sleep phases."
    } else if deep_percent >= 10 {
        "Mostly light/REM sleep. Important for brain development."
    } else {
        "Very little deep sleep detected. Subject may be in an active sleep phase."
    }
}
