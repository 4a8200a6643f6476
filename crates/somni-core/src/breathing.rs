//! Breath peak detection over the raw motion stream.
//!
//! A breath is one excursion of the motion score above the peak threshold;
//! only the first sample of a continuous excursion counts. Inter-peak
//! intervals are validated against physiological bounds before entering the
//! bounded history that drives rate and variability estimates.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::{BreathingConfig, Thresholds};
use crate::domain::{dt_sec, BreathPhase};

/// Detects breath peaks and derives rate / interval variability.
#[derive(Debug, Default)]
pub struct BreathingAnalyzer {
    /// Last ≤100 accepted peak timestamps, oldest evicted first.
    peak_ts_us: VecDeque<i64>,
    /// Last ≤50 validated inter-peak intervals, seconds.
    intervals_s: VecDeque<f64>,
    last_peak_ts_us: Option<i64>,
    in_peak: bool,
}

/// Breathing summary embedded in stats snapshots.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BreathingStats {
    pub breathing_rate_bpm: f64,
    pub breathing_variability: f64,
    pub sleep_phase: BreathPhase,
    pub breath_count: usize,
    pub intervals_recorded: usize,
}

impl BreathingAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.peak_ts_us.clear();
        self.intervals_s.clear();
        self.last_peak_ts_us = None;
        self.in_peak = false;
    }

    /// Feed one motion sample. Returns the inter-peak interval when a new
    /// breath with a valid interval is detected.
    pub fn process(
        &mut self,
        score: f32,
        ts_us: i64,
        thresholds: &Thresholds,
        cfg: &BreathingConfig,
    ) -> Option<f64> {
        if score <= thresholds.breath_peak {
            // End of the excursion; the next crossing counts as a new peak.
            self.in_peak = false;
            return None;
        }
        if self.in_peak {
            return None;
        }
        self.in_peak = true;

        match self.last_peak_ts_us {
            Some(last) => {
                let interval = dt_sec(ts_us, last);
                // Updated on every peak entry so a long gap cannot leave a
                // stale timestamp behind.
                self.last_peak_ts_us = Some(ts_us);

                if interval >= cfg.min_interval_s && interval <= cfg.max_interval_s {
                    self.record_peak(ts_us, cfg);
                    self.record_interval(interval, cfg);
                    Some(interval)
                } else if interval > cfg.max_interval_s {
                    // Too long a gap: first breath of a new sequence.
                    self.record_peak(ts_us, cfg);
                    None
                } else {
                    // Too short: noise bounce, drop it.
                    None
                }
            }
            None => {
                self.last_peak_ts_us = Some(ts_us);
                self.record_peak(ts_us, cfg);
                None
            }
        }
    }

    fn record_peak(&mut self, ts_us: i64, cfg: &BreathingConfig) {
        self.peak_ts_us.push_back(ts_us);
        while self.peak_ts_us.len() > cfg.max_peaks {
            self.peak_ts_us.pop_front();
        }
    }

    fn record_interval(&mut self, interval_s: f64, cfg: &BreathingConfig) {
        self.intervals_s.push_back(interval_s);
        while self.intervals_s.len() > cfg.max_intervals {
            self.intervals_s.pop_front();
        }
    }

    /// Breaths per minute from the mean of the last ≤10 intervals.
    /// 0 with fewer than 3 intervals on record.
    pub fn breathing_rate(&self) -> f64 {
        if self.intervals_s.len() < 3 {
            return 0.0;
        }
        let recent: Vec<f64> = self.recent_intervals(10);
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        if mean > 0.0 {
            60.0 / mean
        } else {
            0.0
        }
    }

    /// Coefficient of variation (sample stddev / mean) over the last ≤20
    /// intervals. 0 with fewer than 5 intervals on record.
    pub fn variability(&self) -> f64 {
        if self.intervals_s.len() < 5 {
            return 0.0;
        }
        let recent: Vec<f64> = self.recent_intervals(20);
        let n = recent.len();
        let mean = recent.iter().sum::<f64>() / n as f64;
        if mean > 0.0 && n >= 2 {
            let var =
                recent.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n as f64 - 1.0);
            var.sqrt() / mean
        } else {
            0.0
        }
    }

    /// Sleep phase from variability: regular breathing means quiet/deep
    /// sleep, irregular means active/REM.
    pub fn phase(&self, cfg: &BreathingConfig) -> BreathPhase {
        let v = self.variability();
        if v == 0.0 {
            BreathPhase::Unknown
        } else if v < cfg.low_variability {
            BreathPhase::Deep
        } else if v > cfg.high_variability {
            BreathPhase::Light
        } else {
            BreathPhase::Transitional
        }
    }

    /// Snapshot with the rate reported to one decimal and the variability to
    /// three, the precision the outward stats carry.
    pub fn stats(&self, cfg: &BreathingConfig) -> BreathingStats {
        BreathingStats {
            breathing_rate_bpm: round_to(self.breathing_rate(), 1),
            breathing_variability: round_to(self.variability(), 3),
            sleep_phase: self.phase(cfg),
            breath_count: self.peak_ts_us.len(),
            intervals_recorded: self.intervals_s.len(),
        }
    }

    fn recent_intervals(&self, n: usize) -> Vec<f64> {
        let skip = self.intervals_s.len().saturating_sub(n);
        self.intervals_s.iter().skip(skip).copied().collect()
    }

    #[cfg(test)]
    pub(crate) fn intervals(&self) -> impl Iterator<Item = f64> + '_ {
        self.intervals_s.iter().copied()
    }
}

fn round_to(x: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (x * f).round() / f
}
