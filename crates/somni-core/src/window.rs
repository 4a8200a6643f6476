//! Rolling statistics over trailing sub-windows of the sample buffer.

use serde::Serialize;

use crate::buffer::MotionBuffer;
use crate::config::{Thresholds, WindowConfig};

/// Statistics over the trailing analysis window, recomputed on every update.
/// All fields degrade to 0 on an empty buffer.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WindowAnalysis {
    pub mean: f32,
    pub std: f32,
    pub max: f32,
    pub min: f32,
    /// Fraction of window samples above the movement threshold.
    pub high_movement_ratio: f32,
    /// Mean below the no-motion threshold.
    pub is_no_motion: bool,
    pub sample_count: usize,
    /// Max over the short spasm window.
    pub spasm_max: f32,
    /// Score of the most recent sample.
    pub current_score: f32,
}

impl WindowAnalysis {
    pub fn compute(
        buffer: &MotionBuffer,
        now_us: i64,
        windows: &WindowConfig,
        thresholds: &Thresholds,
    ) -> Self {
        let window_start = now_us - (windows.analysis_s * 1_000_000.0) as i64;
        let spasm_start = now_us - (windows.spasm_s * 1_000_000.0) as i64;

        let scores: Vec<f32> = buffer.since(window_start).map(|s| s.score).collect();
        let spasm_max = buffer
            .since(spasm_start)
            .map(|s| s.score)
            .fold(0.0f32, f32::max);

        let n = scores.len();
        let (mean, std, max, min) = match n {
            0 => (0.0, 0.0, 0.0, 0.0),
            1 => (scores[0], 0.0, scores[0], scores[0]),
            _ => {
                let mean = scores.iter().sum::<f32>() / n as f32;
                // Sample standard deviation (n-1 denominator).
                let var = scores
                    .iter()
                    .map(|x| (x - mean) * (x - mean))
                    .sum::<f32>()
                    / (n as f32 - 1.0);
                let max = scores.iter().copied().fold(f32::MIN, f32::max);
                let min = scores.iter().copied().fold(f32::MAX, f32::min);
                (mean, var.sqrt(), max, min)
            }
        };

        let high = scores.iter().filter(|&&s| s > thresholds.movement).count();
        let high_movement_ratio = high as f32 / n.max(1) as f32;

        WindowAnalysis {
            mean,
            std,
            max,
            min,
            high_movement_ratio,
            is_no_motion: mean < thresholds.no_motion,
            sample_count: n,
            spasm_max,
            current_score: buffer.latest_score(),
        }
    }
}
