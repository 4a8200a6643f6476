use std::collections::VecDeque;

/// One motion reading. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub ts_us: i64,
    pub score: f32,
}

/// Bounded time-window store of motion samples, insertion order = time order.
/// Entries older than the retention window relative to the latest ingest are
/// evicted from the oldest end on every push.
#[derive(Debug, Default)]
pub struct MotionBuffer {
    samples: VecDeque<MotionSample>,
}

impl MotionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and prune everything older than `retention_s`.
    /// Negative scores are not rejected; they simply behave as very-low motion.
    pub fn push(&mut self, ts_us: i64, score: f32, retention_s: f64) {
        self.samples.push_back(MotionSample { ts_us, score });
        let cutoff = ts_us - (retention_s * 1_000_000.0) as i64;
        while let Some(front) = self.samples.front() {
            if front.ts_us < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Samples with `ts_us >= since_us`, oldest first.
    pub fn since(&self, since_us: i64) -> impl Iterator<Item = &MotionSample> {
        // Buffer is time-ordered, so skip the old prefix.
        self.samples.iter().skip_while(move |s| s.ts_us < since_us)
    }

    /// Score of the most recent sample, 0 when empty.
    pub fn latest_score(&self) -> f32 {
        self.samples.back().map(|s| s.score).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn oldest_ts_us(&self) -> Option<i64> {
        self.samples.front().map(|s| s.ts_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prunes_entries_older_than_retention() {
        let mut buf = MotionBuffer::new();
        for i in 0..100 {
            buf.push(i * 1_000_000, 1.0, 60.0);
        }
        // Latest ingest at t=99s, so nothing before t=39s survives.
        assert_eq!(buf.oldest_ts_us().unwrap(), 39 * 1_000_000);
        assert_eq!(buf.len(), 61);
    }

    #[test]
    fn since_skips_old_prefix() {
        let mut buf = MotionBuffer::new();
        for i in 0..10 {
            buf.push(i * 1_000_000, i as f32, 60.0);
        }
        let tail: Vec<f32> = buf.since(7 * 1_000_000).map(|s| s.score).collect();
        assert_eq!(tail, vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn latest_score_empty_is_zero() {
        let buf = MotionBuffer::new();
        assert_eq!(buf.latest_score(), 0.0);
        assert!(buf.is_empty());
    }
}
