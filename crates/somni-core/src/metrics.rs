//! Session metrics and the discrete event log.
//!
//! Totals accrue on every update keyed by the post-transition state; the
//! discrete events are appended only when a transition commits.

use serde::{Deserialize, Serialize};

use crate::domain::{dt_sec, BreathPhase, SleepEvent, SleepEventKind, SleepState};
use crate::transitions::Commit;

/// One completed interval from falling asleep to waking up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepCycle {
    pub start_us: i64,
    pub end_us: i64,
    pub duration_minutes: f64,
}

/// Running totals and the append-only event log for the active session.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    pub total_sleep_s: f64,
    pub deep_sleep_s: f64,
    pub light_sleep_s: f64,
    pub wake_up_count: u32,
    pub spasm_count: u32,
    pub sleep_cycles: Vec<SleepCycle>,
    pub events: Vec<SleepEvent>,
    /// Open sleep interval, None while awake.
    pub last_sleep_start_us: Option<i64>,
    /// Open sleep cycle, closed on the next wake-up.
    pub cycle_start_us: Option<i64>,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Accrue elapsed time since the previous update to the counters of the
    /// current (post-transition) state. Spasm time counts as light sleep.
    pub fn accrue(&mut self, state: SleepState, now_us: i64, last_update_us: Option<i64>) {
        let Some(last) = last_update_us else {
            return; // first update of the session, nothing elapsed yet
        };
        let delta = dt_sec(now_us, last);
        match state {
            SleepState::DeepSleep => {
                self.deep_sleep_s += delta;
                self.total_sleep_s += delta;
            }
            SleepState::LightSleep | SleepState::Spasm => {
                self.light_sleep_s += delta;
                self.total_sleep_s += delta;
            }
            SleepState::Unknown | SleepState::NoBreathing | SleepState::Awake => {}
        }
    }

    /// Apply the bookkeeping side effects of a committed transition.
    pub fn on_commit(&mut self, commit: &Commit) {
        use SleepState::*;
        let now = commit.at_us;

        if commit.to == Spasm {
            self.spasm_count += 1;
            self.events.push(SleepEvent::new(now, SleepEventKind::Spasm));
        }

        if matches!(commit.from, DeepSleep | LightSleep) && commit.to == Awake {
            self.wake_up_count += 1;
            if let Some(start) = self.last_sleep_start_us.take() {
                let duration = dt_sec(now, start);
                self.events.push(SleepEvent::new(
                    now,
                    SleepEventKind::WakeUp {
                        sleep_duration_seconds: duration,
                    },
                ));
                if let Some(cycle_start) = self.cycle_start_us.take() {
                    self.sleep_cycles.push(SleepCycle {
                        start_us: cycle_start,
                        end_us: now,
                        duration_minutes: dt_sec(now, cycle_start) / 60.0,
                    });
                }
            }
        }

        if matches!(commit.from, Awake | Unknown) && matches!(commit.to, DeepSleep | LightSleep) {
            self.events
                .push(SleepEvent::new(now, SleepEventKind::FellAsleep));
            self.last_sleep_start_us = Some(now);
            self.cycle_start_us = Some(now);
        }

        match (commit.from, commit.to) {
            (DeepSleep, LightSleep) => self.events.push(SleepEvent::new(
                now,
                SleepEventKind::PhaseChange {
                    from: BreathPhase::Deep,
                    to: BreathPhase::Light,
                },
            )),
            (LightSleep, DeepSleep) => self.events.push(SleepEvent::new(
                now,
                SleepEventKind::PhaseChange {
                    from: BreathPhase::Light,
                    to: BreathPhase::Deep,
                },
            )),
            _ => {}
        }

        if commit.to == NoBreathing {
            self.events
                .push(SleepEvent::new(now, SleepEventKind::NoBreathingAlert));
        }
    }

    /// Close any open sleep interval at `now_us` (session stop). The open
    /// interval adds to the total only; the per-phase split is already
    /// accounted for by the per-update accrual.
    pub fn finalize(&mut self, now_us: i64) {
        if let Some(start) = self.last_sleep_start_us.take() {
            self.total_sleep_s += dt_sec(now_us, start);
        }
    }

    /// The most recent `count` events, oldest first within the slice.
    pub fn recent_events(&self, count: usize) -> &[SleepEvent] {
        let skip = self.events.len().saturating_sub(count);
        &self.events[skip..]
    }

    /// Deep-sleep share of total sleep as a truncated percent.
    pub fn deep_percent(&self) -> u32 {
        ((self.deep_sleep_s / self.total_sleep_s.max(1.0)) * 100.0) as u32
    }

    /// Light-sleep share of total sleep as a truncated percent.
    pub fn light_percent(&self) -> u32 {
        ((self.light_sleep_s / self.total_sleep_s.max(1.0)) * 100.0) as u32
    }

    pub fn average_cycle_minutes(&self) -> Option<f64> {
        if self.sleep_cycles.is_empty() {
            return None;
        }
        let sum: f64 = self.sleep_cycles.iter().map(|c| c.duration_minutes).sum();
        Some(sum / self.sleep_cycles.len() as f64)
    }
}
