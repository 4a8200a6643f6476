//! Hysteresis state machine with a validated transition table.
//!
//! A candidate state produced by the classifier is first checked against the
//! allowed-transition table (and remapped when disallowed), then has to hold
//! for a per-transition confirmation delay before it is committed. Timers are
//! wall-clock comparisons re-evaluated on each update; there is no background
//! timer, so a transition can only commit when another sample arrives after
//! the delay has elapsed.

use serde::Serialize;

use crate::config::{ConfirmConfig, WindowConfig};
use crate::domain::{dt_sec, SleepState};

/// Why a transition committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    /// The candidate held for its confirmation delay.
    Confirmed,
    /// Spasm timed out and reverted to the pre-spasm state.
    SpasmEnded,
}

/// A committed state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Commit {
    pub from: SleepState,
    pub to: SleepState,
    pub at_us: i64,
    pub reason: TransitionReason,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    target: SleepState,
    since_us: i64,
}

/// States reachable from `from` without remapping.
pub fn allowed_targets(from: SleepState) -> &'static [SleepState] {
    use SleepState::*;
    match from {
        Unknown => &[NoBreathing, DeepSleep, LightSleep, Awake],
        NoBreathing => &[DeepSleep, LightSleep, Awake],
        DeepSleep => &[LightSleep, Spasm, NoBreathing, Awake],
        LightSleep => &[DeepSleep, Spasm, NoBreathing, Awake],
        Spasm => &[DeepSleep, LightSleep, Awake],
        Awake => &[DeepSleep, LightSleep],
    }
}

/// Deterministic resolution for a disallowed candidate.
fn remap(current: SleepState, candidate: SleepState) -> SleepState {
    if candidate == current || allowed_targets(current).contains(&candidate) {
        return candidate;
    }
    match current {
        // From awake, step down through light sleep first.
        SleepState::Awake => SleepState::LightSleep,
        // Recovery from an alert can go anywhere.
        SleepState::NoBreathing => candidate,
        _ => current,
    }
}

/// Required hold time before `(from -> to)` commits.
fn confirm_delay_s(from: SleepState, to: SleepState, cfg: &ConfirmConfig) -> f64 {
    use SleepState::*;
    match to {
        Spasm => cfg.spasm_s,
        NoBreathing => cfg.no_breathing_s,
        Awake => cfg.awake_s,
        _ => match (from, to) {
            (DeepSleep, LightSleep) | (LightSleep, DeepSleep) => cfg.phase_change_s,
            (Awake, _) => cfg.sleep_s,
            _ => cfg.default_s,
        },
    }
}

/// The hysteresis controller. Owns the committed state, the single pending
/// candidate, and the spasm bookkeeping.
#[derive(Debug)]
pub struct TransitionController {
    current: SleepState,
    /// Stamped by the first commit; None until then.
    state_start_us: Option<i64>,
    pending: Option<Pending>,
    spasm_start_us: Option<i64>,
    pre_spasm: Option<SleepState>,
}

impl Default for TransitionController {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionController {
    pub fn new() -> Self {
        Self {
            current: SleepState::Unknown,
            state_start_us: None,
            pending: None,
            spasm_start_us: None,
            pre_spasm: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn current(&self) -> SleepState {
        self.current
    }

    pub fn state_start_us(&self) -> Option<i64> {
        self.state_start_us
    }

    pub fn pending_target(&self) -> Option<SleepState> {
        self.pending.map(|p| p.target)
    }

    /// Process one classified candidate. Returns the commit if one happened.
    pub fn observe(
        &mut self,
        candidate: SleepState,
        now_us: i64,
        confirm: &ConfirmConfig,
        windows: &WindowConfig,
    ) -> Option<Commit> {
        // Spasm timeout is checked before anything else: a single-sample
        // spike stops producing a SPASM candidate as soon as it leaves the
        // short window, but the revert must still fire.
        if self.current == SleepState::Spasm {
            if let Some(start) = self.spasm_start_us {
                if dt_sec(now_us, start) > windows.spasm_s {
                    let back = self.pre_spasm.unwrap_or(SleepState::LightSleep);
                    return Some(self.commit(back, now_us, TransitionReason::SpasmEnded));
                }
            }
        }

        let candidate = remap(self.current, candidate);

        if candidate == self.current {
            self.pending = None;
            return None;
        }

        let delay = confirm_delay_s(self.current, candidate, confirm);
        match self.pending {
            Some(p) if p.target == candidate => {
                if dt_sec(now_us, p.since_us) >= delay {
                    Some(self.commit(candidate, now_us, TransitionReason::Confirmed))
                } else {
                    None
                }
            }
            // A different candidate replaces the pending one and restarts
            // its timer.
            _ => {
                self.pending = Some(Pending {
                    target: candidate,
                    since_us: now_us,
                });
                log::debug!(
                    "pending transition {} -> {} (need {:.1}s confirmation)",
                    self.current.as_str(),
                    candidate.as_str(),
                    delay
                );
                None
            }
        }
    }

    fn commit(&mut self, to: SleepState, now_us: i64, reason: TransitionReason) -> Commit {
        let from = self.current;
        match to {
            SleepState::Spasm => {
                self.spasm_start_us = Some(now_us);
                self.pre_spasm = Some(from);
            }
            _ => {
                self.spasm_start_us = None;
                self.pre_spasm = None;
            }
        }
        self.current = to;
        self.state_start_us = Some(now_us);
        self.pending = None;
        log::info!(
            "state transition {} -> {} ({:?})",
            from.as_str(),
            to.as_str(),
            reason
        );
        Commit {
            from,
            to,
            at_us: now_us,
            reason,
        }
    }
}
