//! Priority-ordered state classification.
//!
//! Pure decision function: given the window statistics, the breathing phase
//! and the currently committed state, produce the candidate target state.
//! First matching rule wins; the transition controller decides whether the
//! candidate is ever committed.

use crate::config::Thresholds;
use crate::domain::{BreathPhase, SleepState};
use crate::window::WindowAnalysis;

pub fn classify(
    current: SleepState,
    analysis: &WindowAnalysis,
    phase: BreathPhase,
    thresholds: &Thresholds,
) -> SleepState {
    // Rule 1: no motion at all.
    if analysis.is_no_motion {
        return SleepState::NoBreathing;
    }

    // Rule 2: sustained high movement.
    if analysis.high_movement_ratio > 0.5 && analysis.mean > thresholds.movement {
        return SleepState::Awake;
    }

    // Rule 3: isolated spike during sleep.
    if current.is_asleep()
        && analysis.spasm_max > thresholds.awake
        && analysis.high_movement_ratio < 0.3
    {
        return SleepState::Spasm;
    }

    // Rule 4: below the awake level, let breathing decide the phase.
    if analysis.mean < thresholds.awake {
        return match phase {
            BreathPhase::Deep => SleepState::DeepSleep,
            BreathPhase::Light | BreathPhase::Transitional => SleepState::LightSleep,
            // Phase unknown: assume the lighter phase only when nothing is
            // committed yet, otherwise hold.
            BreathPhase::Unknown => {
                if current == SleepState::Unknown {
                    SleepState::LightSleep
                } else {
                    current
                }
            }
        };
    }

    // Fallback: hold, or assume light sleep when nothing is committed yet.
    if current == SleepState::Unknown {
        SleepState::LightSleep
    } else {
        current
    }
}
