//! Premium prompt cadence: re-arm at the 3rd delivery, then every 5th after.

use crate::gates::Section;
use crate::types::AppState;

pub const FIRST_REARM_AT: u64 = 3;
pub const REARM_EVERY: u64 = 5;

pub fn is_rearm_point(completed_jobs: u64) -> bool {
    completed_jobs == FIRST_REARM_AT
        || (completed_jobs > FIRST_REARM_AT && (completed_jobs - FIRST_REARM_AT) % REARM_EVERY == 0)
}

/// Clears the dismissal flag when `state.completed_jobs` sits on a re-arm
/// point. Never sets it.
pub fn rearm(state: &mut AppState) -> bool {
    if is_rearm_point(state.completed_jobs) {
        state.premium_hint_dismissed = false;
        true
    } else {
        false
    }
}

/// Visual emphasis of the Premium tab, derived from state on every render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PremiumVisual {
    pub outline: bool,
    pub glow: bool,
    pub bubble: bool,
}

impl PremiumVisual {
    pub fn from_state(state: &AppState) -> Self {
        let n = state.completed_jobs;
        Self { outline: n >= 1, glow: n >= 2, bubble: n >= 3 && !state.premium_hint_dismissed }
    }

    /// The prompt is not shown over the pages that already advertise Premium.
    pub fn show_nudge_on(&self, section: Section) -> bool {
        self.bubble && !matches!(section, Section::Marketplace | Section::Premium)
    }
}
