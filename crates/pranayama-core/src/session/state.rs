use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pattern::{PatternDurations, Phase};

/// Which nostril the current alternate-nostril half-cycle inhales through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NostrilSide {
    Left,
    Right,
}

impl NostrilSide {
    pub fn flipped(self) -> Self {
        match self {
            NostrilSide::Left => NostrilSide::Right,
            NostrilSide::Right => NostrilSide::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NostrilSide::Left => "Left",
            NostrilSide::Right => "Right",
        }
    }
}

impl fmt::Display for NostrilSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live session state. Only [`PhaseMachine`](super::PhaseMachine) mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    /// Seconds remaining in the current phase.
    pub time_left_secs: f64,
    /// Length of the current phase when it was entered (never zero).
    pub phase_duration_secs: f64,
    pub nostril_side: NostrilSide,
    pub cycle_count: u32,
    pub total_elapsed_secs: f64,
    pub running: bool,
    pub paused: bool,
}

impl SessionState {
    /// Fresh state for a pattern: ready to inhale through the left nostril.
    pub fn initial(durations: &PatternDurations) -> Self {
        let inhale = durations.inhale as f64;
        Self {
            phase: Phase::Inhale,
            time_left_secs: inhale,
            phase_duration_secs: inhale.max(super::machine::ZERO_PHASE_SENTINEL_SECS),
            nostril_side: NostrilSide::Left,
            cycle_count: 0,
            total_elapsed_secs: 0.0,
            running: false,
            paused: false,
        }
    }

    /// Running and not paused.
    pub fn is_active(&self) -> bool {
        self.running && !self.paused
    }
}
