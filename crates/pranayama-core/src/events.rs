use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::{PatternDurations, Phase};
use crate::session::{NostrilSide, SessionRecord, SessionState};

/// Every state change in the engine produces an Event.
/// UIs and notification sinks subscribe; they never mutate session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        phase: Phase,
        nostril: Option<NostrilSide>,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        cycle_count: u32,
        total_elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        time_left_secs: f64,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    /// A phase boundary was crossed.
    PhaseChanged {
        phase: Phase,
        /// Inhale side; only set in alternate-nostril mode.
        nostril: Option<NostrilSide>,
        /// True on the transition that completes a cycle.
        cycle_completed: bool,
        cycle_count: u32,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// Mode or alternate-nostril toggle changed; the session was reset.
    SelectionChanged {
        label: String,
        durations: PatternDurations,
        nostril_active: bool,
        at: DateTime<Utc>,
    },
    /// An alternate-nostril request was refused and the toggle reverted.
    NostrilDisallowed {
        context: String,
        at: DateTime<Utc>,
    },
    SessionRecorded {
        record: SessionRecord,
    },
    /// The session log rejected a record. The engine carries on.
    RecordNotSaved {
        record: SessionRecord,
        reason: String,
    },
    StateSnapshot {
        state: SessionState,
        label: String,
        nostril_active: bool,
        progress: f64,
        at: DateTime<Utc>,
    },
}
