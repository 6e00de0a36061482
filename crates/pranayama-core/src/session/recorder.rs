//! Session summaries at pause/stop boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::SessionState;
use crate::error::Result;
use crate::pattern::Selection;

/// Persistable summary of a practice session.
///
/// Field names on the wire match the history export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "date")]
    pub recorded_at: DateTime<Utc>,
    pub cycles: u32,
    /// Whole seconds of breathing time.
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    #[serde(rename = "pattern")]
    pub pattern_label: String,
    #[serde(rename = "isCustom")]
    pub is_custom_or_preset: bool,
}

/// Append-only destination for session records.
pub trait SessionLog {
    fn append(&mut self, record: &SessionRecord) -> Result<()>;
}

impl SessionLog for Vec<SessionRecord> {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<L: SessionLog + ?Sized> SessionLog for Box<L> {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        (**self).append(record)
    }
}

/// Produces at most one record per pause/stop boundary.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    /// `(cycles, elapsed bits)` of the last record; a second boundary with no
    /// progress in between is the same stop.
    last_mark: Option<(u32, u64)>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarise `state` if at least one cycle was completed and this
    /// boundary has not been recorded yet.
    pub fn record(&mut self, state: &SessionState, selection: &Selection) -> Option<SessionRecord> {
        if state.cycle_count == 0 {
            return None;
        }
        let mark = (state.cycle_count, state.total_elapsed_secs.to_bits());
        if self.last_mark == Some(mark) {
            return None;
        }
        self.last_mark = Some(mark);

        let record = SessionRecord {
            recorded_at: Utc::now(),
            cycles: state.cycle_count,
            duration_secs: state.total_elapsed_secs.max(0.0).round() as u64,
            pattern_label: selection.record_label(),
            is_custom_or_preset: selection.mode().is_custom_or_preset(),
        };
        info!(
            cycles = record.cycles,
            duration_secs = record.duration_secs,
            pattern = %record.pattern_label,
            "session recorded"
        );
        Some(record)
    }

    /// Forget the previous boundary; called when a new session begins.
    pub fn clear(&mut self) {
        self.last_mark = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Mode, PatternDurations, Phase, Tier};
    use crate::session::state::NostrilSide;

    fn state(cycles: u32, elapsed: f64) -> SessionState {
        SessionState {
            phase: Phase::Inhale,
            time_left_secs: 8.0,
            phase_duration_secs: 8.0,
            nostril_side: NostrilSide::Left,
            cycle_count: cycles,
            total_elapsed_secs: elapsed,
            running: true,
            paused: true,
        }
    }

    #[test]
    fn no_record_without_a_cycle() {
        let mut recorder = SessionRecorder::new();
        assert!(recorder
            .record(&state(0, 30.0), &Selection::default())
            .is_none());
    }

    #[test]
    fn one_record_per_boundary() {
        let mut recorder = SessionRecorder::new();
        let selection = Selection::default();
        let record = recorder.record(&state(2, 84.4), &selection).unwrap();
        assert_eq!(record.cycles, 2);
        assert_eq!(record.duration_secs, 84);
        assert_eq!(record.pattern_label, "Adhama (8-16-8-10)");
        assert!(!record.is_custom_or_preset);

        // Same totals again: the stop that follows a pause.
        assert!(recorder.record(&state(2, 84.4), &selection).is_none());
        // Progress since then: a new boundary.
        assert!(recorder.record(&state(2, 90.0), &selection).is_some());
    }

    #[test]
    fn custom_and_nadi_labels() {
        let mut recorder = SessionRecorder::new();
        let (custom, _) = Selection::new(
            Mode::custom(PatternDurations::new(5, 5, 5, 5).unwrap()),
            false,
        )
        .unwrap();
        let record = recorder.record(&state(1, 20.0), &custom).unwrap();
        assert!(record.is_custom_or_preset);

        let (nadi, _) = Selection::new(Mode::tier(Tier::Medium), true).unwrap();
        recorder.clear();
        let record = recorder.record(&state(3, 48.0), &nadi).unwrap();
        assert_eq!(record.pattern_label, "NADI SHODHANA (4:4:8) (Nadi Shodhana)");
    }

    #[test]
    fn record_serializes_with_history_field_names() {
        let mut recorder = SessionRecorder::new();
        let record = recorder
            .record(&state(1, 42.0), &Selection::default())
            .unwrap();
        let json = serde_json::to_value(&record).unwrap();
        for key in ["date", "cycles", "duration", "pattern", "isCustom"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
