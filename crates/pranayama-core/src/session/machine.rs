//! Phase state machine.
//!
//! Operates on elapsed-time deltas -- no internal thread. A
//! [`SessionClock`](super::SessionClock) feeds it deltas while the session is
//! active.
//!
//! ## Phase Cycles
//!
//! ```text
//! standard:          Inhale -> Hold -> Exhale -> Relax -> Inhale   (cycle on Relax -> Inhale)
//! alternate-nostril: Inhale -> [Hold] -> Exhale -> Inhale           (cycle + side flip on Exhale -> Inhale)
//! ```
//!
//! Overshoot past the end of a phase is carried into the next one, so timing
//! error does not accumulate across phases. A zero-length phase is passed
//! straight through within the same tick rather than waiting for the next
//! one. Overshoot spanning many cycles is counted without walking each phase.

use chrono::Utc;
use tracing::debug;

use super::state::{NostrilSide, SessionState};
use crate::events::Event;
use crate::pattern::{PatternDurations, Phase, Resolution};

/// Phase-duration floor used for progress; zero-length phases report full
/// progress instead of dividing by zero.
pub const ZERO_PHASE_SENTINEL_SECS: f64 = 0.001;

/// Remaining time at or below this counts as phase completion. Absorbs float
/// error from summing many small deltas.
pub const PHASE_EPSILON_SECS: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    durations: PatternDurations,
    nostril_active: bool,
    state: SessionState,
}

impl PhaseMachine {
    /// Create a machine for a resolved pattern, idle and ready to inhale.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            durations: resolution.durations,
            nostril_active: resolution.nostril_active,
            state: SessionState::initial(&resolution.durations),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn durations(&self) -> &PatternDurations {
        &self.durations
    }

    pub fn nostril_active(&self) -> bool {
        self.nostril_active
    }

    /// Nostril side to report for the current phase, if alternate-nostril.
    pub fn nostril(&self) -> Option<NostrilSide> {
        self.nostril_active.then_some(self.state.nostril_side)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress_fraction(&self) -> f64 {
        let total = self.state.phase_duration_secs.max(ZERO_PHASE_SENTINEL_SECS);
        (1.0 - self.state.time_left_secs / total).clamp(0.0, 1.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session from the first inhale. No-op when already running.
    pub fn start(&mut self) -> Option<Event> {
        if self.state.running {
            return None;
        }
        self.state = SessionState::initial(&self.durations);
        self.state.running = true;
        Some(Event::SessionStarted {
            phase: self.state.phase,
            nostril: self.nostril(),
            duration_secs: self.durations.inhale,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_active() {
            return None;
        }
        self.state.paused = true;
        Some(Event::SessionPaused {
            cycle_count: self.state.cycle_count,
            total_elapsed_secs: self.state.total_elapsed_secs,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if !(self.state.running && self.state.paused) {
            return None;
        }
        self.state.paused = false;
        Some(Event::SessionResumed {
            time_left_secs: self.state.time_left_secs,
            at: Utc::now(),
        })
    }

    /// Back to the initial state for the current pattern.
    pub fn reset(&mut self) -> Event {
        self.state = SessionState::initial(&self.durations);
        Event::SessionReset { at: Utc::now() }
    }

    /// Swap in a new pattern and reset.
    pub fn reconfigure(&mut self, resolution: Resolution) -> Event {
        self.durations = resolution.durations;
        self.nostril_active = resolution.nostril_active;
        self.reset()
    }

    /// Consume `delta_secs` of session time, advancing through as many
    /// phases as it covers. Returns one `PhaseChanged` per transition.
    ///
    /// Does nothing unless the session is running and not paused.
    pub fn elapse(&mut self, delta_secs: f64) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.state.is_active() || !delta_secs.is_finite() || delta_secs <= 0.0 {
            return events;
        }
        self.state.time_left_secs -= delta_secs;
        self.state.total_elapsed_secs += delta_secs;

        // A cycle of zero length would never leave this loop.
        let cycle_secs = self.cycle_secs();
        if cycle_secs <= 0.0 {
            return events;
        }
        while self.state.time_left_secs <= PHASE_EPSILON_SECS {
            let overflow = -self.state.time_left_secs;
            if overflow >= 2.0 * cycle_secs && self.in_cycle(self.state.phase) {
                self.skip_cycles(overflow, cycle_secs);
                continue;
            }
            events.push(self.advance(overflow));
        }
        events
    }

    /// Move to the next phase, carrying `overflow_secs` of overshoot.
    pub fn advance(&mut self, overflow_secs: f64) -> Event {
        let (next, cycle_completed) = self.next_phase();
        if cycle_completed {
            self.state.cycle_count = self.state.cycle_count.saturating_add(1);
            if self.nostril_active {
                self.state.nostril_side = self.state.nostril_side.flipped();
            }
        }

        let duration = self.durations.get(next) as f64;
        self.state.phase = next;
        self.state.time_left_secs = duration - overflow_secs;
        self.state.phase_duration_secs = duration.max(ZERO_PHASE_SENTINEL_SECS);

        debug!(
            phase = %next,
            cycle_count = self.state.cycle_count,
            cycle_completed,
            overflow_secs,
            "phase advanced"
        );

        Event::PhaseChanged {
            phase: next,
            nostril: self.nostril(),
            cycle_completed,
            cycle_count: self.state.cycle_count,
            duration_secs: self.durations.get(next),
            at: Utc::now(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Length of one full cycle as this mode walks it.
    fn cycle_secs(&self) -> f64 {
        let d = &self.durations;
        let secs = if self.nostril_active {
            u64::from(d.inhale) + u64::from(d.hold) + u64::from(d.exhale)
        } else {
            d.total_secs()
        };
        secs as f64
    }

    fn in_cycle(&self, phase: Phase) -> bool {
        !(self.nostril_active && phase == Phase::Relax)
    }

    /// Drop whole cycles from `overflow_secs` without walking them. One
    /// full cycle plus the remainder is left for the phase walk, so the
    /// last cycle still reports its transitions.
    fn skip_cycles(&mut self, overflow_secs: f64, cycle_secs: f64) {
        let remainder = overflow_secs % cycle_secs;
        let whole = ((overflow_secs - remainder) / cycle_secs).round();
        let skipped = whole - 1.0;

        // Float-to-int casts saturate.
        let counted = skipped as u32;
        self.state.cycle_count = self.state.cycle_count.saturating_add(counted);
        if self.nostril_active && skipped % 2.0 == 1.0 {
            self.state.nostril_side = self.state.nostril_side.flipped();
        }
        self.state.time_left_secs = -(remainder + cycle_secs);

        debug!(
            skipped,
            cycle_count = self.state.cycle_count,
            "whole cycles skipped"
        );
    }

    fn next_phase(&self) -> (Phase, bool) {
        if self.nostril_active {
            match self.state.phase {
                Phase::Inhale if self.durations.hold > 0 => (Phase::Hold, false),
                Phase::Inhale | Phase::Hold => (Phase::Exhale, false),
                Phase::Exhale => (Phase::Inhale, true),
                // Not part of the alternate-nostril cycle; restart it.
                Phase::Relax => (Phase::Inhale, false),
            }
        } else {
            match self.state.phase {
                Phase::Inhale => (Phase::Hold, false),
                Phase::Hold => (Phase::Exhale, false),
                Phase::Exhale => (Phase::Relax, false),
                Phase::Relax => (Phase::Inhale, true),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{resolve, Mode, Tier};

    fn machine(tier: Tier, nadi: bool) -> PhaseMachine {
        PhaseMachine::new(resolve(&Mode::tier(tier), nadi))
    }

    fn custom(inhale: u32, hold: u32, exhale: u32, relax: u32) -> PhaseMachine {
        PhaseMachine::new(Resolution {
            durations: PatternDurations {
                inhale,
                hold,
                exhale,
                relax,
            },
            nostril_active: false,
        })
    }

    #[test]
    fn initial_state() {
        let m = machine(Tier::Medium, false);
        let s = m.state();
        assert_eq!(s.phase, Phase::Inhale);
        assert_eq!(s.time_left_secs, 16.0);
        assert_eq!(s.nostril_side, NostrilSide::Left);
        assert_eq!(s.cycle_count, 0);
        assert!(!s.running);
        assert!(!s.paused);
    }

    #[test]
    fn start_pause_resume() {
        let mut m = machine(Tier::Easy, false);
        assert!(m.start().is_some());
        assert!(m.start().is_none());
        assert!(m.pause().is_some());
        assert!(m.pause().is_none());
        assert!(m.resume().is_some());
        assert!(m.resume().is_none());
        assert!(m.state().is_active());
    }

    #[test]
    fn elapse_is_ignored_when_idle_or_paused() {
        let mut m = machine(Tier::Easy, false);
        assert!(m.elapse(100.0).is_empty());
        assert_eq!(m.state().total_elapsed_secs, 0.0);

        m.start();
        m.pause();
        assert!(m.elapse(100.0).is_empty());
        assert_eq!(m.state().total_elapsed_secs, 0.0);
    }

    #[test]
    fn standard_cycle_counts_on_relax_to_inhale() {
        let mut m = machine(Tier::Easy, false);
        m.start();
        let phases: Vec<_> = [8.0, 16.0, 8.0, 10.0]
            .iter()
            .flat_map(|d| m.elapse(*d))
            .collect();
        assert_eq!(phases.len(), 4);
        match &phases[3] {
            Event::PhaseChanged {
                phase,
                cycle_completed,
                cycle_count,
                nostril,
                ..
            } => {
                assert_eq!(*phase, Phase::Inhale);
                assert!(*cycle_completed);
                assert_eq!(*cycle_count, 1);
                assert!(nostril.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(m.state().cycle_count, 1);
    }

    #[test]
    fn overflow_is_carried_into_next_phase() {
        let mut m = machine(Tier::Easy, false);
        m.start();
        let events = m.elapse(8.25);
        assert_eq!(events.len(), 1);
        assert_eq!(m.state().phase, Phase::Hold);
        assert!((m.state().time_left_secs - 15.75).abs() < 1e-12);
    }

    #[test]
    fn large_delta_crosses_several_phases() {
        let mut m = machine(Tier::Easy, false);
        m.start();
        // 42s = one full cycle, plus 5s into the next inhale.
        let events = m.elapse(47.0);
        assert_eq!(events.len(), 4);
        assert_eq!(m.state().phase, Phase::Inhale);
        assert_eq!(m.state().cycle_count, 1);
        assert!((m.state().time_left_secs - 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_hold_passes_straight_through() {
        let mut m = custom(4, 0, 4, 2);
        m.start();
        let events = m.elapse(4.0);
        // Inhale -> Hold (zero) -> Exhale within the same tick.
        assert_eq!(events.len(), 2);
        assert_eq!(m.state().phase, Phase::Exhale);
        assert_eq!(m.state().time_left_secs, 4.0);
    }

    #[test]
    fn nostril_mode_skips_zero_hold_and_relax() {
        let mut m = machine(Tier::Easy, true);
        m.start();
        m.elapse(4.0);
        assert_eq!(m.state().phase, Phase::Exhale);
        m.elapse(4.0);
        assert_eq!(m.state().phase, Phase::Inhale);
        assert_eq!(m.state().cycle_count, 1);
        assert_eq!(m.state().nostril_side, NostrilSide::Right);
    }

    #[test]
    fn nostril_mode_visits_hold_when_non_zero() {
        let mut m = machine(Tier::Medium, true);
        m.start();
        m.elapse(4.0);
        assert_eq!(m.state().phase, Phase::Hold);
        m.elapse(4.0);
        assert_eq!(m.state().phase, Phase::Exhale);
        m.elapse(8.0);
        assert_eq!(m.state().phase, Phase::Inhale);
        assert_eq!(m.state().nostril_side, NostrilSide::Right);
    }

    #[test]
    fn progress_fraction_is_clamped() {
        let mut m = machine(Tier::Easy, false);
        assert_eq!(m.progress_fraction(), 0.0);
        m.start();
        m.elapse(2.0);
        assert!((m.progress_fraction() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn reconfigure_resets_everything() {
        let mut m = machine(Tier::Easy, false);
        m.start();
        m.elapse(50.0);
        m.reconfigure(resolve(&Mode::tier(Tier::Hard), true));
        let s = m.state();
        assert_eq!(s.cycle_count, 0);
        assert_eq!(s.total_elapsed_secs, 0.0);
        assert_eq!(s.time_left_secs, 4.0);
        assert!(!s.running);
        assert!(m.nostril_active());
    }

    #[test]
    fn all_zero_pattern_does_not_hang() {
        let mut m = custom(0, 0, 0, 0);
        m.start();
        assert!(m.elapse(1.0).is_empty());
    }

    #[test]
    fn huge_delta_returns_with_saturated_cycle_count() {
        let mut m = machine(Tier::Easy, false);
        m.start();
        let events = m.elapse(1e17);
        assert!(events.len() <= 8);
        assert_eq!(m.state().cycle_count, u32::MAX);
        assert!(m.state().time_left_secs > 0.0);
    }

    #[test]
    fn skipped_cycles_match_a_phase_by_phase_walk() {
        let mut m = machine(Tier::Easy, false);
        m.start();
        // 1000 cycles of 42s, then the 8s inhale and 5s into the hold.
        let events = m.elapse(42.0 * 1000.0 + 13.0);
        assert_eq!(events.len(), 5);
        assert_eq!(m.state().cycle_count, 1000);
        assert_eq!(m.state().phase, Phase::Hold);
        assert!((m.state().time_left_secs - 11.0).abs() < 1e-9);
    }

    #[test]
    fn skipped_cycles_keep_nostril_side_parity() {
        let mut m = machine(Tier::Easy, true);
        m.start();
        // Seven 8s cycles plus one second of inhale.
        m.elapse(57.0);
        assert_eq!(m.state().cycle_count, 7);
        assert_eq!(m.state().phase, Phase::Inhale);
        assert_eq!(m.state().nostril_side, NostrilSide::Right);
        assert!((m.state().time_left_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn nostril_mode_with_only_relax_does_not_hang() {
        let mut m = PhaseMachine::new(Resolution {
            durations: PatternDurations {
                inhale: 0,
                hold: 0,
                exhale: 0,
                relax: 5,
            },
            nostril_active: true,
        });
        m.start();
        assert!(m.elapse(10.0).is_empty());
        assert_eq!(m.state().cycle_count, 0);
    }
}
