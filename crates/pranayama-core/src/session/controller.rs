//! Session command API.
//!
//! [`BreathSession`] is the single owner of a running practice: the
//! selection policy, the phase machine, its clock, the recorder and every
//! side-effect collaborator (cue sinks, ambient audio, wake lock, session
//! log). Callers drive it with commands and ticks and receive [`Event`]s
//! back; nothing else touches session state.
//!
//! ```ignore
//! let mut session = BreathSession::new(selection, SessionClock::default(), Vec::new());
//! session.start();
//! loop {
//!     for event in session.tick() { /* render */ }
//! }
//! ```

use chrono::Utc;
use tracing::{info, warn};

use super::clock::{SessionClock, SystemTimeSource, TickHandle, TimeSource};
use super::machine::PhaseMachine;
use super::recorder::{SessionLog, SessionRecorder};
use super::state::SessionState;
use crate::ambient::{AmbientPlayer, AmbientSound};
use crate::error::ValidationError;
use crate::events::Event;
use crate::notify::{Cue, NoWakeLock, Notifier, VisualUpdate, WakeLock};
use crate::pattern::{Mode, PolicyNotice, Selection};

pub struct BreathSession<L: SessionLog, T: TimeSource = SystemTimeSource> {
    selection: Selection,
    machine: PhaseMachine,
    clock: SessionClock<T>,
    tick_handle: Option<TickHandle>,
    recorder: SessionRecorder,
    log: L,
    notifier: Notifier,
    ambient: AmbientPlayer,
    ambient_sound: AmbientSound,
    wake_lock: Box<dyn WakeLock>,
}

impl<L: SessionLog, T: TimeSource> BreathSession<L, T> {
    pub fn new(selection: Selection, clock: SessionClock<T>, log: L) -> Self {
        let machine = PhaseMachine::new(selection.resolve());
        Self {
            selection,
            machine,
            clock,
            tick_handle: None,
            recorder: SessionRecorder::new(),
            log,
            notifier: Notifier::default(),
            ambient: AmbientPlayer::default(),
            ambient_sound: AmbientSound::None,
            wake_lock: Box::new(NoWakeLock),
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_ambient(mut self, player: AmbientPlayer, sound: AmbientSound) -> Self {
        self.ambient.stop();
        self.ambient = player;
        self.ambient_sound = sound;
        self
    }

    pub fn with_wake_lock(mut self, wake_lock: Box<dyn WakeLock>) -> Self {
        self.wake_lock = wake_lock;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn clock(&self) -> &SessionClock<T> {
        &self.clock
    }

    pub fn ambient(&self) -> &AmbientPlayer {
        &self.ambient
    }

    pub fn ambient_mut(&mut self) -> &mut AmbientPlayer {
        &mut self.ambient
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    /// Handle for an external scheduler; `None` while suspended.
    pub fn tick_handle(&self) -> Option<TickHandle> {
        self.tick_handle
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.machine.state().clone(),
            label: self.selection.display_label(),
            nostril_active: self.machine.nostril_active(),
            progress: self.machine.progress_fraction(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session. No-op when one is already running.
    pub fn start(&mut self) -> Vec<Event> {
        let Some(started) = self.machine.start() else {
            return Vec::new();
        };
        self.recorder.clear();
        self.tick_handle = Some(self.clock.arm());
        self.acquire_resources();

        let cue = Cue::for_phase(self.machine.state().phase, self.machine.nostril());
        self.notifier.speak(&cue);
        info!(pattern = %self.selection.display_label(), "session started");
        vec![started]
    }

    /// Suspend and record the session so far.
    pub fn pause(&mut self) -> Vec<Event> {
        let Some(paused) = self.machine.pause() else {
            return Vec::new();
        };
        self.suspend();
        let mut events = vec![paused];
        events.extend(self.record());
        info!(cycles = self.machine.state().cycle_count, "session paused");
        events
    }

    pub fn resume(&mut self) -> Vec<Event> {
        let Some(resumed) = self.machine.resume() else {
            return Vec::new();
        };
        self.tick_handle = Some(self.clock.arm());
        self.acquire_resources();
        info!("session resumed");
        vec![resumed]
    }

    /// Start, pause or resume depending on the current state.
    pub fn toggle(&mut self) -> Vec<Event> {
        let (running, paused) = (self.machine.state().running, self.machine.state().paused);
        if !running {
            self.start()
        } else if paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// Stop: record the session (unless this stop was already recorded by a
    /// pause), tear everything down, and return to the initial state.
    pub fn reset(&mut self) -> Vec<Event> {
        self.suspend();
        let mut events = self.record();
        events.push(self.machine.reset());
        self.recorder.clear();
        info!("session reset");
        events
    }

    /// Switch mode. Discards the current session without recording it.
    pub fn select_mode(&mut self, mode: Mode) -> Result<Vec<Event>, ValidationError> {
        let notice = self.selection.select_mode(mode)?;
        let mut events: Vec<Event> = notice.into_iter().map(notice_event).collect();
        events.extend(self.reconfigure());
        Ok(events)
    }

    /// Apply a mode and an alternate-nostril request together, with a single
    /// reset. Nothing changes if the mode is invalid.
    pub fn configure(&mut self, mode: Mode, nostril: bool) -> Result<Vec<Event>, ValidationError> {
        let mut next = self.selection.clone();
        let mut notices: Vec<PolicyNotice> = next.select_mode(mode)?.into_iter().collect();
        notices.extend(next.set_nostril(nostril));
        notices.dedup();
        self.selection = next;

        let mut events: Vec<Event> = notices.into_iter().map(notice_event).collect();
        events.extend(self.reconfigure());
        Ok(events)
    }

    /// Request the alternate-nostril toggle. A refused request leaves the
    /// session untouched and reports the notice.
    pub fn set_nostril(&mut self, requested: bool) -> Vec<Event> {
        if let Some(notice) = self.selection.set_nostril(requested) {
            return vec![notice_event(notice)];
        }
        self.reconfigure()
    }

    /// Change ambient sound; restarts playback if the session is active.
    pub fn set_ambient(&mut self, sound: AmbientSound) {
        self.ambient_sound = sound;
        if self.machine.state().is_active() {
            self.ambient.play(sound);
        }
    }

    /// Advance by wall-clock time since the previous tick.
    pub fn tick(&mut self) -> Vec<Event> {
        let Some(handle) = self.tick_handle else {
            return Vec::new();
        };
        let events = self.clock.tick(handle, &mut self.machine);
        self.after_tick(&events);
        events
    }

    /// Advance by an explicit delta, for deterministic drivers.
    pub fn tick_with(&mut self, delta_secs: f64) -> Vec<Event> {
        let Some(handle) = self.tick_handle else {
            return Vec::new();
        };
        let events = self.clock.tick_with(handle, &mut self.machine, delta_secs);
        self.after_tick(&events);
        events
    }

    /// Tick on behalf of an external scheduler holding `handle`. Stale
    /// handles are ignored.
    pub fn tick_scheduled(&mut self, handle: TickHandle) -> Vec<Event> {
        let events = self.clock.tick(handle, &mut self.machine);
        self.after_tick(&events);
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn after_tick(&mut self, events: &[Event]) {
        for event in events {
            if let Event::PhaseChanged { phase, nostril, .. } = event {
                self.notifier.announce(&Cue::for_phase(*phase, *nostril));
            }
        }
        let state = self.machine.state();
        if state.is_active() {
            let cue = Cue::for_phase(state.phase, self.machine.nostril());
            let update = VisualUpdate {
                phase: state.phase,
                nostril: self.machine.nostril(),
                progress: self.machine.progress_fraction(),
                seconds_left: state.time_left_secs.max(0.0).ceil() as u32,
                title: cue.title,
            };
            self.notifier.visual(&update);
        }
    }

    fn reconfigure(&mut self) -> Vec<Event> {
        self.suspend();
        let resolution = self.selection.resolve();
        let reset = self.machine.reconfigure(resolution);
        self.recorder.clear();
        vec![
            reset,
            Event::SelectionChanged {
                label: self.selection.display_label(),
                durations: resolution.durations,
                nostril_active: resolution.nostril_active,
                at: Utc::now(),
            },
        ]
    }

    /// Halt the clock and release every side-effect resource.
    fn suspend(&mut self) {
        self.clock.disarm();
        self.tick_handle = None;
        self.notifier.silence();
        if let Err(e) = self.wake_lock.release() {
            warn!(error = %e, "wake lock release failed");
        }
        self.ambient.stop();
    }

    fn acquire_resources(&mut self) {
        if let Err(e) = self.wake_lock.acquire() {
            warn!(error = %e, "wake lock unavailable");
        }
        self.ambient.play(self.ambient_sound);
    }

    fn record(&mut self) -> Vec<Event> {
        let Some(record) = self.recorder.record(self.machine.state(), &self.selection) else {
            return Vec::new();
        };
        match self.log.append(&record) {
            Ok(()) => vec![Event::SessionRecorded { record }],
            Err(e) => {
                warn!(error = %e, "failed to append session record");
                vec![Event::RecordNotSaved {
                    record,
                    reason: e.to_string(),
                }]
            }
        }
    }
}

impl<L: SessionLog> BreathSession<L, SystemTimeSource> {
    /// Session on the real clock.
    pub fn with_system_clock(selection: Selection, log: L) -> Self {
        Self::new(selection, SessionClock::default(), log)
    }
}

fn notice_event(notice: PolicyNotice) -> Event {
    match notice {
        PolicyNotice::NostrilDisallowedInMode { context } => Event::NostrilDisallowed {
            context,
            at: Utc::now(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatternDurations, Phase, Tier};
    use crate::session::clock::ManualTimeSource;
    use crate::session::SessionRecord;

    type TestSession = BreathSession<Vec<SessionRecord>, ManualTimeSource>;

    fn session(tier: Tier, nadi: bool) -> (ManualTimeSource, TestSession) {
        let time = ManualTimeSource::new();
        let (selection, _) = Selection::new(Mode::tier(tier), nadi).unwrap();
        let session = BreathSession::new(selection, SessionClock::new(time.clone()), Vec::new());
        (time, session)
    }

    #[test]
    fn toggle_cycles_through_start_pause_resume() {
        let (_, mut s) = session(Tier::Easy, false);
        assert!(matches!(s.toggle()[0], Event::SessionStarted { .. }));
        assert!(matches!(s.toggle()[0], Event::SessionPaused { .. }));
        assert!(matches!(s.toggle()[0], Event::SessionResumed { .. }));
    }

    #[test]
    fn ticks_after_reset_do_nothing() {
        let (time, mut s) = session(Tier::Easy, false);
        s.start();
        let handle = s.tick_handle().unwrap();
        s.reset();
        time.advance_ms(20_000);
        assert!(s.tick().is_empty());
        assert!(s.tick_scheduled(handle).is_empty());
        assert_eq!(s.state().total_elapsed_secs, 0.0);
    }

    #[test]
    fn paused_time_is_not_counted() {
        let (time, mut s) = session(Tier::Easy, false);
        s.start();
        time.advance_ms(2_000);
        s.tick();
        s.pause();
        time.advance_ms(600_000);
        assert!(s.tick().is_empty());
        s.resume();
        time.advance_ms(1_000);
        s.tick();
        assert!((s.state().total_elapsed_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn pause_then_reset_records_once() {
        let (_, mut s) = session(Tier::Easy, false);
        s.start();
        s.tick_with(42.0);
        let paused = s.pause();
        assert!(paused
            .iter()
            .any(|e| matches!(e, Event::SessionRecorded { .. })));
        let reset = s.reset();
        assert!(!reset
            .iter()
            .any(|e| matches!(e, Event::SessionRecorded { .. })));
        assert_eq!(s.log().len(), 1);
    }

    #[test]
    fn nostril_request_under_custom_is_refused() {
        let (_, mut s) = session(Tier::Easy, false);
        s.select_mode(Mode::custom(PatternDurations::new(3, 3, 3, 3).unwrap()))
            .unwrap();
        s.start();
        s.tick_with(1.0);

        let events = s.set_nostril(true);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::NostrilDisallowed { context, .. } if context == "Custom"));
        assert!(!s.selection().nostril());
        // Refusal does not disturb the running session.
        assert!(s.state().running);
        assert_eq!(s.state().total_elapsed_secs, 1.0);
    }

    #[test]
    fn enabling_nostril_resets_to_nadi_pattern() {
        let (_, mut s) = session(Tier::Hard, false);
        s.start();
        s.tick_with(5.0);
        s.set_nostril(true);
        assert!(!s.state().running);
        assert_eq!(s.state().phase, Phase::Inhale);
        assert_eq!(s.machine().durations().hold, 16);
        assert!(s.machine().nostril_active());
    }

    #[test]
    fn empty_custom_mode_is_rejected_without_reset() {
        let (_, mut s) = session(Tier::Easy, false);
        s.start();
        s.tick_with(1.0);
        let result = s.select_mode(Mode::Custom {
            durations: PatternDurations {
                inhale: 0,
                hold: 0,
                exhale: 0,
                relax: 0,
            },
        });
        assert_eq!(result.unwrap_err(), ValidationError::EmptyPattern);
        assert!(s.state().running);
    }

    #[test]
    fn configure_applies_mode_and_nostril_at_once() {
        let (_, mut s) = session(Tier::Easy, false);
        s.start();
        s.tick_with(3.0);

        let events = s.configure(Mode::tier(Tier::Medium), true).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::SessionReset { .. }));
        assert!(s.machine().nostril_active());
        assert_eq!(s.machine().durations().exhale, 8);

        let events = s
            .configure(Mode::custom(PatternDurations::new(3, 3, 3, 3).unwrap()), true)
            .unwrap();
        let notices = events
            .iter()
            .filter(|e| matches!(e, Event::NostrilDisallowed { .. }))
            .count();
        assert_eq!(notices, 1);
        assert!(!s.selection().nostril());
    }
}
