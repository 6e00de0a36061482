//! Suspend/resume-aware tick driver.
//!
//! The clock turns wall-clock readings into deltas for the
//! [`PhaseMachine`]. It is cooperative: the host calls [`SessionClock::tick`]
//! from whatever callback it has (frame timer, interval, test loop) and the
//! clock decides whether that tick still counts.
//!
//! Every [`arm`](SessionClock::arm) issues a fresh [`TickHandle`];
//! [`disarm`](SessionClock::disarm) invalidates it. A tick presented with a
//! stale handle is dropped, so a callback scheduled before a pause or reset
//! can never move the session afterwards.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use tracing::debug;

use super::machine::PhaseMachine;
use crate::events::Event;

/// Source of monotonic milliseconds.
pub trait TimeSource {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven time source. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<u64>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Proof that a tick was scheduled under the current arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickHandle {
    generation: u64,
}

#[derive(Debug)]
pub struct SessionClock<T: TimeSource = SystemTimeSource> {
    source: T,
    /// Reading at the previous counted tick. `None` while disarmed.
    reference_ms: Option<u64>,
    generation: u64,
}

impl<T: TimeSource> SessionClock<T> {
    pub fn new(source: T) -> Self {
        Self {
            source,
            reference_ms: None,
            generation: 0,
        }
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    pub fn is_armed(&self) -> bool {
        self.reference_ms.is_some()
    }

    /// Start (or restart) ticking. Any previously issued handle is cancelled
    /// and the reference timestamp is reset, so time spent suspended is
    /// never counted.
    pub fn arm(&mut self) -> TickHandle {
        self.generation += 1;
        self.reference_ms = Some(self.source.now_ms());
        debug!(generation = self.generation, "session clock armed");
        TickHandle {
            generation: self.generation,
        }
    }

    /// Cancel the current subscription. Outstanding handles become stale.
    pub fn disarm(&mut self) {
        if self.reference_ms.take().is_some() {
            debug!(generation = self.generation, "session clock disarmed");
        }
        self.generation += 1;
    }

    /// Whether `handle` belongs to the current arming.
    pub fn is_current(&self, handle: TickHandle) -> bool {
        self.reference_ms.is_some() && handle.generation == self.generation
    }

    /// Feed the wall-clock delta since the previous tick into `machine`.
    pub fn tick(&mut self, handle: TickHandle, machine: &mut PhaseMachine) -> Vec<Event> {
        let Some(reference) = self.reference_ms else {
            return Vec::new();
        };
        if handle.generation != self.generation {
            return Vec::new();
        }
        let now = self.source.now_ms();
        let delta_ms = now.saturating_sub(reference);
        self.reference_ms = Some(now);
        machine.elapse(delta_ms as f64 / 1000.0)
    }

    /// Feed an explicit delta instead of reading the time source.
    pub fn tick_with(
        &mut self,
        handle: TickHandle,
        machine: &mut PhaseMachine,
        delta_secs: f64,
    ) -> Vec<Event> {
        if !self.is_current(handle) {
            return Vec::new();
        }
        self.reference_ms = Some(self.source.now_ms());
        machine.elapse(delta_secs)
    }
}

impl Default for SessionClock<SystemTimeSource> {
    fn default() -> Self {
        Self::new(SystemTimeSource::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{resolve, Mode, Phase, Tier};

    fn setup() -> (ManualTimeSource, SessionClock<ManualTimeSource>, PhaseMachine) {
        let time = ManualTimeSource::new();
        let clock = SessionClock::new(time.clone());
        let mut machine = PhaseMachine::new(resolve(&Mode::tier(Tier::Easy), false));
        machine.start();
        (time, clock, machine)
    }

    #[test]
    fn tick_uses_wall_clock_delta() {
        let (time, mut clock, mut machine) = setup();
        let handle = clock.arm();
        time.advance_ms(8_000);
        let events = clock.tick(handle, &mut machine);
        assert_eq!(events.len(), 1);
        assert_eq!(machine.state().phase, Phase::Hold);
        assert_eq!(machine.state().total_elapsed_secs, 8.0);
    }

    #[test]
    fn stale_handle_is_ignored_after_disarm() {
        let (time, mut clock, mut machine) = setup();
        let handle = clock.arm();
        clock.disarm();
        time.advance_ms(5_000);
        assert!(clock.tick(handle, &mut machine).is_empty());
        assert_eq!(machine.state().total_elapsed_secs, 0.0);
    }

    #[test]
    fn rearm_cancels_previous_handle() {
        let (time, mut clock, mut machine) = setup();
        let old = clock.arm();
        let new = clock.arm();
        time.advance_ms(1_000);
        assert!(clock.tick(old, &mut machine).is_empty());
        clock.tick(new, &mut machine);
        assert_eq!(machine.state().total_elapsed_secs, 1.0);
    }

    #[test]
    fn suspended_time_is_not_counted() {
        let (time, mut clock, mut machine) = setup();
        let handle = clock.arm();
        time.advance_ms(1_000);
        clock.tick(handle, &mut machine);

        clock.disarm();
        time.advance_ms(60_000);

        let handle = clock.arm();
        time.advance_ms(500);
        clock.tick(handle, &mut machine);
        assert!((machine.state().total_elapsed_secs - 1.5).abs() < 1e-12);
    }

    #[test]
    fn tick_with_feeds_synthetic_delta() {
        let (_time, mut clock, mut machine) = setup();
        let handle = clock.arm();
        clock.tick_with(handle, &mut machine, 2.5);
        assert_eq!(machine.state().total_elapsed_secs, 2.5);
    }
}
