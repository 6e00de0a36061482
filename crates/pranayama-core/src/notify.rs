//! Notification sinks and phase cues.
//!
//! Sinks are best-effort side effects: speech, vibration, a short beep and
//! visual updates. A failing sink is logged and skipped; it can never change
//! session state.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SinkError;
use crate::pattern::Phase;
use crate::session::NostrilSide;

/// Capabilities a host may provide. Every method defaults to a no-op so a
/// sink only implements what it supports.
pub trait NotificationSink {
    fn speak(&mut self, _text: &str) -> Result<(), SinkError> {
        Ok(())
    }

    /// Stop any in-flight utterance.
    fn cancel_speech(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Vibrate with an on/off pattern in milliseconds.
    fn vibrate(&mut self, _pattern_ms: &[u32]) -> Result<(), SinkError> {
        Ok(())
    }

    fn beep(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn visual_update(&mut self, _update: &VisualUpdate) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps the screen awake while a session is running.
pub trait WakeLock {
    fn acquire(&mut self) -> Result<(), SinkError>;
    fn release(&mut self) -> Result<(), SinkError>;
}

/// Wake lock for hosts without one.
#[derive(Debug, Default)]
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn release(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// What to tell the user when a phase begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub phase: Phase,
    pub nostril: Option<NostrilSide>,
    /// Spoken text, e.g. `"Exhale Right"`.
    pub speech: String,
    /// Display title, e.g. `"Hold (Both)"`.
    pub title: String,
    pub vibration_ms: Option<Vec<u32>>,
}

impl Cue {
    /// Cue for entering `phase`. `nostril` is the inhale side and is `Some`
    /// only in alternate-nostril mode; exhale goes out the other side.
    pub fn for_phase(phase: Phase, nostril: Option<NostrilSide>) -> Self {
        let (speech, title) = match (phase, nostril) {
            (Phase::Inhale, Some(side)) => (format!("Inhale {side}"), format!("Inhale ({side})")),
            (Phase::Exhale, Some(side)) => {
                let out = side.flipped();
                (format!("Exhale {out}"), format!("Exhale ({out})"))
            }
            (Phase::Hold, Some(_)) => ("Hold".to_string(), "Hold (Both)".to_string()),
            (Phase::Relax, Some(_)) => ("Relax".to_string(), "Pause".to_string()),
            (phase, None) => (phase.to_string(), phase.to_string()),
        };
        let vibration_ms = match phase {
            Phase::Inhale => Some(vec![100, 50, 100]),
            Phase::Hold => Some(vec![200]),
            Phase::Exhale => Some(vec![50]),
            Phase::Relax => None,
        };
        Self {
            phase,
            nostril,
            speech,
            title,
            vibration_ms,
        }
    }
}

/// Per-tick rendering data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualUpdate {
    pub phase: Phase,
    pub nostril: Option<NostrilSide>,
    /// 0.0 .. 1.0 within the current phase.
    pub progress: f64,
    /// Whole seconds left, rounded up, for the countdown.
    pub seconds_left: u32,
    pub title: String,
}

/// Which cue channels are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSettings {
    pub sound: bool,
    pub voice: bool,
    pub vibration: bool,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            sound: true,
            voice: true,
            vibration: true,
        }
    }
}

/// Fans cues out to every registered sink, swallowing failures.
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotificationSink>>,
    settings: CueSettings,
}

impl Notifier {
    pub fn new(settings: CueSettings) -> Self {
        Self {
            sinks: Vec::new(),
            settings,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn settings(&self) -> CueSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: CueSettings) {
        self.settings = settings;
    }

    /// Full transition cue: beep, speech, vibration.
    pub fn announce(&mut self, cue: &Cue) {
        let settings = self.settings;
        for sink in &mut self.sinks {
            if settings.sound {
                report("beep", sink.beep());
            }
            if settings.voice {
                report("speech", sink.speak(&cue.speech));
            }
            if settings.vibration {
                if let Some(pattern) = &cue.vibration_ms {
                    report("vibration", sink.vibrate(pattern));
                }
            }
        }
    }

    /// Speech only; used for the very first cue of a session.
    pub fn speak(&mut self, cue: &Cue) {
        if !self.settings.voice {
            return;
        }
        for sink in &mut self.sinks {
            report("speech", sink.speak(&cue.speech));
        }
    }

    pub fn visual(&mut self, update: &VisualUpdate) {
        for sink in &mut self.sinks {
            report("visual", sink.visual_update(update));
        }
    }

    /// Cancel in-flight speech on every sink.
    pub fn silence(&mut self) {
        for sink in &mut self.sinks {
            report("speech cancel", sink.cancel_speech());
        }
    }
}

fn report(channel: &str, result: Result<(), SinkError>) {
    if let Err(e) = result {
        warn!(channel, error = %e, "notification sink failed");
    }
}
