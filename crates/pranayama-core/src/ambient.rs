//! Ambient sound playback.
//!
//! [`AmbientPlayer`] owns at most one [`NoiseGenerator`] at a time and streams
//! its blocks into an [`AudioSink`]. Starting a new sound disconnects the old
//! one first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SinkError, ValidationError};
use crate::noise::{gain_for_volume, NoiseGenerator, NoiseKind};

/// Anything that accepts sample blocks.
pub trait AudioSink {
    fn write_block(&mut self, samples: &[f32], gain: f32) -> Result<(), SinkError>;

    /// Called when playback stops. Must be safe to call repeatedly.
    fn disconnect(&mut self);
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn write_block(&mut self, _samples: &[f32], _gain: f32) -> Result<(), SinkError> {
        Ok(())
    }

    fn disconnect(&mut self) {}
}

/// User-facing ambient choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbientSound {
    #[default]
    None,
    Rain,
    Wind,
    White,
}

impl AmbientSound {
    pub fn noise_kind(&self) -> Option<NoiseKind> {
        match self {
            AmbientSound::None => None,
            AmbientSound::Rain => Some(NoiseKind::Brown),
            AmbientSound::Wind => Some(NoiseKind::Pink),
            AmbientSound::White => Some(NoiseKind::White),
        }
    }
}

impl fmt::Display for AmbientSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AmbientSound::None => "none",
            AmbientSound::Rain => "rain",
            AmbientSound::Wind => "wind",
            AmbientSound::White => "white",
        })
    }
}

impl FromStr for AmbientSound {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(AmbientSound::None),
            "rain" | "brown" => Ok(AmbientSound::Rain),
            "wind" | "pink" => Ok(AmbientSound::Wind),
            "white" => Ok(AmbientSound::White),
            other => Err(ValidationError::UnknownAmbient(other.to_string())),
        }
    }
}

pub struct AmbientPlayer {
    sink: Box<dyn AudioSink>,
    generator: Option<NoiseGenerator>,
    volume: f32,
}

impl AmbientPlayer {
    pub fn new(sink: Box<dyn AudioSink>, volume: f32) -> Self {
        Self {
            sink,
            generator: None,
            volume: clamp_volume(volume),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.generator.is_some()
    }

    pub fn kind(&self) -> Option<NoiseKind> {
        self.generator.as_ref().map(NoiseGenerator::kind)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Effective linear gain for the sink.
    pub fn gain(&self) -> f32 {
        gain_for_volume(self.volume)
    }

    /// Takes effect on the next block.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    /// Replace whatever is playing with `sound`.
    pub fn play(&mut self, sound: AmbientSound) {
        self.stop();
        if let Some(kind) = sound.noise_kind() {
            debug!(%kind, "ambient playback started");
            self.generator = Some(NoiseGenerator::new(kind));
        }
    }

    /// Start a pre-built generator (used for reproducible output).
    pub fn play_generator(&mut self, generator: NoiseGenerator) {
        self.stop();
        self.generator = Some(generator);
    }

    pub fn stop(&mut self) {
        if self.generator.take().is_some() {
            self.sink.disconnect();
            debug!("ambient playback stopped");
        }
    }

    /// Render the next block into the sink. Returns whether a block was
    /// written. A sink error stops playback.
    pub fn pump(&mut self) -> bool {
        let gain = self.gain();
        let Some(generator) = self.generator.as_mut() else {
            return false;
        };
        let block = generator.next_block();
        match self.sink.write_block(&block, gain) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "ambient sink failed, stopping playback");
                self.stop();
                false
            }
        }
    }
}

impl Default for AmbientPlayer {
    fn default() -> Self {
        Self::new(Box::new(NullAudioSink), 0.5)
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
