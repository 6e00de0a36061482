//! Procedural ambient noise.
//!
//! Each generator owns its filter state and a PRNG, and yields fixed-size
//! mono blocks in `[-1, 1]` (brown noise is loudness-boosted and may reach
//! `±3.5`). Generators never end; drop them to stop.
//!
//! - **white**: independent uniform samples.
//! - **brown**: leaky integrator, `out = (last + 0.02*w) / 1.02`, scaled by 3.5.
//! - **pink**: Paul Kellet's 7-pole filter bank, scaled by 0.11.

use std::fmt;
use std::str::FromStr;

use rand::prelude::*;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Samples per block handed to an audio sink.
pub const BLOCK_SIZE: usize = 4096;

/// Gain applied at full volume. Keeps ambient noise under cue sounds and
/// away from clipping.
pub const VOLUME_CEILING: f32 = 0.15;

const BROWN_LEAK: f32 = 1.02;
const BROWN_STEP: f32 = 0.02;
const BROWN_GAIN: f32 = 3.5;
const PINK_GAIN: f32 = 0.11;

/// Linear gain for a user volume in `[0, 1]`.
pub fn gain_for_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0) * VOLUME_CEILING
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    White,
    Pink,
    Brown,
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoiseKind::White => "white",
            NoiseKind::Pink => "pink",
            NoiseKind::Brown => "brown",
        })
    }
}

impl FromStr for NoiseKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(NoiseKind::White),
            "pink" | "wind" => Ok(NoiseKind::Pink),
            "brown" | "rain" => Ok(NoiseKind::Brown),
            other => Err(ValidationError::InvalidValue {
                field: "noise kind".into(),
                message: format!("'{other}' is not one of white, pink, brown"),
            }),
        }
    }
}

/// Brown-noise random walk.
#[derive(Debug, Clone, Default)]
pub struct BrownFilter {
    last_out: f32,
}

impl BrownFilter {
    pub fn process(&mut self, white: f32) -> f32 {
        let out = (self.last_out + BROWN_STEP * white) / BROWN_LEAK;
        self.last_out = out;
        out * BROWN_GAIN
    }
}

/// Paul Kellet's pink-noise filter ("refined" version).
#[derive(Debug, Clone, Default)]
pub struct PinkFilter {
    b: [f32; 7],
}

impl PinkFilter {
    pub fn process(&mut self, white: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let out = (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362) * PINK_GAIN;
        b[6] = white * 0.115926;
        out
    }
}

#[derive(Debug, Clone)]
enum Shaper {
    White,
    Pink(PinkFilter),
    Brown(BrownFilter),
}

impl Shaper {
    fn new(kind: NoiseKind) -> Self {
        match kind {
            NoiseKind::White => Shaper::White,
            NoiseKind::Pink => Shaper::Pink(PinkFilter::default()),
            NoiseKind::Brown => Shaper::Brown(BrownFilter::default()),
        }
    }

    fn process(&mut self, white: f32) -> f32 {
        match self {
            Shaper::White => white,
            Shaper::Pink(f) => f.process(white),
            Shaper::Brown(f) => f.process(white),
        }
    }
}

/// Endless block stream of one noise colour.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    kind: NoiseKind,
    shaper: Shaper,
    rng: Pcg32,
    block_size: usize,
}

impl NoiseGenerator {
    /// Generator seeded from OS entropy.
    pub fn new(kind: NoiseKind) -> Self {
        Self::from_rng(kind, Pcg32::from_entropy())
    }

    /// Reproducible generator.
    pub fn with_seed(kind: NoiseKind, seed: u64) -> Self {
        Self::from_rng(kind, Pcg32::seed_from_u64(seed))
    }

    fn from_rng(kind: NoiseKind, rng: Pcg32) -> Self {
        Self {
            kind,
            shaper: Shaper::new(kind),
            rng,
            block_size: BLOCK_SIZE,
        }
    }

    /// Change the block length (minimum 1).
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    pub fn next_sample(&mut self) -> f32 {
        let white = self.rng.gen::<f32>() * 2.0 - 1.0;
        self.shaper.process(white)
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn next_block(&mut self) -> Vec<f32> {
        let mut block = vec![0.0; self.block_size];
        self.fill(&mut block);
        block
    }
}

impl Iterator for NoiseGenerator {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_block())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brown_filter_matches_recurrence() {
        let mut f = BrownFilter::default();
        let first = f.process(1.0);
        let expected = 0.02 / 1.02;
        assert!((first - expected * 3.5).abs() < 1e-6);
        let second = f.process(-1.0);
        assert!((second - ((expected - 0.02) / 1.02) * 3.5).abs() < 1e-6);
    }

    #[test]
    fn pink_filter_first_sample() {
        let mut f = PinkFilter::default();
        let w = 0.5f32;
        let b_sum = w * (0.0555179 + 0.0750759 + 0.1538520 + 0.3104856 + 0.5329522 - 0.0168980);
        let expected = (b_sum + w * 0.5362) * 0.11;
        assert!((f.process(w) - expected).abs() < 1e-6);
        // With zero input each pole decays, and b6 from the previous sample
        // enters the output.
        let poles = [0.99886f32, 0.99332, 0.96900, 0.86650, 0.55000, -0.7616];
        let decayed: f32 = f.b.iter().zip(poles).map(|(b, a)| b * a).sum();
        let expected_next = (decayed + w * 0.115926) * 0.11;
        let next = f.process(0.0);
        assert!((next - expected_next).abs() < 1e-6);
    }

    #[test]
    fn white_samples_in_range() {
        let mut g = NoiseGenerator::with_seed(NoiseKind::White, 7);
        assert!((0..10_000).all(|_| {
            let s = g.next_sample();
            (-1.0..=1.0).contains(&s)
        }));
    }

    #[test]
    fn blocks_have_requested_size() {
        let mut g = NoiseGenerator::with_seed(NoiseKind::Pink, 1).block_size(256);
        assert_eq!(g.next().map(|b| b.len()), Some(256));
        assert_eq!(NoiseGenerator::with_seed(NoiseKind::Brown, 1).next_block().len(), BLOCK_SIZE);
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let a = NoiseGenerator::with_seed(NoiseKind::Brown, 99).next_block();
        let b = NoiseGenerator::with_seed(NoiseKind::Brown, 99).next_block();
        assert_eq!(a, b);
    }

    #[test]
    fn volume_gain_is_clamped_and_scaled() {
        assert_eq!(gain_for_volume(1.0), 0.15);
        assert_eq!(gain_for_volume(2.0), 0.15);
        assert_eq!(gain_for_volume(-1.0), 0.0);
        assert!((gain_for_volume(0.5) - 0.075).abs() < 1e-7);
        assert_eq!(gain_for_volume(f32::NAN), 0.0);
    }

    #[test]
    fn kind_parses_ambient_aliases() {
        assert_eq!("rain".parse::<NoiseKind>().unwrap(), NoiseKind::Brown);
        assert_eq!("wind".parse::<NoiseKind>().unwrap(), NoiseKind::Pink);
        assert!("blue".parse::<NoiseKind>().is_err());
    }
}
