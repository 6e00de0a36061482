use std::path::PathBuf;

use clap::Subcommand;
use pranayama_core::noise::{gain_for_volume, BLOCK_SIZE};
use pranayama_core::{AudioSink, NoiseGenerator, NoiseKind};
use serde_json::json;

use crate::sinks::RawPcmSink;

#[derive(Subcommand)]
pub enum NoiseAction {
    /// Render noise to a raw f32 little-endian PCM file
    Render {
        /// white, pink or brown (rain and wind are accepted)
        #[arg(long)]
        kind: NoiseKind,
        /// Length in seconds
        #[arg(long)]
        seconds: f64,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
        /// 0.0 - 1.0
        #[arg(long, default_value_t = 1.0)]
        volume: f32,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Peak, RMS and mean of a generated stream
    Stats {
        #[arg(long)]
        kind: NoiseKind,
        #[arg(long, default_value_t = 100_000)]
        samples: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn generator(kind: NoiseKind, seed: Option<u64>) -> NoiseGenerator {
    match seed {
        Some(seed) => NoiseGenerator::with_seed(kind, seed),
        None => NoiseGenerator::new(kind),
    }
}

pub fn run(action: NoiseAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        NoiseAction::Render {
            kind,
            seconds,
            sample_rate,
            volume,
            seed,
            out,
        } => {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err("--seconds must be a non-negative number".into());
            }
            let total = (seconds * f64::from(sample_rate)).round() as usize;
            let gain = gain_for_volume(volume);
            let mut generator = generator(kind, seed);
            let mut sink = RawPcmSink::create(&out)?;

            let mut block = vec![0.0; BLOCK_SIZE];
            let mut written = 0;
            while written < total {
                let len = BLOCK_SIZE.min(total - written);
                generator.fill(&mut block[..len]);
                sink.write_block(&block[..len], gain)?;
                written += len;
            }
            sink.disconnect();
            eprintln!("{written} samples of {kind} noise written to {}", out.display());
        }
        NoiseAction::Stats {
            kind,
            samples,
            seed,
        } => {
            let mut buf = vec![0.0f32; samples];
            generator(kind, seed).fill(&mut buf);

            let n = samples.max(1) as f64;
            let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            let mean = buf.iter().map(|s| f64::from(*s)).sum::<f64>() / n;
            let rms = (buf.iter().map(|s| f64::from(*s).powi(2)).sum::<f64>() / n).sqrt();
            let out = json!({
                "kind": kind,
                "samples": samples,
                "peak": peak,
                "mean": mean,
                "rms": rms,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
