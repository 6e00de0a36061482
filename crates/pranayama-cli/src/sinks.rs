//! Terminal and file implementations of the engine's side-effect traits.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pranayama_core::{AudioSink, NotificationSink, SinkError};
use tracing::warn;

/// Prints spoken cues to stderr and rings the terminal bell.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn speak(&mut self, text: &str) -> Result<(), SinkError> {
        eprintln!("» {text}");
        Ok(())
    }

    fn beep(&mut self) -> Result<(), SinkError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|_| err.flush())
            .map_err(|e| SinkError::Failed(e.to_string()))
    }
}

/// Writes gain-scaled samples as raw mono `f32` little-endian PCM.
pub struct RawPcmSink {
    writer: BufWriter<File>,
}

impl RawPcmSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl AudioSink for RawPcmSink {
    fn write_block(&mut self, samples: &[f32], gain: f32) -> Result<(), SinkError> {
        for sample in samples {
            self.writer
                .write_all(&(sample * gain).to_le_bytes())
                .map_err(|e| SinkError::Failed(e.to_string()))?;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(error = %e, "failed to flush ambient output");
        }
    }
}
