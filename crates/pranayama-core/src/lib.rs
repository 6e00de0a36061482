//! # Pranayama Core Library
//!
//! This library provides the core logic for a guided breathing-exercise
//! timer. Every operation is available through the standalone `pranayama`
//! CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Patterns**: Tier tables, custom rhythms and saved presets, and the
//!   alternate-nostril policy that decides what actually runs
//! - **Session engine**: A wall-clock-delta phase machine driven by a
//!   cancellable tick clock; the caller supplies time, nothing sleeps
//! - **Cues and ambience**: Notification sinks and procedural noise, both
//!   behind traits so hosts plug in their own audio and speech
//! - **Storage**: SQLite history and presets, TOML configuration
//!
//! ## Key Components
//!
//! - [`BreathSession`]: Session controller tying the pieces together
//! - [`PhaseMachine`]: Core inhale/hold/exhale/relax state machine
//! - [`NoiseGenerator`]: White, pink and brown noise blocks
//! - [`Database`]: History and preset persistence
//! - [`Config`]: Application configuration management

pub mod ambient;
pub mod error;
pub mod events;
pub mod noise;
pub mod notify;
pub mod pattern;
pub mod session;
pub mod storage;

pub use ambient::{AmbientPlayer, AmbientSound, AudioSink, NullAudioSink};
pub use error::{ConfigError, CoreError, DatabaseError, PresetError, SinkError, ValidationError};
pub use events::Event;
pub use noise::{NoiseGenerator, NoiseKind};
pub use notify::{Cue, CueSettings, NotificationSink, Notifier, VisualUpdate, WakeLock};
pub use pattern::{
    resolve, Mode, PatternDurations, Phase, PolicyNotice, Preset, Resolution, Selection, Tier,
};
pub use session::{
    BreathSession, ManualTimeSource, NostrilSide, PhaseMachine, SessionClock, SessionLog,
    SessionRecord, SessionRecorder, SessionState, SystemTimeSource, TickHandle, TimeSource,
};
pub use storage::{Backup, Config, Database, HistoryTotals};
