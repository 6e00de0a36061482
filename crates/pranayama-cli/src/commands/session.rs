use std::path::PathBuf;
use std::time::Duration;

use clap::Subcommand;
use pranayama_core::noise::BLOCK_SIZE;
use pranayama_core::{
    AmbientPlayer, AmbientSound, AudioSink, BreathSession, Config, Database, Event,
    ManualTimeSource, Notifier, NullAudioSink, SessionClock, SessionLog, SessionRecord,
    TimeSource,
};
use serde_json::json;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::SelectionArgs;
use crate::sinks::{RawPcmSink, TerminalSink};

/// Sample rate assumed when pacing ambient output against session time.
const AMBIENT_SAMPLE_RATE: f64 = 44_100.0;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Breathe in real time. Events go to stdout as JSON lines, cues to stderr.
    Run {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Stop after this many completed cycles
        #[arg(long)]
        cycles: Option<u32>,
        /// Ambient sound (none, rain, wind, white)
        #[arg(long)]
        ambient: Option<AmbientSound>,
        /// Write ambient audio to this file as raw f32 little-endian PCM
        #[arg(long)]
        ambient_out: Option<PathBuf>,
        /// Do not save the session to history
        #[arg(long)]
        no_record: bool,
    },
    /// Run a session against a simulated clock and print the outcome
    Simulate {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Seconds of breathing to simulate
        #[arg(long)]
        seconds: f64,
        /// Tick size in seconds
        #[arg(long, default_value = "0.05")]
        step: f64,
        /// Save the result to history
        #[arg(long)]
        record: bool,
        /// Print every event as a JSON line before the summary
        #[arg(long)]
        events: bool,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            selection,
            cycles,
            ambient,
            ambient_out,
            no_record,
        } => run_live(selection, cycles, ambient, ambient_out, no_record),
        SessionAction::Simulate {
            selection,
            seconds,
            step,
            record,
            events,
        } => simulate(selection, seconds, step, record, events),
    }
}

fn history_log(record: bool) -> Result<Box<dyn SessionLog>, Box<dyn std::error::Error>> {
    if record {
        Ok(Box::new(Database::open()?))
    } else {
        Ok(Box::new(Vec::<SessionRecord>::new()))
    }
}

fn emit(events: &[Event]) -> Result<(), serde_json::Error> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

fn run_live(
    selection: SelectionArgs,
    cycles: Option<u32>,
    ambient: Option<AmbientSound>,
    ambient_out: Option<PathBuf>,
    no_record: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let selection = selection.selection(&config)?;
    let log = history_log(!no_record)?;

    let audio: Box<dyn AudioSink> = match &ambient_out {
        Some(path) => Box::new(RawPcmSink::create(path)?),
        None => Box::new(NullAudioSink),
    };
    let sound = ambient.unwrap_or(config.ambient.kind);
    let notifier = Notifier::new(config.cue_settings()).with_sink(Box::new(TerminalSink));

    let mut session = BreathSession::with_system_clock(selection, log)
        .with_notifier(notifier)
        .with_ambient(AmbientPlayer::new(audio, config.ambient.volume), sound);

    let tick_every = Duration::from_millis(config.session.tick_interval_ms.max(1));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut ticker = interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        eprintln!("{}", session.selection().display_label());
        emit(&session.start())?;
        let mut samples_written = 0.0;

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("interrupted");
                    break;
                }
                _ = ticker.tick() => {
                    emit(&session.tick())?;

                    let due = session.state().total_elapsed_secs * AMBIENT_SAMPLE_RATE;
                    while samples_written < due && session.ambient_mut().pump() {
                        samples_written += BLOCK_SIZE as f64;
                    }

                    if cycles.is_some_and(|limit| session.state().cycle_count >= limit) {
                        break;
                    }
                }
            }
        }

        emit(&session.reset())?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn simulate(
    selection: SelectionArgs,
    seconds: f64,
    step: f64,
    record: bool,
    print_events: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("--seconds must be a non-negative number".into());
    }
    if !step.is_finite() || step <= 0.0 {
        return Err("--step must be greater than zero".into());
    }

    let config = Config::load()?;
    let selection = selection.selection(&config)?;
    let label = selection.display_label();
    let time = ManualTimeSource::new();
    let mut session =
        BreathSession::new(selection, SessionClock::new(time.clone()), history_log(record)?);

    let mut events = session.start();
    let mut remaining = seconds;
    while remaining > 1e-12 {
        let delta = step.min(remaining);
        time.advance_ms((delta * 1000.0).round() as u64);
        events.extend(session.tick_with(delta));
        remaining -= delta;
    }
    let final_state = session.state().clone();
    let transitions = events
        .iter()
        .filter(|e| matches!(e, Event::PhaseChanged { .. }))
        .count();
    events.extend(session.reset());

    if print_events {
        emit(&events)?;
    }

    let saved = events.iter().find_map(|e| match e {
        Event::SessionRecorded { record } => Some(record),
        _ => None,
    });
    let out = json!({
        "label": label,
        "transitions": transitions,
        "state": final_state,
        "record": saved,
        "simulated_ms": time.now_ms(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
