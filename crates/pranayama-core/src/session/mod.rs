mod clock;
mod controller;
mod machine;
mod recorder;
mod state;

pub use clock::{ManualTimeSource, SessionClock, SystemTimeSource, TickHandle, TimeSource};
pub use controller::BreathSession;
pub use machine::{PhaseMachine, PHASE_EPSILON_SECS, ZERO_PHASE_SENTINEL_SECS};
pub use recorder::{SessionLog, SessionRecord, SessionRecorder};
pub use state::{NostrilSide, SessionState};
