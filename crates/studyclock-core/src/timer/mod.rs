mod builder;
mod dispatch;
mod display;
mod engine;
mod observer;
mod plan;
mod service;

pub use builder::{
    hms_to_secs, SessionBuilder, SessionConfig, BREAK_PHASE_NAME, MAX_CYCLES, STUDY_PHASE_NAME,
};
pub use display::format_remaining;
pub use engine::{Snapshot, TimerEngine, TimerStatus};
pub use observer::{ChannelObserver, ObserverId, TimerObserver};
pub use plan::{Phase, PhaseKind, SessionPlan, Template};
pub use service::TimerService;
