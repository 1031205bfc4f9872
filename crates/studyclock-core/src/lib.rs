//! # Studyclock Core Library
//!
//! Business logic for the Studyclock study timer. The CLI binary is a thin
//! layer over this crate; any other front end drives the same engine.
//!
//! ## Architecture
//!
//! - **Session building**: `SessionConfig` (duration, breaks, cycles) compiled
//!   into an immutable `SessionPlan` of alternating study/break phases
//! - **Timer Engine**: a single-session state machine counting down in whole
//!   seconds and notifying observers of ticks and completions
//! - **Timer Service**: a tokio ticker that drives the engine in the
//!   background, independent of any attached observer
//! - **Storage**: SQLite presets and history, TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionBuilder`]: `SessionConfig -> SessionPlan`
//! - [`TimerEngine`]: core timer state machine
//! - [`TimerService`]: background scheduler around the engine
//! - [`TimerObserver`]: notification contract
//! - [`Database`]: preset and history persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, EngineError, ObserverError, SessionError, StorageError};
pub use events::Event;
pub use storage::{
    Config, Database, HistoryRecorder, HistoryStats, MemoryPresetStore, Preset, PresetId,
    PresetStore,
};
pub use timer::{
    format_remaining, ChannelObserver, ObserverId, Phase, PhaseKind, SessionBuilder, SessionConfig,
    SessionPlan, Snapshot, Template, TimerEngine, TimerObserver, TimerService, TimerStatus,
};
