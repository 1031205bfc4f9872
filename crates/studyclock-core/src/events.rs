use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{PhaseKind, Snapshot, TimerStatus};

/// Every state change in the engine produces an Event.
/// Observers receive them through `on_event`; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        plan_name: String,
        phase_count: usize,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        phase_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        phase_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Tick {
        phase_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        phase_index: usize,
        phase_name: String,
        kind: PhaseKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseAdvanced {
        phase_index: usize,
        phase_name: String,
        kind: PhaseKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        plan_name: String,
        phase_count: usize,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        phase_index: usize,
        phase_name: Option<String>,
        kind: Option<PhaseKind>,
        remaining_secs: u64,
        phase_secs: u64,
        schedule_progress_pct: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Build a full state snapshot event.
    pub fn snapshot(snapshot: &Snapshot) -> Self {
        let phase = snapshot.current_phase();
        Event::StateSnapshot {
            status: snapshot.status,
            phase_index: snapshot.current_phase_index,
            phase_name: phase.map(|p| p.name.clone()),
            kind: phase.map(|p| p.kind),
            remaining_secs: snapshot.remaining_secs,
            phase_secs: phase.map(|p| p.duration_secs).unwrap_or(0),
            schedule_progress_pct: snapshot.schedule_progress_pct(),
            at: Utc::now(),
        }
    }

    /// True for the events after which the engine is idle again.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Event::SessionCompleted { .. } | Event::SessionCancelled { .. }
        )
    }
}
