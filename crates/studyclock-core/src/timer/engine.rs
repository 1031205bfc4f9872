//! Timer engine implementation.
//!
//! The engine is a single-session state machine counting down in whole
//! seconds. It does not own a thread: either the caller invokes `tick()`
//! directly, or [`TimerService`](super::TimerService) drives `catch_up()`
//! from a background ticker.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -> Completed -> Idle   (last phase reached zero)
//! Running | Paused -> Idle       (cancel)
//! ```
//!
//! `Completed` is only visible to observers while `on_session_complete` runs;
//! the engine drops back to `Idle` as soon as the notification is delivered.
//!
//! ## Usage
//!
//! ```ignore
//! let plan = SessionBuilder::build(&SessionConfig::new(1500))?;
//! let mut engine = TimerEngine::new();
//! engine.start(plan)?;
//! // Once per second:
//! let events = engine.tick();
//! ```

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use super::observer::{ObserverId, ObserverRegistry, TimerObserver};
use super::plan::{Phase, SessionPlan};
use crate::error::EngineError;
use crate::events::Event;

const ONE_SECOND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Read-only copy of the engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: TimerStatus,
    pub current_phase_index: usize,
    pub remaining_secs: u64,
    pub active_plan: Option<SessionPlan>,
}

impl Snapshot {
    pub fn current_phase(&self) -> Option<&Phase> {
        self.active_plan
            .as_ref()
            .and_then(|p| p.phase(self.current_phase_index))
    }

    /// 0.0 .. 100.0 progress across the entire plan.
    pub fn schedule_progress_pct(&self) -> f64 {
        let Some(plan) = self.active_plan.as_ref() else {
            return 0.0;
        };
        let total = plan.total_duration_secs() as f64;
        if total == 0.0 {
            return 0.0;
        }
        let done = plan.cumulative_secs(self.current_phase_index);
        let current = self
            .current_phase()
            .map(|p| p.duration_secs.saturating_sub(self.remaining_secs))
            .unwrap_or(0);
        ((done + current) as f64 / total * 100.0).min(100.0)
    }
}

/// Core timer engine.
///
/// Sole owner of the session state; everything else reads [`Snapshot`]s.
pub struct TimerEngine {
    status: TimerStatus,
    active_plan: Option<SessionPlan>,
    phase_index: usize,
    remaining_secs: u64,
    /// Instant up to which elapsed time has been accounted for.
    /// Only set while running.
    anchor: Option<Instant>,
    observers: ObserverRegistry,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("status", &self.status)
            .field("phase_index", &self.phase_index)
            .field("remaining_secs", &self.remaining_secs)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl TimerEngine {
    pub fn new() -> Self {
        Self {
            status: TimerStatus::Idle,
            active_plan: None,
            phase_index: 0,
            remaining_secs: 0,
            anchor: None,
            observers: ObserverRegistry::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn active_plan(&self) -> Option<&SessionPlan> {
        self.active_plan.as_ref()
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.active_plan.as_ref()?.phase(self.phase_index)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            current_phase_index: self.phase_index,
            remaining_secs: self.remaining_secs,
            active_plan: self.active_plan.clone(),
        }
    }

    /// Number of observer callbacks that errored or panicked so far.
    pub fn observer_failures(&self) -> u64 {
        self.observers.failures()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Attach an observer. It immediately receives the current snapshot.
    pub fn attach(&mut self, observer: impl TimerObserver + 'static) -> ObserverId {
        self.attach_boxed(Box::new(observer))
    }

    pub fn attach_boxed(&mut self, observer: Box<dyn TimerObserver>) -> ObserverId {
        let snapshot = self.snapshot();
        let id = self.observers.attach(observer, &snapshot);
        debug!(?id, "observer attached");
        id
    }

    /// Detaching never affects the running session.
    pub fn detach(&mut self, id: ObserverId) -> bool {
        let removed = self.observers.detach(id);
        debug!(?id, removed, "observer detached");
        removed
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, plan: SessionPlan) -> Result<Event, EngineError> {
        if self.status != TimerStatus::Idle {
            return Err(self.invalid("start"));
        }
        // SessionPlan guarantees at least one phase with a positive duration.
        let first_secs = plan.phases().first().map(|p| p.duration_secs).unwrap_or(0);
        info!(
            plan = plan.name(),
            phases = plan.len(),
            total_secs = plan.total_duration_secs(),
            "session started"
        );
        let event = Event::SessionStarted {
            plan_name: plan.name().to_string(),
            phase_count: plan.len(),
            total_secs: plan.total_duration_secs(),
            at: Utc::now(),
        };
        self.active_plan = Some(plan);
        self.phase_index = 0;
        self.remaining_secs = first_secs;
        self.status = TimerStatus::Running;
        self.anchor = Some(Instant::now());
        self.broadcast(&event);
        Ok(event)
    }

    pub fn pause(&mut self) -> Result<Event, EngineError> {
        if self.status != TimerStatus::Running {
            return Err(self.invalid("pause"));
        }
        // The partial second in progress is dropped; time spent paused never counts.
        self.status = TimerStatus::Paused;
        self.anchor = None;
        debug!(remaining_secs = self.remaining_secs, "session paused");
        let event = Event::SessionPaused {
            phase_index: self.phase_index,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        };
        self.broadcast(&event);
        Ok(event)
    }

    pub fn resume(&mut self) -> Result<Event, EngineError> {
        if self.status != TimerStatus::Paused {
            return Err(self.invalid("resume"));
        }
        self.status = TimerStatus::Running;
        self.anchor = Some(Instant::now());
        debug!(remaining_secs = self.remaining_secs, "session resumed");
        let event = Event::SessionResumed {
            phase_index: self.phase_index,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        };
        self.broadcast(&event);
        Ok(event)
    }

    /// Abandon the session. No completion notification is sent.
    ///
    /// Idempotent: returns `None` when there is nothing to cancel.
    pub fn cancel(&mut self) -> Option<Event> {
        if self.status == TimerStatus::Idle {
            return None;
        }
        let event = Event::SessionCancelled {
            phase_index: self.phase_index,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        };
        info!(
            phase_index = self.phase_index,
            remaining_secs = self.remaining_secs,
            "session cancelled"
        );
        self.reset();
        self.broadcast(&event);
        Some(event)
    }

    /// Account for one elapsed second.
    ///
    /// No-op unless running. Returns the events produced, in order:
    /// `Tick`, then `PhaseCompleted` followed by `PhaseAdvanced` or
    /// `SessionCompleted` when the phase ran out.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.status != TimerStatus::Running {
            return events;
        }
        if let Some(anchor) = self.anchor {
            self.anchor = Some(anchor + ONE_SECOND);
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        let remaining = self.remaining_secs;
        let index = self.phase_index;
        self.observers
            .notify("on_tick", |o| o.on_tick(remaining, index));
        self.emit(
            &mut events,
            Event::Tick {
                phase_index: index,
                remaining_secs: remaining,
                at: Utc::now(),
            },
        );
        if remaining > 0 {
            return events;
        }

        let Some(plan) = self.active_plan.take() else {
            self.reset();
            return events;
        };
        if let Some(finished) = plan.phase(index) {
            debug!(phase_index = index, phase = %finished.name, "phase complete");
            self.observers
                .notify("on_phase_complete", |o| o.on_phase_complete(finished));
            self.emit(
                &mut events,
                Event::PhaseCompleted {
                    phase_index: index,
                    phase_name: finished.name.clone(),
                    kind: finished.kind,
                    duration_secs: finished.duration_secs,
                    at: Utc::now(),
                },
            );
        }

        let next = plan
            .phase(index + 1)
            .map(|p| (p.name.clone(), p.kind, p.duration_secs));
        match next {
            Some((phase_name, kind, duration_secs)) => {
                self.phase_index = index + 1;
                self.remaining_secs = duration_secs;
                let event = Event::PhaseAdvanced {
                    phase_index: self.phase_index,
                    phase_name,
                    kind,
                    duration_secs,
                    at: Utc::now(),
                };
                self.active_plan = Some(plan);
                self.emit(&mut events, event);
            }
            None => {
                self.status = TimerStatus::Completed;
                self.anchor = None;
                info!(plan = plan.name(), "session complete");
                self.observers
                    .notify("on_session_complete", |o| o.on_session_complete(&plan));
                let event = Event::SessionCompleted {
                    plan_name: plan.name().to_string(),
                    phase_count: plan.len(),
                    total_secs: plan.total_duration_secs(),
                    at: Utc::now(),
                };
                self.emit(&mut events, event);
                self.reset();
            }
        }
        events
    }

    /// Apply every whole second elapsed between the anchor and `now`.
    ///
    /// Seconds are applied one by one, in order, so a stalled ticker still
    /// produces every tick it missed. The sub-second remainder carries over
    /// to the next call.
    pub fn catch_up(&mut self, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();
        while self.status == TimerStatus::Running {
            match self.anchor {
                Some(anchor) if now.saturating_duration_since(anchor) >= ONE_SECOND => {
                    events.extend(self.tick());
                }
                _ => break,
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn invalid(&self, operation: &'static str) -> EngineError {
        debug!(operation, status = %self.status, "rejected transition");
        EngineError::InvalidState {
            operation,
            status: self.status,
        }
    }

    fn reset(&mut self) {
        self.status = TimerStatus::Idle;
        self.active_plan = None;
        self.phase_index = 0;
        self.remaining_secs = 0;
        self.anchor = None;
    }

    fn broadcast(&mut self, event: &Event) {
        self.observers.notify("on_event", |o| o.on_event(event));
    }

    fn emit(&mut self, events: &mut Vec<Event>, event: Event) {
        self.broadcast(&event);
        events.push(event);
    }
}
