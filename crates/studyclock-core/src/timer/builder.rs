//! Compiles a user-facing [`SessionConfig`] into a [`SessionPlan`].
//!
//! Rules:
//! - a timer without breaks is single-shot: one study phase, `cycles` ignored;
//! - a timer with breaks repeats `[study, break]` `cycles` times, so the plan
//!   always ends with a break and holds `2 * cycles` phases.

use serde::{Deserialize, Serialize};

use super::plan::{Phase, SessionPlan};
use crate::error::SessionError;

pub const STUDY_PHASE_NAME: &str = "Focus Time";
pub const BREAK_PHASE_NAME: &str = "Break Time";
pub const MAX_CYCLES: u32 = 999;

/// Timer parameters as chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Study duration per cycle.
    pub total_secs: u64,
    #[serde(default)]
    pub include_break: bool,
    /// Only read when `include_break` is set.
    #[serde(default)]
    pub break_secs: u64,
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    #[serde(default)]
    pub label: String,
}

fn default_cycles() -> u32 {
    1
}

impl SessionConfig {
    /// A breakless timer of `total_secs`.
    pub fn new(total_secs: u64) -> Self {
        Self {
            total_secs,
            include_break: false,
            break_secs: 0,
            cycles: default_cycles(),
            label: String::new(),
        }
    }

    /// Sums hour/minute/second components, saturating on overflow.
    pub fn from_hms(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self::new(hms_to_secs(hours, minutes, seconds))
    }

    pub fn with_break(mut self, break_secs: u64, cycles: u32) -> Self {
        self.include_break = true;
        self.break_secs = break_secs;
        self.cycles = cycles;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Check the config without building a plan.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.total_secs == 0 {
            return Err(SessionError::config(
                "total_secs",
                "study duration must be greater than zero",
            ));
        }
        if self.include_break {
            if self.break_secs == 0 {
                return Err(SessionError::config(
                    "break_secs",
                    "break duration must be greater than zero when breaks are enabled",
                ));
            }
            if self.cycles == 0 {
                return Err(SessionError::config(
                    "cycles",
                    "at least one cycle is required",
                ));
            }
            if self.cycles > MAX_CYCLES {
                return Err(SessionError::config(
                    "cycles",
                    format!("at most {MAX_CYCLES} cycles are supported"),
                ));
            }
            let session_secs = self
                .total_secs
                .checked_add(self.break_secs)
                .and_then(|cycle| cycle.checked_mul(u64::from(self.cycles)));
            if session_secs.is_none() {
                return Err(SessionError::config(
                    "total_secs",
                    "session length does not fit in a 64-bit second count",
                ));
            }
        }
        Ok(())
    }
}

pub fn hms_to_secs(hours: u64, minutes: u64, seconds: u64) -> u64 {
    hours
        .saturating_mul(3600)
        .saturating_add(minutes.saturating_mul(60))
        .saturating_add(seconds)
}

/// Pure `SessionConfig -> SessionPlan` transformation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionBuilder;

impl SessionBuilder {
    pub fn build(config: &SessionConfig) -> Result<SessionPlan, SessionError> {
        config.validate()?;

        let name = if config.label.trim().is_empty() {
            "Custom Timer".to_string()
        } else {
            config.label.clone()
        };

        if !config.include_break {
            let description = format!(
                "Single {} study block",
                super::format_remaining(config.total_secs)
            );
            return SessionPlan::new(
                name,
                description,
                vec![Phase::study(STUDY_PHASE_NAME, config.total_secs)],
            );
        }

        let cycles = config.cycles as usize;
        let mut phases = Vec::with_capacity(cycles * 2);
        for cycle in 1..=cycles {
            let note = format!("Cycle {cycle} of {cycles}");
            phases.push(
                Phase::study(STUDY_PHASE_NAME, config.total_secs).with_instructions(note.clone()),
            );
            phases.push(Phase::rest(BREAK_PHASE_NAME, config.break_secs).with_instructions(note));
        }
        let description = format!(
            "{cycles} x ({} study + {} break)",
            super::format_remaining(config.total_secs),
            super::format_remaining(config.break_secs)
        );
        SessionPlan::new(name, description, phases)
    }
}
