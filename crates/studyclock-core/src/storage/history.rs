use chrono::Utc;

use super::database::Database;
use crate::error::ObserverError;
use crate::timer::{Phase, SessionPlan, TimerObserver};

/// Observer appending completed phases and sessions to the history tables.
pub struct HistoryRecorder {
    db: Database,
}

impl HistoryRecorder {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn into_inner(self) -> Database {
        self.db
    }
}

impl TimerObserver for HistoryRecorder {
    fn on_phase_complete(&mut self, phase: &Phase) -> Result<(), ObserverError> {
        self.db
            .record_phase(&phase.name, phase.kind, phase.duration_secs, Utc::now())?;
        Ok(())
    }

    fn on_session_complete(&mut self, plan: &SessionPlan) -> Result<(), ObserverError> {
        self.db
            .record_session(plan.name(), plan.len(), plan.total_duration_secs(), Utc::now())?;
        Ok(())
    }
}
