//! Observer contract between the engine and whoever displays or records it.
//!
//! Notifications are fire-and-forget. An observer that returns an error or
//! panics is logged and counted, the engine carries on.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use super::engine::Snapshot;
use super::plan::{Phase, SessionPlan};
use crate::error::ObserverError;
use crate::events::Event;

/// Receives engine lifecycle notifications.
///
/// All methods default to doing nothing so implementors only override what
/// they care about.
pub trait TimerObserver: Send {
    fn on_phase_complete(&mut self, _phase: &Phase) -> Result<(), ObserverError> {
        Ok(())
    }

    fn on_session_complete(&mut self, _plan: &SessionPlan) -> Result<(), ObserverError> {
        Ok(())
    }

    fn on_tick(&mut self, _remaining_secs: u64, _phase_index: usize) -> Result<(), ObserverError> {
        Ok(())
    }

    /// Called once, right after attaching, with the engine's current state.
    fn on_attach(&mut self, snapshot: &Snapshot) -> Result<(), ObserverError> {
        self.on_tick(snapshot.remaining_secs, snapshot.current_phase_index)
    }

    /// Every event the engine emits, including transitions that have no
    /// dedicated callback (start, pause, resume, cancel).
    fn on_event(&mut self, _event: &Event) -> Result<(), ObserverError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(u64);

impl ObserverId {
    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Box<dyn TimerObserver>)>,
    failures: u64,
}

impl ObserverRegistry {
    pub(crate) fn attach(&mut self, mut observer: Box<dyn TimerObserver>, snapshot: &Snapshot) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        if let Some(failure) = isolate(|| observer.on_attach(snapshot)) {
            self.record_failure(id, "on_attach", &failure);
        }
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn detach(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn failures(&self) -> u64 {
        self.failures
    }

    pub(crate) fn notify<F>(&mut self, callback: &'static str, mut f: F)
    where
        F: FnMut(&mut dyn TimerObserver) -> Result<(), ObserverError>,
    {
        let mut failed = Vec::new();
        for (id, observer) in self.observers.iter_mut() {
            if let Some(failure) = isolate(|| f(observer.as_mut())) {
                failed.push((*id, failure));
            }
        }
        for (id, failure) in failed {
            self.record_failure(id, callback, &failure);
        }
    }

    fn record_failure(&mut self, id: ObserverId, callback: &'static str, failure: &str) {
        self.failures += 1;
        warn!(observer = id.0, callback, "observer failed: {failure}");
    }
}

/// Runs an observer callback, turning both errors and panics into a message.
pub(crate) fn isolate<F>(f: F) -> Option<String>
where
    F: FnOnce() -> Result<(), ObserverError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Some(format!("panicked: {msg}"))
        }
    }
}

/// Forwards every engine event into a broadcast channel.
///
/// Sending never blocks; slow receivers lag instead of stalling the ticker.
pub struct ChannelObserver {
    sender: broadcast::Sender<Event>,
}

impl ChannelObserver {
    pub fn new(sender: broadcast::Sender<Event>) -> Self {
        Self { sender }
    }
}

impl TimerObserver for ChannelObserver {
    fn on_attach(&mut self, snapshot: &Snapshot) -> Result<(), ObserverError> {
        // No receivers is not an error.
        let _ = self.sender.send(Event::snapshot(snapshot));
        Ok(())
    }

    fn on_event(&mut self, event: &Event) -> Result<(), ObserverError> {
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerStatus;
    use std::sync::{Arc, Mutex};

    struct Counting(Arc<Mutex<u32>>);

    impl TimerObserver for Counting {
        fn on_tick(&mut self, _: u64, _: usize) -> Result<(), ObserverError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct Failing;

    impl TimerObserver for Failing {
        fn on_tick(&mut self, _: u64, _: usize) -> Result<(), ObserverError> {
            Err("display went away".into())
        }
    }

    struct Panicking;

    impl TimerObserver for Panicking {
        fn on_tick(&mut self, _: u64, _: usize) -> Result<(), ObserverError> {
            panic!("boom");
        }
    }

    fn idle() -> Snapshot {
        Snapshot {
            status: TimerStatus::Idle,
            current_phase_index: 0,
            remaining_secs: 0,
            active_plan: None,
        }
    }

    #[test]
    fn attach_delivers_snapshot_and_detach_removes() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = ObserverRegistry::default();
        let id = registry.attach(Box::new(Counting(count.clone())), &idle());
        assert_eq!(*count.lock().unwrap(), 1);

        registry.notify("on_tick", |o| o.on_tick(5, 0));
        assert_eq!(*count.lock().unwrap(), 2);

        assert!(registry.detach(id));
        assert!(!registry.detach(id));
        registry.notify("on_tick", |o| o.on_tick(4, 0));
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn failing_and_panicking_observers_are_isolated() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = ObserverRegistry::default();
        registry.attach(Box::new(Failing), &idle());
        registry.attach(Box::new(Panicking), &idle());
        registry.attach(Box::new(Counting(count.clone())), &idle());
        let after_attach = registry.failures();
        assert_eq!(after_attach, 2);

        registry.notify("on_tick", |o| o.on_tick(1, 0));
        assert_eq!(registry.failures(), after_attach + 2);
        assert_eq!(*count.lock().unwrap(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn channel_observer_without_receivers_is_fine() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let mut observer = ChannelObserver::new(tx);
        assert!(observer.on_attach(&idle()).is_ok());
    }
}
