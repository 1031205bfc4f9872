//! Off-lock delivery for observers attached through [`TimerService`](super::TimerService).
//!
//! The engine only sees a [`ForwardingObserver`], which queues an owned copy of
//! each notification and returns at once. A dispatcher task per observer drains
//! the queue and runs the real callbacks on the blocking pool, so a slow or
//! blocking observer never holds the engine lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};
use tracing::warn;

use super::engine::Snapshot;
use super::observer::{isolate, ObserverId, TimerObserver};
use super::plan::{Phase, SessionPlan};
use crate::error::ObserverError;
use crate::events::Event;

pub(crate) enum Notification {
    Attach(Snapshot),
    Tick {
        remaining_secs: u64,
        phase_index: usize,
    },
    PhaseComplete(Phase),
    SessionComplete(SessionPlan),
    Event(Event),
    /// Answered once everything queued before it has been delivered.
    Flush(oneshot::Sender<()>),
}

impl Notification {
    fn callback(&self) -> &'static str {
        match self {
            Notification::Attach(_) => "on_attach",
            Notification::Tick { .. } => "on_tick",
            Notification::PhaseComplete(_) => "on_phase_complete",
            Notification::SessionComplete(_) => "on_session_complete",
            Notification::Event(_) => "on_event",
            Notification::Flush(_) => "flush",
        }
    }

    fn deliver(&self, observer: &mut dyn TimerObserver) -> Result<(), ObserverError> {
        match self {
            Notification::Attach(snapshot) => observer.on_attach(snapshot),
            Notification::Tick {
                remaining_secs,
                phase_index,
            } => observer.on_tick(*remaining_secs, *phase_index),
            Notification::PhaseComplete(phase) => observer.on_phase_complete(phase),
            Notification::SessionComplete(plan) => observer.on_session_complete(plan),
            Notification::Event(event) => observer.on_event(event),
            Notification::Flush(_) => Ok(()),
        }
    }
}

/// Engine-side stand-in for a dispatched observer.
pub(crate) struct ForwardingObserver {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ForwardingObserver {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }

    fn forward(&self, notification: Notification) -> Result<(), ObserverError> {
        // A stopped dispatcher already logged why.
        let _ = self.tx.send(notification);
        Ok(())
    }
}

impl TimerObserver for ForwardingObserver {
    fn on_phase_complete(&mut self, phase: &Phase) -> Result<(), ObserverError> {
        self.forward(Notification::PhaseComplete(phase.clone()))
    }

    fn on_session_complete(&mut self, plan: &SessionPlan) -> Result<(), ObserverError> {
        self.forward(Notification::SessionComplete(plan.clone()))
    }

    fn on_tick(&mut self, remaining_secs: u64, phase_index: usize) -> Result<(), ObserverError> {
        self.forward(Notification::Tick {
            remaining_secs,
            phase_index,
        })
    }

    fn on_attach(&mut self, snapshot: &Snapshot) -> Result<(), ObserverError> {
        self.forward(Notification::Attach(snapshot.clone()))
    }

    fn on_event(&mut self, event: &Event) -> Result<(), ObserverError> {
        self.forward(Notification::Event(event.clone()))
    }
}

/// Service-side handle on a dispatcher task.
pub(crate) struct Dispatcher {
    tx: mpsc::UnboundedSender<Notification>,
    handle: JoinHandle<()>,
}

impl Dispatcher {
    /// Spawn the task delivering `rx` to `observer`, in order.
    pub(crate) fn spawn(
        id: ObserverId,
        observer: Box<dyn TimerObserver>,
        tx: mpsc::UnboundedSender<Notification>,
        mut rx: mpsc::UnboundedReceiver<Notification>,
        failures: Arc<AtomicU64>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut observer = observer;
            while let Some(notification) = rx.recv().await {
                if let Notification::Flush(done) = notification {
                    let _ = done.send(());
                    continue;
                }
                let delivered = task::spawn_blocking(move || {
                    let failure = isolate(|| notification.deliver(observer.as_mut()));
                    (observer, notification.callback(), failure)
                })
                .await;
                match delivered {
                    Ok((returned, callback, failure)) => {
                        observer = returned;
                        if let Some(failure) = failure {
                            failures.fetch_add(1, Ordering::Relaxed);
                            warn!(observer = ?id, callback, "observer failed: {failure}");
                        }
                    }
                    Err(e) => {
                        warn!(observer = ?id, "observer dispatcher stopped: {e}");
                        return;
                    }
                }
            }
        });
        Self { tx, handle }
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<Notification> {
        self.tx.clone()
    }

    /// Close the queue and wait for everything already queued to be delivered.
    /// The engine-side [`ForwardingObserver`] must be detached first.
    pub(crate) async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            warn!("observer dispatcher failed: {e}");
        }
    }
}

/// Resolves once every notification queued on `tx` so far has been delivered.
pub(crate) async fn flush(tx: &mpsc::UnboundedSender<Notification>) {
    let (done, delivered) = oneshot::channel();
    if tx.send(Notification::Flush(done)).is_ok() {
        let _ = delivered.await;
    }
}
