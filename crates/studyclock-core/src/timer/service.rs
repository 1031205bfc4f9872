//! Background scheduler driving a [`TimerEngine`] once per second.
//!
//! The ticker is a tokio task that lives as long as the session runs.
//! Observers come and go without touching it; only `pause`, `cancel` or
//! session completion stop it.
//!
//! Observers attached through [`TimerService::attach`] are called outside the
//! engine lock, one dispatcher task each, so a slow observer delays only its
//! own notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::dispatch::{self, Dispatcher, ForwardingObserver};
use super::engine::{Snapshot, TimerEngine, TimerStatus};
use super::observer::{ChannelObserver, ObserverId, TimerObserver};
use super::plan::SessionPlan;
use crate::error::EngineError;
use crate::events::Event;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 1024;

pub struct TimerService {
    engine: Arc<Mutex<TimerEngine>>,
    ticker: StdMutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<Event>,
    dispatchers: StdMutex<HashMap<ObserverId, Dispatcher>>,
    dispatch_failures: Arc<AtomicU64>,
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService {
    pub fn new() -> Self {
        Self::with_engine(TimerEngine::new())
    }

    /// Wrap an existing engine. Observers already attached to it stay
    /// attached and keep running inline with each tick.
    pub fn with_engine(mut engine: TimerEngine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        engine.attach(ChannelObserver::new(events.clone()));
        Self {
            engine: Arc::new(Mutex::new(engine)),
            ticker: StdMutex::new(None),
            events,
            dispatchers: StdMutex::new(HashMap::new()),
            dispatch_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stream of every engine event, starting from now.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.engine.lock().await.snapshot()
    }

    /// Attach an observer. Returns once its `on_attach` has run with the
    /// current snapshot.
    pub async fn attach(&self, observer: impl TimerObserver + 'static) -> ObserverId {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self
            .engine
            .lock()
            .await
            .attach(ForwardingObserver::new(tx.clone()));
        let dispatcher = Dispatcher::spawn(
            id,
            Box::new(observer),
            tx,
            rx,
            Arc::clone(&self.dispatch_failures),
        );
        let sender = dispatcher.sender();
        self.dispatchers_guard().insert(id, dispatcher);
        dispatch::flush(&sender).await;
        id
    }

    /// Detach an observer. Notifications queued before the call are still
    /// delivered before this returns.
    pub async fn detach(&self, id: ObserverId) -> bool {
        let removed = self.engine.lock().await.detach(id);
        let dispatcher = self.dispatchers_guard().remove(&id);
        if let Some(dispatcher) = dispatcher {
            dispatcher.finish().await;
        }
        removed
    }

    /// Wait until every observer has handled everything queued so far.
    pub async fn flush_observers(&self) {
        // Holding the engine lock means no engine call is midway through
        // queueing notifications.
        let engine = self.engine.lock().await;
        let senders: Vec<_> = self
            .dispatchers_guard()
            .values()
            .map(Dispatcher::sender)
            .collect();
        drop(engine);
        for sender in &senders {
            dispatch::flush(sender).await;
        }
    }

    pub async fn observer_failures(&self) -> u64 {
        let inline = self.engine.lock().await.observer_failures();
        inline + self.dispatch_failures.load(Ordering::Relaxed)
    }

    pub async fn start(&self, plan: SessionPlan) -> Result<Event, EngineError> {
        let mut engine = self.engine.lock().await;
        let event = engine.start(plan)?;
        self.spawn_ticker();
        Ok(event)
    }

    pub async fn pause(&self) -> Result<Event, EngineError> {
        let mut engine = self.engine.lock().await;
        // Account for whole seconds the ticker has not applied yet.
        engine.catch_up(Instant::now());
        let event = engine.pause()?;
        self.abort_ticker();
        Ok(event)
    }

    pub async fn resume(&self) -> Result<Event, EngineError> {
        let mut engine = self.engine.lock().await;
        let event = engine.resume()?;
        self.spawn_ticker();
        Ok(event)
    }

    /// Idempotent; `None` when nothing was running.
    pub async fn cancel(&self) -> Option<Event> {
        let mut engine = self.engine.lock().await;
        let event = engine.cancel();
        self.abort_ticker();
        event
    }

    /// Resolves once the engine is idle and every observer has been
    /// notified: immediately when nothing runs, otherwise on session
    /// completion or cancellation.
    pub async fn wait_until_idle(&self) {
        self.wait_for_session_end().await;
        self.flush_observers().await;
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn wait_for_session_end(&self) {
        let mut rx = self.events.subscribe();
        if self.snapshot().await.status == TimerStatus::Idle {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(event) if event.ends_session() => return,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event stream lagged");
                    if self.snapshot().await.status == TimerStatus::Idle {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    fn dispatchers_guard(&self) -> std::sync::MutexGuard<'_, HashMap<ObserverId, Dispatcher>> {
        self.dispatchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the engine lock held so the ticker cannot observe
    /// a half-applied transition.
    fn spawn_ticker(&self) {
        let engine = Arc::clone(&self.engine);
        let first = Instant::now() + TICK_INTERVAL;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(first, TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut guard = engine.lock().await;
                let events = guard.catch_up(Instant::now());
                if events.len() > 1 {
                    trace!(events = events.len(), "ticker caught up");
                }
                if guard.status() != TimerStatus::Running {
                    debug!(status = %guard.status(), "ticker stopped");
                    break;
                }
            }
        });
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn abort_ticker(&self) {
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.abort_ticker();
    }
}
