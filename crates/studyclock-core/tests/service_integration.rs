//! Integration tests for the background timer service.
//!
//! Uses tokio's paused clock so wall-clock scenarios run instantly and
//! deterministically. Observer callbacks are delivered off the engine lock,
//! so assertions on observer state come after `flush_observers` or
//! `wait_until_idle`.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use studyclock_core::{
    ObserverError, SessionBuilder, SessionConfig, SessionPlan, Snapshot, TimerObserver,
    TimerService, TimerStatus,
};
use tokio::time::{advance, sleep};

#[derive(Default)]
struct Seen {
    attached: Vec<Snapshot>,
    sessions: usize,
    ticks: usize,
}

struct Watcher(Arc<Mutex<Seen>>);

impl TimerObserver for Watcher {
    fn on_attach(&mut self, snapshot: &Snapshot) -> Result<(), ObserverError> {
        self.0.lock().unwrap().attached.push(snapshot.clone());
        Ok(())
    }

    fn on_tick(&mut self, _: u64, _: usize) -> Result<(), ObserverError> {
        self.0.lock().unwrap().ticks += 1;
        Ok(())
    }

    fn on_session_complete(&mut self, _: &SessionPlan) -> Result<(), ObserverError> {
        self.0.lock().unwrap().sessions += 1;
        Ok(())
    }
}

fn plan(secs: u64) -> SessionPlan {
    SessionBuilder::build(&SessionConfig::new(secs)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_pause_time_does_not_count() {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let service = TimerService::new();
    service.attach(Watcher(seen.clone())).await;
    service.start(plan(20)).await.unwrap();

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(service.snapshot().await.remaining_secs, 10);

    service.pause().await.unwrap();
    sleep(Duration::from_secs(5)).await;
    let paused = service.snapshot().await;
    assert_eq!(paused.status, TimerStatus::Paused);
    assert_eq!(paused.remaining_secs, 10);

    service.resume().await.unwrap();
    sleep(Duration::from_millis(9_500)).await;
    let snap = service.snapshot().await;
    assert_eq!(snap.status, TimerStatus::Running);
    assert_eq!(snap.remaining_secs, 1);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(service.snapshot().await.status, TimerStatus::Idle);
    service.flush_observers().await;
    assert_eq!(seen.lock().unwrap().sessions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_detached_observer_does_not_stop_the_ticker() {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let service = TimerService::new();
    let id = service.attach(Watcher(seen.clone())).await;
    service.start(plan(60)).await.unwrap();

    sleep(Duration::from_millis(3_500)).await;
    assert!(service.detach(id).await);
    sleep(Duration::from_secs(4)).await;

    let snap = service.snapshot().await;
    assert_eq!(snap.status, TimerStatus::Running);
    assert_eq!(snap.remaining_secs, 53);
    assert_eq!(seen.lock().unwrap().ticks, 3);

    // Re-attaching resynchronizes immediately.
    let again = Arc::new(Mutex::new(Seen::default()));
    service.attach(Watcher(again.clone())).await;
    let again = again.lock().unwrap();
    assert_eq!(again.attached.len(), 1);
    assert_eq!(again.attached[0].status, TimerStatus::Running);
    assert_eq!(again.attached[0].remaining_secs, 53);
    assert_eq!(again.attached[0].current_phase_index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_without_completion() {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let service = TimerService::new();
    service.attach(Watcher(seen.clone())).await;
    service.start(plan(5)).await.unwrap();
    sleep(Duration::from_millis(2_500)).await;

    assert!(service.cancel().await.is_some());
    assert!(service.cancel().await.is_none());
    sleep(Duration::from_secs(10)).await;

    let snap = service.snapshot().await;
    assert_eq!(snap.status, TimerStatus::Idle);
    assert!(snap.active_plan.is_none());
    service.flush_observers().await;
    assert_eq!(seen.lock().unwrap().sessions, 0);
    assert_eq!(seen.lock().unwrap().ticks, 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_transitions_are_rejected() {
    let service = TimerService::new();
    assert!(service.pause().await.is_err());
    assert!(service.resume().await.is_err());

    service.start(plan(30)).await.unwrap();
    assert!(service.start(plan(30)).await.is_err());
    assert!(service.resume().await.is_err());
    service.pause().await.unwrap();
    assert!(service.pause().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_same_plan_can_run_twice() {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let service = TimerService::new();
    service.attach(Watcher(seen.clone())).await;
    let p = plan(2);

    service.start(p.clone()).await.unwrap();
    service.wait_until_idle().await;
    service.start(p).await.unwrap();
    service.wait_until_idle().await;

    assert_eq!(seen.lock().unwrap().sessions, 2);
}

#[tokio::test(start_paused = true)]
async fn test_phase_sequence_runs_unattended() {
    let service = TimerService::new();
    let mut rx = service.subscribe();
    let plan = SessionBuilder::build(&SessionConfig::new(2).with_break(1, 2)).unwrap();
    service.start(plan).await.unwrap();
    service.wait_until_idle().await;

    let mut advanced = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let studyclock_core::Event::PhaseAdvanced { phase_index, .. } = event {
            advanced.push(phase_index);
        }
    }
    assert_eq!(advanced, vec![1, 2, 3]);
}

struct TickLog(Arc<Mutex<Vec<u64>>>);

impl TimerObserver for TickLog {
    fn on_attach(&mut self, _: &Snapshot) -> Result<(), ObserverError> {
        Ok(())
    }

    fn on_tick(&mut self, remaining: u64, _: usize) -> Result<(), ObserverError> {
        self.0.lock().unwrap().push(remaining);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_late_wakeup_replays_every_second_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let service = TimerService::new();
    let mut rx = service.subscribe();
    service.attach(TickLog(log.clone())).await;
    service.start(plan(60)).await.unwrap();

    // The ticker sleeps through five intervals and wakes once.
    advance(Duration::from_millis(5_500)).await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(service.snapshot().await.remaining_secs, 55);

    service.flush_observers().await;
    assert_eq!(*log.lock().unwrap(), vec![59, 58, 57, 56, 55]);

    let mut broadcast = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let studyclock_core::Event::Tick { remaining_secs, .. } = event {
            broadcast.push(remaining_secs);
        }
    }
    assert_eq!(broadcast, vec![59, 58, 57, 56, 55]);
}

/// Blocks its thread for two seconds on every tick.
struct Sluggish;

impl TimerObserver for Sluggish {
    fn on_attach(&mut self, _: &Snapshot) -> Result<(), ObserverError> {
        Ok(())
    }

    fn on_tick(&mut self, _: u64, _: usize) -> Result<(), ObserverError> {
        std::thread::sleep(Duration::from_secs(2));
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_observer_does_not_hold_up_the_ticker_or_cancel() {
    let service = TimerService::new();
    service.attach(Sluggish).await;
    service.start(plan(60)).await.unwrap();

    // The first tick lands at 1s and keeps the observer busy until 3s.
    sleep(Duration::from_millis(2_500)).await;
    let snap = service.snapshot().await;
    assert_eq!(snap.status, TimerStatus::Running);
    assert_eq!(snap.remaining_secs, 58);

    let started = Instant::now();
    assert!(service.cancel().await.is_some());
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "cancel took {:?}",
        started.elapsed()
    );
    assert_eq!(service.snapshot().await.status, TimerStatus::Idle);
}
