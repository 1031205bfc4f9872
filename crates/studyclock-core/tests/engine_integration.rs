//! Integration tests for the timer engine.
//!
//! Drives full sessions tick by tick through the public API and checks
//! observer notifications along the way.

use std::sync::{Arc, Mutex};

use studyclock_core::{
    Event, ObserverError, Phase, SessionBuilder, SessionConfig, SessionError, SessionPlan,
    Snapshot, Template, TimerEngine, TimerObserver, TimerStatus,
};

#[derive(Default)]
struct Log {
    completed_phases: Vec<(String, bool)>,
    completed_sessions: Vec<String>,
    last_tick: Option<(u64, usize)>,
    tick_count: usize,
}

struct Recorder(Arc<Mutex<Log>>);

impl TimerObserver for Recorder {
    fn on_phase_complete(&mut self, phase: &Phase) -> Result<(), ObserverError> {
        self.0
            .lock()
            .unwrap()
            .completed_phases
            .push((phase.name.clone(), phase.is_break()));
        Ok(())
    }

    fn on_session_complete(&mut self, plan: &SessionPlan) -> Result<(), ObserverError> {
        self.0
            .lock()
            .unwrap()
            .completed_sessions
            .push(plan.name().to_string());
        Ok(())
    }

    fn on_tick(&mut self, remaining_secs: u64, phase_index: usize) -> Result<(), ObserverError> {
        let mut log = self.0.lock().unwrap();
        log.last_tick = Some((remaining_secs, phase_index));
        log.tick_count += 1;
        Ok(())
    }

    fn on_attach(&mut self, _snapshot: &Snapshot) -> Result<(), ObserverError> {
        Ok(())
    }
}

struct Broken;

impl TimerObserver for Broken {
    fn on_tick(&mut self, _: u64, _: usize) -> Result<(), ObserverError> {
        Err("render target gone".into())
    }

    fn on_phase_complete(&mut self, _: &Phase) -> Result<(), ObserverError> {
        panic!("observer bug");
    }
}

fn engine_with_log() -> (TimerEngine, Arc<Mutex<Log>>) {
    let log = Arc::new(Mutex::new(Log::default()));
    let mut engine = TimerEngine::new();
    engine.attach(Recorder(log.clone()));
    (engine, log)
}

#[test]
fn test_four_cycle_pomodoro_first_transition() {
    let config = SessionConfig::new(1500).with_break(300, 4);
    let plan = SessionBuilder::build(&config).unwrap();
    assert_eq!(plan.len(), 8);
    assert!(plan.phases().last().unwrap().is_break());

    let (mut engine, log) = engine_with_log();
    engine.start(plan).unwrap();
    for _ in 0..1500 {
        engine.tick();
    }

    let log = log.lock().unwrap();
    assert_eq!(log.completed_phases.len(), 1);
    assert_eq!(log.completed_phases[0], ("Focus Time".to_string(), false));
    assert!(log.completed_sessions.is_empty());
    assert_eq!(engine.status(), TimerStatus::Running);
    assert_eq!(engine.phase_index(), 1);
    assert_eq!(engine.remaining_secs(), 300);
}

#[test]
fn test_full_pomodoro_runs_every_phase_in_order() {
    let config = SessionConfig::new(3).with_break(2, 3).with_label("Short Pomodoro");
    let plan = SessionBuilder::build(&config).unwrap();
    let (mut engine, log) = engine_with_log();
    engine.start(plan).unwrap();

    let mut ticks = 0;
    while engine.status() == TimerStatus::Running {
        engine.tick();
        ticks += 1;
    }

    assert_eq!(ticks, 3 * (3 + 2));
    let log = log.lock().unwrap();
    let kinds: Vec<bool> = log.completed_phases.iter().map(|(_, b)| *b).collect();
    assert_eq!(kinds, vec![false, true, false, true, false, true]);
    assert_eq!(log.completed_sessions, vec!["Short Pomodoro".to_string()]);
    assert_eq!(log.tick_count, ticks);
}

#[test]
fn test_single_phase_completes_exactly_once() {
    let (mut engine, log) = engine_with_log();
    let plan = SessionBuilder::build(&SessionConfig::new(45)).unwrap();
    engine.start(plan).unwrap();

    let mut saw_completion = 0;
    for _ in 0..45 {
        for event in engine.tick() {
            if let Event::SessionCompleted { .. } = event {
                saw_completion += 1;
            }
        }
    }
    assert_eq!(saw_completion, 1);
    assert_eq!(log.lock().unwrap().completed_sessions.len(), 1);
    assert_eq!(engine.status(), TimerStatus::Idle);

    // Extra ticks after completion do nothing.
    assert!(engine.tick().is_empty());
    assert_eq!(log.lock().unwrap().completed_sessions.len(), 1);
}

#[test]
fn test_pause_resume_preserves_position() {
    let (mut engine, _log) = engine_with_log();
    let plan = SessionBuilder::build(&SessionConfig::new(20).with_break(10, 2)).unwrap();
    engine.start(plan).unwrap();
    for _ in 0..23 {
        engine.tick();
    }
    let before = engine.snapshot();
    assert_eq!(before.current_phase_index, 1);
    assert_eq!(before.remaining_secs, 7);

    engine.pause().unwrap();
    engine.resume().unwrap();
    let after = engine.snapshot();
    assert_eq!(after.current_phase_index, before.current_phase_index);
    assert_eq!(after.remaining_secs, before.remaining_secs);
    assert_eq!(after.status, TimerStatus::Running);
}

#[test]
fn test_resumed_session_finishes_after_remaining_ticks() {
    let (mut engine, log) = engine_with_log();
    engine
        .start(SessionBuilder::build(&SessionConfig::new(15)).unwrap())
        .unwrap();
    for _ in 0..5 {
        engine.tick();
    }
    assert_eq!(engine.remaining_secs(), 10);
    engine.pause().unwrap();
    assert!(engine.tick().is_empty());
    engine.resume().unwrap();

    for i in 1..=10 {
        engine.tick();
        if i < 10 {
            assert_eq!(engine.status(), TimerStatus::Running, "finished early at tick {i}");
        }
    }
    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(log.lock().unwrap().completed_sessions.len(), 1);
}

#[test]
fn test_cancel_from_running_and_paused() {
    for pause_first in [false, true] {
        let (mut engine, log) = engine_with_log();
        engine.start(Template::Pomodoro.plan()).unwrap();
        engine.tick();
        if pause_first {
            engine.pause().unwrap();
        }
        assert!(engine.cancel().is_some());
        let snap = engine.snapshot();
        assert_eq!(snap.status, TimerStatus::Idle);
        assert!(snap.active_plan.is_none());
        assert!(log.lock().unwrap().completed_sessions.is_empty());
        assert!(engine.cancel().is_none());
    }
}

#[test]
fn test_zero_duration_config_never_reaches_engine() {
    let engine = TimerEngine::new();
    let before = engine.snapshot();
    let result = SessionBuilder::build(&SessionConfig::new(0));
    assert!(matches!(result, Err(SessionError::InvalidConfig { .. })));
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn test_misbehaving_observer_does_not_stall_the_engine() {
    let (mut engine, log) = engine_with_log();
    engine.attach(Broken);
    engine
        .start(SessionBuilder::build(&SessionConfig::new(2).with_break(1, 1)).unwrap())
        .unwrap();
    while engine.status() == TimerStatus::Running {
        engine.tick();
    }

    // 3 ticks fail, 2 phase completions panic.
    assert_eq!(engine.observer_failures(), 5);
    let log = log.lock().unwrap();
    assert_eq!(log.completed_phases.len(), 2);
    assert_eq!(log.completed_sessions.len(), 1);
}

#[test]
fn test_remaining_time_is_monotonic_within_a_phase() {
    let mut engine = TimerEngine::new();
    engine.start(Template::DeepWork.plan()).unwrap();
    let mut previous = engine.remaining_secs();
    let mut index = engine.phase_index();
    while engine.status() == TimerStatus::Running {
        engine.tick();
        if engine.status() != TimerStatus::Running {
            break;
        }
        if engine.phase_index() == index {
            assert!(engine.remaining_secs() < previous);
        } else {
            index = engine.phase_index();
        }
        previous = engine.remaining_secs();
    }
}
