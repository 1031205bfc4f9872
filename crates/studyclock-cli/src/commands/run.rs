use std::io::Write;

use clap::Args;
use studyclock_core::{
    format_remaining, Config, Database, Event, HistoryRecorder, SessionPlan, TimerService,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::PlanSource;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: PlanSource,
    /// Run the same session this many times back to back
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,
    /// Print events as JSON lines instead of a status line
    #[arg(long)]
    pub json: bool,
}

enum Outcome {
    Completed,
    Cancelled,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let plan = args.source.resolve(&config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_sessions(plan, &config, args.repeat, args.json))
}

async fn run_sessions(
    plan: SessionPlan,
    config: &Config,
    repeat: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = TimerService::new();
    if config.history.enabled {
        match Database::open() {
            Ok(db) => {
                service.attach(HistoryRecorder::new(db)).await;
            }
            Err(e) => warn!("history disabled: {e}"),
        }
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    for round in 1..=repeat {
        if repeat > 1 && !json {
            println!("Round {round} of {repeat}");
        }
        let mut events = service.subscribe();
        service.start(plan.clone()).await?;

        let outcome = loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    if let Some(event) = service.cancel().await {
                        print_event(&event, &plan, config, json)?;
                    }
                    break Outcome::Cancelled;
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        print_event(&event, &plan, config, json)?;
                        if event.ends_session() {
                            break match event {
                                Event::SessionCancelled { .. } => Outcome::Cancelled,
                                _ => Outcome::Completed,
                            };
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped timer events"),
                    Err(RecvError::Closed) => break Outcome::Cancelled,
                },
            }
        };

        if let Outcome::Cancelled = outcome {
            info!(round, "session cancelled");
            break;
        }
    }

    // History is written off the timer's lock; let it catch up before exit.
    service.wait_until_idle().await;
    let failures = service.observer_failures().await;
    if failures > 0 {
        warn!(failures, "observers reported failures during the session");
    }
    Ok(())
}

fn print_event(
    event: &Event,
    plan: &SessionPlan,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    match event {
        Event::SessionStarted {
            plan_name,
            phase_count,
            total_secs,
            ..
        } => {
            writeln!(
                out,
                "{plan_name}: {phase_count} phases, {}",
                format_remaining(*total_secs)
            )?;
        }
        Event::Tick {
            phase_index,
            remaining_secs,
            ..
        } => {
            let name = plan.phase(*phase_index).map_or("", |p| p.name.as_str());
            write!(
                out,
                "\r[{}/{}] {name}  {}  ",
                phase_index + 1,
                plan.len(),
                format_remaining(*remaining_secs)
            )?;
            out.flush()?;
        }
        Event::PhaseCompleted { phase_name, .. } => {
            writeln!(out)?;
            if config.notifications.on_phase_complete {
                writeln!(out, "{phase_name} complete")?;
            }
        }
        Event::SessionCompleted {
            plan_name,
            total_secs,
            ..
        } => {
            if config.notifications.on_session_complete {
                writeln!(
                    out,
                    "Session complete: {plan_name} ({})",
                    format_remaining(*total_secs)
                )?;
            }
        }
        Event::SessionCancelled { .. } => {
            writeln!(out)?;
            writeln!(out, "Session cancelled")?;
        }
        _ => {}
    }
    Ok(())
}
