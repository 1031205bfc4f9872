use clap::Subcommand;
use studyclock_core::{format_remaining, Database};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Totals across all recorded sessions
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Most recently completed phases
    Recent {
        /// Number of phases to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::Stats { json } => {
            let stats = db.history_stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Sessions completed: {}", stats.completed_sessions);
                println!("Phases completed:   {}", stats.completed_phases);
                println!("Study time:         {}", format_remaining(stats.study_secs));
                println!("Break time:         {}", format_remaining(stats.break_secs));
                println!("Studied today:      {}", format_remaining(stats.today_study_secs));
            }
        }
        HistoryAction::Recent { limit, json } => {
            let phases = db.recent_phases(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&phases)?);
            } else {
                for phase in &phases {
                    println!(
                        "{}  {:<6} {:>8}  {}",
                        phase.completed_at.format("%Y-%m-%d %H:%M"),
                        phase.kind.as_str(),
                        format_remaining(phase.duration_secs),
                        phase.phase_name
                    );
                }
            }
        }
    }
    Ok(())
}
