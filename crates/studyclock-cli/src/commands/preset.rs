use clap::Subcommand;
use studyclock_core::{format_remaining, Config, Database, PresetId, PresetStore};

use super::TimerArgs;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List saved presets
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a new preset from config defaults plus flags
    Save {
        #[command(flatten)]
        timer: TimerArgs,
    },
    /// Change an existing preset
    Update {
        /// Preset ID
        id: String,
        #[command(flatten)]
        timer: TimerArgs,
    },
    /// Delete a preset
    Delete {
        /// Preset ID
        id: String,
    },
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        PresetAction::List { json } => {
            let presets = db.list_presets()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else if presets.is_empty() {
                println!("No presets saved.");
            } else {
                for preset in &presets {
                    let c = &preset.config;
                    let breaks = if c.include_break {
                        format!("{} break x{}", format_remaining(c.break_secs), c.cycles)
                    } else {
                        "no break".to_string()
                    };
                    println!(
                        "{}  {}  {} study, {}",
                        preset.id,
                        c.label,
                        format_remaining(c.total_secs),
                        breaks
                    );
                }
            }
        }
        PresetAction::Save { timer } => {
            let config = timer.apply(Config::load()?.session_config());
            config.validate()?;
            let id = db.save_preset(&config)?;
            println!("Preset saved: {id}");
        }
        PresetAction::Update { id, timer } => {
            let id = PresetId::from(id);
            let existing = db
                .get_preset(&id)?
                .ok_or_else(|| format!("preset not found: {id}"))?;
            let config = timer.apply(existing.config);
            config.validate()?;
            db.update_preset(&id, &config)?;
            println!("Preset updated: {id}");
        }
        PresetAction::Delete { id } => {
            db.delete_preset(&PresetId::from(id.as_str()))?;
            println!("Preset deleted: {id}");
        }
    }
    Ok(())
}
