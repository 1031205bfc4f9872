pub mod config;
pub mod history;
pub mod plan;
pub mod preset;
pub mod run;

use clap::Args;
use studyclock_core::timer::hms_to_secs;
use studyclock_core::{
    Config, Database, PresetId, PresetStore, SessionBuilder, SessionConfig, SessionPlan, Template,
};

/// Timer parameters given on the command line. Anything left out falls back
/// to the preset or the `[session]` config defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct TimerArgs {
    /// Study phase hours
    #[arg(long)]
    pub hours: Option<u64>,
    /// Study phase minutes
    #[arg(long)]
    pub minutes: Option<u64>,
    /// Study phase seconds
    #[arg(long)]
    pub seconds: Option<u64>,
    /// Break length in minutes (enables breaks)
    #[arg(long, conflicts_with = "no_break")]
    pub break_minutes: Option<u64>,
    /// Number of study/break cycles
    #[arg(long)]
    pub cycles: Option<u32>,
    /// A single study phase without breaks
    #[arg(long)]
    pub no_break: bool,
    /// Session label
    #[arg(long)]
    pub label: Option<String>,
}

impl TimerArgs {
    /// Overlay the flags that were given onto `base`.
    pub fn apply(&self, base: SessionConfig) -> SessionConfig {
        let mut config = base;
        if self.hours.is_some() || self.minutes.is_some() || self.seconds.is_some() {
            config.total_secs = hms_to_secs(
                self.hours.unwrap_or(0),
                self.minutes.unwrap_or(0),
                self.seconds.unwrap_or(0),
            );
        }
        if let Some(minutes) = self.break_minutes {
            config.include_break = true;
            config.break_secs = hms_to_secs(0, minutes, 0);
        }
        if let Some(cycles) = self.cycles {
            config.cycles = cycles;
        }
        if self.no_break {
            config.include_break = false;
        }
        if let Some(label) = &self.label {
            config.label = label.clone();
        }
        config
    }
}

/// Where a session plan comes from: a template, a saved preset, or the
/// config defaults, with timer flags layered on top of the latter two.
#[derive(Args, Debug, Default)]
pub struct PlanSource {
    /// Saved preset id (see `studyclock preset list`)
    #[arg(long, conflicts_with = "template")]
    pub preset: Option<String>,
    /// Built-in template (see `studyclock templates`)
    #[arg(
        long,
        conflicts_with_all = ["hours", "minutes", "seconds", "break_minutes", "cycles", "no_break", "label"]
    )]
    pub template: Option<String>,
    #[command(flatten)]
    pub timer: TimerArgs,
}

impl PlanSource {
    /// `config` supplies the `[session]` defaults when neither a template nor
    /// a preset is named.
    pub fn resolve(&self, config: &Config) -> Result<SessionPlan, Box<dyn std::error::Error>> {
        if let Some(name) = &self.template {
            let template = Template::from_name(name).ok_or_else(|| {
                let known: Vec<&str> = Template::ALL.iter().map(|t| t.name()).collect();
                format!("unknown template: {name} (available: {})", known.join(", "))
            })?;
            return Ok(template.plan());
        }

        let base = match &self.preset {
            Some(id) => {
                Database::open()?
                    .get_preset(&PresetId::from(id.as_str()))?
                    .ok_or_else(|| format!("preset not found: {id}"))?
                    .config
            }
            None => config.session_config(),
        };
        Ok(SessionBuilder::build(&self.timer.apply(base))?)
    }
}
