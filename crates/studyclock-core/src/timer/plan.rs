use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Study,
    Break,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Study => "study",
            PhaseKind::Break => "break",
        }
    }
}

impl std::str::FromStr for PhaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "study" => Ok(PhaseKind::Study),
            "break" => Ok(PhaseKind::Break),
            other => Err(format!("unknown phase kind '{other}'")),
        }
    }
}

/// One timed segment of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub duration_secs: u64,
    pub kind: PhaseKind,
    #[serde(default)]
    pub instructions: String,
}

impl Phase {
    pub fn study(name: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            kind: PhaseKind::Study,
            instructions: String::new(),
        }
    }

    pub fn rest(name: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            kind: PhaseKind::Break,
            instructions: String::new(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn is_break(&self) -> bool {
        self.kind == PhaseKind::Break
    }
}

/// Ordered, immutable sequence of phases.
///
/// Construction goes through [`SessionPlan::new`], which enforces:
/// - at least one phase,
/// - every phase lasts at least one second,
/// - phases alternate study/break starting with study,
/// - the summed duration fits in a `u64`.
///
/// Deserialization applies the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlan")]
pub struct SessionPlan {
    name: String,
    description: String,
    phases: Vec<Phase>,
}

#[derive(Deserialize)]
struct RawPlan {
    name: String,
    #[serde(default)]
    description: String,
    phases: Vec<Phase>,
}

impl TryFrom<RawPlan> for SessionPlan {
    type Error = SessionError;

    fn try_from(raw: RawPlan) -> Result<Self, Self::Error> {
        SessionPlan::new(raw.name, raw.description, raw.phases)
    }
}

impl SessionPlan {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        phases: Vec<Phase>,
    ) -> Result<Self, SessionError> {
        if phases.is_empty() {
            return Err(SessionError::InvalidPlan("plan has no phases".into()));
        }
        for (i, phase) in phases.iter().enumerate() {
            if phase.duration_secs == 0 {
                return Err(SessionError::InvalidPlan(format!(
                    "phase {i} ('{}') has zero duration",
                    phase.name
                )));
            }
            let expected = if i % 2 == 0 {
                PhaseKind::Study
            } else {
                PhaseKind::Break
            };
            if phases.len() > 1 && phase.kind != expected {
                return Err(SessionError::InvalidPlan(format!(
                    "phase {i} ('{}') is {} but {} was expected",
                    phase.name,
                    phase.kind.as_str(),
                    expected.as_str()
                )));
            }
        }
        let total = phases
            .iter()
            .try_fold(0u64, |acc, p| acc.checked_add(p.duration_secs));
        if total.is_none() {
            return Err(SessionError::InvalidPlan(
                "total duration does not fit in a 64-bit second count".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            description: description.into(),
            phases,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.phases.iter().map(|p| p.duration_secs).sum()
    }

    pub fn study_count(&self) -> usize {
        self.phases.iter().filter(|p| !p.is_break()).count()
    }

    /// Seconds contained in phases before `phase_index`.
    pub fn cumulative_secs(&self, phase_index: usize) -> u64 {
        self.phases
            .iter()
            .take(phase_index)
            .map(|p| p.duration_secs)
            .sum()
    }
}

/// Hand-authored technique plans that bypass the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Template {
    Pomodoro,
    DeepWork,
    FiftyTwoSeventeen,
}

impl Template {
    pub const ALL: [Template; 3] = [
        Template::Pomodoro,
        Template::DeepWork,
        Template::FiftyTwoSeventeen,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Template::Pomodoro => "pomodoro",
            Template::DeepWork => "deep-work",
            Template::FiftyTwoSeventeen => "52-17",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name || (name == "deep_work" && *t == Template::DeepWork))
    }

    pub fn plan(&self) -> SessionPlan {
        let (name, description, phases) = match self {
            Template::Pomodoro => {
                let mut phases = Vec::with_capacity(8);
                for round in 1..=4 {
                    phases.push(
                        Phase::study("Focus Time", 25 * 60)
                            .with_instructions(format!("Pomodoro {round} of 4. One task, no switching.")),
                    );
                    let rest = if round == 4 {
                        Phase::rest("Long Break", 15 * 60)
                            .with_instructions("Step away from the desk.")
                    } else {
                        Phase::rest("Short Break", 5 * 60)
                            .with_instructions("Stretch, drink water.")
                    };
                    phases.push(rest);
                }
                (
                    "Pomodoro",
                    "Four 25-minute focus blocks with short breaks and a long final break.",
                    phases,
                )
            }
            Template::DeepWork => (
                "Deep Work",
                "One long uninterrupted block followed by a real rest.",
                vec![
                    Phase::study("Deep Work", 90 * 60)
                        .with_instructions("Notifications off. Single hard problem."),
                    Phase::rest("Recovery", 20 * 60)
                        .with_instructions("No screens if you can manage it."),
                ],
            ),
            Template::FiftyTwoSeventeen => (
                "52/17",
                "52 minutes of work, 17 minutes of rest.",
                vec![
                    Phase::study("Focus Time", 52 * 60),
                    Phase::rest("Break Time", 17 * 60),
                ],
            ),
        };
        SessionPlan {
            name: name.into(),
            description: description.into(),
            phases,
        }
    }
}
