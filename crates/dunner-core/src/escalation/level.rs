use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Collections-intensity stage. Variant order is the escalation order; the
/// derived `Ord` is what "never de-escalate" is checked against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Pending,
    Gentle,
    Firm,
    Final,
    Agency,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Gentle => "gentle",
            Self::Firm => "firm",
            Self::Final => "final",
            Self::Agency => "agency",
        }
    }

    /// The level immediately below, saturating at `Pending`.
    pub fn predecessor(&self) -> Level {
        match self {
            Self::Pending | Self::Gentle => Self::Pending,
            Self::Firm => Self::Gentle,
            Self::Final => Self::Firm,
            Self::Agency => Self::Final,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step function from days-overdue to target level, over an ascending
/// day-threshold table. Thresholds are deployment configuration; the default
/// table matches the standard collections timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelPolicy {
    thresholds: Vec<(i64, Level)>,
}

impl LevelPolicy {
    pub fn new(thresholds: Vec<(i64, Level)>) -> Result<Self, DomainError> {
        let starts_at_zero = matches!(thresholds.first(), Some((0, _)));
        let ascending = thresholds
            .windows(2)
            .all(|w| w[0].0 < w[1].0 && w[0].1 < w[1].1);
        if !starts_at_zero || !ascending {
            return Err(DomainError::InvalidLevelTable);
        }
        Ok(Self { thresholds })
    }

    /// Target level for an invoice this many days overdue. Negative days
    /// (not yet due) map to the lowest level.
    pub fn level_for(&self, days_overdue: i64) -> Level {
        self.thresholds
            .iter()
            .take_while(|(from_day, _)| *from_day <= days_overdue)
            .last()
            .map(|(_, level)| *level)
            .unwrap_or(Level::Pending)
    }

    /// True iff the target level is strictly above the current one. Never
    /// signals a downgrade.
    pub fn should_escalate(&self, current: Level, days_overdue: i64) -> bool {
        self.level_for(days_overdue) > current
    }

    /// Level a newly-tracked invoice's state record starts at: one below the
    /// target, so the first worker visit performs exactly one escalation.
    pub fn seed_level(&self, days_overdue: i64) -> Level {
        self.level_for(days_overdue).predecessor()
    }
}

impl Default for LevelPolicy {
    fn default() -> Self {
        Self {
            thresholds: vec![
                (0, Level::Pending),
                (5, Level::Gentle),
                (15, Level::Firm),
                (30, Level::Final),
                (60, Level::Agency),
            ],
        }
    }
}
