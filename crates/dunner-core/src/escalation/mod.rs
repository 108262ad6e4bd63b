pub mod level;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::InvoiceId;

pub use level::{Level, LevelPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    PaymentClaim,
    Dispute,
    Manual,
}

impl PauseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentClaim => "payment_claim",
            Self::Dispute => "dispute",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseState {
    pub reason: PauseReason,
    pub paused_at: DateTime<Utc>,
    /// `None` means paused indefinitely (manual/dispute pauses); the worker
    /// never auto-resumes those.
    pub until: Option<DateTime<Utc>>,
}

/// Merge-patch for a state record. Only set fields are written; `pause`
/// distinguishes "set" (`Some(Some(_))`), "clear" (`Some(None)`) and
/// "leave untouched" (`None`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    pub current_level: Option<Level>,
    pub last_escalated_at: Option<DateTime<Utc>>,
    pub pause: Option<Option<PauseState>>,
}

/// Per-invoice escalation record. Created lazily on the first worker visit
/// to an overdue invoice, updated via merge-patch, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationState {
    invoice_id: InvoiceId,
    current_level: Level,
    pause: Option<PauseState>,
    last_escalated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl EscalationState {
    pub fn seed(
        invoice_id: InvoiceId,
        days_overdue: i64,
        policy: &LevelPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            invoice_id,
            current_level: policy.seed_level(days_overdue),
            pause: None,
            last_escalated_at: None,
            created_at: now,
        }
    }

    /// Advance to a strictly higher level. The level never decreases over an
    /// invoice's lifetime and never moves while paused.
    pub fn escalate_to(
        &mut self,
        level: Level,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, DomainError> {
        if self.pause.is_some() {
            return Err(DomainError::EscalationPaused);
        }
        if level <= self.current_level {
            return Err(DomainError::WouldDeescalate);
        }
        self.current_level = level;
        self.last_escalated_at = Some(now);
        Ok(StatePatch {
            current_level: Some(level),
            last_escalated_at: Some(now),
            pause: None,
        })
    }

    pub fn pause(
        &mut self,
        reason: PauseReason,
        until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<StatePatch, DomainError> {
        if self.pause.is_some() {
            return Err(DomainError::AlreadyPaused);
        }
        let pause = PauseState {
            reason,
            paused_at: now,
            until,
        };
        self.pause = Some(pause.clone());
        Ok(StatePatch {
            pause: Some(Some(pause)),
            ..StatePatch::default()
        })
    }

    pub fn resume(&mut self) -> Result<StatePatch, DomainError> {
        if self.pause.is_none() {
            return Err(DomainError::NotPaused);
        }
        self.pause = None;
        Ok(StatePatch {
            pause: Some(None),
            ..StatePatch::default()
        })
    }

    /// True when a deadline-bounded pause has lapsed and the worker should
    /// auto-resume in the current pass.
    pub fn pause_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(&self.pause, Some(p) if p.until.is_some_and(|until| now > until))
    }

    /// Used by store adapters to realise a merge-patch.
    pub fn apply(&mut self, patch: &StatePatch) {
        if let Some(level) = patch.current_level {
            self.current_level = level;
        }
        if let Some(at) = patch.last_escalated_at {
            self.last_escalated_at = Some(at);
        }
        if let Some(pause) = &patch.pause {
            self.pause = pause.clone();
        }
    }

    pub fn invoice_id(&self) -> &InvoiceId {
        &self.invoice_id
    }

    pub fn current_level(&self) -> Level {
        self.current_level
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_some()
    }

    pub fn pause_state(&self) -> Option<&PauseState> {
        self.pause.as_ref()
    }

    pub fn last_escalated_at(&self) -> Option<DateTime<Utc>> {
        self.last_escalated_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
