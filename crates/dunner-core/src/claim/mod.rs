use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{ClaimId, InvoiceId};

/// How long the freelancer has to verify or reject a client's "I have paid"
/// claim before it auto-expires. Deployment constant, not per-user.
pub const VERIFICATION_WINDOW_HOURS: i64 = 48;
pub const STANDARD_REMINDER_HOURS_BEFORE: i64 = 24;
pub const URGENT_REMINDER_HOURS_BEFORE: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    PendingVerification,
    Verified,
    Rejected,
    Expired,
}

impl ClaimStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::PendingVerification)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingVerification => "pending_verification",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// What the hourly sweep should do with a pending claim. Exactly one branch
/// applies per pass; the reminder branches are window-bounded so a standard
/// nudge can never follow an urgent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    Expire,
    RemindStandard,
    RemindUrgent,
    Wait,
}

/// A client-submitted payment claim awaiting freelancer verification.
/// While one is pending, escalation for the invoice is paused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentClaim {
    claim_id: ClaimId,
    invoice_id: InvoiceId,
    status: ClaimStatus,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    reminder_24h_sent: bool,
    reminder_6h_sent: bool,
}

impl PaymentClaim {
    pub fn new(invoice_id: InvoiceId, now: DateTime<Utc>) -> Self {
        Self {
            claim_id: ClaimId::new(),
            invoice_id,
            status: ClaimStatus::PendingVerification,
            created_at: now,
            resolved_at: None,
            reminder_24h_sent: false,
            reminder_6h_sent: false,
        }
    }

    pub fn verification_deadline(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(VERIFICATION_WINDOW_HOURS)
    }

    pub fn verify(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(ClaimStatus::Verified, now)
    }

    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(ClaimStatus::Rejected, now)
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(ClaimStatus::Expired, now)
    }

    fn transition(&mut self, to: ClaimStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::ClaimAlreadyResolved);
        }
        self.status = to;
        self.resolved_at = Some(now);
        Ok(())
    }

    pub fn sweep_action(&self, now: DateTime<Utc>) -> SweepAction {
        if self.status.is_terminal() {
            return SweepAction::Wait;
        }
        let deadline = self.verification_deadline();
        if now >= deadline {
            SweepAction::Expire
        } else if now >= deadline - Duration::hours(URGENT_REMINDER_HOURS_BEFORE) {
            if self.reminder_6h_sent {
                SweepAction::Wait
            } else {
                SweepAction::RemindUrgent
            }
        } else if now >= deadline - Duration::hours(STANDARD_REMINDER_HOURS_BEFORE) {
            if self.reminder_24h_sent {
                SweepAction::Wait
            } else {
                SweepAction::RemindStandard
            }
        } else {
            SweepAction::Wait
        }
    }

    pub fn record_standard_reminder(&mut self) {
        self.reminder_24h_sent = true;
    }

    pub fn record_urgent_reminder(&mut self) {
        self.reminder_6h_sent = true;
    }

    pub fn claim_id(&self) -> &ClaimId {
        &self.claim_id
    }

    pub fn invoice_id(&self) -> &InvoiceId {
        &self.invoice_id
    }

    pub fn status(&self) -> ClaimStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn reminder_24h_sent(&self) -> bool {
        self.reminder_24h_sent
    }

    pub fn reminder_6h_sent(&self) -> bool {
        self.reminder_6h_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn claim_created_at(s: &str) -> PaymentClaim {
        PaymentClaim::new(InvoiceId::new(), ts(s))
    }

    #[test]
    fn deadline_is_48h_after_creation() {
        let claim = claim_created_at("2025-03-01T10:00:00Z");
        assert_eq!(claim.verification_deadline(), ts("2025-03-03T10:00:00Z"));
    }

    #[test]
    fn verify_resolves_claim() {
        let mut claim = claim_created_at("2025-03-01T10:00:00Z");
        claim.verify(ts("2025-03-02T10:00:00Z")).unwrap();
        assert_eq!(claim.status(), ClaimStatus::Verified);
        assert_eq!(claim.resolved_at(), Some(ts("2025-03-02T10:00:00Z")));
    }

    #[test]
    fn terminal_claim_rejects_further_transitions() {
        let mut claim = claim_created_at("2025-03-01T10:00:00Z");
        claim.reject(ts("2025-03-02T10:00:00Z")).unwrap();

        assert_eq!(
            claim.verify(ts("2025-03-02T11:00:00Z")),
            Err(DomainError::ClaimAlreadyResolved)
        );
        assert_eq!(
            claim.expire(ts("2025-03-02T11:00:00Z")),
            Err(DomainError::ClaimAlreadyResolved)
        );
        assert_eq!(claim.status(), ClaimStatus::Rejected);
    }

    #[test]
    fn sweep_waits_before_reminder_window() {
        let claim = claim_created_at("2025-03-01T10:00:00Z");
        // 12h in — nothing to do yet
        assert_eq!(claim.sweep_action(ts("2025-03-01T22:00:00Z")), SweepAction::Wait);
    }

    #[test]
    fn sweep_standard_reminder_between_24h_and_42h() {
        let mut claim = claim_created_at("2025-03-01T10:00:00Z");
        // 25h in: inside [T+24h, T+42h)
        assert_eq!(
            claim.sweep_action(ts("2025-03-02T11:00:00Z")),
            SweepAction::RemindStandard
        );

        claim.record_standard_reminder();
        assert_eq!(claim.sweep_action(ts("2025-03-02T12:00:00Z")), SweepAction::Wait);
    }

    #[test]
    fn sweep_urgent_reminder_in_final_six_hours() {
        // created 47h ago, no reminders sent: the urgent nudge fires alone —
        // the standard window has already passed
        let mut claim = claim_created_at("2025-03-01T10:00:00Z");
        assert_eq!(
            claim.sweep_action(ts("2025-03-03T09:00:00Z")),
            SweepAction::RemindUrgent
        );

        claim.record_urgent_reminder();
        // urgent already sent and standard window over: wait for expiry
        assert_eq!(claim.sweep_action(ts("2025-03-03T09:30:00Z")), SweepAction::Wait);
    }

    #[test]
    fn sweep_expires_at_deadline() {
        let claim = claim_created_at("2025-03-01T10:00:00Z");
        assert_eq!(claim.sweep_action(ts("2025-03-03T10:00:00Z")), SweepAction::Expire);
        assert_eq!(claim.sweep_action(ts("2025-03-05T10:00:00Z")), SweepAction::Expire);
    }

    #[test]
    fn sweep_never_pairs_reminder_with_expiry() {
        let claim = claim_created_at("2025-03-01T10:00:00Z");
        // exactly at the deadline with no reminders sent: expire wins
        assert_eq!(claim.sweep_action(ts("2025-03-03T10:00:00Z")), SweepAction::Expire);
    }

    #[test]
    fn resolved_claim_sweeps_to_wait() {
        let mut claim = claim_created_at("2025-03-01T10:00:00Z");
        claim.verify(ts("2025-03-01T12:00:00Z")).unwrap();
        assert_eq!(claim.sweep_action(ts("2025-03-05T10:00:00Z")), SweepAction::Wait);
    }
}
