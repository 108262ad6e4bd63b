use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dunner_core::claim::{ClaimStatus, PaymentClaim, SweepAction};
use dunner_core::config::AutomationConfig;
use dunner_core::error::DomainError;
use dunner_core::escalation::{EscalationState, LevelPolicy, PauseReason};
use dunner_core::ids::{ClaimId, InvoiceId};
use dunner_core::invoice::Invoice;
use dunner_core::timeline::TimelineEvent;
use dunner_ports::error::PortError;
use dunner_ports::inbound::VerificationSweeper;
use dunner_ports::outbound::{
    AutomationConfigStore, ClaimStore, EscalationStateStore, FreelancerNotifier, InvoiceStore,
    TimelineStore,
};
use dunner_ports::types::{NudgeUrgency, SweepSummary};

use crate::error::AppError;

/// Reacts to payment-claim lifecycle events and runs the hourly deadline
/// sweep. `pause_escalation` and `resume_escalation` are the only mutations
/// it performs on escalation state, and each one appends a timeline event.
pub struct VerificationService<CS, S, T, I, C, N>
where
    CS: ClaimStore,
    S: EscalationStateStore,
    T: TimelineStore,
    I: InvoiceStore,
    C: AutomationConfigStore,
    N: FreelancerNotifier,
{
    claims: CS,
    states: S,
    timeline: T,
    invoices: I,
    configs: C,
    notifier: N,
    policy: LevelPolicy,
}

impl<CS, S, T, I, C, N> VerificationService<CS, S, T, I, C, N>
where
    CS: ClaimStore,
    S: EscalationStateStore,
    T: TimelineStore,
    I: InvoiceStore,
    C: AutomationConfigStore,
    N: FreelancerNotifier,
{
    pub fn new(
        claims: CS,
        states: S,
        timeline: T,
        invoices: I,
        configs: C,
        notifier: N,
        policy: LevelPolicy,
    ) -> Self {
        Self {
            claims,
            states,
            timeline,
            invoices,
            configs,
            notifier,
            policy,
        }
    }

    /// Client says "I've paid": record the claim and suspend escalation
    /// until the verification deadline. A second claim while one is pending
    /// is rejected, never queued.
    pub async fn file_claim(
        &self,
        invoice_id: &InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<PaymentClaim, AppError> {
        let mut invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or(AppError::Port(PortError::NotFound))?;

        let claim = PaymentClaim::new(invoice_id.clone(), now);
        self.claims.create(&claim).await?;

        let config = self
            .configs
            .find_for_freelancer(invoice.freelancer_id())
            .await?
            .unwrap_or_else(|| {
                AutomationConfig::conservative_default(invoice.freelancer_id().clone())
            });
        if config.pause_on_claim {
            self.pause_escalation(&invoice, Some(claim.verification_deadline()), now)
                .await?;
        }

        invoice.set_claim_status(Some(ClaimStatus::PendingVerification));
        self.invoices.save(&invoice).await?;

        Ok(claim)
    }

    /// Freelancer confirms the money arrived: claim and invoice are settled.
    pub async fn verify_claim(&self, claim_id: &ClaimId, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut claim = self
            .claims
            .find_by_id(claim_id)
            .await?
            .ok_or(AppError::Port(PortError::NotFound))?;
        claim.verify(now)?;
        self.claims.save(&claim).await?;

        let mut invoice = self
            .invoices
            .find_by_id(claim.invoice_id())
            .await?
            .ok_or(AppError::Port(PortError::NotFound))?;
        invoice.mark_paid(now);
        invoice.set_claim_status(Some(ClaimStatus::Verified));
        self.invoices.save(&invoice).await?;
        Ok(())
    }

    /// Freelancer says no payment arrived: escalation picks up where it
    /// left off.
    pub async fn reject_claim(&self, claim_id: &ClaimId, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut claim = self
            .claims
            .find_by_id(claim_id)
            .await?
            .ok_or(AppError::Port(PortError::NotFound))?;
        claim.reject(now)?;
        self.claims.save(&claim).await?;

        self.resume_escalation(claim.invoice_id(), "claim_rejected", now)
            .await?;

        if let Some(mut invoice) = self.invoices.find_by_id(claim.invoice_id()).await? {
            invoice.set_claim_status(Some(ClaimStatus::Rejected));
            self.invoices.save(&invoice).await?;
        }
        Ok(())
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, PortError> {
        let pending = self.claims.find_pending().await?;

        let mut summary = SweepSummary::default();
        for claim in pending {
            summary.scanned += 1;
            if let Err(err) = self.sweep_claim(claim.clone(), now, &mut summary).await {
                tracing::warn!(claim_id = %claim.claim_id(), error = %err, "claim sweep failed");
                summary.errors.push(format!("{}: {err}", claim.claim_id()));
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            expired = summary.expired,
            reminded_24h = summary.reminded_24h,
            reminded_6h = summary.reminded_6h,
            errors = summary.errors.len(),
            "verification sweep finished"
        );
        Ok(summary)
    }

    async fn sweep_claim(
        &self,
        mut claim: PaymentClaim,
        now: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) -> Result<(), AppError> {
        match claim.sweep_action(now) {
            SweepAction::Expire => {
                claim.expire(now)?;
                self.claims.save(&claim).await?;
                self.resume_escalation(claim.invoice_id(), "deadline_expired", now)
                    .await?;
                if let Some(mut invoice) = self.invoices.find_by_id(claim.invoice_id()).await? {
                    invoice.set_claim_status(Some(ClaimStatus::Expired));
                    self.invoices.save(&invoice).await?;
                }
                summary.expired += 1;
            }
            SweepAction::RemindStandard => {
                // Flag is only set once the nudge actually went out, so a
                // failed notification is retried on the next sweep.
                self.notifier
                    .claim_deadline_nudge(&claim, NudgeUrgency::Standard)
                    .await?;
                claim.record_standard_reminder();
                self.claims.save(&claim).await?;
                summary.reminded_24h += 1;
            }
            SweepAction::RemindUrgent => {
                self.notifier
                    .claim_deadline_nudge(&claim, NudgeUrgency::Urgent)
                    .await?;
                claim.record_urgent_reminder();
                self.claims.save(&claim).await?;
                summary.reminded_6h += 1;
            }
            SweepAction::Wait => {}
        }
        Ok(())
    }

    async fn pause_escalation(
        &self,
        invoice: &Invoice,
        until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let seeded = EscalationState::seed(
            invoice.id().clone(),
            invoice.days_overdue(now),
            &self.policy,
            now,
        );
        let mut state = self.states.create_if_absent(&seeded).await?;

        match state.pause(PauseReason::PaymentClaim, until, now) {
            Ok(patch) => {
                self.states.update(invoice.id(), &patch).await?;
                self.timeline
                    .append(&TimelineEvent::paused(
                        invoice.id().clone(),
                        state.current_level(),
                        PauseReason::PaymentClaim,
                        until,
                        now,
                    ))
                    .await?;
                Ok(())
            }
            // Escalation is already suspended (e.g. a manual pause); the
            // claim still stands.
            Err(DomainError::AlreadyPaused) => {
                tracing::debug!(invoice_id = %invoice.id(), "escalation already paused");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn resume_escalation(
        &self,
        invoice_id: &InvoiceId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let Some(mut state) = self.states.find_by_invoice(invoice_id).await? else {
            tracing::debug!(invoice_id = %invoice_id, "no escalation state to resume");
            return Ok(());
        };

        match state.resume() {
            Ok(patch) => {
                self.states.update(invoice_id, &patch).await?;
                self.timeline
                    .append(&TimelineEvent::resumed(
                        invoice_id.clone(),
                        state.current_level(),
                        reason,
                        now,
                    ))
                    .await?;
                Ok(())
            }
            // The worker's auto-resume may have won the race; nothing to do.
            Err(DomainError::NotPaused) => {
                tracing::debug!(invoice_id = %invoice_id, "escalation was not paused");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl<CS, S, T, I, C, N> VerificationSweeper for VerificationService<CS, S, T, I, C, N>
where
    CS: ClaimStore,
    S: EscalationStateStore,
    T: TimelineStore,
    I: InvoiceStore,
    C: AutomationConfigStore,
    N: FreelancerNotifier,
{
    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, PortError> {
        VerificationService::sweep(self, now).await
    }
}
