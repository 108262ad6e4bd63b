use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dunner_core::config::AutomationConfig;
use dunner_core::escalation::{EscalationState, LevelPolicy};
use dunner_core::invoice::Invoice;
use dunner_core::timeline::TimelineEvent;
use dunner_ports::error::PortError;
use dunner_ports::inbound::EscalationRunner;
use dunner_ports::outbound::{
    AutomationConfigStore, EscalationStateStore, InvoiceStore, Throttle, TimelineStore,
};
use dunner_ports::types::RunSummary;

use crate::dispatcher::Dispatch;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Caps one run's work so it stays inside the scheduler's execution
    /// budget and bounds downstream provider traffic.
    pub batch_size: u32,
    pub policy: LevelPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            policy: LevelPolicy::default(),
        }
    }
}

/// The batch loop: scans overdue invoices, applies the level policy, drives
/// state transitions and hands off to the channel dispatcher. Invoked by
/// cron with at-least-once semantics — everything it does must tolerate a
/// re-run.
pub struct EscalationWorker<I, S, T, C, D, TH>
where
    I: InvoiceStore,
    S: EscalationStateStore,
    T: TimelineStore,
    C: AutomationConfigStore,
    D: Dispatch,
    TH: Throttle,
{
    invoices: I,
    states: S,
    timeline: T,
    configs: C,
    dispatcher: D,
    throttle: TH,
    config: WorkerConfig,
}

impl<I, S, T, C, D, TH> EscalationWorker<I, S, T, C, D, TH>
where
    I: InvoiceStore,
    S: EscalationStateStore,
    T: TimelineStore,
    C: AutomationConfigStore,
    D: Dispatch,
    TH: Throttle,
{
    pub fn new(
        invoices: I,
        states: S,
        timeline: T,
        configs: C,
        dispatcher: D,
        throttle: TH,
        config: WorkerConfig,
    ) -> Self {
        Self {
            invoices,
            states,
            timeline,
            configs,
            dispatcher,
            throttle,
            config,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, PortError> {
        // Only a failure of this initial query aborts the run.
        let invoices = self.invoices.find_overdue(self.config.batch_size).await?;

        let mut summary = RunSummary::default();
        for invoice in invoices {
            summary.scanned += 1;
            if let Err(err) = self.process_invoice(&invoice, now, &mut summary).await {
                tracing::warn!(invoice_id = %invoice.id(), error = %err, "invoice processing failed");
                summary.errors.push(format!("{}: {err}", invoice.id()));
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            escalated = summary.escalated,
            paused = summary.paused,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "escalation run finished"
        );
        Ok(summary)
    }

    async fn process_invoice(
        &self,
        invoice: &Invoice,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<(), AppError> {
        let days_overdue = invoice.days_overdue(now);
        if days_overdue < 0 {
            // Shouldn't appear in an overdue scan; treat as a skip, not a crash.
            summary.skipped += 1;
            return Ok(());
        }

        let seeded =
            EscalationState::seed(invoice.id().clone(), days_overdue, &self.config.policy, now);
        let mut state = self.states.create_if_absent(&seeded).await?;

        if state.is_paused() {
            if !state.pause_expired(now) {
                summary.paused += 1;
                return Ok(());
            }
            // Verification deadline passed without action: resume and keep
            // evaluating in the same pass.
            let patch = state.resume()?;
            self.states.update(invoice.id(), &patch).await?;
            self.timeline
                .append(&TimelineEvent::resumed(
                    invoice.id().clone(),
                    state.current_level(),
                    "auto_resume_deadline_passed",
                    now,
                ))
                .await?;
        }

        let config = self
            .configs
            .find_for_freelancer(invoice.freelancer_id())
            .await?
            .unwrap_or_else(|| {
                AutomationConfig::conservative_default(invoice.freelancer_id().clone())
            });
        if !config.enabled {
            summary.skipped += 1;
            return Ok(());
        }

        if !self
            .config
            .policy
            .should_escalate(state.current_level(), days_overdue)
        {
            summary.skipped += 1;
            return Ok(());
        }
        let target = self.config.policy.level_for(days_overdue);

        // Order matters: state update, then audit trail, then side effects.
        // A dispatch failure never rolls the level back.
        let patch = state.escalate_to(target, now)?;
        self.states.update(invoice.id(), &patch).await?;

        let mut invoice = invoice.clone();
        invoice.mark_in_collections();
        self.invoices.save(&invoice).await?;

        self.timeline
            .append(&TimelineEvent::escalated(
                invoice.id().clone(),
                target,
                days_overdue,
                now,
            ))
            .await?;

        let outcome = self
            .dispatcher
            .dispatch(&invoice, &config, target, days_overdue, now)
            .await;
        summary.escalated += 1;

        if outcome.attempted() > 0 {
            self.throttle.after_send().await;
        }
        Ok(())
    }
}

#[async_trait]
impl<I, S, T, C, D, TH> EscalationRunner for EscalationWorker<I, S, T, C, D, TH>
where
    I: InvoiceStore,
    S: EscalationStateStore,
    T: TimelineStore,
    C: AutomationConfigStore,
    D: Dispatch,
    TH: Throttle,
{
    async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, PortError> {
        EscalationWorker::run(self, now).await
    }
}
