use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dunner_core::channel::Channel;
use dunner_core::config::{AutomationConfig, ChannelPlan};
use dunner_core::escalation::Level;
use dunner_core::interest::{self, InterestParams};
use dunner_core::invoice::Invoice;
use dunner_core::timeline::TimelineEvent;
use dunner_ports::outbound::{AnalyticsSink, ChannelSender, ConsentGate, SendLedger, TimelineStore};
use dunner_ports::types::{Reminder, SendKey};

use crate::guard::IdempotencyGuard;

/// Per-invoice fan-out result. `sent + failed` is the number of provider
/// calls actually made; the worker throttles only when it is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl DispatchOutcome {
    pub fn attempted(&self) -> u32 {
        self.sent + self.failed
    }
}

/// Seam between the worker and the channel fan-out, so the batch loop can be
/// tested without provider adapters.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(
        &self,
        invoice: &Invoice,
        config: &AutomationConfig,
        level: Level,
        days_overdue: i64,
        now: DateTime<Utc>,
    ) -> DispatchOutcome;
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub plan: ChannelPlan,
    /// Bank of England base rate used when quoting statutory interest.
    pub base_rate_pct: f64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            plan: ChannelPlan::default(),
            base_rate_pct: 5.25,
        }
    }
}

/// Best-effort fan-out over the channel adapters. A stalled SMS provider
/// must never block email delivery or the level transition, so every failure
/// is recorded and swallowed here.
pub struct ChannelDispatcher<T, L, G, A>
where
    T: TimelineStore,
    L: SendLedger,
    G: ConsentGate,
    A: AnalyticsSink,
{
    timeline: T,
    guard: IdempotencyGuard<L>,
    consent: G,
    analytics: A,
    senders: Vec<Arc<dyn ChannelSender>>,
    config: DispatcherConfig,
}

impl<T, L, G, A> ChannelDispatcher<T, L, G, A>
where
    T: TimelineStore,
    L: SendLedger,
    G: ConsentGate,
    A: AnalyticsSink,
{
    pub fn new(
        timeline: T,
        guard: IdempotencyGuard<L>,
        consent: G,
        analytics: A,
        senders: Vec<Arc<dyn ChannelSender>>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            timeline,
            guard,
            consent,
            analytics,
            senders,
            config,
        }
    }

    /// Channels that need data the client record does not have are skipped;
    /// the others proceed.
    fn data_eligible(invoice: &Invoice, channel: Channel) -> bool {
        match channel {
            Channel::Email => true,
            Channel::Sms | Channel::Voice => invoice.contact().phone.is_some(),
            Channel::Letter => invoice.contact().address.is_some(),
        }
    }

    fn build_reminder(&self, invoice: &Invoice, level: Level, days_overdue: i64, now: DateTime<Utc>) -> Reminder {
        // From the final notice onward the reminder quotes the full statutory
        // amount, not just the principal.
        let total_owed_pence = if level >= Level::Final {
            interest::calculate(&InterestParams {
                principal_pence: invoice.amount_pence(),
                due_date: invoice.due_date(),
                as_of: now,
                base_rate_pct: self.config.base_rate_pct,
            })
            .ok()
            .map(|b| b.total_owed_pence)
        } else {
            None
        };

        Reminder {
            invoice_id: invoice.id().clone(),
            freelancer_id: invoice.freelancer_id().clone(),
            level,
            reference: invoice.reference().to_string(),
            contact: invoice.contact().clone(),
            amount_pence: invoice.amount_pence(),
            currency: invoice.currency().to_string(),
            days_overdue,
            total_owed_pence,
        }
    }

    async fn send_one(
        &self,
        sender: &dyn ChannelSender,
        invoice: &Invoice,
        reminder: &Reminder,
        level: Level,
        now: DateTime<Utc>,
        outcome: &mut DispatchOutcome,
    ) {
        let channel = sender.channel();
        let key = SendKey::Level { level, channel };

        match self.guard.has_been_sent(invoice.id(), &key).await {
            Ok(true) => {
                outcome.skipped += 1;
                return;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(invoice_id = %invoice.id(), %channel, error = %err, "send ledger unavailable, skipping channel");
                outcome.skipped += 1;
                return;
            }
        }

        let attempt_id = match self.guard.begin_attempt(invoice.id(), &key, now).await {
            Ok(id) => id,
            Err(err) => {
                // Without a ledger row we cannot dedup a retry, so do not send.
                tracing::warn!(invoice_id = %invoice.id(), %channel, error = %err, "could not record send attempt, skipping channel");
                outcome.skipped += 1;
                return;
            }
        };

        match sender.send(reminder).await {
            Ok(receipt) => {
                let provider_id = receipt.provider_message_id.as_deref().unwrap_or("");
                if let Err(err) = self.guard.complete(attempt_id, receipt.provider_message_id.as_deref()).await {
                    tracing::warn!(invoice_id = %invoice.id(), %channel, error = %err, "failed to mark attempt sent");
                }

                let mut event = TimelineEvent::reminder_sent(
                    invoice.id().clone(),
                    level,
                    channel,
                    provider_id,
                    now,
                );
                if let Some(total) = reminder.total_owed_pence {
                    event = event.with_metadata("total_owed_pence", total.to_string());
                }
                if let Err(err) = self.timeline.append(&event).await {
                    tracing::warn!(invoice_id = %invoice.id(), %channel, error = %err, "failed to append reminder event");
                }

                self.analytics
                    .emit(
                        "collections.reminder_sent",
                        HashMap::from([
                            ("invoice_id".into(), invoice.id().to_string()),
                            ("channel".into(), channel.to_string()),
                            ("level".into(), level.to_string()),
                        ]),
                    )
                    .await;
                outcome.sent += 1;
            }
            Err(err) => {
                tracing::warn!(invoice_id = %invoice.id(), %channel, error = %err, "reminder delivery failed");
                if let Err(mark_err) = self.guard.fail(attempt_id, &err.to_string()).await {
                    tracing::warn!(invoice_id = %invoice.id(), %channel, error = %mark_err, "failed to mark attempt failed");
                }
                let event = TimelineEvent::reminder_failed(
                    invoice.id().clone(),
                    level,
                    channel,
                    &err.to_string(),
                    now,
                );
                if let Err(append_err) = self.timeline.append(&event).await {
                    tracing::warn!(invoice_id = %invoice.id(), %channel, error = %append_err, "failed to append failure event");
                }
                outcome.failed += 1;
            }
        }
    }
}

#[async_trait]
impl<T, L, G, A> Dispatch for ChannelDispatcher<T, L, G, A>
where
    T: TimelineStore,
    L: SendLedger,
    G: ConsentGate,
    A: AnalyticsSink,
{
    async fn dispatch(
        &self,
        invoice: &Invoice,
        config: &AutomationConfig,
        level: Level,
        days_overdue: i64,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let eligible = self.config.plan.channels_for(level);
        let reminder = self.build_reminder(invoice, level, days_overdue, now);

        for sender in &self.senders {
            let channel = sender.channel();
            if !eligible.contains(&channel) {
                continue;
            }
            if !config.channel_enabled(channel) {
                outcome.skipped += 1;
                continue;
            }
            if !Self::data_eligible(invoice, channel) {
                tracing::debug!(invoice_id = %invoice.id(), %channel, "missing contact data, skipping channel");
                outcome.skipped += 1;
                continue;
            }
            match self
                .consent
                .is_channel_allowed(invoice.freelancer_id(), invoice.contact(), channel)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    outcome.skipped += 1;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(invoice_id = %invoice.id(), %channel, error = %err, "consent check failed, skipping channel");
                    outcome.skipped += 1;
                    continue;
                }
            }

            self.send_one(sender.as_ref(), invoice, &reminder, level, now, &mut outcome)
                .await;
        }

        outcome
    }
}
