use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dunner_core::channel::Channel;
use dunner_core::claim::PaymentClaim;
use dunner_core::config::AutomationConfig;
use dunner_core::contact::ClientContact;
use dunner_core::escalation::{EscalationState, StatePatch};
use dunner_core::ids::{ClaimId, FreelancerId, InvoiceId};
use dunner_core::invoice::Invoice;
use dunner_core::timeline::TimelineEvent;

use crate::error::{PortError, SendError};
use crate::types::{NudgeUrgency, Reminder, SendKey, SendReceipt};

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Invoices with status overdue or in_collections, oldest due date
    /// first, capped at `limit`.
    async fn find_overdue(&self, limit: u32) -> Result<Vec<Invoice>, PortError>;
    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, PortError>;
    async fn save(&self, invoice: &Invoice) -> Result<(), PortError>;
}

#[async_trait]
pub trait EscalationStateStore: Send + Sync {
    /// Conditional create: when a record for the invoice already exists the
    /// stored one wins, so overlapping runs converge on one state.
    async fn create_if_absent(&self, state: &EscalationState)
        -> Result<EscalationState, PortError>;
    async fn find_by_invoice(
        &self,
        invoice_id: &InvoiceId,
    ) -> Result<Option<EscalationState>, PortError>;
    /// Merge-patch; untouched fields keep their stored values.
    async fn update(&self, invoice_id: &InvoiceId, patch: &StatePatch) -> Result<(), PortError>;
}

#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Idempotent on `event_id`: re-appending the same event is a no-op.
    async fn append(&self, event: &TimelineEvent) -> Result<(), PortError>;
    /// Timestamp-descending, capped at `limit`.
    async fn list_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        limit: u32,
    ) -> Result<Vec<TimelineEvent>, PortError>;
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Fails with `PortError::Conflict` when the invoice already has a
    /// pending claim.
    async fn create(&self, claim: &PaymentClaim) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &ClaimId) -> Result<Option<PaymentClaim>, PortError>;
    async fn find_pending(&self) -> Result<Vec<PaymentClaim>, PortError>;
    async fn save(&self, claim: &PaymentClaim) -> Result<(), PortError>;
}

#[async_trait]
pub trait SendLedger: Send + Sync {
    /// Record a queued attempt; returns the attempt id for the follow-up
    /// `mark_*` call.
    async fn begin(
        &self,
        invoice_id: &InvoiceId,
        key: &SendKey,
        now: DateTime<Utc>,
    ) -> Result<i64, PortError>;
    async fn mark_sent(
        &self,
        attempt_id: i64,
        provider_message_id: Option<&str>,
    ) -> Result<(), PortError>;
    async fn mark_failed(&self, attempt_id: i64, error: &str) -> Result<(), PortError>;
    /// True when a queued or sent attempt exists for this key; failed
    /// attempts do not count and stay retryable.
    async fn has_active_or_succeeded(
        &self,
        invoice_id: &InvoiceId,
        key: &SendKey,
    ) -> Result<bool, PortError>;
}

#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, reminder: &Reminder) -> Result<SendReceipt, SendError>;
    fn channel(&self) -> Channel;
}

#[async_trait]
pub trait ConsentGate: Send + Sync {
    async fn is_channel_allowed(
        &self,
        freelancer_id: &FreelancerId,
        contact: &ClientContact,
        channel: Channel,
    ) -> Result<bool, PortError>;
}

#[async_trait]
pub trait AutomationConfigStore: Send + Sync {
    async fn find_for_freelancer(
        &self,
        freelancer_id: &FreelancerId,
    ) -> Result<Option<AutomationConfig>, PortError>;
}

/// Fire-and-forget; adapters must swallow their own failures.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn emit(&self, event: &str, properties: HashMap<String, String>);
}

#[async_trait]
pub trait FreelancerNotifier: Send + Sync {
    async fn claim_deadline_nudge(
        &self,
        claim: &PaymentClaim,
        urgency: NudgeUrgency,
    ) -> Result<(), SendError>;
}

/// Self-imposed delay after outbound provider sends, keeping a batch run
/// under downstream rate limits. Not applied to skipped invoices.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn after_send(&self);
}
