pub mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::ClaimStatus;
use crate::contact::ClientContact;
use crate::ids::{FreelancerId, InvoiceId};

pub use status::InvoiceStatus;

/// Whole days an invoice is past due; negative while not yet due.
pub fn days_overdue(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - due_date).num_days()
}

/// Read-mostly view of an invoice. The collections engine mutates it only to
/// move it into collections (bumping the attempt counter), mark it paid on a
/// verified claim, and mirror the claim status for the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    reference: String,
    freelancer_id: FreelancerId,
    contact: ClientContact,
    amount_pence: i64,
    currency: String,
    due_date: DateTime<Utc>,
    status: InvoiceStatus,
    collection_attempts: u32,
    claim_status: Option<ClaimStatus>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Invoice {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reference: String,
        freelancer_id: FreelancerId,
        contact: ClientContact,
        amount_pence: i64,
        currency: String,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            reference,
            freelancer_id,
            contact,
            amount_pence,
            currency,
            due_date,
            status: InvoiceStatus::Sent,
            collection_attempts: 0,
            claim_status: None,
            paid_at: None,
            created_at: now,
        }
    }

    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        days_overdue(self.due_date, now)
    }

    /// Set by the upstream due-date job; exists here so tests and fixtures
    /// can produce overdue invoices.
    pub fn mark_overdue(&mut self) {
        self.status = InvoiceStatus::Overdue;
    }

    /// Records one collection attempt and, on the first one, moves the
    /// invoice out of plain `Overdue`.
    pub fn mark_in_collections(&mut self) {
        if self.status == InvoiceStatus::Overdue {
            self.status = InvoiceStatus::InCollections;
        }
        self.collection_attempts += 1;
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) {
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(now);
    }

    pub fn set_claim_status(&mut self, status: Option<ClaimStatus>) {
        self.claim_status = status;
    }

    pub fn id(&self) -> &InvoiceId {
        &self.id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn freelancer_id(&self) -> &FreelancerId {
        &self.freelancer_id
    }

    pub fn contact(&self) -> &ClientContact {
        &self.contact
    }

    pub fn amount_pence(&self) -> i64 {
        self.amount_pence
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn collection_attempts(&self) -> u32 {
        self.collection_attempts
    }

    pub fn claim_status(&self) -> Option<ClaimStatus> {
        self.claim_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
