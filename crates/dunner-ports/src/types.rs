use std::collections::HashMap;

use serde::Serialize;

use dunner_core::channel::Channel;
use dunner_core::contact::ClientContact;
use dunner_core::escalation::Level;
use dunner_core::ids::{FreelancerId, InvoiceId};

/// Payload handed to a channel adapter. Template selection and rendering are
/// provider concerns; the engine only supplies the facts.
#[derive(Debug, Clone)]
pub struct Reminder {
    pub invoice_id: InvoiceId,
    pub freelancer_id: FreelancerId,
    pub level: Level,
    pub reference: String,
    pub contact: ClientContact,
    pub amount_pence: i64,
    pub currency: String,
    pub days_overdue: i64,
    /// Principal + statutory interest + recovery cost, quoted from the
    /// `Final` level upward.
    pub total_owed_pence: Option<i64>,
}

/// Delivery metadata returned by channel adapters.
#[derive(Debug, Clone, Default)]
pub struct SendReceipt {
    pub provider_message_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Dedup key for the send ledger: one reminder per invoice per level per
/// channel for the escalation worker, per day-bucket per channel for the
/// day-based email sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SendKey {
    Level { level: Level, channel: Channel },
    DayBucket { day: u32, channel: Channel },
}

impl std::fmt::Display for SendKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level { level, channel } => write!(f, "level:{level}:{channel}"),
            Self::DayBucket { day, channel } => write!(f, "day:{day}:{channel}"),
        }
    }
}

/// Lifecycle of one row in the send ledger. `Failed` is the only state the
/// idempotency guard treats as retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Queued,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeUrgency {
    Standard,
    Urgent,
}

/// What one escalation run did; serialized into the cron response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub scanned: u32,
    pub escalated: u32,
    pub paused: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

/// What one verification sweep did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub scanned: u32,
    pub expired: u32,
    pub reminded_24h: u32,
    pub reminded_6h: u32,
    pub errors: Vec<String>,
}
