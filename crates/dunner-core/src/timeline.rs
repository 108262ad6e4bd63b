use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::escalation::{Level, PauseReason};
use crate::ids::InvoiceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    Escalated,
    Paused,
    Resumed,
    ReminderSent,
}

impl TimelineEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalated => "escalated",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
            Self::ReminderSent => "reminder_sent",
        }
    }
}

/// Deterministic event identifier. Derived from invoice + discriminator +
/// timestamp so a retried append of the same decision collapses to one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    pub fn derive(invoice_id: &InvoiceId, discriminator: &str, at: DateTime<Utc>) -> Self {
        Self(format!("{invoice_id}:{discriminator}:{}", at.timestamp()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the per-invoice audit trail. Immutable once written; display
/// order is timestamp-descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    event_id: EventId,
    invoice_id: InvoiceId,
    level: Level,
    kind: TimelineEventKind,
    channel: Option<Channel>,
    occurred_at: DateTime<Utc>,
    message: String,
    metadata: BTreeMap<String, String>,
}

impl TimelineEvent {
    pub fn escalated(
        invoice_id: InvoiceId,
        level: Level,
        days_overdue: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let discriminator = format!("escalated:{level}");
        Self {
            event_id: EventId::derive(&invoice_id, &discriminator, now),
            invoice_id,
            level,
            kind: TimelineEventKind::Escalated,
            channel: None,
            occurred_at: now,
            message: format!("escalated to {level} ({days_overdue} days overdue)"),
            metadata: BTreeMap::from([("days_overdue".into(), days_overdue.to_string())]),
        }
    }

    pub fn paused(
        invoice_id: InvoiceId,
        level: Level,
        reason: PauseReason,
        until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let discriminator = format!("paused:{}", reason.as_str());
        let mut metadata = BTreeMap::from([("reason".into(), reason.as_str().to_string())]);
        if let Some(until) = until {
            metadata.insert("pause_until".into(), until.to_rfc3339());
        }
        Self {
            event_id: EventId::derive(&invoice_id, &discriminator, now),
            invoice_id,
            level,
            kind: TimelineEventKind::Paused,
            channel: None,
            occurred_at: now,
            message: format!("collections paused: {}", reason.as_str()),
            metadata,
        }
    }

    pub fn resumed(invoice_id: InvoiceId, level: Level, reason: &str, now: DateTime<Utc>) -> Self {
        let discriminator = format!("resumed:{reason}");
        Self {
            event_id: EventId::derive(&invoice_id, &discriminator, now),
            invoice_id,
            level,
            kind: TimelineEventKind::Resumed,
            channel: None,
            occurred_at: now,
            message: format!("collections resumed: {reason}"),
            metadata: BTreeMap::from([("reason".into(), reason.to_string())]),
        }
    }

    pub fn reminder_sent(
        invoice_id: InvoiceId,
        level: Level,
        channel: Channel,
        provider_message_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let discriminator = format!("reminder:{level}:{channel}");
        Self {
            event_id: EventId::derive(&invoice_id, &discriminator, now),
            invoice_id,
            level,
            kind: TimelineEventKind::ReminderSent,
            channel: Some(channel),
            occurred_at: now,
            message: format!("{channel} reminder sent"),
            metadata: BTreeMap::from([
                ("outcome".into(), "sent".into()),
                ("provider_message_id".into(), provider_message_id.to_string()),
            ]),
        }
    }

    /// Failed deliveries stay in the timeline so the freelancer sees what
    /// was attempted, not a silent skip.
    pub fn reminder_failed(
        invoice_id: InvoiceId,
        level: Level,
        channel: Channel,
        error: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let discriminator = format!("reminder:{level}:{channel}");
        Self {
            event_id: EventId::derive(&invoice_id, &discriminator, now),
            invoice_id,
            level,
            kind: TimelineEventKind::ReminderSent,
            channel: Some(channel),
            occurred_at: now,
            message: format!("{channel} reminder could not be delivered"),
            metadata: BTreeMap::from([
                ("outcome".into(), "failed".into()),
                ("error".into(), error.to_string()),
            ]),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn invoice_id(&self) -> &InvoiceId {
        &self.invoice_id
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn kind(&self) -> TimelineEventKind {
        self.kind
    }

    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}
