use std::collections::HashMap;

use async_trait::async_trait;

use dunner_core::channel::Channel;
use dunner_ports::error::SendError;
use dunner_ports::outbound::ChannelSender;
use dunner_ports::types::{Reminder, SendReceipt};

/// Stand-in for the provider adapters (SendGrid, Twilio, Lob) in local runs:
/// writes the reminder to the log and reports success. Real deployments
/// register one `ChannelSender` per provider integration instead.
pub struct LogSender {
    channel: Channel,
    counter: std::sync::atomic::AtomicU64,
}

impl LogSender {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            counter: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ChannelSender for LogSender {
    async fn send(&self, reminder: &Reminder) -> Result<SendReceipt, SendError> {
        let seq = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        tracing::info!(
            channel = %self.channel,
            invoice_id = %reminder.invoice_id,
            reference = %reminder.reference,
            level = %reminder.level,
            days_overdue = reminder.days_overdue,
            amount_pence = reminder.amount_pence,
            total_owed_pence = ?reminder.total_owed_pence,
            "collection reminder (log sender)"
        );
        Ok(SendReceipt {
            provider_message_id: Some(format!("log-{}-{seq}", self.channel)),
            metadata: HashMap::new(),
        })
    }

    fn channel(&self) -> Channel {
        self.channel
    }
}
