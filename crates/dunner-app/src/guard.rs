use chrono::{DateTime, Utc};

use dunner_core::ids::InvoiceId;
use dunner_ports::outbound::SendLedger;
use dunner_ports::types::SendKey;

use crate::error::AppError;

/// The single mechanism preventing duplicate client-facing reminders across
/// repeated or retried worker invocations (the trigger is at-least-once).
/// A queued or sent attempt blocks a resend; a failed attempt is retryable.
pub struct IdempotencyGuard<L>
where
    L: SendLedger,
{
    ledger: L,
}

impl<L> IdempotencyGuard<L>
where
    L: SendLedger,
{
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub async fn has_been_sent(
        &self,
        invoice_id: &InvoiceId,
        key: &SendKey,
    ) -> Result<bool, AppError> {
        Ok(self.ledger.has_active_or_succeeded(invoice_id, key).await?)
    }

    pub async fn begin_attempt(
        &self,
        invoice_id: &InvoiceId,
        key: &SendKey,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        Ok(self.ledger.begin(invoice_id, key, now).await?)
    }

    pub async fn complete(
        &self,
        attempt_id: i64,
        provider_message_id: Option<&str>,
    ) -> Result<(), AppError> {
        Ok(self.ledger.mark_sent(attempt_id, provider_message_id).await?)
    }

    pub async fn fail(&self, attempt_id: i64, error: &str) -> Result<(), AppError> {
        Ok(self.ledger.mark_failed(attempt_id, error).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dunner_core::channel::Channel;
    use dunner_core::escalation::Level;
    use dunner_ports::error::PortError;
    use dunner_ports::types::AttemptStatus;
    use std::sync::Mutex;

    struct LedgerRow {
        id: i64,
        invoice_id: InvoiceId,
        key: String,
        status: AttemptStatus,
    }

    #[derive(Default)]
    struct MockLedger {
        rows: Mutex<Vec<LedgerRow>>,
    }

    #[async_trait]
    impl SendLedger for MockLedger {
        async fn begin(
            &self,
            invoice_id: &InvoiceId,
            key: &SendKey,
            _now: DateTime<Utc>,
        ) -> Result<i64, PortError> {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as i64 + 1;
            rows.push(LedgerRow {
                id,
                invoice_id: invoice_id.clone(),
                key: key.to_string(),
                status: AttemptStatus::Queued,
            });
            Ok(id)
        }

        async fn mark_sent(
            &self,
            attempt_id: i64,
            _provider_message_id: Option<&str>,
        ) -> Result<(), PortError> {
            let mut rows = self.rows.lock().unwrap();
            rows.iter_mut()
                .find(|r| r.id == attempt_id)
                .ok_or(PortError::NotFound)?
                .status = AttemptStatus::Sent;
            Ok(())
        }

        async fn mark_failed(&self, attempt_id: i64, _error: &str) -> Result<(), PortError> {
            let mut rows = self.rows.lock().unwrap();
            rows.iter_mut()
                .find(|r| r.id == attempt_id)
                .ok_or(PortError::NotFound)?
                .status = AttemptStatus::Failed;
            Ok(())
        }

        async fn has_active_or_succeeded(
            &self,
            invoice_id: &InvoiceId,
            key: &SendKey,
        ) -> Result<bool, PortError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().any(|r| {
                &r.invoice_id == invoice_id
                    && r.key == key.to_string()
                    && r.status != AttemptStatus::Failed
            }))
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn key() -> SendKey {
        SendKey::Level {
            level: Level::Firm,
            channel: Channel::Email,
        }
    }

    #[tokio::test]
    async fn fresh_key_has_not_been_sent() {
        let guard = IdempotencyGuard::new(MockLedger::default());
        let sent = guard.has_been_sent(&InvoiceId::new(), &key()).await.unwrap();
        assert!(!sent);
    }

    #[tokio::test]
    async fn queued_attempt_blocks_resend() {
        let guard = IdempotencyGuard::new(MockLedger::default());
        let invoice_id = InvoiceId::new();

        guard
            .begin_attempt(&invoice_id, &key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();

        assert!(guard.has_been_sent(&invoice_id, &key()).await.unwrap());
    }

    #[tokio::test]
    async fn sent_attempt_blocks_resend() {
        let guard = IdempotencyGuard::new(MockLedger::default());
        let invoice_id = InvoiceId::new();

        let id = guard
            .begin_attempt(&invoice_id, &key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();
        guard.complete(id, Some("sg-1")).await.unwrap();

        assert!(guard.has_been_sent(&invoice_id, &key()).await.unwrap());
    }

    #[tokio::test]
    async fn failed_attempt_is_retryable() {
        let guard = IdempotencyGuard::new(MockLedger::default());
        let invoice_id = InvoiceId::new();

        let id = guard
            .begin_attempt(&invoice_id, &key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();
        guard.fail(id, "provider timeout").await.unwrap();

        assert!(!guard.has_been_sent(&invoice_id, &key()).await.unwrap());
    }

    #[tokio::test]
    async fn day_bucket_and_level_keys_are_independent() {
        let guard = IdempotencyGuard::new(MockLedger::default());
        let invoice_id = InvoiceId::new();

        let id = guard
            .begin_attempt(&invoice_id, &key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();
        guard.complete(id, None).await.unwrap();

        let day_key = SendKey::DayBucket {
            day: 14,
            channel: Channel::Email,
        };
        assert!(!guard.has_been_sent(&invoice_id, &day_key).await.unwrap());
    }
}
