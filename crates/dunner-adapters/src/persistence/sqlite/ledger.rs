use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dunner_core::ids::InvoiceId;
use dunner_ports::error::PortError;
use dunner_ports::outbound::SendLedger;
use dunner_ports::types::{AttemptStatus, SendKey};

use super::SqliteDb;

fn status_to_str(status: AttemptStatus) -> &'static str {
    match status {
        AttemptStatus::Queued => "queued",
        AttemptStatus::Sent => "sent",
        AttemptStatus::Failed => "failed",
    }
}

#[async_trait]
impl SendLedger for SqliteDb {
    async fn begin(
        &self,
        invoice_id: &InvoiceId,
        key: &SendKey,
        now: DateTime<Utc>,
    ) -> Result<i64, PortError> {
        let result = sqlx::query(
            "INSERT INTO send_attempts (invoice_id, send_key, status, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(invoice_id.to_string())
        .bind(key.to_string())
        .bind(status_to_str(AttemptStatus::Queued))
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn mark_sent(
        &self,
        attempt_id: i64,
        provider_message_id: Option<&str>,
    ) -> Result<(), PortError> {
        sqlx::query("UPDATE send_attempts SET status = ?, provider_message_id = ? WHERE id = ?")
            .bind(status_to_str(AttemptStatus::Sent))
            .bind(provider_message_id)
            .bind(attempt_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn mark_failed(&self, attempt_id: i64, error: &str) -> Result<(), PortError> {
        sqlx::query("UPDATE send_attempts SET status = ?, error = ? WHERE id = ?")
            .bind(status_to_str(AttemptStatus::Failed))
            .bind(error)
            .bind(attempt_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn has_active_or_succeeded(
        &self,
        invoice_id: &InvoiceId,
        key: &SendKey,
    ) -> Result<bool, PortError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM send_attempts
             WHERE invoice_id = ? AND send_key = ? AND status != ?",
        )
        .bind(invoice_id.to_string())
        .bind(key.to_string())
        .bind(status_to_str(AttemptStatus::Failed))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(count.0 > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dunner_core::channel::Channel;
    use dunner_core::escalation::Level;

    fn ts(s: &str) -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn db() -> SqliteDb {
        SqliteDb::new("sqlite::memory:").await.unwrap()
    }

    fn email_key() -> SendKey {
        SendKey::Level {
            level: Level::Firm,
            channel: Channel::Email,
        }
    }

    #[tokio::test]
    async fn queued_attempt_blocks_resend() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        db.begin(&invoice_id, &email_key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();

        assert!(db
            .has_active_or_succeeded(&invoice_id, &email_key())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn sent_attempt_blocks_resend() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        let id = db
            .begin(&invoice_id, &email_key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();
        db.mark_sent(id, Some("sg-123")).await.unwrap();

        assert!(db
            .has_active_or_succeeded(&invoice_id, &email_key())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn failed_attempt_stays_retryable() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        let id = db
            .begin(&invoice_id, &email_key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();
        db.mark_failed(id, "provider timeout").await.unwrap();

        assert!(!db
            .has_active_or_succeeded(&invoice_id, &email_key())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn keys_are_scoped_per_invoice_and_channel() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        let id = db
            .begin(&invoice_id, &email_key(), ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();
        db.mark_sent(id, None).await.unwrap();

        let sms_key = SendKey::Level {
            level: Level::Firm,
            channel: Channel::Sms,
        };
        assert!(!db
            .has_active_or_succeeded(&invoice_id, &sms_key)
            .await
            .unwrap());
        assert!(!db
            .has_active_or_succeeded(&InvoiceId::new(), &email_key())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn day_bucket_keys_round_trip() {
        let db = db().await;
        let invoice_id = InvoiceId::new();
        let key = SendKey::DayBucket {
            day: 14,
            channel: Channel::Email,
        };

        let id = db
            .begin(&invoice_id, &key, ts("2025-03-01T06:00:00Z"))
            .await
            .unwrap();
        db.mark_sent(id, Some("sg-9")).await.unwrap();

        assert!(db.has_active_or_succeeded(&invoice_id, &key).await.unwrap());
    }
}
