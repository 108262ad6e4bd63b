use async_trait::async_trait;

use dunner_core::claim::PaymentClaim;
use dunner_core::ids::ClaimId;
use dunner_ports::error::PortError;
use dunner_ports::outbound::ClaimStore;

use super::SqliteDb;

#[async_trait]
impl ClaimStore for SqliteDb {
    async fn create(&self, claim: &PaymentClaim) -> Result<(), PortError> {
        let id = claim.claim_id().to_string();
        let invoice_id = claim.invoice_id().to_string();
        let status = claim.status().as_str();
        let data =
            serde_json::to_string(claim).map_err(|e| PortError::Persistence(e.to_string()))?;

        // Conditional insert: at most one pending claim per invoice.
        let result = sqlx::query(
            "INSERT INTO payment_claims (id, invoice_id, status, data)
             SELECT ?, ?, ?, ?
             WHERE NOT EXISTS (
                SELECT 1 FROM payment_claims
                WHERE invoice_id = ? AND status = 'pending_verification'
             )",
        )
        .bind(&id)
        .bind(&invoice_id)
        .bind(status)
        .bind(&data)
        .bind(&invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::Conflict);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ClaimId) -> Result<Option<PaymentClaim>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM payment_claims WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data,)) => {
                let claim: PaymentClaim = serde_json::from_str(&data)
                    .map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok(Some(claim))
            }
            None => Ok(None),
        }
    }

    async fn find_pending(&self) -> Result<Vec<PaymentClaim>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM payment_claims WHERE status = 'pending_verification'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut claims = Vec::with_capacity(rows.len());
        for (data,) in rows {
            let claim: PaymentClaim =
                serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))?;
            claims.push(claim);
        }
        Ok(claims)
    }

    async fn save(&self, claim: &PaymentClaim) -> Result<(), PortError> {
        let status = claim.status().as_str();
        let data =
            serde_json::to_string(claim).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO payment_claims (id, invoice_id, status, data)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                data = excluded.data",
        )
        .bind(claim.claim_id().to_string())
        .bind(claim.invoice_id().to_string())
        .bind(status)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dunner_core::claim::ClaimStatus;
    use dunner_core::ids::InvoiceId;

    fn ts(s: &str) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    async fn db() -> SqliteDb {
        SqliteDb::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_and_find_pending() {
        let db = db().await;
        let claim = PaymentClaim::new(InvoiceId::new(), ts("2025-03-01T10:00:00Z"));

        db.create(&claim).await.unwrap();

        let pending = db.find_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].claim_id(), claim.claim_id());
    }

    #[tokio::test]
    async fn second_pending_claim_for_same_invoice_conflicts() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        db.create(&PaymentClaim::new(invoice_id.clone(), ts("2025-03-01T10:00:00Z")))
            .await
            .unwrap();
        let result = db
            .create(&PaymentClaim::new(invoice_id, ts("2025-03-01T11:00:00Z")))
            .await;

        assert!(matches!(result, Err(PortError::Conflict)));
    }

    #[tokio::test]
    async fn resolved_claim_allows_a_new_one() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        let mut first = PaymentClaim::new(invoice_id.clone(), ts("2025-03-01T10:00:00Z"));
        db.create(&first).await.unwrap();
        first.reject(ts("2025-03-02T10:00:00Z")).unwrap();
        db.save(&first).await.unwrap();

        let second = PaymentClaim::new(invoice_id, ts("2025-03-05T10:00:00Z"));
        db.create(&second).await.unwrap();

        let pending = db.find_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].claim_id(), second.claim_id());
    }

    #[tokio::test]
    async fn save_persists_reminder_flags() {
        let db = db().await;
        let mut claim = PaymentClaim::new(InvoiceId::new(), ts("2025-03-01T10:00:00Z"));
        db.create(&claim).await.unwrap();

        claim.record_standard_reminder();
        db.save(&claim).await.unwrap();

        let stored = db.find_by_id(claim.claim_id()).await.unwrap().unwrap();
        assert!(stored.reminder_24h_sent());
        assert!(!stored.reminder_6h_sent());
    }

    #[tokio::test]
    async fn resolved_claims_leave_the_pending_scan() {
        let db = db().await;
        let mut claim = PaymentClaim::new(InvoiceId::new(), ts("2025-03-01T10:00:00Z"));
        db.create(&claim).await.unwrap();

        claim.expire(ts("2025-03-03T10:00:00Z")).unwrap();
        db.save(&claim).await.unwrap();

        assert!(db.find_pending().await.unwrap().is_empty());
        let stored = db.find_by_id(claim.claim_id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), ClaimStatus::Expired);
    }
}
