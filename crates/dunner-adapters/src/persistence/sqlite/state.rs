use async_trait::async_trait;

use dunner_core::escalation::{EscalationState, StatePatch};
use dunner_core::ids::InvoiceId;
use dunner_ports::error::PortError;
use dunner_ports::outbound::EscalationStateStore;

use super::SqliteDb;

#[async_trait]
impl EscalationStateStore for SqliteDb {
    async fn create_if_absent(
        &self,
        state: &EscalationState,
    ) -> Result<EscalationState, PortError> {
        let invoice_id = state.invoice_id().to_string();
        let data =
            serde_json::to_string(state).map_err(|e| PortError::Persistence(e.to_string()))?;

        // Two overlapping runs racing on first contact converge on whichever
        // row landed first.
        sqlx::query(
            "INSERT INTO escalation_states (invoice_id, data) VALUES (?, ?)
             ON CONFLICT(invoice_id) DO NOTHING",
        )
        .bind(&invoice_id)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        self.find_by_invoice(state.invoice_id())
            .await?
            .ok_or(PortError::NotFound)
    }

    async fn find_by_invoice(
        &self,
        invoice_id: &InvoiceId,
    ) -> Result<Option<EscalationState>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM escalation_states WHERE invoice_id = ?")
                .bind(invoice_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data,)) => {
                let state: EscalationState = serde_json::from_str(&data)
                    .map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, invoice_id: &InvoiceId, patch: &StatePatch) -> Result<(), PortError> {
        let mut state = self
            .find_by_invoice(invoice_id)
            .await?
            .ok_or(PortError::NotFound)?;
        state.apply(patch);

        let data =
            serde_json::to_string(&state).map_err(|e| PortError::Persistence(e.to_string()))?;
        sqlx::query("UPDATE escalation_states SET data = ? WHERE invoice_id = ?")
            .bind(&data)
            .bind(invoice_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dunner_core::escalation::{Level, LevelPolicy, PauseReason};

    fn ts(s: &str) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    async fn db() -> SqliteDb {
        SqliteDb::new("sqlite::memory:").await.unwrap()
    }

    fn seed(invoice_id: &InvoiceId, days_overdue: i64) -> EscalationState {
        EscalationState::seed(
            invoice_id.clone(),
            days_overdue,
            &LevelPolicy::default(),
            ts("2025-03-01T06:00:00Z"),
        )
    }

    #[tokio::test]
    async fn create_if_absent_stores_and_returns() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        let stored = db.create_if_absent(&seed(&invoice_id, 20)).await.unwrap();
        assert_eq!(stored.current_level(), Level::Gentle);
    }

    #[tokio::test]
    async fn racing_creates_converge_on_first_record() {
        let db = db().await;
        let invoice_id = InvoiceId::new();

        let first = db.create_if_absent(&seed(&invoice_id, 20)).await.unwrap();
        // a second worker seeing a different days-overdue must not clobber
        let second = db.create_if_absent(&seed(&invoice_id, 70)).await.unwrap();

        assert_eq!(first.current_level(), Level::Gentle);
        assert_eq!(second.current_level(), Level::Gentle);
    }

    #[tokio::test]
    async fn update_is_a_merge_patch() {
        let db = db().await;
        let invoice_id = InvoiceId::new();
        let mut state = db.create_if_absent(&seed(&invoice_id, 20)).await.unwrap();

        let escalate_patch = state.escalate_to(Level::Firm, ts("2025-03-01T06:00:00Z")).unwrap();
        db.update(&invoice_id, &escalate_patch).await.unwrap();

        // a pause-only patch must not disturb the level
        let pause_patch = state
            .pause(
                PauseReason::PaymentClaim,
                Some(ts("2025-03-03T06:00:00Z")),
                ts("2025-03-01T07:00:00Z"),
            )
            .unwrap();
        db.update(&invoice_id, &pause_patch).await.unwrap();

        let stored = db.find_by_invoice(&invoice_id).await.unwrap().unwrap();
        assert_eq!(stored.current_level(), Level::Firm);
        assert!(stored.is_paused());
        assert_eq!(stored.last_escalated_at(), Some(ts("2025-03-01T06:00:00Z")));
    }

    #[tokio::test]
    async fn update_missing_state_is_not_found() {
        let db = db().await;
        let result = db
            .update(&InvoiceId::new(), &StatePatch::default())
            .await;
        assert!(matches!(result, Err(PortError::NotFound)));
    }
}
