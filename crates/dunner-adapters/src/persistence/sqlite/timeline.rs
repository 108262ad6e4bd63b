use async_trait::async_trait;

use dunner_core::ids::InvoiceId;
use dunner_core::timeline::TimelineEvent;
use dunner_ports::error::PortError;
use dunner_ports::outbound::TimelineStore;

use super::SqliteDb;

#[async_trait]
impl TimelineStore for SqliteDb {
    async fn append(&self, event: &TimelineEvent) -> Result<(), PortError> {
        let data =
            serde_json::to_string(event).map_err(|e| PortError::Persistence(e.to_string()))?;

        // The derived event_id makes retried appends collapse into the
        // existing row.
        sqlx::query(
            "INSERT OR IGNORE INTO timeline_events (event_id, invoice_id, kind, occurred_at, data)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event.event_id().as_str())
        .bind(event.invoice_id().to_string())
        .bind(event.kind().as_str())
        .bind(event.occurred_at().to_rfc3339())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn list_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        limit: u32,
    ) -> Result<Vec<TimelineEvent>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM timeline_events
             WHERE invoice_id = ?
             ORDER BY occurred_at DESC
             LIMIT ?",
        )
        .bind(invoice_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut events = Vec::with_capacity(rows.len());
        for (data,) in rows {
            let event: TimelineEvent =
                serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }
}
