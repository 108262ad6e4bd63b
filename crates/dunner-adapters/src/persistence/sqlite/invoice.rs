use async_trait::async_trait;

use dunner_core::ids::InvoiceId;
use dunner_core::invoice::Invoice;
use dunner_ports::error::PortError;
use dunner_ports::outbound::InvoiceStore;

use super::SqliteDb;

#[async_trait]
impl InvoiceStore for SqliteDb {
    async fn find_overdue(&self, limit: u32) -> Result<Vec<Invoice>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM invoices
             WHERE status IN ('overdue', 'in_collections')
             ORDER BY due_date ASC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut invoices = Vec::with_capacity(rows.len());
        for (data,) in rows {
            let invoice: Invoice =
                serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))?;
            invoices.push(invoice);
        }
        Ok(invoices)
    }

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM invoices WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data,)) => {
                let invoice: Invoice = serde_json::from_str(&data)
                    .map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, invoice: &Invoice) -> Result<(), PortError> {
        let id = invoice.id().to_string();
        let freelancer_id = invoice.freelancer_id().to_string();
        let status = invoice.status().as_str();
        let due_date = invoice.due_date().to_rfc3339();
        let data =
            serde_json::to_string(invoice).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO invoices (id, freelancer_id, status, due_date, data)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                freelancer_id = excluded.freelancer_id,
                status = excluded.status,
                due_date = excluded.due_date,
                data = excluded.data",
        )
        .bind(&id)
        .bind(&freelancer_id)
        .bind(status)
        .bind(&due_date)
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
    use dunner_core::contact::ClientContact;
    use dunner_core::ids::FreelancerId;
    use dunner_core::invoice::InvoiceStatus;

    fn ts(s: &str) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    async fn db() -> SqliteDb {
        SqliteDb::new("sqlite::memory:").await.unwrap()
    }

    fn make_invoice(due: &str) -> Invoice {
        Invoice::new(
            "INV-2025-00042".into(),
            FreelancerId::new(),
            ClientContact::email_only("Acme Ltd", "accounts@acme.example"),
            100_000,
            "GBP".into(),
            ts(due),
            ts("2025-01-01T00:00:00Z"),
        )
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let db = db().await;
        let invoice = make_invoice("2025-02-09T00:00:00Z");

        db.save(&invoice).await.unwrap();

        let found = db.find_by_id(invoice.id()).await.unwrap().unwrap();
        assert_eq!(found.id(), invoice.id());
        assert_eq!(found.reference(), "INV-2025-00042");
    }

    #[tokio::test]
    async fn find_overdue_only_returns_collectible_statuses() {
        let db = db().await;

        let sent = make_invoice("2025-02-01T00:00:00Z");
        db.save(&sent).await.unwrap();

        let mut overdue = make_invoice("2025-02-02T00:00:00Z");
        overdue.mark_overdue();
        db.save(&overdue).await.unwrap();

        let mut in_collections = make_invoice("2025-02-03T00:00:00Z");
        in_collections.mark_overdue();
        in_collections.mark_in_collections();
        db.save(&in_collections).await.unwrap();

        let mut paid = make_invoice("2025-02-04T00:00:00Z");
        paid.mark_overdue();
        paid.mark_paid(ts("2025-02-20T00:00:00Z"));
        db.save(&paid).await.unwrap();

        let found = db.find_overdue(50).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .all(|i| matches!(
                i.status(),
                InvoiceStatus::Overdue | InvoiceStatus::InCollections
            )));
    }

    #[tokio::test]
    async fn find_overdue_orders_oldest_first_and_respects_limit() {
        let db = db().await;
        for due in ["2025-02-03", "2025-02-01", "2025-02-02"] {
            let mut invoice = make_invoice(&format!("{due}T00:00:00Z"));
            invoice.mark_overdue();
            db.save(&invoice).await.unwrap();
        }

        let found = db.find_overdue(2).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].due_date(), ts("2025-02-01T00:00:00Z"));
        assert_eq!(found[1].due_date(), ts("2025-02-02T00:00:00Z"));
    }

    #[tokio::test]
    async fn save_updates_existing() {
        let db = db().await;
        let mut invoice = make_invoice("2025-02-09T00:00:00Z");
        db.save(&invoice).await.unwrap();

        invoice.mark_overdue();
        invoice.mark_in_collections();
        db.save(&invoice).await.unwrap();

        let found = db.find_by_id(invoice.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), InvoiceStatus::InCollections);
        assert_eq!(found.collection_attempts(), 1);
    }
}
