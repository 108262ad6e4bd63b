use async_trait::async_trait;

use dunner_core::config::AutomationConfig;
use dunner_core::ids::FreelancerId;
use dunner_ports::error::PortError;
use dunner_ports::outbound::AutomationConfigStore;

use super::SqliteDb;

#[async_trait]
impl AutomationConfigStore for SqliteDb {
    async fn find_for_freelancer(
        &self,
        freelancer_id: &FreelancerId,
    ) -> Result<Option<AutomationConfig>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM automation_configs WHERE freelancer_id = ?")
                .bind(freelancer_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data,)) => {
                let config: AutomationConfig = serde_json::from_str(&data)
                    .map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }
}

impl SqliteDb {
    /// Configs are owned by the platform's settings screens; this writer
    /// exists for that side and for fixtures.
    pub async fn put_automation_config(&self, config: &AutomationConfig) -> Result<(), PortError> {
        let data =
            serde_json::to_string(config).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO automation_configs (freelancer_id, data) VALUES (?, ?)
             ON CONFLICT(freelancer_id) DO UPDATE SET data = excluded.data",
        )
        .bind(config.freelancer_id.to_string())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}
