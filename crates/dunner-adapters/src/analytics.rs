use std::collections::HashMap;

use async_trait::async_trait;

use dunner_ports::outbound::AnalyticsSink;

/// Log-backed analytics sink. Emission is fire-and-forget by contract, and a
/// log line cannot fail, so nothing here can ever propagate into a run.
#[derive(Debug, Clone, Default)]
pub struct TracingAnalytics;

#[async_trait]
impl AnalyticsSink for TracingAnalytics {
    async fn emit(&self, event: &str, properties: HashMap<String, String>) {
        tracing::info!(target: "dunner::analytics", event, ?properties, "analytics event");
    }
}
