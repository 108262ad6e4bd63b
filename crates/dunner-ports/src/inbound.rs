use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PortError;
use crate::types::{RunSummary, SweepSummary};

/// One bounded pass of the escalation batch worker. Only a failure of the
/// initial overdue query surfaces as an error; everything per-invoice is
/// captured in the summary.
#[async_trait]
pub trait EscalationRunner: Send + Sync {
    async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, PortError>;
}

/// One pass of the payment-claim verification sweep.
#[async_trait]
pub trait VerificationSweeper: Send + Sync {
    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, PortError>;
}
