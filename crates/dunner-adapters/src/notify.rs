use async_trait::async_trait;

use dunner_core::claim::PaymentClaim;
use dunner_ports::error::SendError;
use dunner_ports::outbound::FreelancerNotifier;
use dunner_ports::types::NudgeUrgency;

/// Deadline-nudge adapter for deployments without an internal mail route:
/// the nudge lands in the logs where the ops alerting picks it up.
#[derive(Debug, Clone, Default)]
pub struct TracingFreelancerNotifier;

#[async_trait]
impl FreelancerNotifier for TracingFreelancerNotifier {
    async fn claim_deadline_nudge(
        &self,
        claim: &PaymentClaim,
        urgency: NudgeUrgency,
    ) -> Result<(), SendError> {
        match urgency {
            NudgeUrgency::Standard => tracing::info!(
                claim_id = %claim.claim_id(),
                invoice_id = %claim.invoice_id(),
                deadline = %claim.verification_deadline(),
                "payment claim needs verification within 24 hours"
            ),
            NudgeUrgency::Urgent => tracing::warn!(
                claim_id = %claim.claim_id(),
                invoice_id = %claim.invoice_id(),
                deadline = %claim.verification_deadline(),
                "payment claim auto-expires in under 6 hours"
            ),
        }
        Ok(())
    }
}
