use async_trait::async_trait;

use dunner_core::channel::Channel;
use dunner_core::contact::ClientContact;
use dunner_core::ids::FreelancerId;
use dunner_ports::error::PortError;
use dunner_ports::outbound::ConsentGate;

/// Consent gate for local runs and fixtures: email is always allowed, the
/// intrusive channels only when explicitly switched on. Deployments wire the
/// compliance service (PECR opt-outs, suppression lists) here instead.
#[derive(Debug, Clone, Default)]
pub struct StaticConsent {
    pub allow_sms: bool,
    pub allow_letters: bool,
    pub allow_voice: bool,
}

impl StaticConsent {
    pub fn allow_all() -> Self {
        Self {
            allow_sms: true,
            allow_letters: true,
            allow_voice: true,
        }
    }
}

#[async_trait]
impl ConsentGate for StaticConsent {
    async fn is_channel_allowed(
        &self,
        _freelancer_id: &FreelancerId,
        _contact: &ClientContact,
        channel: Channel,
    ) -> Result<bool, PortError> {
        Ok(match channel {
            Channel::Email => true,
            Channel::Sms => self.allow_sms,
            Channel::Letter => self.allow_letters,
            Channel::Voice => self.allow_voice,
        })
    }
}
