use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::escalation::Level;
use crate::ids::FreelancerId;

/// Per-freelancer automation settings. Owned elsewhere in the platform;
/// read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub freelancer_id: FreelancerId,
    pub enabled: bool,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub letters_enabled: bool,
    pub voice_enabled: bool,
    pub pause_on_claim: bool,
    pub pause_on_dispute: bool,
}

impl AutomationConfig {
    /// Fallback when a freelancer has no stored config: automation on,
    /// email only, pauses honored.
    pub fn conservative_default(freelancer_id: FreelancerId) -> Self {
        Self {
            freelancer_id,
            enabled: true,
            email_enabled: true,
            sms_enabled: false,
            letters_enabled: false,
            voice_enabled: false,
            pause_on_claim: true,
            pause_on_dispute: true,
        }
    }

    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email_enabled,
            Channel::Sms => self.sms_enabled,
            Channel::Letter => self.letters_enabled,
            Channel::Voice => self.voice_enabled,
        }
    }
}

/// Which channels each escalation level may use. Deployment configuration;
/// the default table keeps voice out of everything below `Final` and drops
/// SMS again once an invoice is with the agency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPlan {
    per_level: BTreeMap<Level, Vec<Channel>>,
}

impl ChannelPlan {
    pub fn new(per_level: BTreeMap<Level, Vec<Channel>>) -> Self {
        Self { per_level }
    }

    pub fn channels_for(&self, level: Level) -> &[Channel] {
        self.per_level.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for ChannelPlan {
    fn default() -> Self {
        Self {
            per_level: BTreeMap::from([
                (Level::Pending, vec![]),
                (Level::Gentle, vec![Channel::Email]),
                (Level::Firm, vec![Channel::Email, Channel::Sms]),
                (
                    Level::Final,
                    vec![Channel::Email, Channel::Sms, Channel::Letter, Channel::Voice],
                ),
                (Level::Agency, vec![Channel::Email, Channel::Letter]),
            ]),
        }
    }
}
