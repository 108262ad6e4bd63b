use std::time::Duration;

use async_trait::async_trait;

use dunner_ports::outbound::Throttle;

/// Fixed inter-send delay backed by the tokio timer. Keeps one batch run
/// under the email/SMS providers' rate limits.
pub struct TokioThrottle {
    delay: Duration,
}

impl TokioThrottle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for TokioThrottle {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(200),
        }
    }
}

#[async_trait]
impl Throttle for TokioThrottle {
    async fn after_send(&self) {
        tokio::time::sleep(self.delay).await;
    }
}
