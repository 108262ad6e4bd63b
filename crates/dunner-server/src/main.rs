mod routes;

use std::sync::Arc;

use dunner_adapters::analytics::TracingAnalytics;
use dunner_adapters::channels::LogSender;
use dunner_adapters::consent::StaticConsent;
use dunner_adapters::notify::TracingFreelancerNotifier;
use dunner_adapters::persistence::sqlite::SqliteDb;
use dunner_adapters::throttle::TokioThrottle;
use dunner_app::dispatcher::{ChannelDispatcher, DispatcherConfig};
use dunner_app::guard::IdempotencyGuard;
use dunner_app::verification::VerificationService;
use dunner_app::worker::{EscalationWorker, WorkerConfig};
use dunner_core::channel::Channel;
use dunner_core::escalation::LevelPolicy;
use dunner_ports::outbound::ChannelSender;

use routes::{router, AppState};

struct ServerConfig {
    database_url: String,
    bind_addr: String,
    cron_secret: String,
}

impl ServerConfig {
    fn from_env() -> Result<Self, String> {
        let cron_secret = std::env::var("DUNNER_CRON_SECRET")
            .map_err(|_| "DUNNER_CRON_SECRET must be set".to_string())?;
        Ok(Self {
            database_url: std::env::var("DUNNER_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:dunner.db?mode=rwc".into()),
            bind_addr: std::env::var("DUNNER_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8080".into()),
            cron_secret,
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let db = SqliteDb::new(&config.database_url).await?;

    // Log senders stand in for the SendGrid/Twilio/Lob integrations; swap in
    // the real adapters per deployment.
    let senders: Vec<Arc<dyn ChannelSender>> = vec![
        Arc::new(LogSender::new(Channel::Email)),
        Arc::new(LogSender::new(Channel::Sms)),
        Arc::new(LogSender::new(Channel::Letter)),
        Arc::new(LogSender::new(Channel::Voice)),
    ];
    let dispatcher = ChannelDispatcher::new(
        db.clone(),
        IdempotencyGuard::new(db.clone()),
        StaticConsent::allow_all(),
        TracingAnalytics,
        senders,
        DispatcherConfig::default(),
    );
    let worker = EscalationWorker::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        dispatcher,
        TokioThrottle::default(),
        WorkerConfig::default(),
    );
    let sweeper = VerificationService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        TracingFreelancerNotifier,
        LevelPolicy::default(),
    );

    let state = AppState {
        runner: Arc::new(worker),
        sweeper: Arc::new(sweeper),
        cron_secret: Arc::from(config.cron_secret.as_str()),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "dunner server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
