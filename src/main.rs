use std::sync::Arc;

use hr_resolver::config::AppConfig;
use hr_resolver::poller::PollLoop;
use hr_resolver::queue::{QueueConsumer, SqsTransport};
use hr_resolver::registry::HttpRegistryClient;
use hr_resolver::resolution::{Escalation, ResolutionEngine};
use hr_resolver::workflow::HttpWorkflowClient;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("HR Resolver v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Queue: {} ({})", config.queue.queue_name, config.queue.endpoint);
    eprintln!("   Registry: {}", config.registry.host);
    eprintln!("   Workflow: {}", config.workflow.auth_endpoint);
    eprintln!("   Poll interval: {}s\n", config.poll_interval.as_secs());

    // ── Clients ──────────────────────────────────────────────────────────
    let registry = Arc::new(HttpRegistryClient::new(
        config.registry.clone(),
        config.http_timeout,
    )?);
    let workflow = Arc::new(HttpWorkflowClient::new(
        config.workflow.clone(),
        config.http_timeout,
    )?);
    let transport = Arc::new(SqsTransport::new(config.queue.clone(), config.http_timeout)?);

    // ── Engine ───────────────────────────────────────────────────────────
    let engine = ResolutionEngine::new(registry, workflow, Escalation::from(&config.workflow))
        .with_malformed_payload_policy(config.malformed_payload_policy);

    let consumer = QueueConsumer::new(
        transport,
        config.queue.max_messages,
        config.queue.wait_time,
    );
    let poller = PollLoop::new(consumer, Arc::new(engine), config.poll_interval);

    // ── Shutdown ─────────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Shutdown requested");
            cancel.cancel();
        }
    });

    poller.run(cancel).await;

    Ok(())
}
