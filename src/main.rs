use std::sync::Arc;

use anyhow::Context;
use inbox_agent::app::App;
use inbox_agent::config::ServiceConfig;
use inbox_agent::logging::init_tracing;
use inbox_agent::webhook::{Dispatcher, webhook_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export INBOX_USERNAME=... AGENTMAIL_API_KEY=... OPENAI_API_KEY=...");
        std::process::exit(1);
    });
    let port = config.webhook.port;

    eprintln!("📬 Inbox Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Inbox: {}", config.mailbox.inbox_address());
    eprintln!("   Model: {}", config.agent.model);
    eprintln!(
        "   Webhook: {}",
        config.webhook.url.as_deref().unwrap_or("(not registered)")
    );
    eprintln!(
        "   Workers: {} (queue {})",
        config.webhook.worker_count, config.webhook.queue_capacity
    );

    let app = App::bootstrap(config, true)
        .await
        .context("failed to start inbox agent")?;

    let (dispatcher, workers) = Dispatcher::spawn(
        Arc::clone(&app.processor),
        app.config.webhook.worker_count,
        app.config.webhook.queue_capacity,
    );
    let router = webhook_routes(dispatcher);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    eprintln!("   Listening: http://0.0.0.0:{port}/\n");
    tracing::info!(port, inbox_id = %app.inbox.inbox_id, "Webhook server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested; draining queued events");
        })
        .await?;

    workers.join().await;
    Ok(())
}
