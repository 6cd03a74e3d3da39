use anyhow::Context;
use inbox_agent::app::App;
use inbox_agent::config::ServiceConfig;
use inbox_agent::logging::init_tracing;
use inbox_agent::pipeline::BatchScanner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("📬 Inbox Agent batch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Inbox: {}", config.mailbox.inbox_address());
    eprintln!("   Model: {}\n", config.agent.model);

    let app = App::bootstrap(config, false)
        .await
        .context("failed to start inbox agent")?;
    let scanner = BatchScanner::new(app.mailbox, app.processor);
    let summary = scanner.run().await.context("failed to list threads")?;

    println!("Batch complete: {summary}");
    Ok(())
}
