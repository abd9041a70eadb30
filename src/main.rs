use std::sync::Arc;

use tracing::info;

use mailsieve::config::Config;
use mailsieve::executor::ActionExecutor;
use mailsieve::mailbox::{LocalMailbox, Mailbox};
use mailsieve::processor::Processor;
use mailsieve::rules::RuleEngine;
use mailsieve::source::CachedProvider;
use mailsieve::store::{LibSqlStore, Store};

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

    let config = Config::from_env();

    eprintln!("📬 mailsieve v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Rules:   {}", config.rules_path.display());
    eprintln!("   Ledger:  {}", config.db_path.display());
    eprintln!("   Mailbox: {}", config.mailbox_path.display());
    eprintln!();

    let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_local(&config.db_path).await?);
    let mailbox: Arc<dyn Mailbox> = Arc::new(LocalMailbox::open(&config.mailbox_path)?);

    // A bad rules file degrades to an empty rule set; the run still
    // completes as a no-op.
    let engine = RuleEngine::from_file(&config.rules_path);

    let provider = CachedProvider::new(Arc::clone(&mailbox), Arc::clone(&store));
    let executor = ActionExecutor::new(mailbox, store);
    let processor = Processor::new(engine, Arc::new(provider), executor);

    let report = processor.run_once(&config.query, config.fetch_limit).await;

    info!(
        success = report.success_count,
        failed = report.failed_count,
        "Run complete"
    );
    Ok(())
}
