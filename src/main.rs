use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use stockwatch_bot::bot::{CommandHandler, UpdatePoller};
use stockwatch_bot::notify::Notifier;
use stockwatch_bot::scheduler::CatalogScanner;
use stockwatch_bot::scraper::WebScraper;
use stockwatch_bot::telegram::TelegramClient;
use stockwatch_bot::utils::logging;
use stockwatch_bot::{web, AppConfig, AppContext};

#[derive(Parser, Debug)]
#[command(
    name = "stockwatch-bot",
    version,
    about = "Watches a product listing page and notifies subscribers of changes"
)]
struct Cli {
    /// Configuration file (without extension is fine)
    #[arg(short, long)]
    config: Option<String>,

    /// Run a single scan cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting stockwatch-bot v{}", env!("CARGO_PKG_VERSION"));

    let token = config
        .bot
        .load_token()
        .with_context(|| format!("Failed to read bot token from {}", config.bot.token_file))?;

    let context = AppContext::connect(config).await.context("Failed to open database")?;

    let telegram = TelegramClient::new(&context.config.bot, &token)
        .context("Failed to create bot client")?;
    let bot_username = match telegram.get_me().await {
        Ok(me) => {
            info!("Authenticated as bot {}", me.username.as_deref().unwrap_or(&me.first_name));
            me.username
        }
        Err(e) => {
            warn!("Could not verify bot account, continuing: {}", e);
            None
        }
    };

    let notifier = Notifier::new(
        Arc::new(telegram.clone()),
        context.config.bot.delivery_concurrency,
    );
    let fetcher = WebScraper::new(context.config.scraper.clone())
        .context("Failed to create page fetcher")?;
    let scanner = CatalogScanner::new(&context, Arc::new(fetcher), notifier)
        .context("Failed to create scanner")?;

    if cli.once {
        let result = scanner.run_cycle().await;
        context.database.close().await;

        let report = result.context("Scan failed")?;
        info!(
            "Scan complete: {} products, changed: {}, persisted: {}",
            report.products,
            report.changed(),
            report.persisted
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    let scanner_shutdown = shutdown_rx.clone();
    tasks.spawn(async move { scanner.run(scanner_shutdown).await });

    let handler = CommandHandler::new(
        context.subscribers.clone(),
        context.snapshots.clone(),
        context.config.scraper.url.clone(),
    );
    tasks.spawn(UpdatePoller::new(telegram, handler, bot_username).run(shutdown_rx.clone()));

    if context.config.server.enabled {
        let server_context = context.clone();
        let server_shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            if let Err(e) = web::serve(server_context, server_shutdown).await {
                error!("Status server failed: {}", e);
            }
        });
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down, waiting for in-flight work...");
    let _ = shutdown_tx.send(true);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Task failed during shutdown: {}", e);
        }
    }

    context.database.close().await;
    info!("Shutdown complete");
    Ok(())
}
