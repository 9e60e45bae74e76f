mod actions;
mod cache;
mod commands;
mod config;
mod digest;
mod error;
mod extract;
mod fetch;
mod mail;
mod pipeline;
mod schedule;
mod state;
mod store;
mod summarize;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn, Level};

use actions::Actions;
use cache::SummaryCache;
use config::{AppConfig, Settings};
use fetch::ContentFetcher;
use mail::{DisabledMailer, Mailer, SmtpMailer};
use pipeline::ChangelogPipeline;
use schedule::Scheduler;
use state::AppState;
use store::{CnidariumStore, MemoryStore, OptionStore};
use summarize::Summarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(if config.debug { Level::DEBUG } else { Level::INFO })
        .init();

    // Init storage
    let store: Arc<dyn OptionStore> = if config.in_memory() {
        warn!("DATA_DIR is :memory:; settings and summaries will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let store = CnidariumStore::open(&config.data_dir).await?;
        info!("Option store initialized at {:?}", config.data_dir);
        Arc::new(store)
    };
    Settings::seed(store.as_ref(), &config.seed).await?;

    if config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for changelog fetches");
    }
    let fetcher = ContentFetcher::new(config.accept_invalid_certs)?;
    let summarizer = Arc::new(Summarizer::new(&config.gemini_base_url, &config.gemini_model)?);
    let cache = Arc::new(SummaryCache::new(store.clone()));
    let pipeline = Arc::new(ChangelogPipeline::new(fetcher, summarizer, cache));
    info!(model = %config.gemini_model, "summarizer initialized");

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp, &config.admin_email)?),
        None => {
            warn!("SMTP_HOST not set; digests will not be delivered");
            Arc::new(DisabledMailer)
        }
    };

    let actions = Arc::new(Actions::new(
        store,
        pipeline,
        mailer,
        config.admin_email.clone(),
    ));

    // Also prunes once right away.
    let scheduler = Scheduler::start(actions.clone());

    let app_state = Arc::new(AppState::new(
        actions,
        config.admin_token.clone(),
        Some(scheduler),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("bind admin listener")?;
    info!("Changelog checker listening on {}", config.bind_addr);

    axum::serve(listener, commands::router(app_state.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("admin server failed")?;

    app_state.stop().await;
    info!("Changelog checker stopped");
    Ok(())
}
