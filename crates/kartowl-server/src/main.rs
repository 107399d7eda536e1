mod api;
mod middleware;
mod search;

use std::sync::Arc;
use std::time::Duration;

use kartowl_core::AppConfig;
use kartowl_db::{HistoryStore, PgHistoryRepository};
use kartowl_scraper::{
    default_extractors, BrowserSessionManager, BrowserSettings, BrowserStatus, ScraperSettings,
};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
    search::{HistoryRecorder, ResultCache, SearchOrchestrator},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(kartowl_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting kartowl-server");

    let history = connect_history(&config).await?;

    let browser = Arc::new(BrowserSessionManager::new(BrowserSettings::from_app_config(
        &config,
    )));
    let browser_status = browser.start().await;
    if browser_status != BrowserStatus::Ready {
        tracing::warn!(
            status = browser_status.as_str(),
            "browser not ready; every marketplace will report as failed"
        );
    }

    let cache_ttl = Duration::from_secs(config.cache_ttl_secs);
    let orchestrator = SearchOrchestrator::new(
        browser.clone(),
        default_extractors(&ScraperSettings::from_app_config(&config)),
        ResultCache::new(cache_ttl, config.cache_max_entries),
        HistoryRecorder::new(history.clone()),
    );
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        history,
        browser: browser.clone(),
        trending_cache: ResultCache::new(cache_ttl, 1),
    };
    let rate_limit = RateLimitState::new(
        config.rate_limit_max_requests,
        Duration::from_secs(config.rate_limit_window_secs),
    );
    let app = build_app(state, &config.cors_origins, rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    browser.stop().await;
    Ok(())
}

/// Postgres when `DATABASE_URL` is set, otherwise a process-local store.
async fn connect_history(config: &AppConfig) -> anyhow::Result<HistoryStore> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; price history is kept in memory");
        return Ok(HistoryStore::in_memory());
    };

    let pool_config = kartowl_db::PoolConfig::from_app_config(config);
    let pool = kartowl_db::connect_pool(database_url, pool_config).await?;
    let applied = kartowl_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations complete");

    Ok(HistoryStore::new(Arc::new(PgHistoryRepository::new(pool))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
