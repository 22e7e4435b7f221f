mod api;
mod middleware;
mod resolver;
mod scheduler;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use ypcache_db::PgCacheStore;
use ypcache_scraper::{DirectoryScraper, ScraperConfig};

use crate::{
    api::{build_app, AppState},
    resolver::Resolver,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ypcache_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting ypcache-server");

    let pool_config = ypcache_db::PoolConfig::from_app_config(&config);
    let pool = ypcache_db::connect_pool(config.require_database_url()?, pool_config).await?;
    let applied = ypcache_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let store = Arc::new(PgCacheStore::new(pool.clone()));
    let scraper = Arc::new(DirectoryScraper::new(ScraperConfig::from_app_config(
        &config,
    ))?);

    let mut scheduler = scheduler::build_scheduler(Arc::clone(&store), &config).await?;

    let app = build_app(AppState {
        resolver: Arc::new(Resolver::new(store, scraper)),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "scheduler did not shut down cleanly");
    }
    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
