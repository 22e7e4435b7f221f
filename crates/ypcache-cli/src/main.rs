mod cache;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ypcache_scraper::{DirectoryScraper, ScraperConfig};

use crate::cache::CacheCommands;

#[derive(Debug, Parser)]
#[command(name = "ypcache-cli")]
#[command(about = "Directory scrape cache command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape the directory for a keyword and print the listings as JSON.
    /// The cache is not read or written.
    Scrape {
        keyword: String,
        /// Maximum number of listings to collect
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u16).range(1..=500))]
        size: u16,
    },
    /// Inspect or maintain the cache store
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check the database connection
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("ypcache-cli: see --help for commands");
        return Ok(());
    };

    let config = ypcache_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Scrape { keyword, size } => run_scrape(&config, &keyword, usize::from(size)).await,
        Commands::Cache { command } => {
            let pool = connect(&config).await?;
            let result = cache::run(&pool, command).await;
            pool.close().await;
            result
        }
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            let result = run_db(&pool, command).await;
            pool.close().await;
            result
        }
    }
}

async fn connect(config: &ypcache_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = ypcache_db::PoolConfig::from_app_config(config);
    Ok(ypcache_db::connect_pool(config.require_database_url()?, pool_config).await?)
}

async fn run_scrape(
    config: &ypcache_core::AppConfig,
    keyword: &str,
    size: usize,
) -> anyhow::Result<()> {
    let scraper = DirectoryScraper::new(ScraperConfig::from_app_config(config))
        .map_err(|e| anyhow::anyhow!("failed to build directory scraper: {e}"))?;

    let listings = scraper.scrape(keyword, size).await?;
    if listings.is_empty() {
        tracing::warn!(keyword, "no listings found");
    }
    println!("{}", serde_json::to_string_pretty(&listings)?);
    Ok(())
}

async fn run_db(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            ypcache_db::health_check(pool).await?;
            println!("database: ok");
        }
        DbCommands::Migrate => {
            let applied = ypcache_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}
