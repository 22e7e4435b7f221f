//! Cache maintenance command handlers for the CLI.

use chrono::Utc;
use clap::Subcommand;
use ypcache_core::CachedResponse;

/// Sub-commands available under `cache`.
#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Print the stored entry for a keyword with its age and freshness
    Show {
        keyword: String,
        /// Print the full result documents, not just the summary
        #[arg(long)]
        full: bool,
    },
    /// Delete the stored entry for a keyword
    Evict { keyword: String },
    /// Delete every entry older than the freshness window
    Sweep,
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: CacheCommands) -> anyhow::Result<()> {
    match command {
        CacheCommands::Show { keyword, full } => show(pool, &keyword, full).await,
        CacheCommands::Evict { keyword } => {
            let removed = ypcache_db::delete_cached_response(pool, &keyword).await?;
            if removed == 0 {
                println!("no cached entry for '{keyword}'");
            } else {
                println!("evicted '{keyword}'");
            }
            Ok(())
        }
        CacheCommands::Sweep => {
            let cutoff = CachedResponse::expiry_cutoff(Utc::now());
            let removed = ypcache_db::delete_expired_responses(pool, cutoff).await?;
            println!("removed {removed} expired entr{}", if removed == 1 { "y" } else { "ies" });
            Ok(())
        }
    }
}

async fn show(pool: &sqlx::PgPool, keyword: &str, full: bool) -> anyhow::Result<()> {
    let Some(entry) = ypcache_db::find_cached_response(pool, keyword).await? else {
        println!("no cached entry for '{keyword}'");
        return Ok(());
    };

    println!("{}", summarize(&entry, Utc::now()));
    if full {
        println!("{}", serde_json::to_string_pretty(&entry.results)?);
    }
    Ok(())
}

/// One-line description of an entry as seen at `now`.
fn summarize(entry: &CachedResponse, now: chrono::DateTime<Utc>) -> String {
    let age = entry.age(now);
    format!(
        "{keyword}: {size} result(s), cached {date} ({hours}h {minutes}m ago), {state}",
        keyword = entry.keyword,
        size = entry.size,
        date = entry.date.format("%Y-%m-%d %H:%M:%S UTC"),
        hours = age.num_hours(),
        minutes = age.num_minutes() % 60,
        state = if entry.is_fresh(now) { "fresh" } else { "stale" },
    )
}
