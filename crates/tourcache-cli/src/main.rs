//! tourcache - command-line front end for the offline tourism cache.
//!
//! Syncs the remote collections into the local SQLite cache and inspects or
//! clears what is stored there.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tourcache_core::{
    CacheDatabase, CacheStore, Config, EntityKind, HttpRemoteStore, KindOutcome, RemoteDocument,
    RemoteError, RemoteStore, Session, SessionData, SyncOrchestrator, SyncOutcome, SyncSettings,
};

const USAGE: &str = "\
Usage: tourcache [--log-file] <command>

Commands:
  sync                               Pull every collection into the offline cache
  stats                              Show cached row counts and last sync time
  clear --yes                        Delete all offline data (cannot be undone)
  settings [offline|auto-sync] [on|off]
                                     Show or change sync settings
  login <user-id> [display name]     Set the active user
  logout                             Clear the active user";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=tourcache_core=debug).
/// With `log_dir`, a daily-rotated file receives the same events.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "tourcache.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Stand-in used when no remote URL is configured; every fetch fails.
struct UnconfiguredRemote;

#[async_trait]
impl RemoteStore for UnconfiguredRemote {
    async fn fetch_all(&self, _kind: EntityKind) -> Result<Vec<RemoteDocument>, RemoteError> {
        Err(RemoteError::Unavailable("no remote URL configured".to_string()))
    }

    async fn fetch_for_user(
        &self,
        _kind: EntityKind,
        _user_id: &str,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        Err(RemoteError::Unavailable("no remote URL configured".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let log_to_file = if let Some(pos) = args.iter().position(|a| a == "--log-file") {
        args.remove(pos);
        true
    } else {
        false
    };

    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

    let log_dir = cache_dir.join("logs");
    let _log_guard = init_tracing(log_to_file.then_some(log_dir.as_path()));
    info!(cache_dir = %cache_dir.display(), "tourcache starting");

    let session = Arc::new(Session::new(cache_dir.clone()));
    if let Err(e) = session.load() {
        warn!("Ignoring unreadable session: {:#}", e);
    }

    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    match command {
        "login" => login(&session, rest),
        "logout" => {
            session.clear()?;
            println!("Signed out");
            Ok(())
        }
        "settings" => settings(&SyncSettings::open_in(&cache_dir)?, rest),
        "sync" | "stats" | "clear" => {
            let orchestrator = build_orchestrator(&config, &cache_dir, session).await?;
            match command {
                "sync" => {
                    config.require_remote_url()?;
                    sync(&orchestrator).await
                }
                "stats" => stats(&orchestrator).await,
                _ => clear(&orchestrator, rest).await,
            }
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

async fn build_orchestrator(
    config: &Config,
    cache_dir: &Path,
    session: Arc<Session>,
) -> Result<SyncOrchestrator> {
    let db_path = config.database_path()?;
    let db = CacheDatabase::open(&db_path)
        .await
        .with_context(|| format!("Failed to open cache at {}", db_path.display()))?;

    let remote: Arc<dyn RemoteStore> = match config.remote_url.as_deref() {
        Some(url) => {
            let store = HttpRemoteStore::new(url)?;
            Arc::new(match config.api_token.as_deref() {
                Some(token) => store.with_token(token),
                None => store,
            })
        }
        None => Arc::new(UnconfiguredRemote),
    };

    let settings = Arc::new(SyncSettings::open_in(cache_dir)?);
    Ok(SyncOrchestrator::new(CacheStore::new(db), remote, session, settings))
}

async fn sync(orchestrator: &SyncOrchestrator) -> Result<()> {
    let outcome = orchestrator.sync_from_remote().await;

    if let Some(report) = outcome.report() {
        for (kind, result) in &report.kinds {
            let line = match result {
                KindOutcome::Synced { written } => format!("{} synced", written),
                KindOutcome::Partial { written, discarded } => {
                    format!("{} synced, {} malformed skipped", written, discarded)
                }
                KindOutcome::Failed { error } => format!("failed: {}", error),
                KindOutcome::Skipped => "skipped (not signed in)".to_string(),
            };
            println!("  {:<10} {}", kind.to_string(), line);
        }
    }
    println!("{}", outcome.summary());

    if let SyncOutcome::Aborted { error, .. } = outcome {
        bail!("Sync aborted: {}", error);
    }
    Ok(())
}

async fn stats(orchestrator: &SyncOrchestrator) -> Result<()> {
    let stats = orchestrator.get_stats().await?;
    println!("Tourist spots: {}", stats.spot_count);
    println!("Events:        {}", stats.event_count);
    println!("Blog posts:    {}", stats.post_count);
    println!("Favorites:     {}", stats.favorite_count);
    println!("Check-ins:     {}", stats.check_in_count);
    println!("Last sync:     {}", stats.last_sync_time.age_display(Utc::now()));
    println!("Estimated size: {:.2} MB", stats.estimated_size_mb);
    Ok(())
}

async fn clear(orchestrator: &SyncOrchestrator, args: &[String]) -> Result<()> {
    if !args.iter().any(|a| a == "--yes") {
        bail!("This deletes all offline data and cannot be undone; pass --yes to confirm");
    }
    let deleted = orchestrator.clear_offline_data().await?;
    println!("Deleted {} cached rows", deleted);
    Ok(())
}

fn settings(settings: &SyncSettings, args: &[String]) -> Result<()> {
    match args {
        [] => {}
        [name, value] => {
            let enabled = match value.as_str() {
                "on" | "true" => true,
                "off" | "false" => false,
                other => bail!("Expected on/off, got '{}'", other),
            };
            match name.as_str() {
                "offline" => settings.set_offline_mode_enabled(enabled)?,
                "auto-sync" => settings.set_auto_sync_enabled(enabled)?,
                other => bail!("Unknown setting '{}'", other),
            }
        }
        _ => bail!("{}", USAGE),
    }

    let current = settings.snapshot();
    println!("offline:   {}", on_off(current.offline_mode_enabled));
    println!("auto-sync: {}", on_off(current.auto_sync_enabled));
    println!("last sync: {}", current.last_sync_time.age_display(Utc::now()));
    Ok(())
}

fn login(session: &Session, args: &[String]) -> Result<()> {
    let Some(user_id) = args.first() else {
        bail!("Usage: tourcache login <user-id> [display name]");
    };
    let display_name = (args.len() > 1).then(|| args[1..].join(" "));
    session.sign_in(SessionData::new(user_id.clone(), display_name))?;
    println!("Signed in as {}", user_id);
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
