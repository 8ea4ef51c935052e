use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reminote::i18n::Translations;
use reminote::utils::ensure_database_directory;
use reminote::web::{AppState, app};
use reminote::{Config, Database, SessionStore};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// How often expired sessions are swept from the database.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// reminote - personal notes with reminders and cloud attachments
#[derive(Parser)]
#[command(name = "reminote")]
#[command(about = "Personal notes web server with due-reminder notifications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve(ServeCommand),
    /// Apply pending database migrations and exit
    Migrate(MigrateCommand),
}

#[derive(Parser, Default)]
struct ServeCommand {
    /// Address to listen on, overriding REMINOTE_BIND
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// SQLite database file, overriding REMINOTE_DATABASE
    #[arg(short, long, value_name = "PATH")]
    database: Option<PathBuf>,
}

#[derive(Parser)]
struct MigrateCommand {
    /// SQLite database file, overriding REMINOTE_DATABASE
    #[arg(short, long, value_name = "PATH")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reminote=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Serve(cmd)) => handle_serve(cmd).await,
        None => handle_serve(ServeCommand::default()).await,
        Some(Commands::Migrate(cmd)) => handle_migrate(cmd),
    };

    if let Err(e) = result {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn open_database(path: &Path) -> Result<Database> {
    ensure_database_directory(path)?;
    let db = Database::open(path).context("Failed to open database")?;
    info!(path = %path.display(), "database ready");
    Ok(db)
}

fn handle_migrate(cmd: MigrateCommand) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(database) = cmd.database {
        config.database = database;
    }
    // opening applies pending migrations
    let db = open_database(&config.database)?;
    info!(version = db.schema_version()?, "schema up to date");
    Ok(())
}

async fn handle_serve(cmd: ServeCommand) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(bind) = cmd.bind {
        config.bind = bind;
    }
    if let Some(database) = cmd.database {
        config.database = database;
    }

    let translations = match &config.translations {
        Some(path) => Translations::from_file(path, &config.default_lang)?,
        None => Translations::embedded(&config.default_lang)?,
    };

    let db = Arc::new(open_database(&config.database)?);
    let bind = config.bind;
    let state = AppState::new(config, db, translations)?;

    if state.cloud.is_none() {
        warn!("cloud storage not configured, attachment routes will answer 503");
    }

    tokio::spawn(purge_sessions(state.sessions.clone()));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(%bind, "listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn purge_sessions(sessions: SessionStore) {
    let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        ticker.tick().await;
        match sessions.purge_expired() {
            Ok(0) => {}
            Ok(removed) => info!(removed, "purged expired sessions"),
            Err(e) => warn!(error = %e, "failed to purge expired sessions"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
