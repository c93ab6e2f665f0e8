use std::path::PathBuf;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use garden::account::{Account, issue_token};
use garden::{AppState, GardenConfig, PgStore, create_router};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(optional, "PostgreSQL database URL")]
    database_url: Option<String>,
    #[arrrg(flag, "Keep records, accounts and pictures in memory")]
    in_memory: bool,
    #[arrrg(optional, "Directory holding uploaded pictures")]
    media_root: Option<String>,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const HELP_TEXT: &str = r#"gardend - botanical catalog server

USAGE:
    gardend [OPTIONS]

OPTIONS:
    --host <HOST>            Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>            Port to bind the HTTP server [default: 8000]
    --database-url <URL>     PostgreSQL database URL [default: DATABASE_URL or POSTGRES_*]
    --in-memory              Keep records, accounts and pictures in memory
    --media-root <DIR>       Directory holding uploaded pictures [default: media]
    --verbose                Enable verbose logging

DESCRIPTION:
    Serves the catalog pages, the REST API under /api/, the login pages under
    /api-auth/ and public pictures under /media/.

    Settings are read from the environment (and .env) first; flags override them.
    In memory mode, GARDEN_ADMIN_USERNAME and GARDEN_ADMIN_PASSWORD create a
    superuser at startup and its API token is logged.

    The server supports graceful shutdown via SIGTERM or Ctrl+C."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line("USAGE: gardend [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    let default_filter = if args.verbose {
        "garden=debug,tower_http=debug"
    } else {
        "garden=info,tower_http=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = GardenConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = Some(database_url);
    }
    if let Some(media_root) = args.media_root {
        config.media_root = PathBuf::from(media_root);
    }

    let state = match (&config.database_url, args.in_memory) {
        (Some(database_url), false) => {
            let store = PgStore::connect(database_url).await?;
            tracing::info!("connected to PostgreSQL");
            let state = AppState::postgres(store, config.clone());
            match state.ensure_buckets().await {
                Ok(()) => {}
                Err(e) if config.consistency_check => return Err(e.into()),
                Err(e) => tracing::warn!(error = %e, "could not create buckets; uploads will retry"),
            }
            state
        }
        (None, false) => {
            tracing::warn!("no database configured; keeping everything in memory");
            in_memory_state(config.clone()).await?
        }
        (_, true) => in_memory_state(config.clone()).await?,
    };

    let app = create_router(state);
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;
    tracing::info!(address = %addr, "garden listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("garden stopped");
    Ok(())
}

async fn in_memory_state(config: GardenConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let state = AppState::in_memory(config);
    state.ensure_buckets().await?;
    let username = std::env::var("GARDEN_ADMIN_USERNAME").ok();
    let password = std::env::var("GARDEN_ADMIN_PASSWORD").ok();
    if let (Some(username), Some(password)) = (username, password) {
        let account = Account::new(&username, &password, true)?;
        state.accounts.create_account(&account).await?;
        let token = issue_token(state.accounts.as_ref(), &account).await?;
        tracing::info!(username = %username, token = %token, "created superuser");
    }
    Ok(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
