use clap::Parser;
use statichost::app::App;
use statichost::config::AppConfig;
use statichost::pipeline::worker::run_flush_worker;
use statichost::storage;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "statichost", about = "Multi-tenant static site hosting with visit analytics")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statichost=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))?;

    if let Err(msg) = config.validate() {
        eprintln!("Configuration error: {msg}");
        return Err(msg.into());
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        db = %config.database.path.display(),
        data_dir = %config.sites.data_dir.display(),
        "starting statichost"
    );

    // Setup SQLite pool
    let pool = storage::sqlite::create_pool(&config.database)?;
    storage::sqlite::init_pool(&pool).await?;
    tracing::info!("database initialized");

    let app = App::build(&config, pool).await?;

    // Spawn flush worker
    let shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn(run_flush_worker(
        app.reconciler.clone(),
        Duration::from_secs(config.pipeline.flush_interval_secs),
        shutdown.clone(),
    ));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(
        listener,
        app.router
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Requests have drained; persist what is still buffered.
    shutdown.cancel();
    let flush_timeout = Duration::from_secs(config.pipeline.shutdown_flush_timeout_secs);
    if tokio::time::timeout(flush_timeout, worker_handle).await.is_err() {
        tracing::warn!(
            timeout_secs = config.pipeline.shutdown_flush_timeout_secs,
            "final analytics flush timed out, counters left in store"
        );
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    tracing::info!("shutting down...");
}
