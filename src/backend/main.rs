/**
 * Snippets Server Entry Point
 *
 * This is the main entry point for the snippets backend server.
 * It loads configuration and serves the JSON API.
 */

use std::net::SocketAddr;
use std::path::Path;

use snippets::backend::server::{create_app, ServerConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let config = ServerConfig::from_env()?;

    // The guard flushes buffered file output on shutdown
    let _log_guard = init_tracing(config.log_file.as_deref())?;

    tracing::info!("[STARTUP] Server initialization started");

    let port = config.port;

    // Create the Axum app
    let app = create_app(config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    // Run the server; the peer address feeds the rate limiter
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Initialize tracing with INFO level by default, writing to stdout or `log_file`
fn init_tracing(log_file: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(&env_filter))
            .init();
        return Ok(None);
    };

    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("LOG_FILE has no file name: {}", path.display()),
        )
    })?;
    let log_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .with_writer(writer)
        .with_ansi(false) // No ANSI colors in log files
        .init();

    Ok(Some(guard))
}
