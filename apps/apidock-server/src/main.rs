//! apidock API server binary.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use apidock_audit::AuditLog;
use apidock_storage::Store;
use apidock_store_sqlite::SqliteStore;

mod envelope;
mod handlers;
mod policy;
mod routes;
mod server;
#[cfg(test)]
mod tests;

use server::ApiServer;

#[derive(Parser)]
#[command(name = "apidock-server", about = "API documentation platform server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,

        /// SQLite database URL
        #[arg(long, env = "DATABASE_URL", default_value = "sqlite://apidock.db?mode=rwc")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { addr, database_url } => serve(&addr, &database_url).await,
    }
}

async fn serve(addr: &str, database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteStore::open(database_url).await?);
    tracing::info!("database ready at {}", database_url);

    let server = ApiServer::new(
        store.clone() as Arc<dyn Store>,
        store as Arc<dyn AuditLog>,
    );
    let app = routes::router(server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {}", e);
        return;
    }
    tracing::info!("shutting down");
}
