use anyhow::Result;
use std::env;
use tracing::info;

use clubpass::create_router;
use clubpass::domain::init_database_with_retry_from_env;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber to log to stdout
    tracing_subscriber::fmt::init();
    info!("Starting clubpass authentication service...");

    // Bring up the Postgres pool (and schema) before accepting traffic.
    init_database_with_retry_from_env().await?;

    let app = create_router()?;

    // Get optional bind endpoint from environment
    let endpoint = env::var("CLUBPASS_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    info!(
        "clubpass v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        endpoint
    );

    let listener = tokio::net::TcpListener::bind(&endpoint).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
