use anyhow::Result;
use mock_backend::{fixtures, serve, AppState};
use std::env;
use tokio::net::TcpListener;
use tracing::info;

/// - `MOCK_BACKEND_ADDR` when set
/// - otherwise 0.0.0.0:9000, the port the client expects by default
fn bind_addr() -> String {
    env::var("MOCK_BACKEND_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("mock_backend=debug,tower_http=info")
        .init();

    let state = AppState::with_queries(fixtures::demo_queries());

    let listener = TcpListener::bind(bind_addr()).await?;
    info!("mock backend listening on {}", listener.local_addr()?);

    serve(listener, state).await?;
    Ok(())
}
