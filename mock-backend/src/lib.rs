//! In-memory stand-in for the query backend.
//!
//! Serves the same REST surface as the real service but interprets nothing:
//! `/search` answers with a canned interpretation and started queries walk
//! through a scripted task plan, one step per listing request.

pub mod fixtures;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub use handlers::{build_router, Ack};
pub use state::{AppState, MockQuery, RecordedRequest, TaskPlan};

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, build_router(state)).await
}

/// Binds an ephemeral port on localhost and serves in the background.
pub async fn spawn_local(state: AppState) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    info!("mock backend listening on {}", addr);

    tokio::spawn(async move {
        if let Err(err) = serve(listener, state).await {
            tracing::error!("mock backend stopped: {}", err);
        }
    });
    Ok(addr)
}
