use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use axum::Router;
use routes::{create_router, SharedStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    stats::service::StatsService,
    storage::file_store::FileStore,
    utils::clock::DefaultClock,
};

pub mod args;
pub mod routes;
pub mod shutdown;

/// Represents the starting point for the server. Data is kept in `dir/data`.
pub async fn start_server(dir: PathBuf, addr: SocketAddr) -> Result<()> {
    let store: SharedStore = Arc::new(FileStore::new(dir.join("data"))?);
    let router = create_router(StatsService::new(store, Box::new(DefaultClock)));

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    let shutdown_token = CancellationToken::new();

    let (_, serve_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        serve(listener, router, shutdown_token),
    );

    if let Err(serve_result) = &serve_result {
        error!("Server stopped with an error {:?}", serve_result);
    }

    serve_result
}

/// Serves requests until the token is cancelled. Cancels the token itself if serving stops for
/// any other reason.
async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    let token = shutdown.clone();
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await;
    shutdown.cancel();
    info!("Server stopped");
    Ok(result?)
}
