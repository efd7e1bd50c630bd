use std::sync::Arc;

use anyhow::Context;
use server::{AppState, ServerConfig, routes};
use services::services::{
    board::Board,
    board_api::HttpBoardApi,
    config::BoardConfig,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init();

    let board_config = BoardConfig::from_env().context("invalid board configuration")?;
    let server_config = ServerConfig::from_env().context("invalid server configuration")?;

    let api = HttpBoardApi::new(&board_config).context("failed to build backend client")?;
    info!(base_url = %board_config.api_base_url, "Using assignment backend");
    let (board, worker) = Board::spawn(Arc::new(api), &board_config);

    let app = routes::router(AppState::new(board.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = server_config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    board.shutdown().await;
    worker.await?;
    Ok(())
}
