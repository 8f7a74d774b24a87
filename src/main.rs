use std::net::SocketAddr;

use report_assistant::core::config::AppPaths;
use report_assistant::core::logging;
use report_assistant::server::build_router;
use report_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let state = AppState::initialize().await?;

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("chat server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
