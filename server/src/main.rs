use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use todo_api::{logging, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is the normal case in production.
    let _ = dotenvy::dotenv();
    let config = Config::parse();
    logging::init(config.log_format);

    let state = AppState::connect(&config).await;

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let port = listener.local_addr()?.port();
    info!(%addr, "Todo API listening");
    info!("Health: http://localhost:{port}/health");
    info!("Todos:  http://localhost:{port}/todos");

    todo_api::run_until_shutdown(listener, state).await?;
    Ok(())
}
