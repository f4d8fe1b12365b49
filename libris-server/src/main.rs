//! `libris` — serves the author/book relation API.
//!
//! Configure with `LIBRIS_BIND_ADDR` / `LIBRIS_MAX_BODY_BYTES`, log level
//! with `RUST_LOG`. Stops cleanly on Ctrl-C.

use libris_server::{CatalogServer, ServerConfig};

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown signal received"),
        Err(e) => {
            log::error!("Cannot listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    log::info!("Starting libris on {}...", config.bind_addr);
    let server = CatalogServer::new(config);
    if let Err(e) = server.run_until(shutdown_signal()).await {
        log::error!("Server error: {e}");
        std::process::exit(1);
    }
}
