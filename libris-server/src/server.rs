//! HTTP server owning one [`BookAuthorStore`].
//!
//! ```text
//! Client A ──┐
//!            ├── axum Router ── Arc<BookAuthorStore> ── RwLock<authors, books>
//! Client B ──┘
//! ```
//!
//! The store is created with the server and dropped with it; nothing is
//! persisted between runs.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::Router;
use libris_core::BookAuthorStore;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::routes;

/// The catalog server.
pub struct CatalogServer {
    config: ServerConfig,
    store: Arc<BookAuthorStore>,
}

impl CatalogServer {
    /// Create a server with a fresh, empty store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(BookAuthorStore::new()))
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Serve an existing store (shared with the caller).
    pub fn with_store(config: ServerConfig, store: Arc<BookAuthorStore>) -> Self {
        Self { config, store }
    }

    pub fn router(&self) -> Router {
        routes::router(self.store.clone(), self.config.max_body_bytes)
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn run(&self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// In-flight requests finish before this returns.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        log::info!("Catalog server listening on {addr}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        match self.store.stats() {
            Ok(stats) => log::info!(
                "Catalog server on {addr} stopped: {} authors, {} books, {} relations",
                stats.left_entities,
                stats.right_entities,
                stats.relations
            ),
            Err(e) => log::error!("Catalog server on {addr} stopped with unreadable store: {e}"),
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<BookAuthorStore> {
        &self.store
    }
}
