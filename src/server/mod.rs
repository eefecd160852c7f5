// Solace - HTTP Server Module
// Thin JSON surface over the chat pipeline and resource cache

mod handlers;

pub use handlers::{create_router, health_check, AppError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::pipeline::TurnPipeline;
use crate::resources::{ResourceLibrary, ResourceScraper};

/// Shared state behind every handler
pub struct AppServer {
    pipeline: Arc<TurnPipeline>,
    library: ResourceLibrary,
    scraper: ResourceScraper,
    config: ServerConfig,
    started_at: Instant,
    started: DateTime<Utc>,
}

impl AppServer {
    pub fn new(config: &Config, pipeline: TurnPipeline) -> Result<Self> {
        let scraper = ResourceScraper::new(
            config.resources.sources.clone(),
            config.resources.timeout(),
        )?;

        Ok(Self {
            pipeline: Arc::new(pipeline),
            library: ResourceLibrary::new(config.resources.dir.clone()),
            scraper,
            config: config.server.clone(),
            started_at: Instant::now(),
            started: Utc::now(),
        })
    }

    /// Start the HTTP server and run until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.config.bind_address))?;
        let cors_enabled = self.config.cors_enabled;

        let mut app = create_router(Arc::new(self)).layer(TraceLayer::new_for_http());
        if cors_enabled {
            app = app.layer(CorsLayer::permissive());
        }

        tracing::info!("Starting Solace server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn pipeline(&self) -> &Arc<TurnPipeline> {
        &self.pipeline
    }

    pub fn library(&self) -> &ResourceLibrary {
        &self.library
    }

    pub fn scraper(&self) -> &ResourceScraper {
        &self.scraper
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
