//! API module for the course pipeline
//!
//! Provides the REST and SSE endpoints consumed by the course frontend.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::pipeline::CoursePipeline;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{build_router, AppState};

/// API server wrapping the pipeline and its configuration
pub struct ApiServer {
    pipeline: Arc<CoursePipeline>,
    config: Arc<Config>,
}

impl ApiServer {
    pub fn new(pipeline: Arc<CoursePipeline>, config: Arc<Config>) -> Self {
        Self { pipeline, config }
    }

    /// Start the API server and serve until shutdown
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.config.server.port);

        server::start_http_server(AppState {
            pipeline: self.pipeline,
            config: self.config,
        })
        .await
    }
}
