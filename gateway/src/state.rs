use std::sync::Arc;

use sqlx::PgPool;

use crate::config::GatewayConfig;
use crate::oracle::OllamaClient;
use crate::pipeline::PipelineEngine;
use crate::store::PgStore;

/// Concrete engine wiring used by the running gateway: Postgres persistence
/// and one Ollama client playing both oracle roles.
pub type GatewayPipeline = PipelineEngine<PgStore, OllamaClient, OllamaClient>;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<GatewayConfig>,
    pub pipeline: Arc<GatewayPipeline>,
    pub http: reqwest::Client,
}
