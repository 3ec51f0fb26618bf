//! Application state and shared resources.

use std::env;
use std::sync::Arc;

use analysis::{AnalysisConfig, AnalysisPipeline, TileService};
use anyhow::{Context, Result};
use ee_client::auth::{RefreshingToken, StaticToken, TokenProvider};
use ee_client::{EeRestClient, ImageryService};
use storage::MeasurementStore;
use tracing::{info, warn};

/// Imagery service endpoint used when `EE_ENDPOINT` is not set.
const DEFAULT_ENDPOINT: &str = "https://earthengine.googleapis.com";

/// Token endpoint used when neither `EE_ACCESS_TOKEN` nor `EE_TOKEN_URL`
/// is set; this is the GCE instance metadata endpoint.
const DEFAULT_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Shared application state.
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    pub tiles: TileService,
    pub imagery: Arc<dyn ImageryService>,
    pub store: Option<MeasurementStore>,
}

impl AppState {
    /// Build state from environment configuration.
    pub async fn new() -> Result<Self> {
        let endpoint = env::var("EE_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let project = env::var("EE_PROJECT").context("EE_PROJECT must be set")?;

        let tokens: Arc<dyn TokenProvider> = match env::var("EE_ACCESS_TOKEN") {
            Ok(token) => Arc::new(StaticToken::new(token)),
            Err(_) => {
                let token_url =
                    env::var("EE_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string());
                Arc::new(RefreshingToken::new(reqwest::Client::new(), token_url))
            }
        };
        let imagery: Arc<dyn ImageryService> =
            Arc::new(EeRestClient::new(endpoint, project, tokens)?);

        let mut config = AnalysisConfig::default();
        if let Ok(raw) = env::var("ANALYSIS_MAX_CONCURRENT") {
            if let Ok(parsed) = raw.parse::<usize>() {
                config.max_concurrent = parsed;
            }
        }

        let store = match env::var("DATABASE_URL") {
            Ok(url) => {
                let store = MeasurementStore::connect(&url).await?;
                store.migrate().await?;
                info!("Measurement persistence enabled");
                Some(store)
            }
            Err(_) => {
                warn!("DATABASE_URL not set, measurements will not be persisted");
                None
            }
        };

        Ok(Self::with_imagery(imagery, config, store))
    }

    /// Build state around a given imagery service. Tests hand in a
    /// scripted one.
    pub fn with_imagery(
        imagery: Arc<dyn ImageryService>,
        config: AnalysisConfig,
        store: Option<MeasurementStore>,
    ) -> Self {
        Self {
            pipeline: AnalysisPipeline::new(imagery.clone(), config),
            tiles: TileService::new(imagery.clone()),
            imagery,
            store,
        }
    }
}
