//! REST implementation of [`ImageryService`].
//!
//! All operations are JSON POSTs under `/v1/projects/{project}/`. The
//! service owns scene storage and expression evaluation; this client only
//! shapes requests, attaches bearer tokens and decodes responses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::TokenProvider;
use crate::error::{EeError, EeResult};
use crate::expr::ImageExpr;
use crate::query::SceneQuery;
use crate::reduce::{BandValues, RegionReduction};
use crate::service::ImageryService;
use crate::vis::VisParams;

/// Regional reductions can take a while server-side.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct EeRestClient {
    client: reqwest::Client,
    endpoint: String,
    project: String,
    tokens: Arc<dyn TokenProvider>,
}

#[derive(Serialize)]
struct DatesRequest<'a> {
    query: &'a SceneQuery,
}

#[derive(Deserialize)]
struct DatesResponse {
    dates: Vec<NaiveDate>,
}

#[derive(Serialize)]
struct CountRequest<'a> {
    query: &'a SceneQuery,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Serialize)]
struct ComputeRequest<'a> {
    expression: &'a ImageExpr,
    reduction: &'a RegionReduction,
}

#[derive(Deserialize)]
struct ComputeResponse {
    values: BandValues,
}

#[derive(Serialize)]
struct MapRequest<'a> {
    expression: &'a ImageExpr,
    vis_params: &'a VisParams,
}

#[derive(Deserialize)]
struct MapResponse {
    /// Opaque map name, e.g. `projects/demo/maps/abc123`.
    name: String,
}

impl EeRestClient {
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> EeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EeError::Remote(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project: project.into(),
            tokens,
        })
    }

    fn url(&self, operation: &str) -> String {
        format!("{}/v1/projects/{}/{}", self.endpoint, self.project, operation)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, url: &str, body: &B) -> EeResult<R> {
        let token = self.tokens.bearer_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(EeError::Auth(format!("service rejected credentials ({})", status)));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let snippet: String = detail.chars().take(200).collect();
            return Err(EeError::Remote(format!("{} returned {}: {}", url, status, snippet)));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| EeError::Protocol(format!("malformed response from {}: {}", url, e)))
    }
}

#[async_trait]
impl ImageryService for EeRestClient {
    async fn list_dates(&self, query: &SceneQuery) -> Result<Vec<NaiveDate>, EeError> {
        let url = self.url("dates:list");
        let response: DatesResponse = self.post(&url, &DatesRequest { query }).await?;
        debug!(dates = response.dates.len(), "Listed acquisition dates");
        Ok(response.dates)
    }

    async fn count_scenes(&self, query: &SceneQuery) -> Result<u64, EeError> {
        let url = self.url("scenes:count");
        let response: CountResponse = self.post(&url, &CountRequest { query }).await?;
        Ok(response.count)
    }

    async fn reduce_region(
        &self,
        image: &ImageExpr,
        reduction: &RegionReduction,
    ) -> Result<BandValues, EeError> {
        let url = self.url("value:compute");
        let response: ComputeResponse = self
            .post(&url, &ComputeRequest { expression: image, reduction })
            .await?;
        Ok(response.values)
    }

    async fn tile_url(&self, image: &ImageExpr, vis: &VisParams) -> Result<String, EeError> {
        let url = self.url("maps");
        let response: MapResponse = self
            .post(&url, &MapRequest { expression: image, vis_params: vis })
            .await?;
        Ok(format!(
            "{}/v1/{}/tiles/{{z}}/{{x}}/{{y}}",
            self.endpoint, response.name
        ))
    }
}
