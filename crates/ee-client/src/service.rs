//! The imagery service abstraction.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::EeError;
use crate::expr::ImageExpr;
use crate::query::SceneQuery;
use crate::reduce::{BandValues, RegionReduction};
use crate::vis::VisParams;

/// Remote evaluation of image expressions.
///
/// [`crate::rest::EeRestClient`] implements this against the real service;
/// tests substitute scripted implementations. All four operations are
/// independent round trips and safe to issue concurrently.
#[async_trait]
pub trait ImageryService: Send + Sync {
    /// Distinct acquisition dates with at least one scene matching the query.
    async fn list_dates(&self, query: &SceneQuery) -> Result<Vec<NaiveDate>, EeError>;

    /// Number of scenes matching the query.
    async fn count_scenes(&self, query: &SceneQuery) -> Result<u64, EeError>;

    /// Evaluate an expression and reduce it over a region, one value per band.
    async fn reduce_region(
        &self,
        image: &ImageExpr,
        reduction: &RegionReduction,
    ) -> Result<BandValues, EeError>;

    /// Publish an expression as a styled tile layer and return its URL
    /// template (with `{z}/{x}/{y}` placeholders).
    async fn tile_url(&self, image: &ImageExpr, vis: &VisParams) -> Result<String, EeError>;
}
