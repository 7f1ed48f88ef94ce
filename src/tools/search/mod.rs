pub mod google;

use crate::core::config::{PipelineTimeouts, SearchConfig};
use crate::core::error::SearchError;
use crate::core::types::{ExtractionResult, SearchRequest};
use crate::scraping::session::Session;
use crate::tools::extract::{extract_link, ExtractOptions};
use futures::future::join_all;
use std::time::Instant;
use tracing::info;

/// Run one complete search: open a browser session, harvest, extract, close.
///
/// Only request validation, session start-up and harvesting can fail the
/// call; links that cannot be extracted are left out of the result.
pub async fn search(
    request: &SearchRequest,
    config: &SearchConfig,
) -> Result<Vec<ExtractionResult>, SearchError> {
    let request = request.clone().validate()?;
    let session = Session::open(&config.session_options(&request)).await?;
    search_with_session(&session, &request, &config.pipeline_timeouts()).await
}

/// Validate, run and then close `session`, on every path.
pub async fn search_with_session(
    session: &Session,
    request: &SearchRequest,
    timeouts: &PipelineTimeouts,
) -> Result<Vec<ExtractionResult>, SearchError> {
    let outcome = match request.clone().validate() {
        Ok(request) => run_search(session, &request, timeouts).await,
        Err(e) => Err(e),
    };
    session.close().await;
    outcome
}

/// Harvest and extract on an already-open session. Does not close it.
pub async fn run_search(
    session: &Session,
    request: &SearchRequest,
    timeouts: &PipelineTimeouts,
) -> Result<Vec<ExtractionResult>, SearchError> {
    let start = Instant::now();
    info!("🔍 Searching: {}", request.query);

    let mut links = google::harvest(session, request, timeouts.harvest).await?;
    links.truncate(request.result_limit);

    let options = ExtractOptions {
        navigation_timeout: timeouts.navigation,
        truncate: request.content_truncate_length,
    };
    let extracted = join_all(links.iter().map(|link| extract_link(session, link, options))).await;
    let results: Vec<ExtractionResult> = extracted.into_iter().flatten().collect();

    info!(
        "✅ Search finished: {}/{} links extracted in {}ms",
        results.len(),
        links.len(),
        start.elapsed().as_millis()
    );
    Ok(results)
}
