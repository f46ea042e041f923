//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - The bounded BFS frontier
//! - Static and headless fetch backends with retry logic
//! - Client-rendering detection for automatic backend selection
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod render;
mod spa;

pub use coordinator::Coordinator;
pub use fetcher::{
    backoff_delay, build_http_client, fetch_with_retry, FetchError, FetchOutcome, PageFetchResult,
    PageFetcher, RenderedSnapshot, StaticFetcher,
};
pub use frontier::{Frontier, PushOutcome, QueuedUrl};
pub use render::RenderedFetcher;
pub use spa::detect_spa;

use crate::config::{BackendKind, Config};
use crate::output::{CrawlReport, DiagnosticRecord, DiagnosticSink, TracingSink};
use crate::url::normalize_url;
use crate::DiscoveryError;
use std::sync::Arc;
use std::time::Duration;

/// Builds the fetch backend the configuration asks for
///
/// `auto` fetches the first seed statically and switches to the rendered
/// backend when the page shows client-rendering signals. A browser that
/// cannot be launched falls back to the static backend.
pub async fn select_fetcher(
    config: &Config,
    sink: &dyn DiagnosticSink,
) -> Result<Arc<dyn PageFetcher>, DiscoveryError> {
    let static_fetcher = Arc::new(StaticFetcher::new(config)?);

    let (wanted, reason) = match config.crawl.backend {
        BackendKind::Static => (BackendKind::Static, "configured".to_string()),
        BackendKind::Rendered => (BackendKind::Rendered, "configured".to_string()),
        BackendKind::Auto => probe_first_seed(config, static_fetcher.as_ref()).await?,
    };

    let fetcher: Arc<dyn PageFetcher> = match wanted {
        BackendKind::Rendered => match RenderedFetcher::launch(config).await {
            Ok(rendered) => {
                sink.record(DiagnosticRecord::BackendSelected {
                    backend: BackendKind::Rendered,
                    reason,
                });
                return Ok(Arc::new(rendered));
            }
            Err(e) => {
                tracing::warn!("Rendered backend unavailable ({}), falling back to static fetch", e);
                sink.record(DiagnosticRecord::BackendSelected {
                    backend: BackendKind::Static,
                    reason: format!("browser launch failed: {}", e),
                });
                static_fetcher
            }
        },
        _ => {
            sink.record(DiagnosticRecord::BackendSelected {
                backend: BackendKind::Static,
                reason,
            });
            static_fetcher
        }
    };

    Ok(fetcher)
}

/// Fetches the first seed and looks for client-rendering markers
async fn probe_first_seed(
    config: &Config,
    fetcher: &StaticFetcher,
) -> Result<(BackendKind, String), DiscoveryError> {
    let Some(seed) = config.crawl.seeds.first() else {
        return Err(crate::ConfigError::NoSeeds.into());
    };
    let url = normalize_url(seed)?;
    let timeout = Duration::from_millis(config.crawl.page_timeout_ms);

    match fetcher.fetch(&url, timeout).await {
        Ok(page) => match detect_spa(&page.content) {
            Some(signal) => Ok((BackendKind::Rendered, format!("client rendering detected: {}", signal))),
            None => Ok((BackendKind::Static, "no client rendering detected".to_string())),
        },
        Err(e) => {
            tracing::warn!("Backend probe of {} failed: {}", url, e);
            Ok((BackendKind::Static, format!("probe failed: {}", e)))
        }
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the accepted domain set and seed the frontier
/// 2. Select the fetch backend
/// 3. Fetch pages in BFS order, extracting and fusing links
/// 4. Return the report with every page record and the summary
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished (completed or aborted with partial results)
/// * `Err(DiscoveryError)` - The configuration was unusable
pub async fn crawl(config: Config) -> Result<CrawlReport, DiscoveryError> {
    let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);

    // Fail on a bad domain set before any browser is launched
    crate::url::AdmissionFilter::from_config(&config)?;

    let fetcher = select_fetcher(&config, sink.as_ref()).await?;
    let coordinator = Coordinator::new(config, fetcher)?.with_sink(sink);
    Ok(coordinator.run().await)
}
