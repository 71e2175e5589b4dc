use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

pub const NOTION_REQUESTS: &str = "folio_notion_requests_total";
pub const NOTION_RETRIES: &str = "folio_notion_retries_total";
pub const NOTION_REQUEST_MS: &str = "folio_notion_request_ms";
pub const CACHE_HITS: &str = "folio_content_cache_hit_total";
pub const CACHE_MISSES: &str = "folio_content_cache_miss_total";
pub const CACHE_STALE_SERVED: &str = "folio_content_cache_stale_total";
pub const VIEW_INCREMENTS: &str = "folio_view_increment_total";

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            NOTION_REQUESTS,
            Unit::Count,
            "Total number of requests sent to the Notion API."
        );
        describe_counter!(
            NOTION_RETRIES,
            Unit::Count,
            "Total number of Notion requests retried after throttling or failure."
        );
        describe_histogram!(
            NOTION_REQUEST_MS,
            Unit::Milliseconds,
            "Notion request latency in milliseconds."
        );
        describe_counter!(
            CACHE_HITS,
            Unit::Count,
            "Total number of fresh content-cache hits."
        );
        describe_counter!(
            CACHE_MISSES,
            Unit::Count,
            "Total number of content-cache misses or expirations."
        );
        describe_counter!(
            CACHE_STALE_SERVED,
            Unit::Count,
            "Total number of stale content-cache entries served after a failed refresh."
        );
        describe_counter!(
            VIEW_INCREMENTS,
            Unit::Count,
            "Total number of page view increments."
        );
    });
}
