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
            "florette_request_cache_hit_total",
            Unit::Count,
            "Storefront reads answered from the request cache."
        );
        describe_counter!(
            "florette_request_cache_miss_total",
            Unit::Count,
            "Storefront reads that ran the underlying query."
        );
        describe_counter!(
            "florette_request_cache_invalidate_total",
            Unit::Count,
            "Full request-cache invalidations after admin writes."
        );
        describe_counter!(
            "florette_upload_publish_failed_total",
            Unit::Count,
            "Uploads stored locally whose publish step failed."
        );
        describe_counter!(
            "florette_admin_login_rejected_total",
            Unit::Count,
            "Admin login attempts rejected for a wrong password."
        );
        describe_counter!(
            "florette_admin_login_throttled_total",
            Unit::Count,
            "Admin login attempts refused by the rate limiter."
        );
        describe_histogram!(
            "florette_http_request_ms",
            Unit::Milliseconds,
            "HTTP request latency in milliseconds."
        );
    });
}
