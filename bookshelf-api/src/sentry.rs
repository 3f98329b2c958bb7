use std::sync::Arc;

use anyhow::Result;
use bookshelf_config::Environment;
use bookshelf_config::shared::SentryConfig;
use tracing::info;

/// Endpoints polled by infrastructure, traced far less often than API calls.
const PROBE_ENDPOINTS: [&str; 2] = ["/health_check", "/metrics"];
const PROBE_SAMPLE_RATE: f32 = 0.001;
const DEFAULT_SAMPLE_RATE: f32 = 0.01;

/// Starts reporting errors and traces to Sentry when a DSN is configured.
pub fn init(config: Option<&SentryConfig>) -> Result<Option<sentry::ClientInitGuard>> {
    let Some(config) = config else {
        info!("sentry not configured, skipping initialization");
        return Ok(None);
    };

    let environment = Environment::load()?;
    info!(%environment, "initializing sentry");

    let options = sentry::ClientOptions {
        dsn: Some(config.dsn.expose_secret().parse()?),
        environment: Some(environment.to_string().into()),
        traces_sampler: Some(Arc::new(|ctx: &sentry::TransactionContext| {
            sample_trace_rate(ctx.name())
        })),
        // Request bodies carry passwords.
        max_request_body_size: sentry::MaxRequestBodySize::None,
        integrations: vec![Arc::new(
            sentry::integrations::panic::PanicIntegration::new(),
        )],
        attach_stacktrace: true,
        ..Default::default()
    };
    let guard = sentry::init(options);

    sentry::configure_scope(|scope| scope.set_tag("service", "bookshelf-api"));

    Ok(Some(guard))
}

/// Sampling rate for a transaction named like `GET /v1/books`.
fn sample_trace_rate(transaction_name: &str) -> f32 {
    let path = match transaction_name.split_once(' ') {
        Some((method, path)) if method.bytes().all(|b| b.is_ascii_uppercase()) => path,
        _ => transaction_name,
    };

    if PROBE_ENDPOINTS.contains(&path) {
        PROBE_SAMPLE_RATE
    } else {
        DEFAULT_SAMPLE_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_checks_are_sampled_less_than_api_calls() {
        assert_eq!(sample_trace_rate("GET /health_check"), PROBE_SAMPLE_RATE);
        assert_eq!(sample_trace_rate("GET /metrics"), PROBE_SAMPLE_RATE);
        assert_eq!(sample_trace_rate("/metrics"), PROBE_SAMPLE_RATE);
        assert_eq!(sample_trace_rate("POST /v1/books"), DEFAULT_SAMPLE_RATE);
    }
}
