//! HTTP Client Factory
//!
//! Builds the reqwest client used for both the chat stream and file listing.

use std::time::Duration;

use contract_risk_core::proxy::ProxyConfig;

use crate::error::{PipelineError, PipelineResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> configure proxy on the client
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
///
/// `timeout` bounds the whole request including the streamed body, so it
/// must cover the slowest pipeline run; `None` disables it.
pub fn build_http_client(
    proxy: Option<&ProxyConfig>,
    timeout: Option<Duration>,
) -> PipelineResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    match proxy {
        Some(cfg) => {
            cfg.validate().map_err(PipelineError::invalid_config)?;
            let mut p = reqwest::Proxy::all(cfg.url()).map_err(|e| {
                PipelineError::invalid_config(format!("invalid proxy URL {}: {}", cfg.url(), e))
            })?;
            if let Some((user, password)) = cfg.credentials() {
                p = p.basic_auth(&user, &password);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| PipelineError::invalid_config(format!("failed to build HTTP client: {}", e)))
}

/// Join a base URL and an endpoint path, tolerating stray slashes.
pub fn endpoint_url(base_url: &str, path: &str) -> PipelineResult<String> {
    let base = url::Url::parse(base_url.trim())
        .map_err(|e| PipelineError::invalid_config(format!("invalid backend URL {}: {}", base_url, e)))?;
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim().trim_start_matches('/')
    );
    Ok(joined)
}
