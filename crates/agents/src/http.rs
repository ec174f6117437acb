//! Shared HTTP plumbing for agents that call JSON APIs.

use fieldnote_core::error::AgentError;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

/// Build a client with a per-request timeout.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("fieldnote/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// GET `url` with `query` and decode the body as JSON.
///
/// Non-success statuses become [`AgentError::Http`] carrying the status and
/// the start of the body.
pub async fn get_json(
    client: &reqwest::Client,
    agent: &str,
    url: Url,
    query: &[(&str, String)],
) -> Result<Value, AgentError> {
    let http_err = |reason: String| AgentError::Http {
        agent: agent.to_string(),
        reason,
    };

    tracing::debug!(agent, url = %url, "GET");

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| http_err(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(http_err(format!("HTTP {status}: {}", truncate(&body, 200))));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| AgentError::InvalidResponse(e.to_string()))
}

/// Parse `base` as a URL.
pub fn parse_url(base: &str) -> Result<Url, AgentError> {
    Url::parse(base).map_err(|e| AgentError::Failed(format!("invalid endpoint '{base}': {e}")))
}

/// Append `segment` to the path of `base`, percent-encoding it.
pub fn with_segment(base: &str, segment: &str) -> Result<Url, AgentError> {
    let mut url = parse_url(base)?;
    url.path_segments_mut()
        .map_err(|_| AgentError::Failed(format!("endpoint '{base}' cannot take a path")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

/// Require the API key named by `env`, when one is configured.
pub fn require_key(
    endpoint: &fieldnote_config::EndpointConfig,
) -> Result<Option<String>, AgentError> {
    match &endpoint.api_key_env {
        None => Ok(None),
        Some(env) => endpoint
            .api_key()
            .map(Some)
            .ok_or_else(|| AgentError::MissingInput(format!("{env} is not set"))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
