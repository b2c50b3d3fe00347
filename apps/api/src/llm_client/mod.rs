/// LLM Client: shared HTTP plumbing for every provider adapter.
///
/// ARCHITECTURAL RULE: adapters in `providers/` are the only callers of this module,
/// and the orchestrator is the only caller of the adapters.
///
/// No retries happen here. One `invoke` is one HTTP request; fallback belongs to the
/// orchestrator.
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::providers::{ProviderError, ProviderKind};

pub mod prompts;

/// Longest slice of an error body kept in a `ProviderError` message.
const MAX_ERROR_BODY: usize = 300;

/// Credentials plus an HTTP client for one provider.
///
/// Construction never fails: a missing key or an unbuildable client leaves the
/// connection unavailable, and the orchestrator skips it at call time.
pub struct ProviderConnection {
    kind: ProviderKind,
    client: Option<Client>,
    api_key: Option<String>,
    base_url: String,
}

impl ProviderConnection {
    pub fn new(
        kind: ProviderKind,
        api_key: Option<String>,
        timeout: Duration,
        base_url: &str,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            info!("{kind} adapter has no API key configured; it will be skipped");
        }

        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("{kind} adapter could not build an HTTP client: {e}");
                None
            }
        };

        Self {
            kind,
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Points the connection at a local mock server.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some() && self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the client and key, or `Unavailable`.
    pub fn parts(&self) -> Result<(&Client, &str), ProviderError> {
        match (&self.client, &self.api_key) {
            (Some(client), Some(key)) => Ok((client, key.as_str())),
            (None, _) => Err(ProviderError::Unavailable(format!(
                "{} HTTP client could not be constructed",
                self.kind
            ))),
            (_, None) => Err(ProviderError::Unavailable(format!(
                "{} API key is not configured",
                self.kind
            ))),
        }
    }
}

/// Sends a prepared request and decodes a JSON body, classifying every failure.
pub async fn send_json<T: DeserializeOwned>(
    kind: ProviderKind,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("{kind} returned {status}: {}", truncate(&body));
        return Err(classify_status(status, &body));
    }

    let body = response.text().await.map_err(transport_error)?;
    debug!("{kind} call succeeded ({} bytes)", body.len());

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::MalformedResponse(format!("undecodable {kind} response body: {e}"))
    })
}

/// Maps an HTTP status onto the provider error taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("status {}: {}", status.as_u16(), truncate(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthFailure(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::QuotaExceeded(detail),
        // Gemini reports a bad key as 400 INVALID_ARGUMENT.
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") => {
            ProviderError::AuthFailure(detail)
        }
        _ => ProviderError::Transient(detail),
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_decode() {
        ProviderError::MalformedResponse(e.to_string())
    } else {
        ProviderError::Transient(e.to_string())
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
