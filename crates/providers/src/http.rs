//! Shared HTTP plumbing for provider clients.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use storyshot_core::error::JobError;
use storyshot_core::sanitize::sanitize;

/// Errors from the provider HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The body could not be encoded or decoded.
    #[error("Malformed payload: {0}")]
    Decode(String),
}

/// Every provider failure is retryable from the job's point of view.
impl From<ProviderError> for JobError {
    fn from(err: ProviderError) -> Self {
        JobError::Network(err.to_string())
    }
}

/// Default per-request timeout. Rendering calls block until the video is
/// ready, so this is generous.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Build a client with the given request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Serialize a request body and run it through the payload sanitizer.
pub fn sanitized_body<T: Serialize>(body: &T) -> Result<serde_json::Value, ProviderError> {
    let value = serde_json::to_value(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(sanitize(value))
}

/// POST a sanitized JSON body and decode the JSON response.
pub async fn post_json<B: Serialize, T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> Result<T, ProviderError> {
    let payload = sanitized_body(body)?;
    let response = client.post(url).json(&payload).send().await?;
    parse_response(response).await
}

/// GET a URL and decode the JSON response.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, ProviderError> {
    let response = client.get(url).send().await?;
    parse_response(response).await
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or an [`ProviderError::ApiError`] carrying the
/// status and body text on failure.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::ApiError {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))
}
