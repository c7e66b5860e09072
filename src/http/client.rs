use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::constants;

// Shared HTTP client instance.
lazy_static::lazy_static! {
    static ref CLIENT: Arc<reqwest::Client> = Arc::new(reqwest::Client::new());
}

/// Custom error type for HTTP requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP error: {0} returned {1}")]
    HttpError(reqwest::Url, u16),
    #[error("Request error: {0}")]
    Transport(String),
    #[error("Other error: {0}")]
    Other(String),
}

/// Issues a single GET to the given path with query parameters and returns
/// the raw response body. The request is bounded by the pipeline's download
/// timeout; any non-success status is an error carrying the final URL.
pub async fn get_bytes(path: &str, params: &[(&str, &str)]) -> Result<Vec<u8>, RequestError> {
    // Construct the URL.
    let url = if !params.is_empty() {
        reqwest::Url::parse_with_params(path, params)
            .map_err(|e| RequestError::Other(e.to_string()))?
    } else {
        reqwest::Url::parse(path).map_err(|e| RequestError::Other(e.to_string()))?
    };

    let response = CLIENT
        .get(url.as_str())
        .timeout(Duration::from_secs(constants::HTTP_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))?;

    // Get the response status code.
    let status = response.status();

    // Handle non-success status codes.
    if !status.is_success() {
        return Err(RequestError::HttpError(url, status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))?;

    Ok(body.to_vec())
}
