// Error type shared by the remote engine and search index clients

use thiserror::Error;

/// Failure of a single remote call
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (connect, timeout, TLS, ...)
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// The remote side answered with a non-success status
    #[error("{endpoint} rejected the request with status {status}: {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// The remote side answered, but the payload was not what we expected
    #[error("unexpected response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

impl ClientError {
    pub fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn rejected(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Turn a raw response into `Ok(response)` or a `Rejected` error carrying the body
pub(crate) async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body
    };

    Err(ClientError::rejected(endpoint, status.as_u16(), message))
}
