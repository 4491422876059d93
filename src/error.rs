use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenewalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API returned status {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenewalError {
    /// Build an `Api` error from a non-success response, consuming its body.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        RenewalError::Api { service, status, body }
    }
}

pub type Result<T> = std::result::Result<T, RenewalError>;
