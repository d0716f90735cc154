use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VideoTokenQuery {
    pub identity: Option<String>,
    pub room: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("Missing fields: {0}")]
    MissingFields(String),

    #[error("Video credentials are not configured")]
    VideoNotConfigured,

    #[error("Token encoding failed: {0}")]
    Token(String),

    #[error("Chat service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Chat service rejected the request: {0}")]
    UpstreamRejected(String),

    #[error("Inventory file error: {0}")]
    Inventory(String),

    #[error("Unknown product code")]
    UnknownProduct,
}
