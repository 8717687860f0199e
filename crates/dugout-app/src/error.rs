use thiserror::Error;

/// Errors raised while pulling pages or tokens from the league provider.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url}: expected table {index}, page has {found}")]
    MissingTable {
        url: String,
        index: usize,
        found: usize,
    },

    #[error("{url}: {message}")]
    Parse { url: String, message: String },

    #[error("OAuth credentials are not configured")]
    MissingCredentials,

    #[error("token endpoint rejected the refresh: {0}")]
    Auth(String),
}

impl FetchError {
    pub fn parse(url: &str, message: impl Into<String>) -> Self {
        FetchError::Parse {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
