use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoiError {
    #[error("Check URL: {url} (HTTP {status})")]
    BadUrl { url: String, status: u16 },

    #[error("Check internet connection ({0})")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode metadata for {doi}: {source}")]
    Decode {
        doi: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported work type '{0}'")]
    UnsupportedType(String),

    #[error("Could not buffer download: {0}")]
    Spool(#[source] std::io::Error),

    #[error("Metadata for {doi} has no {what}")]
    MissingMetadata { doi: String, what: &'static str },
}

impl DoiError {
    /// Separates connectivity problems from other transport errors.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            DoiError::Connection(err.to_string())
        } else {
            DoiError::Network(err)
        }
    }
}
