use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token request to {0} failed")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Token endpoint {url} answered with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Token response from {0} could not be decoded")]
    TokenDecode(String, #[source] reqwest::Error),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}
