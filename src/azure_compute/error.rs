use http::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing config key {0}")]
    MissingConfig(&'static str),
    #[error("Failed to generate url {url} caused by {source:?}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("Received bad response with status {status:?} and body {body:?}")]
    BadResponse { status: StatusCode, body: String },
    #[error("Failed to acquire access token: {0}")]
    Credential(String),
}
