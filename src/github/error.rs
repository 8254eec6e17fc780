use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A listing page could not be fetched. The whole listing is void.
    #[error("Failed to fetch page {page}: {status_or_message}")]
    FetchFailed { page: u32, status_or_message: String },

    #[error("GitHub responded with {status}: {message}")]
    Api { status: reqwest::StatusCode, message: String },

    #[error("Operation requires an access token.")]
    Unauthenticated,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Header(#[from] http::header::InvalidHeaderValue),
}
