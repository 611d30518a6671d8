use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),
    #[error("session service returned no content")]
    NoContent,
    #[error("session service returned an empty body")]
    EmptyBody,
    #[error("malformed profile payload: {0}")]
    MalformedProfile(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
