use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication failure: {0}")]
    AuthFailure(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("read timed out")]
    ReadTimeout,
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("codec error: {0}")]
    Wire(#[from] wire::WireError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth_failure(msg: impl Into<String>) -> Self {
        Self::AuthFailure(msg.into())
    }

    /// Configuration errors indicate broken wiring rather than a misbehaving
    /// peer; they are the only per-connection failures worth an error-level
    /// log line.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Get a human-readable category for this error
    pub fn category(&self) -> &'static str {
        match self {
            Error::Protocol(_) | Error::Wire(_) => "Protocol",
            Error::Config(_) => "Configuration",
            Error::AuthFailure(_) => "Authentication",
            Error::Io(_) | Error::ConnectionClosed => "Transport",
            Error::ReadTimeout => "Timeout",
            Error::Json(_) => "Serialization",
        }
    }
}

impl From<session::SessionError> for Error {
    fn from(err: session::SessionError) -> Self {
        Error::AuthFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
