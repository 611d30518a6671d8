use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("varint exceeds five bytes")]
    VarIntTooLong,
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    #[error("negative length prefix")]
    NegativeLength,
    #[error("string of {length} bytes exceeds limit of {limit}")]
    StringTooLong { length: usize, limit: usize },
    #[error("invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("invalid UTF-16 string")]
    InvalidUtf16,
    #[error("invalid cipher key length {0}, expected 16 bytes")]
    InvalidKeyLength(usize),
    #[error("compression error: {0}")]
    Compression(String),
}

impl WireError {
    pub fn compression_error(msg: &str) -> Self {
        Self::Compression(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
