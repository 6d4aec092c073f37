use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The OS entropy source failed.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// A stored hash is not 64 lowercase or uppercase hex characters.
    #[error("invalid key hash encoding: {0}")]
    InvalidHashEncoding(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
