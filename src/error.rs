//! Error types for rsacrypt

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rsacrypt
#[derive(Error, Debug)]
pub enum Error {
    // Key generation errors
    #[error("Unsupported RSA key size: {0} bits (must be 2048-4096 and a multiple of 8)")]
    UnsupportedKeySize(usize),

    #[error("Secure random source unavailable: {0}")]
    Entropy(String),

    #[error("Key encoding error: {0}")]
    KeyEncoding(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // Cipher errors
    #[error("Plaintext too large for RSA key: {0}")]
    PlaintextTooLargeForKey(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption failed - wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Invalid padding")]
    InvalidPadding,

    #[error("Truncated payload: expected at least {expected} bytes, got {got}")]
    TruncatedPayload { expected: usize, got: usize },

    // Payload errors
    #[error("Unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    #[error("Corrupt image data: {0}")]
    CorruptImageData(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Process exit code for the command-line front end
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnsupportedKeySize(_) | Error::InvalidKey(_) | Error::KeyEncoding(_) => 2,
            Error::Entropy(_) => 3,
            Error::DecryptionFailed | Error::InvalidPadding | Error::TruncatedPayload { .. } => 4,
            Error::PlaintextTooLargeForKey(_) | Error::Encryption(_) => 5,
            Error::UnsupportedPayloadType(_) | Error::CorruptImageData(_) => 6,
            Error::Config(_) | Error::InvalidConfig(_) | Error::Serialization(_) => 78,
            Error::Io(_) => 74,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
