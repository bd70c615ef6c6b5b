//! SafeRelay error types
//!
//! Each pipeline component surfaces a closed error enum with structured
//! fields. The crate-level [`Error`] aggregates them so callers that do not
//! care which stage failed can use the single [`Result`] alias.

use thiserror::Error;

/// Errors from the split-transfer protocol (split, encrypt, reconstruct).
#[derive(Error, Debug)]
pub enum TransferError {
    /// Caller lacked permission to read a scoped resource
    #[error("Access denied for resource: {resource}")]
    AccessDenied { resource: String },

    /// AEAD seal produced no output
    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// AEAD open failed authentication
    #[error("Decryption failed: ciphertext did not authenticate")]
    DecryptionFailed,

    /// Secondary package could not be deserialized
    #[error("Malformed secondary package: {source}")]
    MalformedPackage {
        #[source]
        source: serde_json::Error,
    },

    /// An expected part file is missing
    #[error("Resource not found: {name}")]
    ResourceNotFound { name: String },

    /// Key in the secondary package has the wrong length
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// Split ratio outside the open interval (0, 1)
    #[error("Invalid split ratio: {ratio}")]
    InvalidRatio { ratio: f64 },

    /// IO error while reading or materializing parts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the tokenizer.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Key-store rejected the tokenization key
    #[error("Key store error: {reason}")]
    KeyStore { reason: String },
}

/// Errors from the pattern detector.
#[derive(Error, Debug)]
pub enum DetectError {
    /// A detection pattern failed to compile
    #[error("Invalid pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },
}

/// Errors from message persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Blob file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob contents could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SafeRelay error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transfer protocol error
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Tokenization error
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Detection error
    #[error(transparent)]
    Detect(#[from] DetectError),

    /// Persistence error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for SafeRelay operations
pub type Result<T> = std::result::Result<T, Error>;
