//! # Error Types
//!
//! Typed failures for each boundary of the system. Validation-kind errors are
//! answered with a specific reply by the handler that hit them; everything
//! else bubbles up to the router, which logs it and sends one generic error
//! message.

use thiserror::Error;

/// Failure while decoding an encoded command payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload has no cmd key")]
    MissingCommand,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid value for {param}: {value}")]
    BadValue { param: &'static str, value: String },
}

/// Persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("could not prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Trading gateway failure.
#[derive(Debug, Error)]
pub enum BrokerageError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected the call: {status} {message}")]
    Api { status: u16, message: String },
}
