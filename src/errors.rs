/*!
 * Error types for the banca-db crate.
 *
 * This module contains custom error types for different parts of the crate,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the catalog query layer
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file does not exist at its expected location.
    /// Raw BANCA data is distributed separately; the catalog itself is
    /// built locally with the `create` command.
    #[error("catalog not found at {path:?}; run `banca-db create` first")]
    NotCreated {
        /// Expected catalog location
        path: PathBuf,
    },

    /// A client with the given identifier is not registered
    #[error("unknown client id: {0}")]
    UnknownClient(i64),

    /// A protocol with the given name is not registered
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// The catalog already holds data and `force` was not given
    #[error("catalog is already populated; use --force to rebuild")]
    AlreadyPopulated,

    /// An invalid vocabulary value was supplied
    #[error("invalid {what} value: \"{value}\", valid values are {valid}")]
    InvalidValue {
        /// Kind of value (group, gender, purpose, ...)
        what: &'static str,
        /// The offending input
        value: String,
        /// Comma-separated list of accepted values
        valid: &'static str,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the catalog layer
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
