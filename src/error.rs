//! Error types for APK Signing Block operations.
//!
//! Every fallible function in the library returns [`crate::Result`], which
//! carries this [`enum@Error`]. The variants separate "this APK has no usable
//! signing block" from "this APK is a format we do not handle" so callers can
//! decide whether to treat the input as unsigned.

use thiserror::Error;

/// Error type for locating, parsing and rebuilding APK Signing Blocks.
#[derive(Debug, Error)]
pub enum Error {
    /// The EOCD record, the signing block magic or a consistent set of
    /// size fields could not be found.
    ///
    /// Callers usually treat this as "the APK is not signed with v2".
    #[error("APK Signing Block not found: {0}")]
    SignatureNotFound(String),

    /// The archive uses a layout we do not support, such as ZIP64.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The extracted regions do not tile the file.
    #[error("Corrupt APK layout: {0}")]
    CorruptLayout(String),

    /// The caller passed something the serializer cannot encode.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading from the underlying source failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal consistency check failed.
    ///
    /// This should be unreachable; please report it.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
