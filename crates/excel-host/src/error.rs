//! Error types for excel-host.

use std::path::PathBuf;

use thiserror::Error;

use crate::bridge::BridgeError;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the session and its components.
///
/// Only [`Error::HostUnavailable`] ends a session. Everything else is
/// recoverable at the call site; batch operations log these and continue.
#[derive(Debug, Error)]
pub enum Error {
    /// No compatible spreadsheet host could be attached to or created.
    #[error("No usable spreadsheet host: {0}")]
    HostUnavailable(String),

    /// Neither the given path nor a directory search found the workbook.
    #[error("Workbook not found: {0}")]
    WorkbookNotFound(String),

    /// The locator has no directory to search in.
    #[error("Invalid workbook locator: {0}")]
    InvalidLocator(String),

    /// Source and destination column lists differ in length; nothing was copied.
    #[error(
        "Column count mismatch: {source_columns} source column(s) vs {destination_columns} destination column(s)"
    )]
    ColumnCountMismatch {
        source_columns: usize,
        destination_columns: usize,
    },

    /// An image listed for insertion does not exist on disk.
    #[error("Image not found: {}", .0.display())]
    ImageMissing(PathBuf),

    /// A teardown step failed. Recorded, never propagated.
    #[error("Teardown step failed: {0}")]
    TeardownFailure(String),

    /// Invalid column, row or range address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The host rejected or failed a call.
    #[error("Host call failed: {0}")]
    Host(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a host-call error with a message
    pub fn host<S: Into<String>>(msg: S) -> Self {
        Error::Host(msg.into())
    }

    /// Whether the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::HostUnavailable(_))
    }
}
