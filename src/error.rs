//! Error types for the head tracking library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Face classifier could not be loaded
    #[error("Face classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// Frame buffers are inconsistent with their declared dimensions
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Frame source or acquisition thread failed
    #[error("Acquisition error: {0}")]
    Acquisition(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
