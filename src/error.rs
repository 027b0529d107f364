//! Error types for image-metadata.

use std::io;
use std::path::PathBuf;

/// Result type for image-metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, editing or saving image metadata.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The logical key is not part of the field registry.
    #[error("Unknown metadata key: {0}")]
    KeyNotFound(String),

    /// A required external tool is missing, or a strict save failed.
    #[error("Save error: {0}")]
    Save(String),

    /// The existing metadata of an image could not be read.
    #[error("Failed to read metadata from {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// I/O error (temporary script files, process spawning).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
