//! Error types for lrmm-markers
//!
//! Only [`Error::NotFound`] (an update or removal naming an unknown label) and
//! session failures reach callers of the mutation API. Decode, render and
//! document write failures are logged and absorbed by the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Sidecar document could not be decoded
///
/// Any of these fails the whole load; the caller regenerates the document.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Document file could not be read
    #[error("Failed to read markers document: {0}")]
    Io(#[from] std::io::Error),

    /// Not well-formed XML, or wrong structure
    #[error("Malformed markers document: {0}")]
    Malformed(String),

    /// Required child element absent (or empty where a value is required)
    #[error("Mark #{mark} is missing <{field}>")]
    MissingField { mark: usize, field: &'static str },

    /// `id` attribute absent, non-numeric or zero
    #[error("Mark #{mark} has an invalid id '{value}'")]
    InvalidIndex { mark: usize, value: String },

    /// Numeric child element does not parse
    #[error("Mark #{mark} has an invalid <{field}> value '{value}'")]
    InvalidNumber {
        mark: usize,
        field: &'static str,
        value: String,
    },

    /// Timestamp is not ISO-8601
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// Classification is not one of the known names
    #[error("Invalid classification '{0}'")]
    InvalidClassification(String),
}

/// Artifact rendering failed for one marker/subsystem combination
#[derive(Error, Debug)]
pub enum RenderFailure {
    /// Renderer found no sensor data for the marker window
    #[error("No image available for marker {label} on subsystem {subsystem}")]
    NoImage { label: String, subsystem: u32 },

    /// Renderer reported an error
    #[error("Rendering failed: {0}")]
    Pipeline(String),

    /// Rendered image could not be stored
    #[error("Failed to write artifact {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Main error type for lrmm-markers
#[derive(Error, Debug)]
pub enum Error {
    /// Update/remove referenced a label with no record
    #[error("Marker not found: {0}")]
    NotFound(String),

    /// Sidecar document could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Sidecar document could not be encoded
    #[error("Failed to encode markers document: {0}")]
    Encode(String),

    /// Sidecar document could not be written
    #[error("Failed to write markers document {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// lrmm-common error
    #[error("Common error: {0}")]
    Common(#[from] lrmm_common::Error),

    /// Session worker failed or was dropped
    #[error("Session error: {0}")]
    Session(String),
}

/// Convenience Result type using lrmm-markers Error
pub type Result<T> = std::result::Result<T, Error>;
