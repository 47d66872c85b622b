//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! All public APIs that can fail at resource-creation time return
//! [`Result<T>`], an alias for `std::result::Result<T, PrismError>`.
//! Draw-time failures never surface as errors: per the renderer's error
//! policy they are logged and degrade to no-ops so a render pass always
//! runs to completion.

use thiserror::Error;

/// The main error type for the prism renderer.
#[derive(Error, Debug)]
pub enum PrismError {
    // ========================================================================
    // Resource Creation Errors
    // ========================================================================
    /// A buffer or texture was requested with a zero or overflowing size.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested logical width
        width: u32,
        /// Requested logical height
        height: u32,
    },

    /// The requested texture format / sample-count combination is not supported.
    #[error("Unsupported sample count: {0} (supported: 1, 4)")]
    UnsupportedSampleCount(u32),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// Vertex and fragment stages disagree on a shared layout.
    #[error("Shader stage mismatch: {0}")]
    StageMismatch(String),

    /// A vertex array was created from inconsistent buffers.
    #[error("Vertex array error: {0}")]
    VertexArrayError(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image encoding error (texture dumps).
    #[error("Image encode error: {0}")]
    ImageEncodeError(String),
}

impl From<image::ImageError> for PrismError {
    fn from(err: image::ImageError) -> Self {
        PrismError::ImageEncodeError(err.to_string())
    }
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;
