//! Error types for the preview renderer

use thiserror::Error;

/// Result type alias for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a preview image
///
/// Failures local to one asset (a font, an emoji glyph) are absorbed by the
/// resolvers and never surface here. These variants cover the failures that
/// abort a whole render.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load or initialize a layout/raster backend
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to read a local resource
    #[error("Failed to load resource: {0}")]
    LoadError(String),

    /// The layout engine rejected the element tree
    #[error("Layout failed: {0}")]
    LayoutError(String),

    /// The rasterizer could not produce a PNG
    #[error("Rasterization failed: {0}")]
    RasterError(String),

    /// The asset cache could not store or read an entry
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Invalid configuration or render options
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::LoadError(err.to_string())
    }
}
