//! Error types for label generation.
//!
//! Two layers exist. [`Error`] is returned to callers that build configurations
//! or deserialize elements and templates. [`EmitError`] is local to a single
//! element: the generator never propagates it, it turns it into an empty
//! fragment plus a [`Diagnostic`](crate::Diagnostic).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for configuration and deserialization.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration parameter provided.
    ///
    /// Label sizes must be positive and finite, and the resolution must be
    /// at least one dot per inch.
    #[error("Invalid configuration parameter: {0}")]
    InvalidConfig(String),

    /// Element map has no `"type"` discriminator.
    #[error("Element has no \"type\" key")]
    MissingType,

    #[error("Unknown element type: {0:?}")]
    UnknownElementType(String),

    /// A required field is missing or has the wrong shape.
    ///
    /// Wraps the underlying serde_json error, which names the offending field.
    #[error(transparent)]
    Deserialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors that make a single element unprintable.
///
/// These never abort a document; see [`Generator`](crate::Generator).
#[derive(Error, Debug)]
pub enum EmitError {
    /// Image element has neither embedded bytes nor a path.
    #[error("Image element has no image data or path")]
    NoImageSource,

    #[error("Failed to read image {path:?}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source bytes could not be decoded as a supported image format.
    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Image target size {width}x{height} dots is empty")]
    EmptyImage { width: u32, height: u32 },

    /// Both endpoints of a line fall on the same dot.
    #[error("Line has zero length at this resolution")]
    DegenerateLine,

    #[error("{what} has zero size at this resolution")]
    InvalidSize { what: &'static str },
}

impl EmitError {
    /// Short machine-readable tag, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoImageSource => "no_image_source",
            Self::ImageRead { .. } => "image_read",
            Self::ImageDecode(_) => "image_decode",
            Self::EmptyImage { .. } => "empty_image",
            Self::DegenerateLine => "degenerate_line",
            Self::InvalidSize { .. } => "invalid_size",
        }
    }
}
