//! Error types for the transformation pipeline.
//!
//! Errors fall into four categories:
//! - **Construction**: a chain could not be created (missing or empty source)
//! - **Validation**: a parameter is out of range, either at the builder call
//!   that introduced it or, when real pixel data is needed, at `build()` time
//! - **Processing**: a transform or collaborator failed for an environmental reason
//! - **Batch**: a per-image failure surfaced when joining a batch

use thiserror::Error;

/// Centralized error type for chains, engines and batches.
#[derive(Error, Debug)]
pub enum ChainError {
    /// The chain could not be created from its source.
    #[error("Construction error: {0}")]
    Construction(String),

    /// A parameter failed validation.
    #[error("Invalid parameter '{param}': {message}")]
    Validation { param: String, message: String },

    /// A transform failed while running.
    #[error("Processing error: {0}")]
    Processing(String),

    /// A single image of a batch failed.
    #[error("Batch item {index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<ChainError>,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ChainError>;

impl ChainError {
    pub fn construction(message: impl Into<String>) -> Self {
        ChainError::Construction(message.into())
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        ChainError::Validation {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        ChainError::Processing(message.into())
    }

    /// Wrap a per-image failure with the index of the image it came from.
    ///
    /// Already wrapped errors are not wrapped twice.
    pub fn batch(index: usize, source: ChainError) -> Self {
        match source {
            ChainError::Batch { .. } => source,
            other => ChainError::Batch {
                index,
                source: Box::new(other),
            },
        }
    }

    pub fn is_construction(&self) -> bool {
        matches!(self, ChainError::Construction(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ChainError::Validation { .. })
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, ChainError::Processing(_))
    }

    /// Index of the failing image for batch errors.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            ChainError::Batch { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The innermost error, unwrapping a batch wrapper if present.
    pub fn root(&self) -> &ChainError {
        match self {
            ChainError::Batch { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<image::ImageError> for ChainError {
    fn from(err: image::ImageError) -> Self {
        ChainError::Processing(err.to_string())
    }
}
