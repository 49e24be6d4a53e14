use std::path::PathBuf;

use thiserror::Error;

use super::assets::AssetKind;

/// Failure taxonomy of the assembly pipeline.
///
/// `Configuration`, `MissingPool` and `EmptyPool` abort the run. The rest are
/// local to one source item, which is reported and skipped.
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("No {kind} asset is at least {required:.2}s long")]
    ResourceUnavailable { kind: AssetKind, required: f64 },

    #[error("Speech synthesis failed for {key}: {message}")]
    SynthesisFailure { key: String, message: String },

    #[error("Failed to stitch {chunks} narration chunks for {key}: {message}")]
    ConcatenationFailure {
        key: String,
        chunks: usize,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Visual clip {visual:.3}s and mixed audio {audio:.3}s differ for {item}")]
    DurationMismatch { item: String, visual: f64, audio: f64 },

    #[error("Asset pool directory {0} does not exist")]
    MissingPool(PathBuf),

    #[error("The {0} asset pool has no usable files")]
    EmptyPool(AssetKind),
}

impl ReelError {
    /// Whether the error should abort the whole run rather than one item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReelError::Configuration(_) | ReelError::MissingPool(_) | ReelError::EmptyPool(_)
        )
    }
}

/// Classify an `anyhow` error chain, if it carries a `ReelError`.
pub fn classify(err: &anyhow::Error) -> Option<&ReelError> {
    err.chain().find_map(|cause| cause.downcast_ref::<ReelError>())
}
