//! Error types for PCA fitting, projection, and model persistence.

/// Errors surfaced by [`crate::PCA`].
///
/// There is no retry or recovery path: every variant is returned immediately
/// to the caller and no partial results are produced.
#[derive(Debug, thiserror::Error)]
pub enum PcaError {
    /// A requested component count outside `1..=n_features`, or mismatched
    /// shapes between the data, projection, basis, or mean.
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    /// Fewer than two observations were supplied; the sample covariance is
    /// undefined for a single row.
    #[error("at least 2 samples are required to compute a covariance, got {got}")]
    InsufficientSamples { got: usize },

    /// The underlying eigendecomposition failed to converge or produced
    /// non-finite values.
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// `transform`, `center`, or `inverse_transform` was called on a model
    /// that has not been fitted or loaded.
    #[error("model is not fitted; call fit() or load a model first")]
    NotFitted,

    /// File access failed while saving or loading a model.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A saved model could not be encoded or decoded.
    #[error("model serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, PcaError>;
