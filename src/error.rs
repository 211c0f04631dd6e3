// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for candle-relex.

/// Errors that can occur when building or running a relation model.
#[derive(Debug, thiserror::Error)]
pub enum RelexError {
    /// Tensor construction or forward pass error (wraps candle).
    #[error("model error: {0}")]
    Model(#[from] candle_core::Error),

    /// Model configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Input contract violation: malformed shapes, wrong dtype, or ids
    /// outside the embedding tables.
    #[error("input error: {0}")]
    Input(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for candle-relex operations.
pub type Result<T> = std::result::Result<T, RelexError>;
