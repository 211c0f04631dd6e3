// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core backend trait and model wrapper.
//!
//! [`RelationBackend`] is the seam between the scoring function and the
//! experiment harness: any sentence-level encoder that maps a
//! [`RelationInput`] batch to relation logits can implement it. The PCNN is
//! the one encoder shipped here; the original system carried several
//! sentence-level baselines behind the same interface.
//!
//! [`RelationModel`] wraps a backend with device metadata and prediction
//! convenience methods (argmax labels, softmax scores).

use candle_core::{D, DType, Device, Tensor};

use crate::error::Result;
use crate::inputs::RelationInput;

// ---------------------------------------------------------------------------
// RelationBackend trait
// ---------------------------------------------------------------------------

/// Unified interface for sentence-level relation encoders.
pub trait RelationBackend: Send + Sync {
    // --- Metadata --------------------------------------------------------

    /// Number of relation labels (output logit width).
    fn num_relations(&self) -> usize;

    /// Per-piece hidden feature size.
    fn hidden_size(&self) -> usize;

    /// Word vocabulary size.
    fn vocab_size(&self) -> usize;

    // --- Core forward pass -------------------------------------------------

    /// Score a batch of examples.
    ///
    /// `train` enables dropout; evaluation callers pass `false` and get a
    /// deterministic computation.
    ///
    /// # Shapes
    /// - `input`: five `(batch, seq_len)` id tensors
    /// - returns: `(batch, num_relations)` raw logits
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`](crate::RelexError::Input) on contract
    /// violations and [`RelexError::Model`](crate::RelexError::Model) on
    /// tensor operation failures.
    fn forward(&self, input: &RelationInput, train: bool) -> Result<Tensor>;
}

// ---------------------------------------------------------------------------
// RelationModel
// ---------------------------------------------------------------------------

/// High-level model wrapper combining a backend with device metadata.
pub struct RelationModel {
    /// The underlying sentence encoder.
    backend: Box<dyn RelationBackend>,
    /// The device this model lives on.
    device: Device,
}

impl RelationModel {
    /// Wrap an existing backend.
    #[must_use]
    pub fn new(backend: Box<dyn RelationBackend>, device: Device) -> Self {
        Self { backend, device }
    }

    /// The device this model lives on.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Number of relation labels.
    #[must_use]
    pub fn num_relations(&self) -> usize {
        self.backend.num_relations()
    }

    /// Per-piece hidden feature size.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.backend.hidden_size()
    }

    /// Word vocabulary size.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.backend.vocab_size()
    }

    /// Score a batch in evaluation mode (dropout disabled).
    ///
    /// # Shapes
    /// - returns: `(batch, num_relations)` raw logits
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying backend.
    pub fn forward(&self, input: &RelationInput) -> Result<Tensor> {
        self.backend.forward(input, false)
    }

    /// Predict the most likely relation label id for every example.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying backend.
    pub fn predict(&self, input: &RelationInput) -> Result<Vec<u32>> {
        let logits = self.forward(input)?;
        let labels = logits.argmax(D::Minus1)?;
        Ok(labels.to_dtype(DType::U32)?.to_vec1()?)
    }

    /// Predict softmax-normalized relation scores for every example.
    ///
    /// # Shapes
    /// - returns: `(batch, num_relations)` probabilities summing to 1 per row
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying backend.
    pub fn predict_with_scores(&self, input: &RelationInput) -> Result<Tensor> {
        let logits = self.forward(input)?;
        Ok(candle_nn::ops::softmax(&logits, D::Minus1)?)
    }

    /// Access the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &dyn RelationBackend {
        &*self.backend
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
