// SPDX-License-Identifier: MIT OR Apache-2.0

//! Piecewise convolutional relation extractor.
//!
//! [`Pcnn`] wires the three components together: the `EmbeddingBank` turns
//! id tensors into the per-token feature tensor, the `PiecewiseEncoder`
//! reduces each masked piece to a fixed-size vector, and a dense head
//! projects the concatenated
//! pieces to relation logits. The forward pass is a pure function of the
//! inputs and the (frozen-during-call) parameters; the only randomness is
//! dropout, active in train mode only.

pub(crate) mod embedding;
pub(crate) mod encoder;

use candle_core::{Module, Tensor};
use candle_nn::init::Init;
use candle_nn::{Dropout, Linear, VarBuilder};

use crate::backend::RelationBackend;
use crate::config::PcnnConfig;
use crate::error::Result;
use crate::inputs::RelationInput;
use crate::util::masks::PieceMasks;

use self::embedding::EmbeddingBank;
use self::encoder::PiecewiseEncoder;

// ---------------------------------------------------------------------------
// Pcnn
// ---------------------------------------------------------------------------

/// The PCNN model: embedding bank, piecewise encoder, classifier head.
pub struct Pcnn {
    /// Word / position / reserved tag tables.
    bank: EmbeddingBank,
    /// Shared masked convolution + per-piece max-pool.
    encoder: PiecewiseEncoder,
    /// Dropout over the concatenated piece features (train mode only).
    dropout: Dropout,
    /// Dense map from `3 * hidden` to `num_relations` logits.
    classifier: Linear,
    /// Model configuration, fixed for the model's lifetime.
    config: PcnnConfig,
}

impl Pcnn {
    /// Build the model from a [`VarBuilder`].
    ///
    /// `word_emb` optionally supplies a pretrained word matrix of shape
    /// `(vocab_size, emb_dim)`, used verbatim; without it the tables are
    /// filled uniform(-1, 1) with the word pad row zeroed. The classifier
    /// weight starts from a small-variance Gaussian (std `1e-3`) with a
    /// zero bias.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Config`](crate::RelexError::Config) for an
    /// invalid configuration or pretrained shape mismatch, and
    /// [`RelexError::Model`](crate::RelexError::Model) on tensor failures.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: &PcnnConfig, word_emb: Option<Tensor>, vb: VarBuilder<'_>) -> Result<Self> {
        config.validate()?;

        let bank = EmbeddingBank::load(config, word_emb, vb.pp("embed"))?;
        let encoder = PiecewiseEncoder::load(config, vb.pp("encoder"))?;

        let weight = vb.get_with_hints(
            (config.num_relations, 3 * config.hidden),
            "classifier.weight",
            Init::Randn {
                mean: 0.0,
                stdev: 1e-3,
            },
        )?;
        let bias = vb.get_with_hints(config.num_relations, "classifier.bias", Init::Const(0.0))?;
        let classifier = Linear::new(weight, Some(bias));

        tracing::info!(
            hidden = config.hidden,
            window_size = config.window_size,
            num_relations = config.num_relations,
            "PCNN model ready"
        );

        Ok(Self {
            bank,
            encoder,
            dropout: Dropout::new(config.dropout),
            classifier,
            config: config.clone(),
        })
    }

    /// Model configuration.
    #[must_use]
    pub const fn config(&self) -> &PcnnConfig {
        &self.config
    }

    /// Run the forward pass.
    ///
    /// Control flow: embedding lookups → feature concatenation → three
    /// masked conv/pool passes → concatenation → dropout (train only) →
    /// linear projection. Examples in the batch never interact.
    ///
    /// # Shapes
    /// - `input`: five `(batch, seq_len)` id tensors
    /// - returns: `(batch, num_relations)` raw logits
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`](crate::RelexError::Input) for ids or
    /// offsets outside the embedding tables, and
    /// [`RelexError::Model`](crate::RelexError::Model) on tensor failures.
    pub fn forward(&self, input: &RelationInput, train: bool) -> Result<Tensor> {
        let emb_words = self.bank.embed_words(input.words())?;
        let emb_subj_pos = self.bank.embed_positions(input.subj_pos())?;
        let emb_obj_pos = self.bank.embed_positions(input.obj_pos())?;

        let masks = PieceMasks::from_positions(input.subj_pos(), input.obj_pos())?;

        let features = Tensor::cat(&[&emb_words, &emb_subj_pos, &emb_obj_pos], 2)?.contiguous()?;

        let encoded = self.encoder.encode(&features, &masks)?;
        let encoded = self.dropout.forward(&encoded, train)?;

        Ok(self.classifier.forward(&encoded)?)
    }
}

// ---------------------------------------------------------------------------
// RelationBackend implementation
// ---------------------------------------------------------------------------

impl RelationBackend for Pcnn {
    fn num_relations(&self) -> usize {
        self.config.num_relations
    }

    fn hidden_size(&self) -> usize {
        self.config.hidden
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn forward(&self, input: &RelationInput, train: bool) -> Result<Tensor> {
        Self::forward(self, input, train)
    }
}
