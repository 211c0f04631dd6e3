// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding tables owned by the PCNN.
//!
//! [`EmbeddingBank`] holds the word table (optionally pretrained), the
//! shared relative-position table, and the reserved part-of-speech /
//! entity-type tables. Every lookup goes through a shape-checked accessor:
//! ids are validated against table bounds before indexing, and raw signed
//! offsets are shifted into the non-negative position-table index space
//! here and nowhere else.

use candle_core::{Module, Tensor};
use candle_nn::{Embedding, VarBuilder};
use candle_nn::init::Init;

use crate::config::{PcnnConfig, PAD_ID};
use crate::error::{RelexError, Result};

/// Random-initialization range for embedding tables, matching the original
/// uniform(-1, 1) fill.
const EMB_INIT: Init = Init::Uniform { lo: -1.0, up: 1.0 };

// ---------------------------------------------------------------------------
// EmbeddingBank
// ---------------------------------------------------------------------------

/// All embedding tables of the model, with bounds-checked lookups.
pub struct EmbeddingBank {
    /// Word table: `(vocab_size, emb_dim)`.
    word: Embedding,
    /// Shared subject/object relative-position table: `(2*max_len, position_dim)`.
    position: Embedding,
    /// Part-of-speech table (reserved, inert in the forward pass).
    pos: Option<Embedding>,
    /// Entity-type table (reserved, inert in the forward pass).
    ner: Option<Embedding>,
    /// Word vocabulary size, for id validation.
    vocab_size: usize,
    /// Offset shift; lookup index is `offset + max_len`.
    max_len: usize,
}

impl EmbeddingBank {
    /// Build all tables from a [`VarBuilder`].
    ///
    /// With `word_emb: Some(matrix)` the word table is taken verbatim from
    /// the pretrained matrix, which must have shape
    /// `(vocab_size, emb_dim)`. Without it, the word table is filled
    /// uniform(-1, 1) with the pad row zeroed. The position table is always
    /// uniform(-1, 1); the reserved pos/ner tables are created only when
    /// their dims are non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Config`] on a pretrained shape mismatch and
    /// [`RelexError::Model`] on tensor failures.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: &PcnnConfig, word_emb: Option<Tensor>, vb: VarBuilder<'_>) -> Result<Self> {
        let word_weight = match word_emb {
            Some(matrix) => {
                let shape = matrix.dims2().map_err(|_| {
                    RelexError::Config("pretrained word embeddings must be a 2-D matrix".into())
                })?;
                if shape != (config.vocab_size, config.emb_dim) {
                    return Err(RelexError::Config(format!(
                        "pretrained word embeddings have shape {shape:?}, \
                         expected ({}, {})",
                        config.vocab_size, config.emb_dim
                    )));
                }
                matrix.to_dtype(vb.dtype())?.to_device(vb.device())?
            }
            None => {
                let weight = vb.get_with_hints(
                    (config.vocab_size, config.emb_dim),
                    "word_emb.weight",
                    EMB_INIT,
                )?;
                zero_pad_row(&weight)?
            }
        };

        let position_weight = vb.get_with_hints(
            (config.position_rows(), config.position_dim),
            "position_emb.weight",
            EMB_INIT,
        )?;

        let pos = if config.pos_dim > 0 {
            let weight = vb.get_with_hints(
                (config.pos_vocab_size, config.pos_dim),
                "pos_emb.weight",
                EMB_INIT,
            )?;
            Some(Embedding::new(zero_pad_row(&weight)?, config.pos_dim))
        } else {
            None
        };

        let ner = if config.ner_dim > 0 {
            let weight = vb.get_with_hints(
                (config.ner_vocab_size, config.ner_dim),
                "ner_emb.weight",
                EMB_INIT,
            )?;
            Some(Embedding::new(zero_pad_row(&weight)?, config.ner_dim))
        } else {
            None
        };

        tracing::debug!(
            vocab_size = config.vocab_size,
            emb_dim = config.emb_dim,
            position_rows = config.position_rows(),
            position_dim = config.position_dim,
            "embedding tables ready"
        );

        Ok(Self {
            word: Embedding::new(word_weight, config.emb_dim),
            position: Embedding::new(position_weight, config.position_dim),
            pos,
            ner,
            vocab_size: config.vocab_size,
            max_len: config.max_len,
        })
    }

    /// Look up word embeddings.
    ///
    /// # Shapes
    /// - `words`: `(batch, seq_len)`, `I64`
    /// - returns: `(batch, seq_len, emb_dim)`
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`] for ids outside `[0, vocab_size)`.
    pub fn embed_words(&self, words: &Tensor) -> Result<Tensor> {
        check_id_range("word id", words, 0, i64::try_from(self.vocab_size).unwrap_or(i64::MAX))?;
        Ok(self.word.forward(words)?)
    }

    /// Look up relative-position embeddings for signed offsets.
    ///
    /// Offsets are shifted by `+max_len` so the table index is always
    /// non-negative; the table itself never sees a raw offset.
    ///
    /// # Shapes
    /// - `offsets`: `(batch, seq_len)`, `I64`, values in `[-max_len, max_len)`
    /// - returns: `(batch, seq_len, position_dim)`
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`] for offsets outside the supported range.
    pub fn embed_positions(&self, offsets: &Tensor) -> Result<Tensor> {
        let max_len = i64::try_from(self.max_len)
            .map_err(|_| RelexError::Config("max_len overflows i64".into()))?;
        let shift = Tensor::new(max_len, offsets.device())?;
        let indices = offsets.broadcast_add(&shift)?;
        check_id_range("shifted position index", &indices, 0, 2 * max_len)?;
        Ok(self.position.forward(&indices)?)
    }

    /// Look up part-of-speech embeddings, if that table is enabled.
    ///
    /// Reserved for richer encoders; the PCNN forward pass does not call
    /// this.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`] for out-of-range ids.
    pub fn embed_pos_tags(&self, tags: &Tensor) -> Result<Option<Tensor>> {
        match &self.pos {
            Some(table) => {
                let rows = table.embeddings().dim(0)?;
                check_id_range("pos tag id", tags, 0, i64::try_from(rows).unwrap_or(i64::MAX))?;
                Ok(Some(table.forward(tags)?))
            }
            None => Ok(None),
        }
    }

    /// Look up entity-type embeddings, if that table is enabled.
    ///
    /// Reserved for richer encoders; the PCNN forward pass does not call
    /// this.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`] for out-of-range ids.
    pub fn embed_ner_tags(&self, tags: &Tensor) -> Result<Option<Tensor>> {
        match &self.ner {
            Some(table) => {
                let rows = table.embeddings().dim(0)?;
                check_id_range("ner tag id", tags, 0, i64::try_from(rows).unwrap_or(i64::MAX))?;
                Ok(Some(table.forward(tags)?))
            }
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Zero the pad row of an embedding weight matrix.
///
/// Mirrors the `padding_idx` behavior of the randomly-initialized tables:
/// the pad token contributes an exactly-zero vector.
fn zero_pad_row(weight: &Tensor) -> Result<Tensor> {
    let (rows, _cols) = weight.dims2()?;
    let mut keep = vec![1_f32; rows];
    if let Some(pad) = keep.get_mut(usize::try_from(PAD_ID).unwrap_or(0)) {
        *pad = 0.0;
    }
    let keep = Tensor::from_vec(keep, (rows, 1), weight.device())?.to_dtype(weight.dtype())?;
    Ok(weight.broadcast_mul(&keep)?)
}

/// Fail unless every id in the tensor lies in `[lo, hi)`.
fn check_id_range(what: &str, ids: &Tensor, lo: i64, hi: i64) -> Result<()> {
    let min = ids.min_all()?.to_scalar::<i64>()?;
    let max = ids.max_all()?.to_scalar::<i64>()?;
    if min < lo || max >= hi {
        return Err(RelexError::Input(format!(
            "{what} out of range: found [{min}, {max}], table accepts [{lo}, {hi})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
