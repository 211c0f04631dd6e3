// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batched model input and its shape/dtype contract.
//!
//! [`RelationInput`] bundles the five id tensors the forward pass consumes.
//! All shape and dtype checking happens at construction, so the model can
//! assume a well-formed batch.

use candle_core::{DType, Device, Tensor};

use crate::error::{RelexError, Result};

// ---------------------------------------------------------------------------
// RelationInput
// ---------------------------------------------------------------------------

/// One batch of examples for the relation extractor.
///
/// Every tensor has shape `(batch, seq_len)` and dtype `I64`; sequences are
/// right-padded to the batch maximum length with the pad id. `pos` and `ner`
/// are carried for forward compatibility and are not consumed by the PCNN
/// forward pass.
#[derive(Debug, Clone)]
pub struct RelationInput {
    /// Word ids, pad id reserved.
    words: Tensor,
    /// Part-of-speech tag ids (reserved).
    pos: Tensor,
    /// Entity-type tag ids (reserved).
    ner: Tensor,
    /// Signed token offsets relative to the subject span (`0` on the span).
    subj_pos: Tensor,
    /// Signed token offsets relative to the object span (`0` on the span).
    obj_pos: Tensor,
}

impl RelationInput {
    /// Bundle five pre-built tensors into a batch.
    ///
    /// # Shapes
    /// - all tensors: `(batch, seq_len)`, dtype `I64`
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`] if any tensor is not rank 2, has a
    /// dtype other than `I64`, or disagrees with the others on shape.
    pub fn new(
        words: Tensor,
        pos: Tensor,
        ner: Tensor,
        subj_pos: Tensor,
        obj_pos: Tensor,
    ) -> Result<Self> {
        let shape = check_tensor("words", &words, None)?;
        check_tensor("pos", &pos, Some(shape))?;
        check_tensor("ner", &ner, Some(shape))?;
        check_tensor("subj_pos", &subj_pos, Some(shape))?;
        check_tensor("obj_pos", &obj_pos, Some(shape))?;

        Ok(Self {
            words,
            pos,
            ner,
            subj_pos,
            obj_pos,
        })
    }

    /// Build a batch from per-example id rows.
    ///
    /// Convenience constructor for tests and small harnesses; every row
    /// must already be padded to the same length.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Input`] on ragged rows and
    /// [`RelexError::Model`] on tensor construction failure.
    pub fn from_vecs(
        words: Vec<Vec<i64>>,
        pos: Vec<Vec<i64>>,
        ner: Vec<Vec<i64>>,
        subj_pos: Vec<Vec<i64>>,
        obj_pos: Vec<Vec<i64>>,
        device: &Device,
    ) -> Result<Self> {
        Self::new(
            rows_to_tensor("words", words, device)?,
            rows_to_tensor("pos", pos, device)?,
            rows_to_tensor("ner", ner, device)?,
            rows_to_tensor("subj_pos", subj_pos, device)?,
            rows_to_tensor("obj_pos", obj_pos, device)?,
        )
    }

    /// Batch size and padded sequence length.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Model`] on tensor introspection failure
    /// (cannot happen for a successfully constructed input).
    pub fn batch_shape(&self) -> Result<(usize, usize)> {
        Ok(self.words.dims2()?)
    }

    /// Word id tensor.
    #[must_use]
    pub const fn words(&self) -> &Tensor {
        &self.words
    }

    /// Part-of-speech id tensor (reserved, unused by the PCNN).
    #[must_use]
    pub const fn pos(&self) -> &Tensor {
        &self.pos
    }

    /// Entity-type id tensor (reserved, unused by the PCNN).
    #[must_use]
    pub const fn ner(&self) -> &Tensor {
        &self.ner
    }

    /// Subject-relative offset tensor.
    #[must_use]
    pub const fn subj_pos(&self) -> &Tensor {
        &self.subj_pos
    }

    /// Object-relative offset tensor.
    #[must_use]
    pub const fn obj_pos(&self) -> &Tensor {
        &self.obj_pos
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate rank, dtype, and (optionally) shape agreement for one input
/// tensor, returning its `(batch, seq_len)` shape.
fn check_tensor(
    name: &str,
    tensor: &Tensor,
    expected: Option<(usize, usize)>,
) -> Result<(usize, usize)> {
    let shape = tensor
        .dims2()
        .map_err(|_| RelexError::Input(format!("'{name}' must have shape (batch, seq_len)")))?;

    if tensor.dtype() != DType::I64 {
        return Err(RelexError::Input(format!(
            "'{name}' must have dtype I64, got {:?}",
            tensor.dtype()
        )));
    }

    if let Some(expected) = expected {
        if shape != expected {
            return Err(RelexError::Input(format!(
                "'{name}' shape {shape:?} does not match 'words' shape {expected:?}"
            )));
        }
    }

    Ok(shape)
}

/// Flatten equal-length id rows into a `(batch, seq_len)` `I64` tensor.
fn rows_to_tensor(name: &str, rows: Vec<Vec<i64>>, device: &Device) -> Result<Tensor> {
    let batch = rows.len();
    let seq_len = rows.first().map_or(0, Vec::len);
    if batch == 0 || seq_len == 0 {
        return Err(RelexError::Input(format!("'{name}' batch is empty")));
    }

    let mut flat = Vec::with_capacity(batch * seq_len);
    for row in &rows {
        if row.len() != seq_len {
            return Err(RelexError::Input(format!(
                "'{name}' rows have unequal lengths ({} vs {seq_len})",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }

    Ok(Tensor::from_vec(flat, (batch, seq_len), device)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(rows: &[&[i64]], device: &Device) -> Tensor {
        let flat: Vec<i64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::from_vec(flat, (rows.len(), rows[0].len()), device).unwrap()
    }

    #[test]
    fn well_formed_batch_accepted() {
        let device = Device::Cpu;
        let t = ids(&[&[2, 5, 0, 0]], &device);
        let input = RelationInput::new(t.clone(), t.clone(), t.clone(), t.clone(), t).unwrap();
        assert_eq!(input.batch_shape().unwrap(), (1, 4));
    }

    #[test]
    fn shape_mismatch_rejected() {
        let device = Device::Cpu;
        let words = ids(&[&[2, 5, 0, 0]], &device);
        let short = ids(&[&[2, 5, 0]], &device);
        let result = RelationInput::new(
            words.clone(),
            words.clone(),
            words.clone(),
            short,
            words,
        );
        assert!(matches!(result, Err(RelexError::Input(_))));
    }

    #[test]
    fn wrong_dtype_rejected() {
        let device = Device::Cpu;
        let words = ids(&[&[2, 5]], &device);
        let floats = Tensor::zeros((1, 2), DType::F32, &device).unwrap();
        let result = RelationInput::new(
            words.clone(),
            words.clone(),
            words.clone(),
            words,
            floats,
        );
        assert!(matches!(result, Err(RelexError::Input(_))));
    }

    #[test]
    fn wrong_rank_rejected() {
        let device = Device::Cpu;
        let flat = Tensor::from_vec(vec![1_i64, 2, 3], 3, &device).unwrap();
        let result = RelationInput::new(
            flat.clone(),
            flat.clone(),
            flat.clone(),
            flat.clone(),
            flat,
        );
        assert!(matches!(result, Err(RelexError::Input(_))));
    }

    #[test]
    fn ragged_rows_rejected() {
        let device = Device::Cpu;
        let result = RelationInput::from_vecs(
            vec![vec![2, 5, 0], vec![3, 0]],
            vec![vec![0, 0, 0], vec![0, 0]],
            vec![vec![0, 0, 0], vec![0, 0]],
            vec![vec![0, 1, 2], vec![0, 1]],
            vec![vec![-1, 0, 1], vec![-1, 0]],
            &device,
        );
        assert!(matches!(result, Err(RelexError::Input(_))));
    }

    #[test]
    fn empty_batch_rejected() {
        let device = Device::Cpu;
        let result = RelationInput::from_vecs(
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            &device,
        );
        assert!(matches!(result, Err(RelexError::Input(_))));
    }
}
