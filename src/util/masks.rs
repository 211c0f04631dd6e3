// SPDX-License-Identifier: MIT OR Apache-2.0

//! Piece masks derived from subject/object relative positions.
//!
//! The PCNN splits each sentence into three regions around the two entity
//! spans. Membership is a pure function of the signed offsets:
//!
//! - **piece 1**: at or before both entities (`subj <= 0 && obj <= 0`)
//! - **piece 2**: strictly between the entities (`(subj > 0) XOR (obj > 0)`)
//! - **piece 3**: at or on both entities or after (`subj >= 0 && obj >= 0`)
//!
//! A token sitting exactly on both spans (`subj == 0 && obj == 0`) belongs
//! to piece 1 *and* piece 3. The overlap at zero offsets is intentional and
//! must not be normalized into a disjoint partition: the shared boundary
//! token is visible to both flanking convolutions.

use candle_core::Tensor;

use crate::error::Result;

// ---------------------------------------------------------------------------
// PieceMasks
// ---------------------------------------------------------------------------

/// Boolean (`U8`) per-token membership masks for the three sentence pieces.
#[derive(Debug, Clone)]
pub struct PieceMasks {
    /// Tokens at or before both entities.
    pub piece1: Tensor,
    /// Tokens strictly between the two entities.
    pub piece2: Tensor,
    /// Tokens at or after both entities.
    pub piece3: Tensor,
}

impl PieceMasks {
    /// Compute the three piece masks from relative-position tensors.
    ///
    /// # Shapes
    /// - `subj_pos`, `obj_pos`: `(batch, seq_len)`, dtype `I64`
    /// - returns: three `(batch, seq_len)` `U8` masks
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Model`](crate::RelexError::Model) on tensor
    /// operation failures.
    pub fn from_positions(subj_pos: &Tensor, obj_pos: &Tensor) -> Result<Self> {
        let subj_le = subj_pos.le(0_i64)?;
        let obj_le = obj_pos.le(0_i64)?;
        let subj_ge = subj_pos.ge(0_i64)?;
        let obj_ge = obj_pos.ge(0_i64)?;
        let subj_gt = subj_pos.gt(0_i64)?;
        let obj_gt = obj_pos.gt(0_i64)?;

        // AND via elementwise product on 0/1 masks; XOR via inequality.
        let piece1 = subj_le.mul(&obj_le)?;
        let piece2 = subj_gt.ne(&obj_gt)?;
        let piece3 = subj_ge.mul(&obj_ge)?;

        Ok(Self {
            piece1,
            piece2,
            piece3,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
