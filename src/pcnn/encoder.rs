// SPDX-License-Identifier: MIT OR Apache-2.0

//! Piecewise masked convolution encoder.
//!
//! One shared 1-D convolution kernel runs over the token axis three times,
//! once per piece mask. Masking is zero-fill, never index-filtering:
//! positions outside a piece contribute exactly-zero feature vectors, so
//! the time axis keeps its length and the fixed-width kernel stays aligned.
//! Each pass max-pools over time and saturates with `tanh`, producing one
//! fixed-size vector per piece regardless of sentence length.

use candle_core::{D, Module, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, VarBuilder};

use crate::config::PcnnConfig;
use crate::error::Result;
use crate::util::masks::PieceMasks;

// ---------------------------------------------------------------------------
// PiecewiseEncoder
// ---------------------------------------------------------------------------

/// Shared convolution + per-piece max-pool.
pub struct PiecewiseEncoder {
    /// Shared kernel: in = `emb_dim + 2*position_dim`, out = `hidden`,
    /// width = `window_size`, stride 1, no padding.
    conv: Conv1d,
    /// Kernel width, kept for the short-sequence guard.
    window_size: usize,
}

impl PiecewiseEncoder {
    /// Load the convolution weights (`conv.weight`, `conv.bias`).
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Model`](crate::RelexError::Model) if weight
    /// loading fails.
    #[allow(clippy::needless_pass_by_value)] // VarBuilder is candle's pass-by-value convention
    pub fn load(config: &PcnnConfig, vb: VarBuilder<'_>) -> Result<Self> {
        let conv = candle_nn::conv1d(
            config.input_size(),
            config.hidden,
            config.window_size,
            Conv1dConfig::default(),
            vb.pp("conv"),
        )?;
        Ok(Self {
            conv,
            window_size: config.window_size,
        })
    }

    /// Encode a feature tensor into the concatenated three-piece vector.
    ///
    /// # Shapes
    /// - `features`: `(batch, seq_len, emb_dim + 2*position_dim)`
    /// - returns: `(batch, 3 * hidden)`
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Model`](crate::RelexError::Model) on tensor
    /// operation failures.
    pub fn encode(&self, features: &Tensor, masks: &PieceMasks) -> Result<Tensor> {
        let piece1 = self.pool_piece(features, &masks.piece1)?;
        let piece2 = self.pool_piece(features, &masks.piece2)?;
        let piece3 = self.pool_piece(features, &masks.piece3)?;
        Ok(Tensor::cat(&[&piece1, &piece2, &piece3], 1)?)
    }

    /// Masked convolution + max-pool + tanh for a single piece.
    ///
    /// A piece whose mask selects no tokens convolves over all-zero input,
    /// so every window produces the bias vector and the pooled output is
    /// `tanh(bias)`: deterministic and finite. Sequences shorter than the
    /// kernel are right-padded with zeros up to the kernel width so the
    /// convolution always has at least one valid window.
    ///
    /// # Shapes
    /// - `features`: `(batch, seq_len, input_size)`
    /// - `mask`: `(batch, seq_len)`, `U8`
    /// - returns: `(batch, hidden)`
    fn pool_piece(&self, features: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let mask = mask.unsqueeze(2)?.to_dtype(features.dtype())?;
        let mut masked = features.broadcast_mul(&mask)?;

        let (_batch, seq_len, _input_size) = masked.dims3()?;
        if seq_len < self.window_size {
            masked = masked.pad_with_zeros(1, 0, self.window_size - seq_len)?;
        }

        // (batch, seq, input) -> (batch, input, seq) for the convolution.
        let stacked = masked.transpose(1, 2)?.contiguous()?;
        let convolved = self.conv.forward(&stacked)?;

        // Adaptive max-pool to a single vector, then saturate.
        let pooled = convolved.max(D::Minus1)?;
        Ok(pooled.tanh()?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;

    use super::*;

    /// 2-channel input, 2 filters, window 2, with hand-picked weights so
    /// activations are easy to compute by hand.
    fn fixed_encoder(device: &Device) -> (PiecewiseEncoder, PcnnConfig) {
        let config = PcnnConfig {
            vocab_size: 10,
            num_relations: 2,
            emb_dim: 2,
            position_dim: 0, // input_size() == 2 for these unit tests
            hidden: 2,
            window_size: 2,
            max_len: 4,
            ..PcnnConfig::default()
        };

        let mut tensors = HashMap::new();
        // Filter 0 sums its window; filter 1 negates it.
        tensors.insert(
            "conv.weight".to_string(),
            Tensor::from_vec(
                vec![1_f32, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0],
                (2, 2, 2),
                device,
            )
            .unwrap(),
        );
        tensors.insert(
            "conv.bias".to_string(),
            Tensor::from_vec(vec![0.5_f32, -0.25], 2, device).unwrap(),
        );

        let vb = VarBuilder::from_tensors(tensors, DType::F32, device);
        let encoder = PiecewiseEncoder::load(&config, vb).unwrap();
        (encoder, config)
    }

    fn features(vals: Vec<f32>, seq_len: usize, device: &Device) -> Tensor {
        Tensor::from_vec(vals, (1, seq_len, 2), device).unwrap()
    }

    fn mask(vals: Vec<u8>, device: &Device) -> Tensor {
        let len = vals.len();
        Tensor::from_vec(vals, (1, len), device).unwrap()
    }

    #[test]
    fn fully_masked_piece_pools_to_tanh_bias() {
        let device = Device::Cpu;
        let (encoder, _config) = fixed_encoder(&device);

        let feats = features(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, &device);
        let empty = mask(vec![0, 0, 0], &device);

        let pooled = encoder.pool_piece(&feats, &empty).unwrap();
        let values: Vec<f32> = pooled.flatten_all().unwrap().to_vec1().unwrap();
        assert!((values[0] - 0.5_f32.tanh()).abs() < 1e-6);
        assert!((values[1] - (-0.25_f32).tanh()).abs() < 1e-6);
    }

    #[test]
    fn sequence_shorter_than_window_is_padded() {
        let device = Device::Cpu;
        let (encoder, _config) = fixed_encoder(&device);

        // One token, window 2: conv sees [token, zero-pad].
        let feats = features(vec![1.0, 1.0], 1, &device);
        let all = mask(vec![1], &device);

        let pooled = encoder.pool_piece(&feats, &all).unwrap();
        let values: Vec<f32> = pooled.flatten_all().unwrap().to_vec1().unwrap();
        // Filter 0: 1 + 1 + 0 + 0 + bias 0.5 = 2.5.
        assert!((values[0] - 2.5_f32.tanh()).abs() < 1e-6);
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn masked_positions_do_not_leak_into_the_pool() {
        let device = Device::Cpu;
        let (encoder, _config) = fixed_encoder(&device);

        let quiet = features(vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0], 3, &device);
        let loud = features(vec![1.0, 1.0, 0.0, 0.0, 100.0, 100.0], 3, &device);
        let first_only = mask(vec![1, 0, 0], &device);

        let a: Vec<f32> = encoder
            .pool_piece(&quiet, &first_only)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        let b: Vec<f32> = encoder
            .pool_piece(&loud, &first_only)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn max_pool_selects_strongest_window() {
        let device = Device::Cpu;
        let (encoder, _config) = fixed_encoder(&device);

        // Windows: [t0,t1] sums to 2, [t1,t2] sums to 6; pool takes 6.
        let feats = features(vec![1.0, 0.0, 1.0, 0.0, 5.0, 0.0], 3, &device);
        let all = mask(vec![1, 1, 1], &device);

        let pooled = encoder.pool_piece(&feats, &all).unwrap();
        let values: Vec<f32> = pooled.flatten_all().unwrap().to_vec1().unwrap();
        assert!((values[0] - 6.5_f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn encode_concatenates_three_pieces() {
        let device = Device::Cpu;
        let (encoder, _config) = fixed_encoder(&device);

        let feats = features(vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0], 3, &device);
        let subj = Tensor::from_vec(vec![-1_i64, 0, 1], (1, 3), &device).unwrap();
        let obj = Tensor::from_vec(vec![0_i64, 1, 2], (1, 3), &device).unwrap();
        let masks = PieceMasks::from_positions(&subj, &obj).unwrap();

        let encoded = encoder.encode(&feats, &masks).unwrap();
        assert_eq!(encoded.dims2().unwrap(), (1, 6));
        let values: Vec<f32> = encoded.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }
}
