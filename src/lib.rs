// SPDX-License-Identifier: MIT OR Apache-2.0

//! # candle-relex
//!
//! Sentence-level relation extraction in Rust, built on
//! [candle](https://github.com/huggingface/candle).
//!
//! The crate implements the piecewise convolutional neural network (PCNN)
//! forward pass: a sentence with a marked subject and object entity is
//! segmented into three pieces by the tokens' relative positions to the two
//! entities, a shared 1-D convolution + max-pool runs over each masked piece
//! independently, and the three pooled feature vectors are concatenated and
//! projected to relation logits.
//!
//! Data loading, vocabulary construction, and the training loop live in the
//! external experiment harness; this crate is the scoring function. Inputs
//! arrive as batched `i64` id tensors (tokens, part-of-speech tags, entity
//! types, and signed subject/object offsets) and logits come back as a
//! `(batch, num_relations)` `f32` tensor.
//!
//! ## Quick start
//!
//! ```no_run
//! use candle_core::Device;
//! use candle_nn::{VarBuilder, VarMap};
//! use candle_relex::{Pcnn, PcnnConfig, RelationInput};
//!
//! # fn main() -> candle_relex::Result<()> {
//! let device = Device::Cpu;
//! let config = PcnnConfig {
//!     vocab_size: 20_000,
//!     num_relations: 42,
//!     ..PcnnConfig::default()
//! };
//!
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, candle_core::DType::F32, &device);
//! let model = Pcnn::load(&config, None, vb)?;
//!
//! let input = RelationInput::from_vecs(
//!     vec![vec![2, 5, 9, 0]],          // words (0 = pad)
//!     vec![vec![0, 0, 0, 0]],          // pos tags (reserved)
//!     vec![vec![0, 0, 0, 0]],          // ner tags (reserved)
//!     vec![vec![-1, 0, 1, 2]],         // offsets from subject
//!     vec![vec![-2, -1, 0, 1]],        // offsets from object
//!     &device,
//! )?;
//!
//! let logits = model.forward(&input, false)?; // (1, 42)
//! # let _ = logits;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod inputs;
pub mod pcnn;
pub mod util;

pub use backend::{RelationBackend, RelationModel};
pub use config::{PcnnConfig, PAD_ID};
pub use error::{RelexError, Result};
pub use inputs::RelationInput;
pub use pcnn::Pcnn;
pub use util::masks::PieceMasks;
