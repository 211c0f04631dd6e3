// SPDX-License-Identifier: MIT OR Apache-2.0

//! PCNN configuration and experiment-config JSON parsing.
//!
//! [`PcnnConfig`] captures every constructor-time knob of the model. All
//! fields are plain public values fixed for the model's lifetime; the
//! external trainer supplies them either directly or through
//! [`from_json`](PcnnConfig::from_json), which reads the experiment config
//! format used by the harness.
//!
//! # Usage
//!
//! ```
//! use candle_relex::PcnnConfig;
//!
//! let config_str = r#"{"vocab_size": 53953, "num_relations": 42,
//!     "hidden": 230, "emb_dim": 300, "position_dim": 30,
//!     "window_size": 3, "dropout": 0.5, "max_len": 100}"#;
//! let json: serde_json::Value = serde_json::from_str(config_str).unwrap();
//! let config = PcnnConfig::from_json(&json).unwrap();
//! assert_eq!(config.hidden, 230);
//! assert_eq!(config.input_size(), 360);
//! ```

use serde_json::Value;

use crate::error::{RelexError, Result};

/// Reserved id for padding tokens, fixed across every id space (words,
/// part-of-speech tags, entity types).
pub const PAD_ID: i64 = 0;

// ---------------------------------------------------------------------------
// PcnnConfig
// ---------------------------------------------------------------------------

/// Configuration for the piecewise convolutional relation extractor.
///
/// `pos_dim`, `ner_dim`, `attn_dim`, and `num_layers` are accepted for
/// forward compatibility with richer sentence encoders but are inert in the
/// PCNN forward pass; setting an embedding dim to `0` disables its table
/// entirely.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PcnnConfig {
    // --- Dimensions ----------------------------------------------------------
    /// Number of convolution output channels (per-piece feature size).
    pub hidden: usize,
    /// Word vocabulary size (including the pad id).
    pub vocab_size: usize,
    /// Word embedding dimension.
    pub emb_dim: usize,
    /// Part-of-speech embedding dimension (`0` disables the table; reserved,
    /// not consumed by the forward pass).
    pub pos_dim: usize,
    /// Entity-type embedding dimension (`0` disables the table; reserved,
    /// not consumed by the forward pass).
    pub ner_dim: usize,
    /// Part-of-speech tag vocabulary size. Required when `pos_dim > 0`.
    pub pos_vocab_size: usize,
    /// Entity-type vocabulary size. Required when `ner_dim > 0`.
    pub ner_vocab_size: usize,
    /// Relative-position embedding dimension (shared subject/object table).
    pub position_dim: usize,
    /// Attention dimension. Reserved for attention-based encoders.
    pub attn_dim: usize,

    // --- Encoder -------------------------------------------------------------
    /// Convolution kernel width over the token axis.
    pub window_size: usize,
    /// Number of stacked encoder layers. Reserved for recurrent encoders;
    /// the PCNN always uses a single convolution.
    pub num_layers: usize,
    /// Dropout rate applied to the concatenated piece features in train mode.
    pub dropout: f32,

    // --- Positions and output ------------------------------------------------
    /// Maximum supported sentence length. Relative offsets live in
    /// `[-max_len, max_len)` and the position table has `2 * max_len` rows.
    pub max_len: usize,
    /// Number of relation labels (output logit width).
    pub num_relations: usize,
}

impl Default for PcnnConfig {
    /// Defaults follow the published PCNN setup: 230 filters, 300-d word
    /// vectors, 30-d position vectors, window 3, dropout 0.5.
    ///
    /// `vocab_size` and `num_relations` default to `0` and must be set by
    /// the caller; [`validate`](Self::validate) rejects them otherwise.
    fn default() -> Self {
        Self {
            hidden: 230,
            vocab_size: 0,
            emb_dim: 300,
            pos_dim: 0,
            ner_dim: 0,
            pos_vocab_size: 0,
            ner_vocab_size: 0,
            position_dim: 30,
            attn_dim: 200,
            window_size: 3,
            num_layers: 1,
            dropout: 0.5,
            max_len: 100,
            num_relations: 0,
        }
    }
}

impl PcnnConfig {
    /// Width of the per-token feature vector fed to the convolution:
    /// word embedding plus the two position embeddings.
    #[must_use]
    pub const fn input_size(&self) -> usize {
        self.emb_dim + 2 * self.position_dim
    }

    /// Number of rows in the shared relative-position table.
    #[must_use]
    pub const fn position_rows(&self) -> usize {
        2 * self.max_len
    }

    /// Parse a [`PcnnConfig`] from an experiment-config JSON value.
    ///
    /// `vocab_size` and `num_relations` are required; every other field
    /// falls back to [`PcnnConfig::default`]. The parsed config is
    /// validated before being returned.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Config`] if a required field is missing,
    /// a field has the wrong type, or validation fails.
    pub fn from_json(config: &Value) -> Result<Self> {
        let defaults = Self::default();

        let parsed = Self {
            hidden: get_usize_or(config, "hidden", defaults.hidden),
            vocab_size: get_usize(config, "vocab_size")?,
            emb_dim: get_usize_or(config, "emb_dim", defaults.emb_dim),
            pos_dim: get_usize_or(config, "pos_dim", defaults.pos_dim),
            ner_dim: get_usize_or(config, "ner_dim", defaults.ner_dim),
            pos_vocab_size: get_usize_or(config, "pos_vocab_size", defaults.pos_vocab_size),
            ner_vocab_size: get_usize_or(config, "ner_vocab_size", defaults.ner_vocab_size),
            position_dim: get_usize_or(config, "position_dim", defaults.position_dim),
            attn_dim: get_usize_or(config, "attn_dim", defaults.attn_dim),
            window_size: get_usize_or(config, "window_size", defaults.window_size),
            num_layers: get_usize_or(config, "num_layers", defaults.num_layers),
            dropout: get_f32_or(config, "dropout", defaults.dropout),
            max_len: get_usize_or(config, "max_len", defaults.max_len),
            num_relations: get_usize(config, "num_relations")?,
        };

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RelexError::Config`] naming the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(RelexError::Config("vocab_size must be > 0".into()));
        }
        if self.num_relations == 0 {
            return Err(RelexError::Config("num_relations must be > 0".into()));
        }
        if self.hidden == 0 {
            return Err(RelexError::Config("hidden must be > 0".into()));
        }
        if self.emb_dim == 0 {
            return Err(RelexError::Config("emb_dim must be > 0".into()));
        }
        if self.position_dim == 0 {
            return Err(RelexError::Config("position_dim must be > 0".into()));
        }
        if self.window_size == 0 {
            return Err(RelexError::Config("window_size must be >= 1".into()));
        }
        if self.max_len == 0 {
            return Err(RelexError::Config("max_len must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(RelexError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.pos_dim > 0 && self.pos_vocab_size == 0 {
            return Err(RelexError::Config(
                "pos_vocab_size must be > 0 when pos_dim > 0".into(),
            ));
        }
        if self.ner_dim > 0 && self.ner_vocab_size == 0 {
            return Err(RelexError::Config(
                "ner_vocab_size must be > 0 when ner_dim > 0".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON extraction helpers
// ---------------------------------------------------------------------------

/// Extract a required `usize` field from a JSON object.
fn get_usize(config: &Value, key: &str) -> Result<usize> {
    let val = config
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| RelexError::Config(format!("missing or invalid field '{key}'")))?;
    usize::try_from(val)
        .map_err(|_| RelexError::Config(format!("field '{key}' value {val} overflows usize")))
}

/// Extract an optional `usize` field, returning a default if absent.
fn get_usize_or(config: &Value, key: &str, default: usize) -> usize {
    config
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Extract an optional `f32` field, returning a default if absent.
fn get_f32_or(config: &Value, key: &str, default: f32) -> f32 {
    config
        .get(key)
        .and_then(Value::as_f64)
        .map_or(default, |v| v as f32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn experiment_json() -> Value {
        serde_json::json!({
            "vocab_size": 53953,
            "num_relations": 42,
            "hidden": 230,
            "emb_dim": 300,
            "position_dim": 30,
            "window_size": 3,
            "dropout": 0.5,
            "max_len": 100
        })
    }

    #[test]
    fn parse_experiment_config() {
        let config = PcnnConfig::from_json(&experiment_json()).unwrap();
        assert_eq!(config.vocab_size, 53953);
        assert_eq!(config.num_relations, 42);
        assert_eq!(config.hidden, 230);
        assert_eq!(config.window_size, 3);
        assert_eq!(config.input_size(), 300 + 2 * 30);
        assert_eq!(config.position_rows(), 200);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let json = serde_json::json!({ "vocab_size": 100, "num_relations": 5 });
        let config = PcnnConfig::from_json(&json).unwrap();
        assert_eq!(config.hidden, 230);
        assert_eq!(config.emb_dim, 300);
        assert_eq!(config.position_dim, 30);
        assert_eq!(config.max_len, 100);
        assert!((config.dropout - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_vocab_size_errors() {
        let json = serde_json::json!({ "num_relations": 5 });
        assert!(PcnnConfig::from_json(&json).is_err());
    }

    #[test]
    fn missing_num_relations_errors() {
        let json = serde_json::json!({ "vocab_size": 100 });
        assert!(PcnnConfig::from_json(&json).is_err());
    }

    #[test]
    fn dropout_out_of_range_rejected() {
        let config = PcnnConfig {
            vocab_size: 100,
            num_relations: 5,
            dropout: 1.0,
            ..PcnnConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_window_rejected() {
        let config = PcnnConfig {
            vocab_size: 100,
            num_relations: 5,
            window_size: 0,
            ..PcnnConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn pos_dim_without_vocab_rejected() {
        let config = PcnnConfig {
            vocab_size: 100,
            num_relations: 5,
            pos_dim: 30,
            pos_vocab_size: 0,
            ..PcnnConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inert_fields_accepted() {
        let json = serde_json::json!({
            "vocab_size": 100,
            "num_relations": 5,
            "pos_dim": 30,
            "pos_vocab_size": 50,
            "ner_dim": 30,
            "ner_vocab_size": 25,
            "attn_dim": 200,
            "num_layers": 2
        });
        let config = PcnnConfig::from_json(&json).unwrap();
        assert_eq!(config.pos_dim, 30);
        assert_eq!(config.attn_dim, 200);
        assert_eq!(config.num_layers, 2);
    }
}
