// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared utilities: piece-mask construction from relative positions.

pub mod masks;
