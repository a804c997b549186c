//! Internal utilities for the H9 control engine.
//!
//! This crate provides the low-level 7-bit helpers the sysex codec is built
//! from. All utilities are `const fn` where possible and have zero external
//! dependencies.
//!
//! # Usage
//!
//! This crate is an implementation detail of `h9-core` and is not intended
//! for direct use. Use the `h9` facade crate instead.
//!
//! # Contents
//!
//! - [`checksum_7bit`] - Additive payload checksum
//! - [`split_14bit`] / [`combine_14bit`] - 14-bit septet pairs
//! - [`quantize_unit`] / [`dequantize_unit`] - Unit interval to 14-bit steps
//! - [`split_u16`] / [`combine_u16`] - 16-bit values as three septets

pub mod septet;

pub use septet::{
    checksum_7bit, combine_14bit, combine_u16, dequantize_unit, is_7bit_clean, quantize_unit,
    split_14bit, split_u16, MAX_14BIT,
};
