#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod adapter;
pub mod decode;
pub mod define;
pub mod encode;
pub mod error;
pub mod lookup;

#[cfg(test)]
mod testing;

// -----------------------------------------------------------------------------
// Top-level exports

pub use decode::{Decoder, DecoderSession};
pub use define::{Converter, Describe, Descriptor, Linked, Scalar, Schema};
pub use encode::{Encoder, EncoderSession};
pub use error::{BuildError, DataError};
