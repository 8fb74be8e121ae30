#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// STD Support

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod stream;

#[cfg(feature = "json")]
pub mod json;
#[cfg(feature = "protobuf")]
pub mod protobuf;
#[cfg(feature = "query")]
pub mod query;

#[cfg(test)]
mod fixtures;
