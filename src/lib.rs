#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use vc_format as format;
pub use vc_schema as schema;
pub use vc_utils as utils;

pub use vc_schema::{
    BuildError, DataError, Decoder, DecoderSession, Describe, Descriptor, Encoder, EncoderSession,
    Linked, Schema,
};
