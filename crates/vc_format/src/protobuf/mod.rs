//! A protobuf-compatible binary format.
//!
//! Every top-level entity is one message, framed by its varint encoded
//! length. Inside a message:
//!
//! - an object field is keyed by its [tag](vc_schema::define::FieldInfo::tag);
//! - a nested object is a length-delimited sub-message;
//! - an array is a repeated field, one key per item;
//! - a top-level value or array is written as field `1`.
//!
//! Integers are zigzag varints when signed and plain varints otherwise,
//! floats are fixed-width and strings are length-delimited UTF-8.
//!
//! Arrays of arrays have no encoding and fail with
//! [`Unsupported`](vc_schema::error::DataErrorKind::Unsupported).

use alloc::string::ToString;

use prost::DecodeError;
use vc_schema::error::DataError;

mod reader;
mod value;
mod writer;

pub use reader::{ProtoIn, ProtobufReader};
pub use value::WireValue;
pub use writer::{ProtoOut, ProtobufWriter};

/// Field number of a top-level value or array.
pub const ROOT_TAG: u32 = 1;

fn from_prost(err: DecodeError) -> DataError {
    DataError::malformed(err.to_string())
}
