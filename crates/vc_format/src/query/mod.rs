//! URL query strings, one line per entity.
//!
//! An entity must be a flat object: `x=3&y=-4`. Arrays become repeated
//! keys, `tags=a&tags=b`. Keys and values are percent-encoded; on input a
//! `+` also stands for a space.
//!
//! Top-level values and arrays, objects inside objects and arrays of arrays
//! fail with [`Unsupported`](vc_schema::error::DataErrorKind::Unsupported).

mod reader;
mod value;
mod writer;

pub use reader::{QueryIn, QueryReader};
pub use value::QueryValue;
pub use writer::{QueryOut, QueryWriter};
