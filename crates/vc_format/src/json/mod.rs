//! JSON text, one top-level value per entity.
//!
//! Entities are separated by a newline on output. On input any whitespace
//! separates them, so both JSON Lines and concatenated documents decode.
//!
//! Objects map to JSON objects keyed by field name, arrays to JSON arrays
//! and scalars to [`JsonScalar`]s.
//!
//! # Examples
//!
//! ```
//! use vc_format::json::{JsonReader, JsonScalar, JsonWriter};
//! use vc_schema::{Decoder, Encoder, Schema};
//!
//! let linked = Schema::<JsonScalar>::of::<Vec<u32>>().unwrap();
//!
//! let mut out = Vec::new();
//! let encoder = Encoder::new(&linked, JsonWriter::new());
//! encoder.encode_once(&mut out, &vec![1, 2, 3]).unwrap();
//! assert_eq!(out, b"[1,2,3]\n");
//!
//! let decoder = Decoder::new(&linked, JsonReader).unwrap();
//! let mut session = decoder.open(&out[..]).unwrap();
//! assert_eq!(session.decode().unwrap(), vec![1, 2, 3]);
//! ```

use alloc::string::ToString;

use serde_json::error::Category;
use vc_schema::error::{DataError, Position};

mod reader;
mod value;
mod writer;

pub use reader::{JsonIn, JsonReader};
pub use value::JsonScalar;
pub use writer::{JsonOut, JsonWriter};

// -----------------------------------------------------------------------------
// Errors

/// Maps a `serde_json` error, moving its line and column into the position.
fn from_json(err: serde_json::Error) -> DataError {
    let text = err.to_string();
    let (message, position) = match err.line() {
        0 => (text.as_str(), Position::Unknown),
        line => (
            text.rfind(" at line ").map_or(text.as_str(), |end| &text[..end]),
            Position::LineColumn {
                line,
                column: err.column(),
            },
        ),
    };
    let error = match err.classify() {
        Category::Io => DataError::io(message),
        Category::Syntax => DataError::malformed(message),
        Category::Data => DataError::unexpected(message),
        Category::Eof => DataError::truncated(message),
    };
    error.at(position)
}
