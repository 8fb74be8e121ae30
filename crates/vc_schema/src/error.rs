//! Construction errors and data errors.
//!
//! The two never mix: a [`BuildError`] comes from a mistake in the schema
//! declaration and is reported once, while building. A [`DataError`] comes
//! from one encode or decode call and leaves the session usable.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use thiserror::Error;

// -----------------------------------------------------------------------------
// ShapeKind

/// The shape a definition was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// A scalar converted to and from the format's native value.
    Value,
    /// A homogeneous array of one element type.
    Array,
    /// An object with named fields.
    Object,
    /// A reference to the definition of another, memoized type.
    Link,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeKind::Value => "a value",
            ShapeKind::Array => "an array",
            ShapeKind::Object => "an object",
            ShapeKind::Link => "a link",
        })
    }
}

// -----------------------------------------------------------------------------
// BuildError

/// A mistake in a schema declaration.
///
/// Returned while declaring or linking; no encoder or decoder is ever
/// created from a schema that produced one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    #[error("`{type_name}` is already declared as {existing}, cannot declare it as {requested}")]
    ShapeConflict {
        type_name: &'static str,
        existing: ShapeKind,
        requested: ShapeKind,
    },

    #[error("field `{field}` is declared twice on `{type_name}`")]
    DuplicateField {
        type_name: &'static str,
        field: String,
    },

    #[error("key `{key}` is already registered")]
    DuplicateKey { key: String },

    #[error("`{type_name}` is referenced but its shape was never declared")]
    Undeclared { type_name: &'static str },

    #[error("`{type_name}` only links to itself and never declares a shape")]
    UnresolvedLink { type_name: &'static str },
}

// -----------------------------------------------------------------------------
// Position

/// Where in the stream a [`DataError`] happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Unknown,
    /// Byte offset from the start of the stream.
    Offset(usize),
    /// 1-based line number.
    Line(usize),
    /// 1-based line and column.
    LineColumn { line: usize, column: usize },
}

impl Position {
    #[inline]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Position::Unknown)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Unknown => f.write_str("at unknown position"),
            Position::Offset(offset) => write!(f, "at byte {offset}"),
            Position::Line(line) => write!(f, "at line {line}"),
            Position::LineColumn { line, column } => {
                write!(f, "at line {line} column {column}")
            }
        }
    }
}

// -----------------------------------------------------------------------------
// FieldPath

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// The chain of fields and indices leading to the failing value.
///
/// Segments are appended innermost first while an error bubbles out of
/// nested callbacks, and rendered outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (at, segment) in self.0.iter().rev().enumerate() {
            match segment {
                Segment::Field(name) if at == 0 => f.write_str(name)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// DataError

/// Category of a [`DataError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DataErrorKind {
    /// The stream ended cleanly before the next entity.
    EndOfInput,
    /// The stream ended in the middle of an entity.
    Truncated,
    /// The bytes do not follow the format's syntax.
    Malformed,
    /// Well-formed input of the wrong shape, e.g. an array where an object was declared.
    Unexpected,
    /// A native value could not be converted to the declared scalar type.
    Conversion,
    /// The format cannot represent the declared shape.
    Unsupported,
    /// The underlying stream failed.
    Io,
    /// The compiled tree was used with an entity of another type.
    Internal,
}

impl fmt::Display for DataErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataErrorKind::EndOfInput => "end of input",
            DataErrorKind::Truncated => "truncated input",
            DataErrorKind::Malformed => "malformed input",
            DataErrorKind::Unexpected => "unexpected input",
            DataErrorKind::Conversion => "conversion failed",
            DataErrorKind::Unsupported => "unsupported shape",
            DataErrorKind::Io => "stream error",
            DataErrorKind::Internal => "internal error",
        })
    }
}

struct PathSuffix<'a>(&'a FieldPath);

impl fmt::Display for PathSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, " (in `{}`)", self.0)
        }
    }
}

/// A failed encode or decode call.
///
/// Carries a position in the stream and a human readable message. The
/// session that produced it stays open; the caller decides whether to skip
/// the record, log it or stop.
///
/// # Examples
///
/// ```
/// use vc_schema::error::{DataError, DataErrorKind, Position};
///
/// let err = DataError::malformed("expected `:`")
///     .at(Position::Offset(12))
///     .in_field("y")
///     .at_index(2)
///     .in_field("points");
///
/// assert_eq!(err.kind(), DataErrorKind::Malformed);
/// assert_eq!(
///     err.to_string(),
///     "malformed input at byte 12: expected `:` (in `points[2].y`)",
/// );
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} {position}: {message}{}", PathSuffix(.path))]
pub struct DataError {
    kind: DataErrorKind,
    position: Position,
    message: String,
    path: FieldPath,
}

impl DataError {
    pub fn new(kind: DataErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            position: Position::Unknown,
            message: message.into(),
            path: FieldPath::default(),
        }
    }

    #[inline]
    pub fn end_of_input() -> Self {
        Self::new(DataErrorKind::EndOfInput, "no more entities in the stream")
    }

    #[inline]
    pub fn truncated(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Truncated, message)
    }

    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Malformed, message)
    }

    #[inline]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Unexpected, message)
    }

    #[inline]
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Conversion, message)
    }

    #[inline]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Unsupported, message)
    }

    #[inline]
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Io, message)
    }

    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Internal, message)
    }

    /// Sets the position unless a more precise one was recorded already.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        if !self.position.is_known() {
            self.position = position;
        }
        self
    }

    /// Records that the error happened inside field `name`.
    #[must_use]
    pub fn in_field(mut self, name: &str) -> Self {
        self.path.0.push(Segment::Field(name.to_owned()));
        self
    }

    /// Records that the error happened inside array item `index`.
    #[must_use]
    pub fn at_index(mut self, index: usize) -> Self {
        self.path.0.push(Segment::Index(index));
        self
    }

    #[inline]
    pub fn kind(&self) -> DataErrorKind {
        self.kind
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Returns `true` if the stream simply had no further entity.
    #[inline]
    pub fn is_end_of_input(&self) -> bool {
        self.kind == DataErrorKind::EndOfInput
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{BuildError, DataError, Position, ShapeKind};
    use alloc::string::ToString;

    #[test]
    fn inner_position_wins() {
        let err = DataError::truncated("eof")
            .at(Position::Offset(3))
            .at(Position::Offset(0));
        assert_eq!(err.position(), Position::Offset(3));
    }

    #[test]
    fn path_renders_outermost_first() {
        let err = DataError::conversion("not an i32")
            .in_field("value")
            .at_index(0)
            .in_field("children")
            .at_index(1)
            .in_field("children");

        assert_eq!(err.path().to_string(), "children[1].children[0].value");
        assert!(!err.is_end_of_input());
    }

    #[test]
    fn display_without_path() {
        let err = DataError::end_of_input().at(Position::Line(4));
        assert_eq!(
            err.to_string(),
            "end of input at line 4: no more entities in the stream"
        );
    }

    #[test]
    fn build_error_messages() {
        let err = BuildError::ShapeConflict {
            type_name: "Point",
            existing: ShapeKind::Object,
            requested: ShapeKind::Value,
        };
        assert_eq!(
            err.to_string(),
            "`Point` is already declared as an object, cannot declare it as a value"
        );
    }
}
