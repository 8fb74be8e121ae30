//! The contract between the engines and a wire format.
//!
//! A format is split into a [`Writer`] and a [`Reader`]. Both are stateless
//! values shared by every session; everything that belongs to one open
//! stream lives in the associated `State`, created by `start` and consumed
//! by `stop`.
//!
//! The engines never look at bytes. They hand the adapter either a native
//! value, or a small object describing an array or an object whose parts the
//! adapter asks for in its own order.

use crate::define::FieldInfo;
use crate::error::{DataError, Position};
use crate::lookup::{FieldLookup, LookupStrategy};

// -----------------------------------------------------------------------------
// Writing

/// The format side shared by all writers of one format.
pub trait WriteFormat {
    /// The scalar value model of the format.
    type Native: 'static;
}

/// Writes entities of a format into a stream of type `S`.
pub trait Writer<S>: WriteFormat {
    /// Per-stream state, alive from [`start`](Writer::start) to
    /// [`stop`](Writer::stop).
    type State;

    /// Opens a stream.
    fn start(&self, stream: S) -> Result<Self::State, DataError>;

    /// Closes a stream. Called exactly once per successful `start`.
    fn stop(&self, state: Self::State) -> Result<(), DataError>;

    /// Called after each complete top-level entity.
    fn flush(&self, state: &mut Self::State) -> Result<(), DataError>;

    /// Current location in the output, used to annotate errors.
    fn position(&self, _state: &Self::State) -> Position {
        Position::Unknown
    }

    fn write_as_value(&self, state: &mut Self::State, value: Self::Native) -> Result<(), DataError>;

    fn write_as_array(
        &self,
        state: &mut Self::State,
        items: &dyn ArrayItems<Self::State>,
    ) -> Result<(), DataError>;

    fn write_as_object(
        &self,
        state: &mut Self::State,
        object: &dyn ObjectFields<Self::State>,
    ) -> Result<(), DataError>;
}

/// The items of one array being written.
pub trait ArrayItems<St> {
    /// Number of items.
    fn len(&self) -> usize;

    /// Writes every item in order.
    ///
    /// `before_item` runs ahead of each item with its index, so the writer
    /// can emit separators or keys.
    fn write_each(
        &self,
        state: &mut St,
        before_item: &mut dyn FnMut(&mut St, usize) -> Result<(), DataError>,
    ) -> Result<(), DataError>;
}

/// The fields of one object being written.
pub trait ObjectFields<St> {
    /// Declared fields, in declaration order.
    fn fields(&self) -> &[FieldInfo];

    /// Writes the value of field `index`.
    fn write_field(&self, index: usize, state: &mut St) -> Result<(), DataError>;
}

// -----------------------------------------------------------------------------
// Reading

/// The format side shared by all readers of one format.
pub trait ReadFormat {
    /// The scalar value model of the format.
    type Native: 'static;

    /// How this format addresses object fields.
    fn lookup_strategy() -> LookupStrategy {
        LookupStrategy::Name
    }
}

/// Reads entities of a format from a stream of type `S`.
pub trait Reader<S>: ReadFormat {
    /// Per-stream state, alive from [`start`](Reader::start) to
    /// [`stop`](Reader::stop).
    type State;

    /// Opens a stream.
    fn start(&self, stream: S) -> Result<Self::State, DataError>;

    /// Closes a stream. Called exactly once per successful `start`.
    fn stop(&self, state: Self::State) -> Result<(), DataError>;

    /// Moves to the next top-level entity.
    ///
    /// Fails with [`DataErrorKind::EndOfInput`] if the stream holds no
    /// further entity.
    ///
    /// [`DataErrorKind::EndOfInput`]: crate::error::DataErrorKind::EndOfInput
    fn advance(&self, state: &mut Self::State) -> Result<(), DataError>;

    /// Current location in the input, used to annotate errors.
    fn position(&self, _state: &Self::State) -> Position {
        Position::Unknown
    }

    fn read_to_value(&self, state: &mut Self::State) -> Result<Self::Native, DataError>;

    /// Reads an array, calling [`ArrayTarget::read_item`] once per item.
    fn read_to_array(
        &self,
        state: &mut Self::State,
        target: &mut dyn ArrayTarget<Self::State>,
    ) -> Result<(), DataError>;

    /// Reads an object.
    ///
    /// Each key is resolved through [`ObjectTarget::lookup`]. A resolved key
    /// is handed to [`ObjectTarget::read_field`]; the value of an unresolved
    /// key is skipped.
    fn read_to_object(
        &self,
        state: &mut Self::State,
        target: &mut dyn ObjectTarget<Self::State>,
    ) -> Result<(), DataError>;
}

/// The array being decoded. Every read item is appended.
pub trait ArrayTarget<St> {
    fn read_item(&mut self, state: &mut St) -> Result<(), DataError>;
}

/// The object being decoded.
pub trait ObjectTarget<St> {
    /// Field keys to field indices.
    fn lookup(&self) -> &FieldLookup<usize>;

    /// Declared fields, in declaration order.
    fn fields(&self) -> &[FieldInfo];

    /// Reads the value of field `index` into the object.
    fn read_field(&mut self, index: usize, state: &mut St) -> Result<(), DataError>;
}
