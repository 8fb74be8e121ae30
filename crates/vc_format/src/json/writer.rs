use alloc::vec::Vec;
use std::io::{self, Write};

use serde_json::Value;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use vc_schema::adapter::{ArrayItems, ObjectFields, WriteFormat, Writer};
use vc_schema::error::{DataError, Position};

use super::{JsonScalar, from_json};
use crate::stream::{Counted, io_error};

// -----------------------------------------------------------------------------
// Style

enum Style {
    Compact(CompactFormatter),
    Pretty(PrettyFormatter<'static>),
}

impl Style {
    fn new(pretty: bool) -> Self {
        if pretty {
            Style::Pretty(PrettyFormatter::new())
        } else {
            Style::Compact(CompactFormatter)
        }
    }
}

macro_rules! dispatch {
    ($self:ident.$method:ident($($arg:expr),*)) => {
        match $self {
            Style::Compact(formatter) => formatter.$method($($arg),*),
            Style::Pretty(formatter) => formatter.$method($($arg),*),
        }
    };
}

impl Formatter for Style {
    #[inline]
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        dispatch!(self.begin_array(writer))
    }

    #[inline]
    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        dispatch!(self.end_array(writer))
    }

    #[inline]
    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        dispatch!(self.begin_array_value(writer, first))
    }

    #[inline]
    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        dispatch!(self.end_array_value(writer))
    }

    #[inline]
    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        dispatch!(self.begin_object(writer))
    }

    #[inline]
    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        dispatch!(self.end_object(writer))
    }

    #[inline]
    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        dispatch!(self.begin_object_key(writer, first))
    }

    #[inline]
    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        dispatch!(self.begin_object_value(writer))
    }

    #[inline]
    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        dispatch!(self.end_object_value(writer))
    }
}

// -----------------------------------------------------------------------------
// JsonWriter

/// Writes each entity as one JSON value followed by a newline.
///
/// The entity is assembled in memory and only reaches the stream on flush,
/// so a failed entity leaves no partial text behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriter {
    pretty: bool,
}

impl JsonWriter {
    /// A writer producing compact, single-line JSON.
    #[inline]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// A writer producing indented JSON.
    #[inline]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Output state of a [`JsonWriter`] session.
pub struct JsonOut<W> {
    out: Counted<W>,
    buffer: Vec<u8>,
    style: Style,
    pretty: bool,
    depth: usize,
}

impl<W> JsonOut<W> {
    fn begin_entity(&mut self) {
        if self.depth == 0 {
            self.buffer.clear();
            self.style = Style::new(self.pretty);
        }
    }

    fn format(
        &mut self,
        step: impl FnOnce(&mut Style, &mut Vec<u8>) -> io::Result<()>,
    ) -> Result<(), DataError> {
        step(&mut self.style, &mut self.buffer).map_err(io_error)
    }

    fn nested(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), DataError>,
    ) -> Result<(), DataError> {
        self.begin_entity();
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }
}

impl WriteFormat for JsonWriter {
    type Native = JsonScalar;
}

impl<W: Write> Writer<W> for JsonWriter {
    type State = JsonOut<W>;

    fn start(&self, stream: W) -> Result<JsonOut<W>, DataError> {
        Ok(JsonOut {
            out: Counted::new(stream),
            buffer: Vec::new(),
            style: Style::new(self.pretty),
            pretty: self.pretty,
            depth: 0,
        })
    }

    fn stop(&self, mut state: JsonOut<W>) -> Result<(), DataError> {
        state.out.flush().map_err(io_error)
    }

    fn flush(&self, state: &mut JsonOut<W>) -> Result<(), DataError> {
        state.buffer.push(b'\n');
        let result = state
            .out
            .write_all(&state.buffer)
            .and_then(|()| state.out.flush());
        state.buffer.clear();
        result.map_err(io_error)
    }

    fn position(&self, state: &JsonOut<W>) -> Position {
        Position::Offset(state.out.count() + state.buffer.len())
    }

    fn write_as_value(&self, state: &mut JsonOut<W>, value: JsonScalar) -> Result<(), DataError> {
        state.begin_entity();
        serde_json::to_writer(&mut state.buffer, &Value::from(value)).map_err(from_json)
    }

    fn write_as_array(
        &self,
        state: &mut JsonOut<W>,
        items: &dyn ArrayItems<JsonOut<W>>,
    ) -> Result<(), DataError> {
        state.nested(|state| {
            state.format(|style, buffer| style.begin_array(buffer))?;
            let mut any = false;
            items.write_each(state, &mut |state, index| {
                any = true;
                state.format(|style, buffer| {
                    if index > 0 {
                        style.end_array_value(buffer)?;
                    }
                    style.begin_array_value(buffer, index == 0)
                })
            })?;
            state.format(|style, buffer| {
                if any {
                    style.end_array_value(buffer)?;
                }
                style.end_array(buffer)
            })
        })
    }

    fn write_as_object(
        &self,
        state: &mut JsonOut<W>,
        object: &dyn ObjectFields<JsonOut<W>>,
    ) -> Result<(), DataError> {
        state.nested(|state| {
            state.format(|style, buffer| style.begin_object(buffer))?;
            for (index, field) in object.fields().iter().enumerate() {
                state.format(|style, buffer| {
                    style.begin_object_key(buffer, index == 0)?;
                    serde_json::to_writer(&mut *buffer, field.name()).map_err(io::Error::from)?;
                    style.end_object_key(buffer)?;
                    style.begin_object_value(buffer)
                })?;
                object.write_field(index, state)?;
                state.format(|style, buffer| style.end_object_value(buffer))?;
            }
            state.format(|style, buffer| style.end_object(buffer))
        })
    }
}

// -----------------------------------------------------------------------------
// Tests
