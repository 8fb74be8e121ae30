use alloc::format;
use alloc::vec;
use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes};
use prost::encoding::{WireType, decode_key, decode_varint};
use vc_schema::adapter::{ArrayTarget, ObjectTarget, ReadFormat, Reader};
use vc_schema::error::{DataError, Position};
use vc_schema::lookup::LookupStrategy;

use super::{ROOT_TAG, WireValue, from_prost};
use crate::stream::io_error;

// -----------------------------------------------------------------------------
// ProtobufReader

/// Reads length-prefixed messages, one per entity.
///
/// Fields are matched by tag only: a field named with a decimal number uses
/// that number as its tag. Unknown fields are skipped.
#[derive(Debug, Clone, Copy)]
pub struct ProtobufReader {
    max_frame_len: usize,
}

impl ProtobufReader {
    pub const DEFAULT_MAX_FRAME_LEN: usize = 64 << 20;

    #[inline]
    pub const fn new() -> Self {
        Self {
            max_frame_len: Self::DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Rejects frames whose length prefix exceeds `len` bytes.
    #[inline]
    pub const fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }
}

impl Default for ProtobufReader {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

enum Cursor {
    /// A whole top-level message.
    Message(Bytes),
    /// One field of the enclosing message.
    Field(WireValue),
}

/// Input state of a [`ProtobufReader`] session.
pub struct ProtoIn<R> {
    input: R,
    consumed: usize,
    frame_start: usize,
    cursor: Option<Cursor>,
}

impl<R> ProtoIn<R> {
    fn take(&mut self) -> Result<Cursor, DataError> {
        self.cursor
            .take()
            .ok_or_else(|| DataError::internal("no protobuf value pending"))
    }
}

// -----------------------------------------------------------------------------
// Framing

/// Reads one byte, or `None` at a clean end of the stream.
fn read_byte<R: Read>(input: &mut R) -> Result<Option<u8>, DataError> {
    let mut byte = [0_u8];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(io_error(err)),
        }
    }
}

/// Reads a frame length prefix, or `None` if the stream ended before it.
fn read_frame_len<R: Read>(state: &mut ProtoIn<R>) -> Result<Option<u64>, DataError> {
    let mut value = 0_u64;
    for index in 0..10 {
        let Some(byte) = read_byte(&mut state.input)? else {
            return match index {
                0 => Ok(None),
                _ => Err(DataError::truncated("stream ends inside a frame length")),
            };
        };
        state.consumed += 1;
        value |= u64::from(byte & 0x7f) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(Some(value));
        }
    }
    Err(DataError::malformed("frame length varint is too long"))
}

fn next_field(buf: &mut Bytes) -> Result<(u32, WireValue), DataError> {
    let (tag, wire_type) = decode_key(buf).map_err(from_prost)?;
    let value = match wire_type {
        WireType::Varint => WireValue::Varint(decode_varint(buf).map_err(from_prost)?),
        WireType::SixtyFourBit => {
            if buf.remaining() < 8 {
                return Err(DataError::truncated("message ends inside a 64-bit field"));
            }
            WireValue::Fixed64(buf.get_u64_le())
        }
        WireType::ThirtyTwoBit => {
            if buf.remaining() < 4 {
                return Err(DataError::truncated("message ends inside a 32-bit field"));
            }
            WireValue::Fixed32(buf.get_u32_le())
        }
        WireType::LengthDelimited => {
            let len = decode_varint(buf).map_err(from_prost)?;
            match usize::try_from(len) {
                Ok(len) if len <= buf.remaining() => WireValue::Bytes(buf.split_to(len)),
                _ => {
                    return Err(DataError::truncated(format!(
                        "field {tag} needs {len} bytes, {} left",
                        buf.remaining()
                    )));
                }
            }
        }
        WireType::StartGroup | WireType::EndGroup => {
            return Err(DataError::unsupported(format!(
                "field {tag} is a group, groups are not supported"
            )));
        }
    };
    Ok((tag, value))
}

impl ReadFormat for ProtobufReader {
    type Native = WireValue;

    #[inline]
    fn lookup_strategy() -> LookupStrategy {
        LookupStrategy::IndexOrName
    }
}

impl<R: Read> Reader<R> for ProtobufReader {
    type State = ProtoIn<R>;

    fn start(&self, stream: R) -> Result<ProtoIn<R>, DataError> {
        Ok(ProtoIn {
            input: stream,
            consumed: 0,
            frame_start: 0,
            cursor: None,
        })
    }

    fn stop(&self, _state: ProtoIn<R>) -> Result<(), DataError> {
        Ok(())
    }

    fn advance(&self, state: &mut ProtoIn<R>) -> Result<(), DataError> {
        state.frame_start = state.consumed;
        state.cursor = None;

        let Some(len) = read_frame_len(state)? else {
            return Err(DataError::end_of_input());
        };
        let len = match usize::try_from(len) {
            Ok(len) if len <= self.max_frame_len => len,
            _ => {
                return Err(DataError::malformed(format!(
                    "frame of {len} bytes exceeds the limit of {}",
                    self.max_frame_len
                )));
            }
        };

        let mut frame = vec![0_u8; len];
        state.input.read_exact(&mut frame).map_err(io_error)?;
        state.consumed += len;
        state.cursor = Some(Cursor::Message(Bytes::from(frame)));
        Ok(())
    }

    /// The byte offset of the current frame's length prefix.
    fn position(&self, state: &ProtoIn<R>) -> Position {
        Position::Offset(state.frame_start)
    }

    fn read_to_value(&self, state: &mut ProtoIn<R>) -> Result<WireValue, DataError> {
        match state.take()? {
            Cursor::Field(value) => Ok(value),
            Cursor::Message(mut body) => {
                let mut last = None;
                while body.has_remaining() {
                    let (tag, value) = next_field(&mut body)?;
                    if tag == ROOT_TAG {
                        last = Some(value);
                    }
                }
                last.ok_or_else(|| DataError::unexpected("message carries no field 1"))
            }
        }
    }

    fn read_to_array(
        &self,
        state: &mut ProtoIn<R>,
        target: &mut dyn ArrayTarget<ProtoIn<R>>,
    ) -> Result<(), DataError> {
        match state.take()? {
            // One occurrence of a repeated field; the decoder appends it.
            Cursor::Field(value) => {
                state.cursor = Some(Cursor::Field(value));
                target.read_item(state)
            }
            Cursor::Message(mut body) => {
                while body.has_remaining() {
                    let (tag, value) = next_field(&mut body)?;
                    if tag == ROOT_TAG {
                        state.cursor = Some(Cursor::Field(value));
                        target.read_item(state)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn read_to_object(
        &self,
        state: &mut ProtoIn<R>,
        target: &mut dyn ObjectTarget<ProtoIn<R>>,
    ) -> Result<(), DataError> {
        let mut body = match state.take()? {
            Cursor::Message(body) | Cursor::Field(WireValue::Bytes(body)) => body,
            Cursor::Field(other) => {
                return Err(DataError::unexpected(format!(
                    "expected a message, found wire type {:?}",
                    other.wire_type()
                )));
            }
        };

        while body.has_remaining() {
            let (tag, value) = next_field(&mut body)?;
            match target.lookup().follow_index(tag).copied() {
                Some(index) => {
                    state.cursor = Some(Cursor::Field(value));
                    target.read_field(index, state)?;
                }
                None => log::trace!("skipping unknown protobuf field {tag}"),
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
