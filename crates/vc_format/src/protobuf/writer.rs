use core::mem;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use prost::encoding::{WireType, encode_key, encode_varint};
use vc_schema::adapter::{ArrayItems, ObjectFields, WriteFormat, Writer};
use vc_schema::error::{DataError, Position};

use super::{ROOT_TAG, WireValue};
use crate::stream::{Counted, io_error};

// -----------------------------------------------------------------------------
// ProtobufWriter

/// Writes each entity as one length-prefixed message.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufWriter;

impl ProtobufWriter {
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

/// Output state of a [`ProtobufWriter`] session.
pub struct ProtoOut<W> {
    out: Counted<W>,
    body: BytesMut,
    tag: u32,
    in_array: bool,
    depth: usize,
}

impl<W> ProtoOut<W> {
    fn begin_entity(&mut self) {
        if self.depth == 0 {
            self.body.clear();
            self.tag = ROOT_TAG;
            self.in_array = false;
        }
    }

    fn nested(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), DataError>,
    ) -> Result<(), DataError> {
        self.begin_entity();
        let (tag, in_array) = (self.tag, self.in_array);
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        self.tag = tag;
        self.in_array = in_array;
        result
    }
}

fn put_value(buf: &mut BytesMut, tag: u32, value: WireValue) {
    encode_key(tag, value.wire_type(), buf);
    match value {
        WireValue::Varint(value) => encode_varint(value, buf),
        WireValue::Fixed64(value) => buf.put_u64_le(value),
        WireValue::Fixed32(value) => buf.put_u32_le(value),
        WireValue::Bytes(value) => {
            encode_varint(value.len() as u64, buf);
            buf.put_slice(&value);
        }
    }
}

impl WriteFormat for ProtobufWriter {
    type Native = WireValue;
}

impl<W: Write> Writer<W> for ProtobufWriter {
    type State = ProtoOut<W>;

    fn start(&self, stream: W) -> Result<ProtoOut<W>, DataError> {
        Ok(ProtoOut {
            out: Counted::new(stream),
            body: BytesMut::new(),
            tag: ROOT_TAG,
            in_array: false,
            depth: 0,
        })
    }

    fn stop(&self, mut state: ProtoOut<W>) -> Result<(), DataError> {
        state.out.flush().map_err(io_error)
    }

    fn flush(&self, state: &mut ProtoOut<W>) -> Result<(), DataError> {
        let body = state.body.split();
        let mut frame = BytesMut::with_capacity(body.len() + 10);
        encode_varint(body.len() as u64, &mut frame);
        frame.unsplit(body);
        state
            .out
            .write_all(&frame)
            .and_then(|()| state.out.flush())
            .map_err(io_error)
    }

    fn position(&self, state: &ProtoOut<W>) -> Position {
        Position::Offset(state.out.count())
    }

    fn write_as_value(&self, state: &mut ProtoOut<W>, value: WireValue) -> Result<(), DataError> {
        state.begin_entity();
        put_value(&mut state.body, state.tag, value);
        Ok(())
    }

    fn write_as_array(
        &self,
        state: &mut ProtoOut<W>,
        items: &dyn ArrayItems<ProtoOut<W>>,
    ) -> Result<(), DataError> {
        if state.depth > 0 && state.in_array {
            return Err(DataError::unsupported(
                "an array of arrays has no protobuf encoding",
            ));
        }
        state.nested(|state| {
            let tag = state.tag;
            items.write_each(state, &mut |state, _| {
                state.tag = tag;
                state.in_array = true;
                Ok(())
            })
        })
    }

    fn write_as_object(
        &self,
        state: &mut ProtoOut<W>,
        object: &dyn ObjectFields<ProtoOut<W>>,
    ) -> Result<(), DataError> {
        let root = state.depth == 0;
        state.nested(|state| {
            let tag = state.tag;
            let parent = if root { None } else { Some(mem::take(&mut state.body)) };

            let result = object.fields().iter().enumerate().try_for_each(|(index, field)| {
                state.tag = field.tag();
                state.in_array = false;
                object.write_field(index, state)
            });

            if let Some(parent) = parent {
                let message = mem::replace(&mut state.body, parent);
                if result.is_ok() {
                    encode_key(tag, WireType::LengthDelimited, &mut state.body);
                    encode_varint(message.len() as u64, &mut state.body);
                    state.body.unsplit(message);
                }
            }
            result
        })
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::ProtobufWriter;
    use crate::fixtures::{Node, Point};
    use crate::protobuf::WireValue;
    use alloc::vec;
    use alloc::vec::Vec;
    use vc_schema::error::DataErrorKind;
    use vc_schema::{Encoder, Schema};

    #[test]
    fn object_frame() {
        let linked = Schema::<WireValue>::of::<Point>().unwrap();
        let encoder = Encoder::new(&linked, ProtobufWriter::new());
        let mut out = Vec::new();

        let mut session = encoder.open(&mut out).unwrap();
        session.encode(&Point { x: 3, y: -4 }).unwrap();
        session.encode(&Point::default()).unwrap();
        session.close().unwrap();

        assert_eq!(out, [4, 0x08, 6, 0x10, 7, 4, 0x08, 0, 0x10, 0]);
    }

    #[test]
    fn root_values_and_arrays_use_field_one() {
        let linked = Schema::<WireValue>::of::<u32>().unwrap();
        let mut out = Vec::new();
        Encoder::new(&linked, ProtobufWriter)
            .encode_once(&mut out, &300)
            .unwrap();
        assert_eq!(out, [3, 0x08, 0xac, 0x02]);

        let linked = Schema::<WireValue>::of::<Vec<u32>>().unwrap();
        let mut out = Vec::new();
        let encoder = Encoder::new(&linked, ProtobufWriter);
        let mut session = encoder.open(&mut out).unwrap();
        session.encode(&vec![1, 2]).unwrap();
        session.encode(&vec![]).unwrap();
        session.close().unwrap();
        assert_eq!(out, [4, 0x08, 1, 0x08, 2, 0]);
    }

    #[test]
    fn nested_messages() {
        let linked = Schema::<WireValue>::of::<Node>().unwrap();
        let mut out = Vec::new();
        let tree = Node {
            value: 1,
            children: vec![Node::leaf(-1)],
        };
        Encoder::new(&linked, ProtobufWriter)
            .encode_once(&mut out, &tree)
            .unwrap();

        // value = 1, children = { value = -1 }
        assert_eq!(out, [6, 0x08, 2, 0x12, 2, 0x08, 1]);
    }

    #[test]
    fn arrays_of_arrays_are_unsupported() {
        let linked = Schema::<WireValue>::of::<Vec<Vec<u32>>>().unwrap();
        let encoder = Encoder::new(&linked, ProtobufWriter);
        let mut out = Vec::new();
        let mut session = encoder.open(&mut out).unwrap();

        let err = session.encode(&vec![vec![1]]).unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Unsupported);

        // Nothing of the failed entity reaches the stream.
        session.encode(&vec![]).unwrap();
        session.close().unwrap();
        assert_eq!(out, [0]);
    }
}
