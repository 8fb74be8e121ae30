use alloc::string::String;
use std::io::Write;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use vc_schema::adapter::{ArrayItems, ObjectFields, WriteFormat, Writer};
use vc_schema::error::{DataError, Position};

use super::QueryValue;
use crate::stream::{Counted, io_error};

/// Everything but the unreserved characters of RFC 3986.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// -----------------------------------------------------------------------------
// QueryWriter

/// Writes each entity as one `key=value&...` line.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWriter;

/// Output state of a [`QueryWriter`] session.
pub struct QueryOut<W> {
    out: Counted<W>,
    line: String,
    key: String,
    in_array: bool,
    depth: usize,
}

impl WriteFormat for QueryWriter {
    type Native = QueryValue;
}

impl<W: Write> Writer<W> for QueryWriter {
    type State = QueryOut<W>;

    fn start(&self, stream: W) -> Result<QueryOut<W>, DataError> {
        Ok(QueryOut {
            out: Counted::new(stream),
            line: String::new(),
            key: String::new(),
            in_array: false,
            depth: 0,
        })
    }

    fn stop(&self, mut state: QueryOut<W>) -> Result<(), DataError> {
        state.out.flush().map_err(io_error)
    }

    fn flush(&self, state: &mut QueryOut<W>) -> Result<(), DataError> {
        state.line.push('\n');
        let result = state
            .out
            .write_all(state.line.as_bytes())
            .and_then(|()| state.out.flush());
        state.line.clear();
        result.map_err(io_error)
    }

    fn position(&self, state: &QueryOut<W>) -> Position {
        Position::Offset(state.out.count())
    }

    fn write_as_value(&self, state: &mut QueryOut<W>, value: QueryValue) -> Result<(), DataError> {
        if state.depth == 0 {
            return Err(DataError::unsupported("a query string entity must be an object"));
        }
        if !state.line.is_empty() {
            state.line.push('&');
        }
        state.line.extend(utf8_percent_encode(&state.key, COMPONENT));
        state.line.push('=');
        state.line.extend(utf8_percent_encode(value.as_str(), COMPONENT));
        Ok(())
    }

    fn write_as_array(
        &self,
        state: &mut QueryOut<W>,
        items: &dyn ArrayItems<QueryOut<W>>,
    ) -> Result<(), DataError> {
        if state.depth == 0 {
            return Err(DataError::unsupported("a query string entity must be an object"));
        }
        if state.in_array {
            return Err(DataError::unsupported(
                "an array of arrays has no query string encoding",
            ));
        }
        state.in_array = true;
        let result = items.write_each(state, &mut |_, _| Ok(()));
        state.in_array = false;
        result
    }

    fn write_as_object(
        &self,
        state: &mut QueryOut<W>,
        object: &dyn ObjectFields<QueryOut<W>>,
    ) -> Result<(), DataError> {
        if state.depth > 0 {
            return Err(DataError::unsupported(
                "a query string cannot hold a nested object",
            ));
        }
        state.line.clear();
        state.in_array = false;
        state.depth = 1;
        let result = object.fields().iter().enumerate().try_for_each(|(index, field)| {
            state.key.clear();
            state.key.push_str(field.name());
            object.write_field(index, state)
        });
        state.depth = 0;
        result
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::QueryWriter;
    use crate::fixtures::{Inventory, Node, Point};
    use crate::query::QueryValue;
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;
    use vc_schema::error::DataErrorKind;
    use vc_schema::{Encoder, Schema};

    #[test]
    fn flat_objects() {
        let linked = Schema::<QueryValue>::of::<Point>().unwrap();
        let encoder = Encoder::new(&linked, QueryWriter);
        let mut out = Vec::new();
        let mut session = encoder.open(&mut out).unwrap();
        session.encode(&Point { x: 3, y: -4 }).unwrap();
        session.encode(&Point { x: 0, y: 1 }).unwrap();
        session.close().unwrap();

        assert_eq!(out, b"x=3&y=-4\nx=0&y=1\n");
    }

    #[test]
    fn arrays_repeat_their_key() {
        let linked = Schema::<QueryValue>::of::<Inventory>().unwrap();
        let inventory = Inventory {
            name: String::from("a b&c=d"),
            tags: vec![String::from("x"), String::from("caf\u{e9}")],
            counts: Vec::new(),
            ratio: 0.5,
            active: true,
        };
        let mut out = Vec::new();
        Encoder::new(&linked, QueryWriter)
            .encode_once(&mut out, &inventory)
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name=a%20b%26c%3Dd&tags=x&tags=caf%C3%A9&ratio=0.5&active=true\n"
        );
    }

    #[test]
    fn nesting_is_unsupported() {
        let linked = Schema::<QueryValue>::of::<Node>().unwrap();
        let encoder = Encoder::new(&linked, QueryWriter);
        let mut out = Vec::new();
        let mut session = encoder.open(&mut out).unwrap();

        let err = session
            .encode(&Node {
                value: 1,
                children: vec![Node::leaf(2)],
            })
            .unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Unsupported);
        assert_eq!(err.path().to_string(), "children[0]");

        session.encode(&Node::leaf(5)).unwrap();
        session.close().unwrap();
        assert_eq!(out, b"value=5\n");

        let linked = Schema::<QueryValue>::of::<Vec<u32>>().unwrap();
        let err = Encoder::new(&linked, QueryWriter)
            .encode_once(&mut Vec::<u8>::new(), &vec![1])
            .unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Unsupported);
    }
}
