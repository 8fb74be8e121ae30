use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;
use std::io::BufRead;

use percent_encoding::percent_decode_str;
use vc_schema::adapter::{ArrayTarget, ObjectTarget, ReadFormat, Reader};
use vc_schema::error::{DataError, Position};

use super::QueryValue;
use crate::stream::io_error;

// -----------------------------------------------------------------------------
// QueryReader

/// Reads one `key=value&...` line per entity.
///
/// An empty line is an object without fields. Pairs without `=` have an
/// empty value.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryReader;

/// Input state of a [`QueryReader`] session.
pub struct QueryIn<R> {
    input: R,
    line_no: usize,
    line: Option<String>,
    value: Option<String>,
    in_array: bool,
}

fn decode_component(raw: &str) -> Result<String, DataError> {
    let spaced = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|err| DataError::malformed(format!("{raw:?} is not percent-encoded UTF-8: {err}")))
}

impl ReadFormat for QueryReader {
    type Native = QueryValue;
}

impl<R: BufRead> Reader<R> for QueryReader {
    type State = QueryIn<R>;

    fn start(&self, stream: R) -> Result<QueryIn<R>, DataError> {
        Ok(QueryIn {
            input: stream,
            line_no: 0,
            line: None,
            value: None,
            in_array: false,
        })
    }

    fn stop(&self, _state: QueryIn<R>) -> Result<(), DataError> {
        Ok(())
    }

    fn advance(&self, state: &mut QueryIn<R>) -> Result<(), DataError> {
        state.value = None;
        state.in_array = false;

        let mut line = state.line.take().unwrap_or_default();
        line.clear();
        if state.input.read_line(&mut line).map_err(io_error)? == 0 {
            return Err(DataError::end_of_input());
        }
        state.line_no += 1;

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        state.line = Some(line);
        Ok(())
    }

    /// The 1-based line of the current entity.
    fn position(&self, state: &QueryIn<R>) -> Position {
        Position::Line(state.line_no)
    }

    fn read_to_value(&self, state: &mut QueryIn<R>) -> Result<QueryValue, DataError> {
        state
            .value
            .take()
            .map(QueryValue)
            .ok_or_else(|| DataError::unsupported("a query string entity must be an object"))
    }

    fn read_to_array(
        &self,
        state: &mut QueryIn<R>,
        target: &mut dyn ArrayTarget<QueryIn<R>>,
    ) -> Result<(), DataError> {
        if state.value.is_none() {
            return Err(DataError::unsupported("a query string entity must be an object"));
        }
        if state.in_array {
            return Err(DataError::unsupported(
                "an array of arrays has no query string encoding",
            ));
        }
        // Each occurrence of a repeated key is one item; the decoder appends it.
        state.in_array = true;
        let result = target.read_item(state);
        state.in_array = false;
        result
    }

    fn read_to_object(
        &self,
        state: &mut QueryIn<R>,
        target: &mut dyn ObjectTarget<QueryIn<R>>,
    ) -> Result<(), DataError> {
        if state.value.is_some() {
            return Err(DataError::unsupported(
                "a query string cannot hold a nested object",
            ));
        }
        let Some(line) = state.line.take() else {
            return Err(DataError::internal("no query string line pending"));
        };

        let result = line
            .split('&')
            .filter(|pair| !pair.is_empty())
            .try_for_each(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = decode_component(key)?;
                match target.lookup().follow_name(&key).copied() {
                    Some(index) => {
                        state.value = Some(decode_component(value)?);
                        target.read_field(index, state)
                    }
                    None => {
                        log::trace!("skipping unknown query key `{key}`");
                        Ok(())
                    }
                }
            });

        // Keep the allocation for the next line.
        state.value = None;
        state.line = Some(line);
        result
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::QueryReader;
    use crate::fixtures::{Inventory, Node, Point};
    use crate::query::{QueryValue, QueryWriter};
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;
    use vc_schema::error::{DataError, DataErrorKind, Position};
    use vc_schema::{Decoder, Encoder, Schema};

    fn decode_points(input: &str) -> Vec<Result<Point, DataError>> {
        let linked = Schema::<QueryValue>::of::<Point>().unwrap();
        let decoder = Decoder::new(&linked, QueryReader).unwrap();
        decoder.open(input.as_bytes()).unwrap().collect()
    }

    #[test]
    fn lines_and_unknown_keys() {
        assert_eq!(
            decode_points("x=3&y=-4&z=9\n\ny=2\r\nflag&x=1"),
            vec![
                Ok(Point { x: 3, y: -4 }),
                Ok(Point::default()),
                Ok(Point { x: 0, y: 2 }),
                Ok(Point { x: 1, y: 0 }),
            ]
        );
    }

    #[test]
    fn conversion_error_has_line_and_field() {
        let decoded = decode_points("x=1\nx=1&y=two\nx=5");
        assert_eq!(decoded.len(), 2);

        let err = decoded[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Conversion);
        assert_eq!(err.position(), Position::Line(2));
        assert_eq!(err.path().to_string(), "y");
    }

    #[test]
    fn invalid_escapes_are_malformed() {
        let decoded = decode_points("x=%FF");
        let err = decoded[0].as_ref().unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Malformed);
    }

    #[test]
    fn plus_is_a_space() {
        let linked = Schema::<QueryValue>::of::<Inventory>().unwrap();
        let decoder = Decoder::new(&linked, QueryReader).unwrap();
        let mut session = decoder
            .open(&b"name=nuts+%26+bolts&tags=a&counts=3&tags=b%2Bc&counts=4"[..])
            .unwrap();

        let inventory = session.decode().unwrap();
        assert_eq!(inventory.name, "nuts & bolts");
        assert_eq!(inventory.tags, vec!["a", "b+c"]);
        assert_eq!(inventory.counts, vec![3, 4]);
    }

    #[test]
    fn nested_objects_are_unsupported() {
        let linked = Schema::<QueryValue>::of::<Node>().unwrap();
        let decoder = Decoder::new(&linked, QueryReader).unwrap();
        let mut session = decoder.open(&b"value=1&children=2\nvalue=3"[..]).unwrap();

        let err = session.decode().unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Unsupported);
        assert_eq!(err.path().to_string(), "children[0]");

        assert_eq!(session.decode().unwrap(), Node::leaf(3));
    }

    #[test]
    fn round_trip() {
        let inventory = Inventory {
            name: String::from("tab\tand = sign"),
            tags: vec![String::from("\u{1F980}"), String::from("a&b")],
            counts: vec![7, 0, 7],
            ratio: -1.25e-3,
            active: true,
        };
        let linked = Schema::<QueryValue>::of::<Inventory>().unwrap();

        let mut out = Vec::new();
        let encoder = Encoder::new(&linked, QueryWriter);
        let mut session = encoder.open(&mut out).unwrap();
        session.encode(&inventory).unwrap();
        session.encode(&Inventory::default()).unwrap();
        session.close().unwrap();

        let decoder = Decoder::new(&linked, QueryReader).unwrap();
        let decoded: Result<Vec<_>, _> = decoder.open(&out[..]).unwrap().collect();
        assert_eq!(decoded.unwrap(), vec![inventory, Inventory::default()]);
    }
}
