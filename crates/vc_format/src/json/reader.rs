use alloc::format;
use std::io::Read;

use serde_json::de::{IoRead, StreamDeserializer};
use serde_json::{Deserializer, Value};
use vc_schema::adapter::{ArrayTarget, ObjectTarget, ReadFormat, Reader};
use vc_schema::error::{DataError, Position};

use super::{JsonScalar, from_json};

// -----------------------------------------------------------------------------
// JsonReader

/// Reads a stream of whitespace separated JSON values, one per entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

/// Input state of a [`JsonReader`] session.
pub struct JsonIn<R: Read> {
    values: StreamDeserializer<'static, IoRead<R>, Value>,
    current: Option<Value>,
    start: usize,
}

impl<R: Read> JsonIn<R> {
    fn take(&mut self) -> Result<Value, DataError> {
        self.current
            .take()
            .ok_or_else(|| DataError::internal("no JSON value pending"))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl ReadFormat for JsonReader {
    type Native = JsonScalar;
}

impl<R: Read> Reader<R> for JsonReader {
    type State = JsonIn<R>;

    fn start(&self, stream: R) -> Result<JsonIn<R>, DataError> {
        Ok(JsonIn {
            values: Deserializer::from_reader(stream).into_iter::<Value>(),
            current: None,
            start: 0,
        })
    }

    fn stop(&self, _state: JsonIn<R>) -> Result<(), DataError> {
        Ok(())
    }

    fn advance(&self, state: &mut JsonIn<R>) -> Result<(), DataError> {
        state.start = state.values.byte_offset();
        match state.values.next() {
            None => Err(DataError::end_of_input()),
            Some(Ok(value)) => {
                state.current = Some(value);
                Ok(())
            }
            Some(Err(err)) => Err(from_json(err)),
        }
    }

    /// The byte offset at which the current entity's text began.
    fn position(&self, state: &JsonIn<R>) -> Position {
        Position::Offset(state.start)
    }

    fn read_to_value(&self, state: &mut JsonIn<R>) -> Result<JsonScalar, DataError> {
        JsonScalar::try_from(state.take()?)
    }

    fn read_to_array(
        &self,
        state: &mut JsonIn<R>,
        target: &mut dyn ArrayTarget<JsonIn<R>>,
    ) -> Result<(), DataError> {
        match state.take()? {
            Value::Array(items) => {
                for item in items {
                    state.current = Some(item);
                    target.read_item(state)?;
                }
                Ok(())
            }
            other => Err(DataError::unexpected(format!(
                "expected an array, found {}",
                kind_of(&other)
            ))),
        }
    }

    fn read_to_object(
        &self,
        state: &mut JsonIn<R>,
        target: &mut dyn ObjectTarget<JsonIn<R>>,
    ) -> Result<(), DataError> {
        match state.take()? {
            Value::Object(entries) => {
                for (key, value) in entries {
                    match target.lookup().follow_name(&key).copied() {
                        Some(index) => {
                            state.current = Some(value);
                            target.read_field(index, state)?;
                        }
                        None => log::trace!("skipping unknown JSON key `{key}`"),
                    }
                }
                Ok(())
            }
            other => Err(DataError::unexpected(format!(
                "expected an object, found {}",
                kind_of(&other)
            ))),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
