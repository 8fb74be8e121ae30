//! An in-memory format for exercising the engines without a byte syntax.
//!
//! Entities are written to and read from a `Vec<TreeValue>`, one tree per
//! top-level entity.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::{self, Vec};

use crate::adapter::{
    ArrayItems, ArrayTarget, ObjectFields, ObjectTarget, ReadFormat, Reader, WriteFormat, Writer,
};
use crate::define::{Describe, Descriptor, Scalar};
use crate::error::{BuildError, DataError, Position};
use crate::lookup::LookupStrategy;

// -----------------------------------------------------------------------------
// Values

#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    Int(i64),
    Text(String),
    Array(Vec<TreeValue>),
    Object(Vec<(String, TreeValue)>),
}

pub fn points(entries: &[(&str, i64)]) -> TreeValue {
    TreeValue::Object(
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), TreeValue::Int(*value)))
            .collect(),
    )
}

impl Scalar<TreeValue> for i32 {
    fn to_native(&self) -> TreeValue {
        TreeValue::Int(i64::from(*self))
    }

    fn from_native(native: TreeValue) -> Result<Self, DataError> {
        match native {
            TreeValue::Int(value) => i32::try_from(value)
                .map_err(|_| DataError::conversion(format!("{value} does not fit in an i32"))),
            other => Err(DataError::unexpected(format!("expected an integer, found {other:?}"))),
        }
    }
}

impl Scalar<TreeValue> for String {
    fn to_native(&self) -> TreeValue {
        TreeValue::Text(self.clone())
    }

    fn from_native(native: TreeValue) -> Result<Self, DataError> {
        match native {
            TreeValue::Text(text) => Ok(text),
            other => Err(DataError::unexpected(format!("expected a text, found {other:?}"))),
        }
    }
}

// -----------------------------------------------------------------------------
// Entities

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Describe<TreeValue> for Point {
    fn describe(mut point: Descriptor<'_, Self, TreeValue>) -> Result<(), BuildError> {
        point.declare_field("x", |p| &p.x, |p| &mut p.x)?.describe()?;
        point.declare_field("y", |p| &p.y, |p| &mut p.y)?.describe()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    pub value: i32,
    pub children: Vec<Node>,
}

impl Node {
    pub fn leaf(value: i32) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }
}

impl Describe<TreeValue> for Node {
    fn describe(mut node: Descriptor<'_, Self, TreeValue>) -> Result<(), BuildError> {
        node.declare_field("value", |n| &n.value, |n| &mut n.value)?
            .describe()?;
        node.declare_field("children", |n| &n.children, |n| &mut n.children)?
            .describe()
    }
}

// -----------------------------------------------------------------------------
// TreeWriter

pub struct TreeWriter;

impl TreeWriter {
    /// Rejected by `write_as_value`, to provoke write failures.
    pub const POISON: i32 = i32::MIN;
}

pub struct TreeOut<'o> {
    out: &'o mut Vec<TreeValue>,
    done: Option<TreeValue>,
}

impl WriteFormat for TreeWriter {
    type Native = TreeValue;
}

impl<'o> Writer<&'o mut Vec<TreeValue>> for TreeWriter {
    type State = TreeOut<'o>;

    fn start(&self, out: &'o mut Vec<TreeValue>) -> Result<TreeOut<'o>, DataError> {
        Ok(TreeOut { out, done: None })
    }

    fn stop(&self, _state: TreeOut<'o>) -> Result<(), DataError> {
        Ok(())
    }

    fn flush(&self, state: &mut TreeOut<'o>) -> Result<(), DataError> {
        state.out.extend(state.done.take());
        Ok(())
    }

    fn position(&self, state: &TreeOut<'o>) -> Position {
        Position::Line(state.out.len() + 1)
    }

    fn write_as_value(&self, state: &mut TreeOut<'o>, value: TreeValue) -> Result<(), DataError> {
        if value == TreeValue::Int(i64::from(Self::POISON)) {
            return Err(DataError::unsupported("poisoned value"));
        }
        state.done = Some(value);
        Ok(())
    }

    fn write_as_array(
        &self,
        state: &mut TreeOut<'o>,
        items: &dyn ArrayItems<TreeOut<'o>>,
    ) -> Result<(), DataError> {
        let mut values = Vec::with_capacity(items.len());
        state.done = None;
        items.write_each(state, &mut |state, _| {
            values.extend(state.done.take());
            Ok(())
        })?;
        values.extend(state.done.take());
        state.done = Some(TreeValue::Array(values));
        Ok(())
    }

    fn write_as_object(
        &self,
        state: &mut TreeOut<'o>,
        object: &dyn ObjectFields<TreeOut<'o>>,
    ) -> Result<(), DataError> {
        let mut entries = Vec::with_capacity(object.fields().len());
        for (index, field) in object.fields().iter().enumerate() {
            object.write_field(index, state)?;
            if let Some(value) = state.done.take() {
                entries.push((field.name().to_string(), value));
            }
        }
        state.done = Some(TreeValue::Object(entries));
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// TreeReader

/// Reads trees; with `TAGGED` set, object keys may also be field tags.
pub struct TreeReader<const TAGGED: bool = false>;

pub struct TreeIn {
    input: vec::IntoIter<TreeValue>,
    current: Option<TreeValue>,
    entity: usize,
}

fn take(state: &mut TreeIn) -> Result<TreeValue, DataError> {
    state
        .current
        .take()
        .ok_or_else(|| DataError::truncated("no value left in this entity"))
}

impl<const TAGGED: bool> ReadFormat for TreeReader<TAGGED> {
    type Native = TreeValue;

    fn lookup_strategy() -> LookupStrategy {
        if TAGGED {
            LookupStrategy::IndexOrName
        } else {
            LookupStrategy::Name
        }
    }
}

impl<const TAGGED: bool> Reader<Vec<TreeValue>> for TreeReader<TAGGED> {
    type State = TreeIn;

    fn start(&self, input: Vec<TreeValue>) -> Result<TreeIn, DataError> {
        Ok(TreeIn {
            input: input.into_iter(),
            current: None,
            entity: 0,
        })
    }

    fn stop(&self, _state: TreeIn) -> Result<(), DataError> {
        Ok(())
    }

    fn advance(&self, state: &mut TreeIn) -> Result<(), DataError> {
        let next = state.input.next().ok_or_else(DataError::end_of_input)?;
        state.current = Some(next);
        state.entity += 1;
        Ok(())
    }

    fn position(&self, state: &TreeIn) -> Position {
        Position::Line(state.entity)
    }

    fn read_to_value(&self, state: &mut TreeIn) -> Result<TreeValue, DataError> {
        match take(state)? {
            value @ (TreeValue::Int(_) | TreeValue::Text(_)) => Ok(value),
            other => Err(DataError::unexpected(format!("expected a value, found {other:?}"))),
        }
    }

    fn read_to_array(
        &self,
        state: &mut TreeIn,
        target: &mut dyn ArrayTarget<TreeIn>,
    ) -> Result<(), DataError> {
        match take(state)? {
            TreeValue::Array(items) => {
                for item in items {
                    state.current = Some(item);
                    target.read_item(state)?;
                }
                Ok(())
            }
            other => Err(DataError::unexpected(format!("expected an array, found {other:?}"))),
        }
    }

    fn read_to_object(
        &self,
        state: &mut TreeIn,
        target: &mut dyn ObjectTarget<TreeIn>,
    ) -> Result<(), DataError> {
        match take(state)? {
            TreeValue::Object(entries) => {
                for (key, value) in entries {
                    match target.lookup().follow_name(&key).copied() {
                        Some(index) => {
                            state.current = Some(value);
                            target.read_field(index, state)?;
                        }
                        None => log::trace!("skipping unknown field `{key}`"),
                    }
                }
                Ok(())
            }
            other => Err(DataError::unexpected(format!("expected an object, found {other:?}"))),
        }
    }
}
