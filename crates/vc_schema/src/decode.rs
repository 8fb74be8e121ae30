//! Running a linked schema against a [`Reader`].

use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;
use core::any::{Any, type_name};
use core::fmt;
use core::marker::PhantomData;

use crate::adapter::{ArrayTarget, ObjectTarget, ReadFormat, Reader};
use crate::define::{Callback, DefinitionId, ErasedItems, FieldInfo, FieldSlot, Linked, Program};
use crate::error::{BuildError, DataError};
use crate::lookup::{FieldLookup, IndexOrNameLookup, Lookup, LookupStrategy};

// -----------------------------------------------------------------------------
// Decoder

/// Decodes entities of type `T` with the reader `R`.
///
/// Creating a decoder compiles one [`FieldLookup`] per object definition,
/// using the reader's [`LookupStrategy`]. After that the decoder is
/// immutable and can be shared.
pub struct Decoder<T, R: ReadFormat> {
    program: Arc<Program<R::Native>>,
    lookups: Box<[Option<FieldLookup<usize>>]>,
    root: DefinitionId,
    reader: R,
    marker: PhantomData<fn() -> T>,
}

impl<T: 'static, R: ReadFormat> Decoder<T, R> {
    pub fn new(linked: &Linked<T, R::Native>, reader: R) -> Result<Self, BuildError> {
        let program = Arc::clone(linked.program());
        let strategy = R::lookup_strategy();

        let lookups = program
            .nodes()
            .iter()
            .map(|node| match &node.callback {
                Callback::Object { fields, .. } => compile_lookup(strategy, fields).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Box<[_]>, _>>()?;

        log::debug!(
            "decoder for `{}` compiled {} lookup tables by {:?}",
            type_name::<T>(),
            lookups.iter().flatten().count(),
            strategy,
        );

        Ok(Self {
            program,
            lookups,
            root: linked.root(),
            reader,
            marker: PhantomData,
        })
    }

    #[inline]
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Starts reading from `stream`.
    pub fn open<S>(&self, stream: S) -> Result<DecoderSession<'_, T, S, R>, DataError>
    where
        R: Reader<S>,
    {
        let state = self.reader.start(stream)?;
        log::trace!("decoder session for `{}` opened", type_name::<T>());
        Ok(DecoderSession {
            decoder: self,
            state: Some(state),
            fused: false,
            marker: PhantomData,
        })
    }
}

impl<T, R: ReadFormat + fmt::Debug> fmt::Debug for Decoder<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("root", &type_name::<T>())
            .field("reader", &self.reader)
            .finish()
    }
}

fn compile_lookup(
    strategy: LookupStrategy,
    fields: &[FieldInfo],
) -> Result<FieldLookup<usize>, BuildError> {
    match strategy {
        LookupStrategy::Name => {
            let mut lookup = Lookup::new();
            for (index, field) in fields.iter().enumerate() {
                lookup.insert(field.name().chars(), index)?;
            }
            Ok(FieldLookup::Name(lookup))
        }
        LookupStrategy::IndexOrName => {
            let mut lookup = IndexOrNameLookup::new();
            for (index, field) in fields.iter().enumerate() {
                lookup.insert_index(field.tag(), index)?;
                lookup.insert_name(field.name(), index)?;
            }
            Ok(FieldLookup::IndexOrName(lookup))
        }
    }
}

// -----------------------------------------------------------------------------
// DecoderSession

/// One open input stream.
///
/// Each [`decode`](Self::decode) call reads the next top-level entity. The
/// session is also an iterator over the remaining entities: it ends at the
/// end of the input and stops after the first error.
///
/// The reader's `stop` runs exactly once: in [`close`](Self::close), or when
/// the session is dropped.
pub struct DecoderSession<'d, T, S, R: Reader<S>> {
    decoder: &'d Decoder<T, R>,
    state: Option<R::State>,
    fused: bool,
    marker: PhantomData<fn(S)>,
}

impl<T: 'static, S, R: Reader<S>> DecoderSession<'_, T, S, R> {
    /// Reads the next entity into `entity`.
    ///
    /// Fields missing from the input keep their current value; arrays are
    /// appended to.
    pub fn decode_into(&mut self, entity: &mut T) -> Result<(), DataError> {
        let decoder = self.decoder;
        let Some(state) = self.state.as_mut() else {
            return Err(DataError::internal("session is closed"));
        };

        let walk = Walk::<S, R> {
            program: &decoder.program,
            lookups: &decoder.lookups,
            reader: &decoder.reader,
            marker: PhantomData,
        };
        let result = decoder
            .reader
            .advance(state)
            .and_then(|()| read_entity(walk, decoder.root, entity, state));
        result.map_err(|err| err.at(decoder.reader.position(state)))
    }

    /// Reads the next entity into a default-constructed `T`.
    pub fn decode(&mut self) -> Result<T, DataError>
    where
        T: Default,
    {
        let mut entity = T::default();
        self.decode_into(&mut entity)?;
        Ok(entity)
    }

    /// Stops the reader and reports its outcome.
    pub fn close(mut self) -> Result<(), DataError> {
        match self.state.take() {
            Some(state) => {
                log::trace!("decoder session for `{}` closed", type_name::<T>());
                self.decoder.reader.stop(state)
            }
            None => Ok(()),
        }
    }
}

impl<T: Default + 'static, S, R: Reader<S>> Iterator for DecoderSession<'_, T, S, R> {
    type Item = Result<T, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.decode() {
            Ok(entity) => Some(Ok(entity)),
            Err(err) => {
                self.fused = true;
                (!err.is_end_of_input()).then_some(Err(err))
            }
        }
    }
}

impl<T, S, R: Reader<S>> Drop for DecoderSession<'_, T, S, R> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take()
            && let Err(err) = self.decoder.reader.stop(state)
        {
            log::warn!("dropped decoder session failed to stop: {err}");
        }
    }
}

// -----------------------------------------------------------------------------
// Walk

struct Walk<'a, S, R: Reader<S>> {
    program: &'a Program<R::Native>,
    lookups: &'a [Option<FieldLookup<usize>>],
    reader: &'a R,
    marker: PhantomData<fn(S)>,
}

impl<S, R: Reader<S>> Clone for Walk<'_, S, R> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, R: Reader<S>> Copy for Walk<'_, S, R> {}

fn read_entity<S, R: Reader<S>>(
    walk: Walk<'_, S, R>,
    id: DefinitionId,
    slot: &mut dyn Any,
    state: &mut R::State,
) -> Result<(), DataError> {
    let node = walk.program.node(id);
    match &node.callback {
        Callback::Pending => Err(DataError::internal(format!(
            "`{}` was used before it was linked",
            node.type_name
        ))),
        Callback::Value(value) => {
            let native = walk.reader.read_to_value(state)?;
            value.from_native(native, slot)
        }
        Callback::Array { element, items } => {
            let mut target = DecodeItems {
                walk,
                element: *element,
                items: &**items,
                slot,
            };
            walk.reader.read_to_array(state, &mut target)
        }
        Callback::Object { fields, slots } => {
            let Some(lookup) = walk.lookups.get(id).and_then(Option::as_ref) else {
                return Err(DataError::internal(format!(
                    "no lookup table for `{}`",
                    node.type_name
                )));
            };
            let mut target = DecodeFields {
                walk,
                fields,
                slots,
                lookup,
                slot,
            };
            walk.reader.read_to_object(state, &mut target)
        }
    }
}

struct DecodeItems<'a, S, R: Reader<S>> {
    walk: Walk<'a, S, R>,
    element: DefinitionId,
    items: &'a dyn ErasedItems,
    slot: &'a mut dyn Any,
}

impl<S, R: Reader<S>> ArrayTarget<R::State> for DecodeItems<'_, S, R> {
    fn read_item(&mut self, state: &mut R::State) -> Result<(), DataError> {
        let (walk, element) = (self.walk, self.element);
        // Repeated-field formats hand over one item per call.
        let index = self.items.len(&*self.slot)?;
        self.items
            .push_with(self.slot, &mut |item| read_entity(walk, element, item, state))
            .map_err(|err| err.at_index(index))
    }
}

struct DecodeFields<'a, S, R: Reader<S>> {
    walk: Walk<'a, S, R>,
    fields: &'a [FieldInfo],
    slots: &'a [FieldSlot],
    lookup: &'a FieldLookup<usize>,
    slot: &'a mut dyn Any,
}

impl<S, R: Reader<S>> ObjectTarget<R::State> for DecodeFields<'_, S, R> {
    #[inline]
    fn lookup(&self) -> &FieldLookup<usize> {
        self.lookup
    }

    #[inline]
    fn fields(&self) -> &[FieldInfo] {
        self.fields
    }

    fn read_field(&mut self, index: usize, state: &mut R::State) -> Result<(), DataError> {
        let (walk, fields, slots) = (self.walk, self.fields, self.slots);
        let (Some(info), Some(field)) = (fields.get(index), slots.get(index)) else {
            return Err(DataError::internal(format!("no field at index {index}")));
        };
        field
            .access
            .get_mut(self.slot)
            .and_then(|value| read_entity(walk, field.target, value, state))
            .map_err(|err| err.in_field(info.name()))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Decoder;
    use crate::define::{Linked, Schema};
    use crate::encode::Encoder;
    use crate::error::{DataErrorKind, Position};
    use crate::testing::{Node, Point, TreeReader, TreeValue, TreeWriter, points};
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;

    fn object(entries: Vec<(&str, TreeValue)>) -> TreeValue {
        TreeValue::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    fn point_schema() -> Linked<Point, TreeValue> {
        Schema::<TreeValue>::of::<Point>().unwrap()
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let decoder = Decoder::new(&point_schema(), TreeReader::<false>).unwrap();
        let input = vec![points(&[("x", 3), ("y", -4), ("z", 9)])];

        let mut session = decoder.open(input).unwrap();
        assert_eq!(session.decode().unwrap(), Point { x: 3, y: -4 });
        assert!(session.decode().unwrap_err().is_end_of_input());
        session.close().unwrap();
    }

    #[test]
    fn missing_fields_keep_their_value() {
        let decoder = Decoder::new(&point_schema(), TreeReader::<false>).unwrap();
        let mut session = decoder.open(vec![points(&[("y", 1)])]).unwrap();

        let mut point = Point { x: 5, y: 6 };
        session.decode_into(&mut point).unwrap();
        assert_eq!(point, Point { x: 5, y: 1 });
    }

    #[test]
    fn round_trip_recursive_tree() {
        let tree = Node {
            value: 1,
            children: vec![
                Node {
                    value: 2,
                    children: vec![Node {
                        value: 3,
                        children: vec![Node::leaf(4)],
                    }],
                },
                Node::leaf(5),
            ],
        };

        let linked = Schema::<TreeValue>::of::<Node>().unwrap();
        let mut wire = Vec::new();
        Encoder::new(&linked, TreeWriter)
            .encode_once(&mut wire, &tree)
            .unwrap();

        let decoder = Decoder::new(&linked, TreeReader::<false>).unwrap();
        let decoded: Vec<Node> = decoder
            .open(wire)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(decoded, [tree]);
    }

    #[test]
    fn round_trip_nested_arrays() {
        let value: Vec<Vec<String>> = vec![
            vec!["a".to_string(), "b".to_string()],
            vec![],
            vec!["c".to_string()],
        ];

        let linked = Schema::<TreeValue>::of::<Vec<Vec<String>>>().unwrap();
        let mut wire = Vec::new();
        Encoder::new(&linked, TreeWriter)
            .encode_once(&mut wire, &value)
            .unwrap();

        let decoder = Decoder::new(&linked, TreeReader::<false>).unwrap();
        let mut session = decoder.open(wire).unwrap();
        assert_eq!(session.decode().unwrap(), value);
    }

    #[test]
    fn data_error_path_and_position() {
        let linked = Schema::<TreeValue>::of::<Node>().unwrap();
        let decoder = Decoder::new(&linked, TreeReader::<false>).unwrap();

        let bad = object(vec![
            ("value", TreeValue::Int(1)),
            (
                "children",
                TreeValue::Array(vec![object(vec![(
                    "value",
                    TreeValue::Text("one".to_string()),
                )])]),
            ),
        ]);
        let good = object(vec![("value", TreeValue::Int(2))]);

        let mut session = decoder.open(vec![bad, good]).unwrap();
        let err = session.decode().unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Unexpected);
        assert_eq!(err.position(), Position::Line(1));
        assert_eq!(err.path().to_string(), "children[0].value");

        // The next call reads the next entity.
        assert_eq!(session.decode().unwrap(), Node::leaf(2));
    }

    #[test]
    fn iteration_stops_after_error() {
        let decoder = Decoder::new(&point_schema(), TreeReader::<false>).unwrap();
        let input = vec![
            points(&[("x", 1)]),
            TreeValue::Array(vec![]),
            points(&[("x", 2)]),
        ];

        let mut session = decoder.open(input).unwrap();
        assert_eq!(session.next().unwrap().unwrap(), Point { x: 1, y: 0 });
        assert_eq!(
            session.next().unwrap().unwrap_err().kind(),
            DataErrorKind::Unexpected
        );
        assert!(session.next().is_none());

        // Explicit calls still work.
        assert_eq!(session.decode().unwrap(), Point { x: 2, y: 0 });
    }

    #[test]
    fn tagged_reader_accepts_tags_and_names() {
        let decoder = Decoder::new(&point_schema(), TreeReader::<true>).unwrap();
        let input = vec![points(&[("1", 3), ("y", -4)]), points(&[("2", 8), ("3", 1)])];

        let decoded: Vec<Point> = decoder
            .open(input)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(decoded, [Point { x: 3, y: -4 }, Point { x: 0, y: 8 }]);
    }

    #[test]
    fn is_sync_send() {
        fn is_send<T: Send>() {}
        fn is_sync<T: Sync>() {}

        is_send::<Decoder<Point, TreeReader>>();
        is_sync::<Decoder<Point, TreeReader>>();
    }
}
