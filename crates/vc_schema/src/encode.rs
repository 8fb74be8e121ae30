//! Running a linked schema against a [`Writer`].

use alloc::format;
use alloc::sync::Arc;
use core::any::{Any, type_name};
use core::fmt;
use core::marker::PhantomData;

use crate::adapter::{ArrayItems, ObjectFields, WriteFormat, Writer};
use crate::define::{Callback, DefinitionId, ErasedItems, FieldInfo, FieldSlot, Linked, Program};
use crate::error::DataError;

// -----------------------------------------------------------------------------
// Encoder

/// Encodes entities of type `T` with the writer `W`.
///
/// An encoder is immutable; every stream it writes to is driven by its own
/// [`EncoderSession`].
pub struct Encoder<T, W: WriteFormat> {
    program: Arc<Program<W::Native>>,
    root: DefinitionId,
    writer: W,
    marker: PhantomData<fn(&T)>,
}

impl<T: 'static, W: WriteFormat> Encoder<T, W> {
    pub fn new(linked: &Linked<T, W::Native>, writer: W) -> Self {
        Self {
            program: Arc::clone(linked.program()),
            root: linked.root(),
            writer,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Starts writing to `stream`.
    pub fn open<S>(&self, stream: S) -> Result<EncoderSession<'_, T, S, W>, DataError>
    where
        W: Writer<S>,
    {
        let state = self.writer.start(stream)?;
        log::trace!("encoder session for `{}` opened", type_name::<T>());
        Ok(EncoderSession {
            encoder: self,
            state: Some(state),
            marker: PhantomData,
        })
    }

    /// Opens a session on `stream`, encodes `entity` and closes it again.
    pub fn encode_once<S>(&self, stream: S, entity: &T) -> Result<(), DataError>
    where
        W: Writer<S>,
    {
        let mut session = self.open(stream)?;
        session.encode(entity)?;
        session.close()
    }
}

impl<T, W: WriteFormat + fmt::Debug> fmt::Debug for Encoder<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("root", &type_name::<T>())
            .field("writer", &self.writer)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// EncoderSession

/// One open output stream.
///
/// The writer's `stop` runs exactly once: in [`close`](Self::close), or when
/// the session is dropped.
pub struct EncoderSession<'e, T, S, W: Writer<S>> {
    encoder: &'e Encoder<T, W>,
    state: Option<W::State>,
    marker: PhantomData<fn(S)>,
}

impl<T: 'static, S, W: Writer<S>> EncoderSession<'_, T, S, W> {
    /// Writes one top-level entity and flushes it.
    ///
    /// A failure aborts this entity only; the session stays usable.
    pub fn encode(&mut self, entity: &T) -> Result<(), DataError> {
        let encoder = self.encoder;
        let Some(state) = self.state.as_mut() else {
            return Err(DataError::internal("session is closed"));
        };

        let result =
            write_entity::<S, W>(&encoder.program, &encoder.writer, encoder.root, entity, state)
                .and_then(|()| encoder.writer.flush(state));
        result.map_err(|err| err.at(encoder.writer.position(state)))
    }

    /// Stops the writer and reports its outcome.
    pub fn close(mut self) -> Result<(), DataError> {
        match self.state.take() {
            Some(state) => {
                log::trace!("encoder session for `{}` closed", type_name::<T>());
                self.encoder.writer.stop(state)
            }
            None => Ok(()),
        }
    }
}

impl<T, S, W: Writer<S>> Drop for EncoderSession<'_, T, S, W> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take()
            && let Err(err) = self.encoder.writer.stop(state)
        {
            log::warn!("dropped encoder session failed to stop: {err}");
        }
    }
}

// -----------------------------------------------------------------------------
// Walk

fn write_entity<S, W: Writer<S>>(
    program: &Program<W::Native>,
    writer: &W,
    id: DefinitionId,
    entity: &dyn Any,
    state: &mut W::State,
) -> Result<(), DataError> {
    let node = program.node(id);
    match &node.callback {
        Callback::Pending => Err(DataError::internal(format!(
            "`{}` was used before it was linked",
            node.type_name
        ))),
        Callback::Value(value) => {
            let native = value.to_native(entity)?;
            writer.write_as_value(state, native)
        }
        Callback::Array { element, items } => {
            let items = EncodeItems::<S, W> {
                program,
                writer,
                element: *element,
                len: items.len(entity)?,
                items: &**items,
                entity,
                marker: PhantomData,
            };
            writer.write_as_array(state, &items)
        }
        Callback::Object { fields, slots } => {
            let object = EncodeFields::<S, W> {
                program,
                writer,
                fields,
                slots,
                entity,
                marker: PhantomData,
            };
            writer.write_as_object(state, &object)
        }
    }
}

struct EncodeItems<'a, S, W: Writer<S>> {
    program: &'a Program<W::Native>,
    writer: &'a W,
    element: DefinitionId,
    len: usize,
    items: &'a dyn ErasedItems,
    entity: &'a dyn Any,
    marker: PhantomData<fn(S)>,
}

impl<S, W: Writer<S>> ArrayItems<W::State> for EncodeItems<'_, S, W> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn write_each(
        &self,
        state: &mut W::State,
        before_item: &mut dyn FnMut(&mut W::State, usize) -> Result<(), DataError>,
    ) -> Result<(), DataError> {
        self.items.for_each(self.entity, &mut |index, item| {
            before_item(state, index)?;
            write_entity::<S, W>(self.program, self.writer, self.element, item, state)
                .map_err(|err| err.at_index(index))
        })
    }
}

struct EncodeFields<'a, S, W: Writer<S>> {
    program: &'a Program<W::Native>,
    writer: &'a W,
    fields: &'a [FieldInfo],
    slots: &'a [FieldSlot],
    entity: &'a dyn Any,
    marker: PhantomData<fn(S)>,
}

impl<S, W: Writer<S>> ObjectFields<W::State> for EncodeFields<'_, S, W> {
    #[inline]
    fn fields(&self) -> &[FieldInfo] {
        self.fields
    }

    fn write_field(&self, index: usize, state: &mut W::State) -> Result<(), DataError> {
        let (Some(info), Some(slot)) = (self.fields.get(index), self.slots.get(index)) else {
            return Err(DataError::internal(format!("no field at index {index}")));
        };
        slot.access
            .get(self.entity)
            .and_then(|value| {
                write_entity::<S, W>(self.program, self.writer, slot.target, value, state)
            })
            .map_err(|err| err.in_field(info.name()))
    }
}

// -----------------------------------------------------------------------------
// Tests
