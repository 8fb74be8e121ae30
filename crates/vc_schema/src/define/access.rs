use alloc::collections::{BTreeSet, LinkedList, VecDeque};
use alloc::format;
use alloc::vec::Vec;
use core::any::{Any, type_name};

use crate::error::DataError;

pub(crate) fn mismatch<T>() -> DataError {
    DataError::internal(format!("entity is not a `{}`", type_name::<T>()))
}

// -----------------------------------------------------------------------------
// Field access

/// Projects a parent entity onto one of its fields.
pub(crate) trait ErasedField: Send + Sync {
    fn get<'a>(&self, parent: &'a dyn Any) -> Result<&'a dyn Any, DataError>;

    fn get_mut<'a>(&self, parent: &'a mut dyn Any) -> Result<&'a mut dyn Any, DataError>;
}

pub(crate) struct FieldAccess<T, U> {
    pub get: fn(&T) -> &U,
    pub get_mut: fn(&mut T) -> &mut U,
}

impl<T: 'static, U: 'static> ErasedField for FieldAccess<T, U> {
    fn get<'a>(&self, parent: &'a dyn Any) -> Result<&'a dyn Any, DataError> {
        let parent = parent.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
        Ok((self.get)(parent))
    }

    fn get_mut<'a>(&self, parent: &'a mut dyn Any) -> Result<&'a mut dyn Any, DataError> {
        let parent = parent.downcast_mut::<T>().ok_or_else(mismatch::<T>)?;
        Ok((self.get_mut)(parent))
    }
}

// -----------------------------------------------------------------------------
// Sequence

/// A collection that can be declared as an array.
///
/// Decoding appends items one by one, in input order.
pub trait Sequence: 'static {
    type Item: 'static;

    fn item_count(&self) -> usize;

    fn iter_items(&self) -> impl Iterator<Item = &Self::Item>;

    fn push_item(&mut self, item: Self::Item);
}

impl<T: 'static> Sequence for Vec<T> {
    type Item = T;

    #[inline]
    fn item_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn iter_items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    #[inline]
    fn push_item(&mut self, item: T) {
        self.push(item);
    }
}

impl<T: 'static> Sequence for VecDeque<T> {
    type Item = T;

    #[inline]
    fn item_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn iter_items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    #[inline]
    fn push_item(&mut self, item: T) {
        self.push_back(item);
    }
}

impl<T: 'static> Sequence for LinkedList<T> {
    type Item = T;

    #[inline]
    fn item_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn iter_items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    #[inline]
    fn push_item(&mut self, item: T) {
        self.push_back(item);
    }
}

/// Items are visited in sorted order; duplicates collapse on decode.
impl<T: Ord + 'static> Sequence for BTreeSet<T> {
    type Item = T;

    #[inline]
    fn item_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn iter_items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    #[inline]
    fn push_item(&mut self, item: T) {
        self.insert(item);
    }
}

// -----------------------------------------------------------------------------
// Item access

/// The items of an array-shaped entity.
pub(crate) trait ErasedItems: Send + Sync {
    fn len(&self, entity: &dyn Any) -> Result<usize, DataError>;

    fn for_each(
        &self,
        entity: &dyn Any,
        f: &mut dyn FnMut(usize, &dyn Any) -> Result<(), DataError>,
    ) -> Result<(), DataError>;

    /// Builds a default item, lets `f` fill it, then appends it.
    fn push_with(
        &self,
        entity: &mut dyn Any,
        f: &mut dyn FnMut(&mut dyn Any) -> Result<(), DataError>,
    ) -> Result<(), DataError>;
}

/// Reaches the collection `C` inside entity `T`.
pub(crate) struct SequenceItems<T, C> {
    pub get: fn(&T) -> &C,
    pub get_mut: fn(&mut T) -> &mut C,
}

impl<T, C> ErasedItems for SequenceItems<T, C>
where
    T: 'static,
    C: Sequence,
    C::Item: Default,
{
    fn len(&self, entity: &dyn Any) -> Result<usize, DataError> {
        let entity = entity.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
        Ok((self.get)(entity).item_count())
    }

    fn for_each(
        &self,
        entity: &dyn Any,
        f: &mut dyn FnMut(usize, &dyn Any) -> Result<(), DataError>,
    ) -> Result<(), DataError> {
        let entity = entity.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
        for (index, item) in (self.get)(entity).iter_items().enumerate() {
            f(index, item)?;
        }
        Ok(())
    }

    fn push_with(
        &self,
        entity: &mut dyn Any,
        f: &mut dyn FnMut(&mut dyn Any) -> Result<(), DataError>,
    ) -> Result<(), DataError> {
        let entity = entity.downcast_mut::<T>().ok_or_else(mismatch::<T>)?;
        let mut item = C::Item::default();
        f(&mut item)?;
        (self.get_mut)(entity).push_item(item);
        Ok(())
    }
}

pub(crate) fn itself<C>(value: &C) -> &C {
    value
}

pub(crate) fn itself_mut<C>(value: &mut C) -> &mut C {
    value
}

// -----------------------------------------------------------------------------
// Tests
