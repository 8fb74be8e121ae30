use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::{BTreeSet, LinkedList, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;
use core::any::type_name;
use core::marker::PhantomData;

use super::access::{FieldAccess, Sequence, SequenceItems, itself, itself_mut};
use super::convert::{Converter, Scalar, ValueBinding};
use super::schema::{DefinitionId, FieldDef, Schema, Shape};
use crate::error::{BuildError, ShapeKind};
use crate::lookup::Lookup;

// -----------------------------------------------------------------------------
// Descriptor

/// Declares the shape of one definition of type `T`.
///
/// A definition is exactly one of: a value, an array, or an object. The
/// first `declare_*` call fixes the shape; a call that asks for another
/// shape fails with [`BuildError::ShapeConflict`]. Objects may receive any
/// number of [`declare_field`](Self::declare_field) calls.
///
/// Nested descriptors returned by `declare_field` and `declare_items` borrow
/// the schema, so each must be finished before the parent continues.
pub struct Descriptor<'s, T, N> {
    schema: &'s mut Schema<N>,
    id: DefinitionId,
    marker: PhantomData<fn() -> T>,
}

impl<'s, T: 'static, N: 'static> Descriptor<'s, T, N> {
    #[inline]
    pub(crate) fn new(schema: &'s mut Schema<N>, id: DefinitionId) -> Self {
        Self {
            schema,
            id,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn claim(&mut self, requested: ShapeKind, shape: Shape<N>) -> Result<(), BuildError> {
        let definition = self.schema.definition_mut(self.id);
        if let Some(existing) = definition.shape.kind() {
            return Err(BuildError::ShapeConflict {
                type_name: definition.type_name,
                existing,
                requested,
            });
        }
        definition.shape = shape;
        Ok(())
    }

    /// Declares `T` as a scalar, converted with `converter`.
    pub fn declare_value(mut self, converter: Converter<T, N>) -> Result<(), BuildError> {
        self.claim(ShapeKind::Value, Shape::Value(Box::new(ValueBinding(converter))))
    }

    /// Declares `T` as an object. Calling it again is a no-op.
    ///
    /// Only needed for objects without fields; `declare_field` implies it.
    pub fn declare_object(&mut self) -> Result<(), BuildError> {
        if matches!(self.schema.definition(self.id).shape, Shape::Object { .. }) {
            return Ok(());
        }
        self.claim(
            ShapeKind::Object,
            Shape::Object {
                fields: Vec::new(),
                names: Lookup::new(),
            },
        )
    }

    /// Adds field `name` of type `U` to the object `T`.
    ///
    /// Returns the descriptor of the new field definition, which must then
    /// be declared in turn.
    pub fn declare_field<U: 'static>(
        &mut self,
        name: &str,
        get: fn(&T) -> &U,
        get_mut: fn(&mut T) -> &mut U,
    ) -> Result<Descriptor<'_, U, N>, BuildError> {
        self.declare_object()?;
        let target = self.schema.next_id();

        let definition = self.schema.definition_mut(self.id);
        if let Shape::Object { fields, names } = &mut definition.shape {
            names.insert(name.chars(), fields.len()).map_err(|_| {
                BuildError::DuplicateField {
                    type_name: definition.type_name,
                    field: String::from(name),
                }
            })?;
            fields.push(FieldDef {
                name: name.to_owned(),
                target,
                access: Box::new(FieldAccess { get, get_mut }),
            });
        }

        let target = self.schema.allocate::<U>();
        Ok(Descriptor::new(&mut *self.schema, target))
    }

    /// Declares `T` as an array of its own items.
    #[inline]
    pub fn declare_items(self) -> Result<Descriptor<'s, T::Item, N>, BuildError>
    where
        T: Sequence,
        T::Item: Default,
    {
        self.declare_items_with(itself, itself_mut)
    }

    /// Declares `T` as an array of the items of the collection `C` it holds.
    ///
    /// Decoding builds each item with `Default` and fills it in place.
    pub fn declare_items_with<C>(
        mut self,
        get: fn(&T) -> &C,
        get_mut: fn(&mut T) -> &mut C,
    ) -> Result<Descriptor<'s, C::Item, N>, BuildError>
    where
        C: Sequence,
        C::Item: Default,
    {
        let element = self.schema.next_id();
        self.claim(
            ShapeKind::Array,
            Shape::Array {
                element,
                items: Box::new(SequenceItems { get, get_mut }),
            },
        )?;
        let element = self.schema.allocate::<C::Item>();
        Ok(Descriptor::new(self.schema, element))
    }

    /// Lets `T` declare itself through [`Describe`].
    ///
    /// The first definition described for a type is remembered; describing
    /// the same type again, including recursively from inside its own
    /// declaration, links to that definition.
    pub fn describe(mut self) -> Result<(), BuildError>
    where
        T: Describe<N>,
    {
        match self.schema.memo_mut().get_type::<T>().copied() {
            Some(target) => self.claim(ShapeKind::Link, Shape::Link(target)),
            None => {
                self.schema.memo_mut().insert_type::<T>(self.id);
                T::describe(self)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Describe

/// A type that knows how to declare its own shape for format values `N`.
///
/// # Examples
///
/// A recursive type:
///
/// ```
/// use vc_schema::define::{Describe, Descriptor, Schema, Scalar};
/// use vc_schema::error::{BuildError, DataError};
///
/// struct Native(i64);
///
/// impl Scalar<Native> for i32 {
///     fn to_native(&self) -> Native { Native(i64::from(*self)) }
///     fn from_native(native: Native) -> Result<Self, DataError> {
///         i32::try_from(native.0).map_err(|_| DataError::conversion("out of range"))
///     }
/// }
///
/// #[derive(Default)]
/// struct Tree {
///     value: i32,
///     children: Vec<Tree>,
/// }
///
/// impl Describe<Native> for Tree {
///     fn describe(mut tree: Descriptor<'_, Self, Native>) -> Result<(), BuildError> {
///         tree.declare_field("value", |t| &t.value, |t| &mut t.value)?.describe()?;
///         tree.declare_field("children", |t| &t.children, |t| &mut t.children)?.describe()
///     }
/// }
///
/// let linked = Schema::<Native>::of::<Tree>().unwrap();
/// assert_eq!(linked.definition_count(), 4);
/// ```
pub trait Describe<N>: Sized + 'static {
    fn describe(descriptor: Descriptor<'_, Self, N>) -> Result<(), BuildError>;
}

macro_rules! describe_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl<N: 'static> Describe<N> for $ty
        where
            $ty: Scalar<N>,
        {
            #[inline]
            fn describe(descriptor: Descriptor<'_, Self, N>) -> Result<(), BuildError> {
                descriptor.declare_value(Converter::scalar())
            }
        }
    )*};
}

describe_scalar!(
    bool, char, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String,
);

macro_rules! describe_sequence {
    ($($ty:ident <E $(: $bound:path)?>),* $(,)?) => {$(
        impl<N: 'static, E: Describe<N> + Default $(+ $bound)?> Describe<N> for $ty<E> {
            #[inline]
            fn describe(descriptor: Descriptor<'_, Self, N>) -> Result<(), BuildError> {
                descriptor.declare_items()?.describe()
            }
        }
    )*};
}

describe_sequence!(Vec<E>, VecDeque<E>, LinkedList<E>, BTreeSet<E: Ord>);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Describe, Descriptor};
    use crate::define::{Converter, Schema};
    use crate::error::{BuildError, ShapeKind};
    use crate::testing::TreeValue;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;

    #[derive(Default)]
    struct Pair {
        left: i32,
        right: i32,
    }

    #[test]
    fn duplicate_field_name() {
        let err = Schema::<TreeValue>::build::<Pair>(|mut pair| {
            pair.declare_field("left", |p| &p.left, |p| &mut p.left)?.describe()?;
            pair.declare_field("left", |p| &p.right, |p| &mut p.right)?.describe()
        })
        .unwrap_err();

        assert_eq!(
            err,
            BuildError::DuplicateField {
                type_name: core::any::type_name::<Pair>(),
                field: "left".to_string(),
            }
        );
    }

    #[test]
    fn second_shape_conflicts() {
        let err = Schema::<TreeValue>::build::<Pair>(|mut pair| {
            pair.declare_field("left", |p| &p.left, |p| &mut p.left)?.describe()?;
            pair.declare_value(Converter::new(|p: &Pair| TreeValue::Int(p.left.into()), |_| {
                Ok(Pair::default())
            }))
        })
        .unwrap_err();

        assert!(matches!(
            err,
            BuildError::ShapeConflict {
                existing: ShapeKind::Object,
                requested: ShapeKind::Value,
                ..
            }
        ));
    }

    #[test]
    fn items_after_object_conflict() {
        let err = Schema::<TreeValue>::build::<Vec<i32>>(|mut list| {
            list.declare_object()?;
            list.declare_items()?.describe()
        })
        .unwrap_err();

        assert!(matches!(
            err,
            BuildError::ShapeConflict {
                existing: ShapeKind::Object,
                requested: ShapeKind::Array,
                ..
            }
        ));
    }

    #[test]
    fn undeclared_field() {
        let err = Schema::<TreeValue>::build::<Pair>(|mut pair| {
            pair.declare_field("left", |p| &p.left, |p| &mut p.left)?;
            Ok(())
        })
        .unwrap_err();

        assert_eq!(err, BuildError::Undeclared { type_name: "i32" });
    }

    #[test]
    fn numeric_names_keep_their_tags() {
        let tuple = Schema::<TreeValue>::build::<Pair>(|mut pair| {
            pair.declare_field("0", |p| &p.left, |p| &mut p.left)?.describe()?;
            pair.declare_field("1", |p| &p.right, |p| &mut p.right)?.describe()
        })
        .unwrap();
        let tags: Vec<_> = tuple.root_fields().unwrap().iter().map(|f| f.tag()).collect();
        assert_eq!(tags, [2, 1]);

        let mixed = Schema::<TreeValue>::build::<Pair>(|mut pair| {
            pair.declare_field("a", |p| &p.left, |p| &mut p.left)?.describe()?;
            pair.declare_field("1", |p| &p.right, |p| &mut p.right)?.describe()
        })
        .unwrap();
        let tags: Vec<_> = mixed.root_fields().unwrap().iter().map(|f| f.tag()).collect();
        assert_eq!(tags, [2, 1]);
    }

    #[test]
    fn empty_object() {
        struct Unit;

        impl Describe<TreeValue> for Unit {
            fn describe(mut unit: Descriptor<'_, Self, TreeValue>) -> Result<(), BuildError> {
                unit.declare_object()?;
                unit.declare_object()
            }
        }

        let linked = Schema::<TreeValue>::of::<Unit>().unwrap();
        assert_eq!(linked.root_fields(), Some(&[][..]));
    }

    #[test]
    fn repeated_types_share_one_definition() {
        #[derive(Default)]
        struct Names {
            first: Vec<String>,
            second: Vec<String>,
        }

        impl Describe<TreeValue> for Names {
            fn describe(mut names: Descriptor<'_, Self, TreeValue>) -> Result<(), BuildError> {
                names.declare_field("first", |n| &n.first, |n| &mut n.first)?.describe()?;
                names.declare_field("second", |n| &n.second, |n| &mut n.second)?.describe()
            }
        }

        let linked = Schema::<TreeValue>::of::<Names>().unwrap();
        // root, first, first's items, second (a link to first)
        assert_eq!(linked.definition_count(), 4);

        let fields = linked.root_fields().unwrap();
        assert_eq!(fields[0].tag(), 1);
        assert_eq!(fields[1].tag(), 2);
    }
}
