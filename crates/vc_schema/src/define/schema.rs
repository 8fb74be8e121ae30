use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::type_name;
use core::fmt;
use core::marker::PhantomData;

use vc_utils::TypeIdMap;

use super::access::{ErasedField, ErasedItems};
use super::convert::ErasedValue;
use super::{Describe, Descriptor};
use crate::error::{BuildError, ShapeKind};
use crate::lookup::{Lookup, parse_index};

pub(crate) type DefinitionId = usize;

// -----------------------------------------------------------------------------
// FieldInfo

/// Largest field tag a format may put on the wire.
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// The linked description of one object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    name: Box<str>,
    tag: u32,
}

impl FieldInfo {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric identity of the field.
    ///
    /// A field whose name is a decimal number in `1..=MAX_TAG` uses that
    /// number. The other fields take the lowest free tags, in declaration
    /// order.
    #[inline]
    pub fn tag(&self) -> u32 {
        self.tag
    }
}

fn explicit_tag(name: &str) -> Option<u32> {
    parse_index(name).filter(|tag| (1..=MAX_TAG).contains(tag))
}

/// Assigns one distinct tag to every name.
///
/// Names are unique, so explicit tags never collide.
fn assign_tags<'a>(names: impl Iterator<Item = &'a str> + Clone) -> Vec<u32> {
    let mut taken = Lookup::<u32, ()>::new();
    for tag in names.clone().filter_map(explicit_tag) {
        let _ = taken.insert([tag], ());
    }

    let mut next = 1;
    names
        .map(|name| match explicit_tag(name) {
            Some(tag) => tag,
            None => {
                while taken.get([next]).is_some() {
                    next += 1;
                }
                let tag = next;
                next += 1;
                tag
            }
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Definitions

pub(crate) struct FieldDef {
    pub name: String,
    pub target: DefinitionId,
    pub access: Box<dyn ErasedField>,
}

pub(crate) enum Shape<N> {
    Undeclared,
    Value(Box<dyn ErasedValue<N>>),
    Array {
        element: DefinitionId,
        items: Box<dyn ErasedItems>,
    },
    Object {
        fields: Vec<FieldDef>,
        names: Lookup<char, usize>,
    },
    Link(DefinitionId),
}

impl<N> Shape<N> {
    pub fn kind(&self) -> Option<ShapeKind> {
        match self {
            Shape::Undeclared => None,
            Shape::Value(_) => Some(ShapeKind::Value),
            Shape::Array { .. } => Some(ShapeKind::Array),
            Shape::Object { .. } => Some(ShapeKind::Object),
            Shape::Link(_) => Some(ShapeKind::Link),
        }
    }
}

pub(crate) struct Definition<N> {
    pub type_name: &'static str,
    pub shape: Shape<N>,
}

// -----------------------------------------------------------------------------
// Schema

/// The definition tree of one root type, while it is being declared.
///
/// A schema only exists inside [`Schema::build`] or [`Schema::of`]; both
/// link it right away and return the immutable [`Linked`] result.
///
/// `N` is the native value type of the format the schema targets.
pub struct Schema<N> {
    definitions: Vec<Definition<N>>,
    memo: TypeIdMap<DefinitionId>,
}

impl<N: 'static> Schema<N> {
    /// Declares the root type `T` with `declare` and links the result.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_schema::define::{Converter, Schema, Scalar};
    /// use vc_schema::error::DataError;
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
    /// struct Point { x: i32, y: i32 }
    ///
    /// let linked = Schema::<Native>::build::<Point>(|mut point| {
    ///     point.declare_field("x", |p| &p.x, |p| &mut p.x)?.describe()?;
    ///     point.declare_field("y", |p| &p.y, |p| &mut p.y)?.describe()?;
    ///     Ok(())
    /// })
    /// .unwrap();
    ///
    /// let names: Vec<_> = linked.root_fields().unwrap().iter().map(|f| f.name()).collect();
    /// assert_eq!(names, ["x", "y"]);
    /// ```
    pub fn build<T: 'static>(
        declare: impl FnOnce(Descriptor<'_, T, N>) -> Result<(), BuildError>,
    ) -> Result<Linked<T, N>, BuildError> {
        let mut schema = Schema {
            definitions: Vec::new(),
            memo: TypeIdMap::new(),
        };
        let root = schema.allocate::<T>();
        declare(Descriptor::new(&mut schema, root))?;
        schema.link(root)
    }

    /// Builds and links the schema of a type that describes itself.
    #[inline]
    pub fn of<T: Describe<N>>() -> Result<Linked<T, N>, BuildError> {
        Self::build(|descriptor: Descriptor<'_, T, N>| descriptor.describe())
    }

    pub(crate) fn allocate<T>(&mut self) -> DefinitionId {
        let id = self.definitions.len();
        self.definitions.push(Definition {
            type_name: type_name::<T>(),
            shape: Shape::Undeclared,
        });
        id
    }

    #[inline]
    pub(crate) fn next_id(&self) -> DefinitionId {
        self.definitions.len()
    }

    #[inline]
    pub(crate) fn definition(&self, id: DefinitionId) -> &Definition<N> {
        &self.definitions[id]
    }

    #[inline]
    pub(crate) fn definition_mut(&mut self, id: DefinitionId) -> &mut Definition<N> {
        &mut self.definitions[id]
    }

    #[inline]
    pub(crate) fn memo_mut(&mut self) -> &mut TypeIdMap<DefinitionId> {
        &mut self.memo
    }

    /// Follows links from `id` to the definition that carries a shape.
    fn resolve(&self, id: DefinitionId) -> Result<DefinitionId, BuildError> {
        let mut current = id;
        for _ in 0..=self.definitions.len() {
            let definition = &self.definitions[current];
            match definition.shape {
                Shape::Link(next) => current = next,
                Shape::Undeclared => {
                    return Err(BuildError::Undeclared {
                        type_name: definition.type_name,
                    });
                }
                _ => return Ok(current),
            }
        }
        Err(BuildError::UnresolvedLink {
            type_name: self.definitions[id].type_name,
        })
    }

    fn link<T: 'static>(self, root: DefinitionId) -> Result<Linked<T, N>, BuildError> {
        let canonical = (0..self.definitions.len())
            .map(|id| self.resolve(id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut nodes = Vec::with_capacity(self.definitions.len());
        for definition in self.definitions {
            let callback = match definition.shape {
                Shape::Undeclared | Shape::Link(_) => Callback::Pending,
                Shape::Value(value) => Callback::Value(value),
                Shape::Array { element, items } => Callback::Array {
                    element: canonical[element],
                    items,
                },
                Shape::Object { fields, .. } => compile_object(fields, &canonical),
            };
            nodes.push(Compiled {
                type_name: definition.type_name,
                callback,
            });
        }

        log::debug!(
            "linked schema of `{}` with {} definitions",
            type_name::<T>(),
            nodes.len()
        );

        Ok(Linked {
            program: Arc::new(Program {
                nodes: nodes.into_boxed_slice(),
            }),
            root: canonical[root],
            marker: PhantomData,
        })
    }
}

fn compile_object<N>(fields: Vec<FieldDef>, canonical: &[DefinitionId]) -> Callback<N> {
    let tags = assign_tags(fields.iter().map(|field| field.name.as_str()));
    let mut infos = Vec::with_capacity(fields.len());
    let mut slots = Vec::with_capacity(fields.len());

    for (field, tag) in fields.into_iter().zip(tags) {
        infos.push(FieldInfo {
            name: field.name.into_boxed_str(),
            tag,
        });
        slots.push(FieldSlot {
            access: field.access,
            target: canonical[field.target],
        });
    }

    Callback::Object {
        fields: infos.into_boxed_slice(),
        slots: slots.into_boxed_slice(),
    }
}

// -----------------------------------------------------------------------------
// Program

pub(crate) struct FieldSlot {
    pub access: Box<dyn ErasedField>,
    pub target: DefinitionId,
}

/// What the engines do with an entity of one definition.
pub(crate) enum Callback<N> {
    /// Left behind by links; never reachable from a linked root.
    Pending,
    Value(Box<dyn ErasedValue<N>>),
    Array {
        element: DefinitionId,
        items: Box<dyn ErasedItems>,
    },
    Object {
        fields: Box<[FieldInfo]>,
        slots: Box<[FieldSlot]>,
    },
}

pub(crate) struct Compiled<N> {
    pub type_name: &'static str,
    pub callback: Callback<N>,
}

pub(crate) struct Program<N> {
    nodes: Box<[Compiled<N>]>,
}

impl<N> Program<N> {
    #[inline]
    pub fn node(&self, id: DefinitionId) -> &Compiled<N> {
        &self.nodes[id]
    }

    #[inline]
    pub fn nodes(&self) -> &[Compiled<N>] {
        &self.nodes
    }
}

// -----------------------------------------------------------------------------
// Linked

/// An immutable, linked schema for the root type `T`.
///
/// Cheap to clone and safe to share between threads. Encoders and decoders
/// are created from it.
pub struct Linked<T, N> {
    program: Arc<Program<N>>,
    root: DefinitionId,
    marker: PhantomData<fn() -> T>,
}

impl<T, N> Linked<T, N> {
    #[inline]
    pub(crate) fn program(&self) -> &Arc<Program<N>> {
        &self.program
    }

    #[inline]
    pub(crate) fn root(&self) -> DefinitionId {
        self.root
    }

    /// Number of definitions in the linked tree, links included.
    #[inline]
    pub fn definition_count(&self) -> usize {
        self.program.nodes.len()
    }

    /// Fields of the root type, if it is an object.
    pub fn root_fields(&self) -> Option<&[FieldInfo]> {
        match &self.program.node(self.root).callback {
            Callback::Object { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

impl<T, N> Clone for Linked<T, N> {
    fn clone(&self) -> Self {
        Self {
            program: Arc::clone(&self.program),
            root: self.root,
            marker: PhantomData,
        }
    }
}

impl<T, N> fmt::Debug for Linked<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linked")
            .field("root", &type_name::<T>())
            .field("definitions", &self.definition_count())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests
