//! Declaring how types map onto a format's value model.
//!
//! Every type is described as a value, an array or an object. Declarations
//! go through a [`Descriptor`], either by hand inside [`Schema::build`] or
//! through a type's [`Describe`] implementation with [`Schema::of`]. The
//! result is a [`Linked`] schema, shared by every encoder and decoder made
//! from it.
//!
//! Recursive types are supported: [`Descriptor::describe`] remembers the
//! first definition of each type and links later occurrences back to it.

// -----------------------------------------------------------------------------
// Modules

mod access;
mod convert;
mod descriptor;
mod schema;

// -----------------------------------------------------------------------------
// Exports

pub use access::Sequence;
pub use convert::{Converter, Scalar};
pub use descriptor::{Describe, Descriptor};
pub use schema::{FieldInfo, Linked, MAX_TAG, Schema};

pub(crate) use access::ErasedItems;
pub(crate) use schema::{Callback, DefinitionId, FieldSlot, Program};
