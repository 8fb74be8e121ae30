use core::fmt::Debug;

use super::{IndexOrNameLookup, Lookup};

// -----------------------------------------------------------------------------
// LookupStrategy

/// How a reader addresses object fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupStrategy {
    /// Fields are addressed by name only.
    #[default]
    Name,
    /// Fields are addressed by numeric tag, or by name as a fallback.
    IndexOrName,
}

// -----------------------------------------------------------------------------
// FieldLookup

/// The field dispatch table of one object definition.
///
/// Which variant a decoder builds is chosen by its reader's
/// [`LookupStrategy`].
#[derive(Debug, Clone)]
pub enum FieldLookup<V> {
    Name(Lookup<char, V>),
    IndexOrName(IndexOrNameLookup<V>),
}

impl<V> FieldLookup<V> {
    /// Resolves a field by its textual key.
    pub fn follow_name(&self, key: &str) -> Option<&V> {
        match self {
            FieldLookup::Name(lookup) => lookup.get(key.chars()),
            FieldLookup::IndexOrName(lookup) => lookup.follow(key),
        }
    }

    /// Resolves a field by its numeric tag.
    ///
    /// A name-only table treats the tag as its decimal spelling.
    pub fn follow_index(&self, index: u32) -> Option<&V> {
        match self {
            FieldLookup::Name(lookup) => lookup.get(decimal(index)),
            FieldLookup::IndexOrName(lookup) => lookup.follow_index(index),
        }
    }
}

fn decimal(mut value: u32) -> impl Iterator<Item = char> {
    let mut digits = [0_u8; 10];
    let mut start = digits.len();
    loop {
        start -= 1;
        digits[start] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    digits.into_iter().skip(start).map(char::from)
}

// -----------------------------------------------------------------------------
// Tests
