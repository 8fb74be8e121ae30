use core::fmt::{self, Debug};

use super::Lookup;
use crate::error::BuildError;

// -----------------------------------------------------------------------------
// IndexOrNameLookup

/// Dispatches a key either by integer index or by name.
///
/// The index trie is consulted first: a key spelled as a canonical decimal
/// integer with an index registration resolves there, even if some name
/// path also matches. Anything else, `"01"` and `"+1"` included, falls
/// through to the name trie.
///
/// # Examples
///
/// ```
/// use vc_schema::lookup::IndexOrNameLookup;
///
/// let mut lookup = IndexOrNameLookup::new();
/// lookup.insert_index(1, "by index").unwrap();
/// lookup.insert_name("1", "by name").unwrap();
/// lookup.insert_name("id", "id field").unwrap();
///
/// assert_eq!(lookup.follow("1"), Some(&"by index"));
/// assert_eq!(lookup.follow("id"), Some(&"id field"));
/// assert_eq!(lookup.follow_index(1), Some(&"by index"));
/// assert_eq!(lookup.follow("2"), None);
/// ```
#[derive(Clone)]
pub struct IndexOrNameLookup<V> {
    index: Lookup<u32, V>,
    name: Lookup<char, V>,
}

impl<V> IndexOrNameLookup<V> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            index: Lookup::new(),
            name: Lookup::new(),
        }
    }

    /// Registers `value` under the integer `index`.
    #[inline]
    pub fn insert_index(&mut self, index: u32, value: V) -> Result<(), BuildError> {
        self.index.insert([index], value)
    }

    /// Registers `value` under `name`.
    #[inline]
    pub fn insert_name(&mut self, name: &str, value: V) -> Result<(), BuildError> {
        self.name.insert(name.chars(), value)
    }

    /// Resolves an integer key against the index trie only.
    #[inline]
    pub fn follow_index(&self, index: u32) -> Option<&V> {
        self.index.get([index])
    }

    /// Resolves a textual key, preferring the index trie.
    pub fn follow(&self, key: &str) -> Option<&V> {
        if let Some(index) = parse_index(key)
            && let Some(value) = self.follow_index(index)
        {
            return Some(value);
        }
        self.name.get(key.chars())
    }

    /// The underlying name trie.
    #[inline]
    pub fn names(&self) -> &Lookup<char, V> {
        &self.name
    }
}

impl<V> Default for IndexOrNameLookup<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for IndexOrNameLookup<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexOrNameLookup")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish()
    }
}

/// Parses `key` as a decimal integer without sign or leading zeros.
pub(crate) fn parse_index(key: &str) -> Option<u32> {
    let canonical = match key.as_bytes() {
        [b'0'] => true,
        [b'1'..=b'9', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
        _ => false,
    };
    if canonical { key.parse().ok() } else { None }
}

// -----------------------------------------------------------------------------
// Tests
