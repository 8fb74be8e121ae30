//! Trie-based dispatch from field names or tags to registered values.
//!
//! A decoder resolves every incoming field key by walking a [`Lookup`] one
//! key at a time. Keys below [`DENSE_SLOTS`] (ASCII characters, small tags)
//! index directly into a per-node array; other keys fall back to a hash map
//! on that node. Walking never fails: a missing edge yields the lookup's
//! empty sentinel node, and every edge out of the sentinel leads back to it.

// -----------------------------------------------------------------------------
// Modules

mod composite;
mod strategy;

// -----------------------------------------------------------------------------
// Exports

pub use composite::IndexOrNameLookup;
pub(crate) use composite::parse_index;
pub use strategy::{FieldLookup, LookupStrategy};

// -----------------------------------------------------------------------------
// Imports

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt::{self, Debug, Write};
use core::hash::Hash;

use vc_utils::hash::HashMap;

use crate::error::BuildError;

// -----------------------------------------------------------------------------
// LookupKey

/// Number of child slots stored inline in every branching node.
pub const DENSE_SLOTS: usize = 128;

/// The alphabet of a [`Lookup`].
pub trait LookupKey: Copy + Eq + Hash + 'static {
    /// Returns the dense slot of this key, or `None` if it belongs to the
    /// overflow map.
    fn slot(self) -> Option<usize>;

    /// Appends a readable form of this key to `out`, for error messages.
    fn render(self, out: &mut String);
}

impl LookupKey for char {
    #[inline]
    fn slot(self) -> Option<usize> {
        let code = self as usize;
        (code < DENSE_SLOTS).then_some(code)
    }

    #[inline]
    fn render(self, out: &mut String) {
        out.push(self);
    }
}

impl LookupKey for u32 {
    #[inline]
    fn slot(self) -> Option<usize> {
        let code = self as usize;
        (code < DENSE_SLOTS).then_some(code)
    }

    fn render(self, out: &mut String) {
        if !out.is_empty() {
            out.push('.');
        }
        let _ = write!(out, "{self}");
    }
}

// -----------------------------------------------------------------------------
// Node

type Dense<K, V> = Box<[Option<Box<Node<K, V>>>; DENSE_SLOTS]>;

/// One node of a [`Lookup`].
///
/// Holds an optional value and the edges to its children. The value can be
/// set at most once.
#[derive(Clone)]
pub struct Node<K, V> {
    value: Option<V>,
    dense: Option<Dense<K, V>>,
    sparse: Option<Box<HashMap<K, Node<K, V>>>>,
}

impl<K: LookupKey, V> Node<K, V> {
    #[inline]
    const fn new() -> Self {
        Self {
            value: None,
            dense: None,
            sparse: None,
        }
    }

    /// Returns the value registered at this node.
    #[inline]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Returns `true` if a value was registered at this node.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Registers `value` at this node.
    ///
    /// Hands the value back if the node already holds one.
    pub fn set(&mut self, value: V) -> Result<(), V> {
        if self.value.is_some() {
            return Err(value);
        }
        self.value = Some(value);
        Ok(())
    }

    /// Returns the child reached through `key`, creating it if needed.
    ///
    /// Following the same key from the same node always yields the same child.
    pub fn connect(&mut self, key: K) -> &mut Node<K, V> {
        match key.slot() {
            Some(slot) => {
                let dense = self
                    .dense
                    .get_or_insert_with(|| Box::new(core::array::from_fn(|_| None)));
                dense[slot]
                    .get_or_insert_with(|| Box::new(Node::new()))
                    .as_mut()
            }
            None => self
                .sparse
                .get_or_insert_with(|| Box::new(HashMap::default()))
                .entry(key)
                .or_insert_with(Node::new),
        }
    }

    #[inline]
    fn child(&self, key: K) -> Option<&Node<K, V>> {
        match key.slot() {
            Some(slot) => self.dense.as_ref()?[slot].as_deref(),
            None => self.sparse.as_ref()?.get(&key),
        }
    }
}

impl<K, V: Debug> Debug for Node<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value)
            .field("dense", &self.dense.is_some())
            .field("sparse", &self.sparse.as_ref().map(|map| map.len()))
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Lookup

/// A trie from key sequences to values.
///
/// # Examples
///
/// ```
/// use vc_schema::lookup::Lookup;
///
/// let mut lookup = Lookup::<char, usize>::new();
/// lookup.insert("x".chars(), 0).unwrap();
/// lookup.insert("xy".chars(), 1).unwrap();
///
/// assert_eq!(lookup.get("x".chars()), Some(&0));
/// assert_eq!(lookup.get("xy".chars()), Some(&1));
/// assert_eq!(lookup.get("z".chars()), None);
///
/// // Following a missing edge lands on the sentinel, which absorbs every key.
/// let missing = lookup.find("zz".chars());
/// assert!(core::ptr::eq(missing, lookup.empty()));
/// assert!(core::ptr::eq(lookup.follow(missing, 'x'), lookup.empty()));
/// ```
#[derive(Clone)]
pub struct Lookup<K, V> {
    root: Node<K, V>,
    empty: Node<K, V>,
}

impl<K: LookupKey, V> Lookup<K, V> {
    /// Creates an empty lookup.
    #[inline]
    pub const fn new() -> Self {
        Self {
            root: Node::new(),
            empty: Node::new(),
        }
    }

    /// The root node, reached by the empty key sequence.
    #[inline]
    pub fn root(&self) -> &Node<K, V> {
        &self.root
    }

    /// The sentinel returned for every missing edge.
    #[inline]
    pub fn empty(&self) -> &Node<K, V> {
        &self.empty
    }

    /// Returns the node at the end of `path`, creating missing nodes.
    pub fn connect(&mut self, path: impl IntoIterator<Item = K>) -> &mut Node<K, V> {
        path.into_iter()
            .fold(&mut self.root, |node, key| node.connect(key))
    }

    /// Registers `value` at the end of `path`.
    ///
    /// Fails with [`BuildError::DuplicateKey`] if the path already holds a value.
    pub fn insert(&mut self, path: impl IntoIterator<Item = K>, value: V) -> Result<(), BuildError> {
        let mut rendered = String::new();
        let mut node = &mut self.root;
        for key in path {
            key.render(&mut rendered);
            node = node.connect(key);
        }
        node.set(value)
            .map_err(|_| BuildError::DuplicateKey { key: rendered })
    }

    /// Follows one edge out of `node`.
    ///
    /// Returns the sentinel if there is no such edge.
    #[inline]
    pub fn follow<'a>(&'a self, node: &'a Node<K, V>, key: K) -> &'a Node<K, V> {
        node.child(key).unwrap_or(&self.empty)
    }

    /// Follows `path` from the root.
    pub fn find(&self, path: impl IntoIterator<Item = K>) -> &Node<K, V> {
        path.into_iter()
            .fold(&self.root, |node, key| self.follow(node, key))
    }

    /// Returns the value registered at `path`.
    #[inline]
    pub fn get(&self, path: impl IntoIterator<Item = K>) -> Option<&V> {
        self.find(path).value()
    }
}

impl<K: LookupKey, V> Default for Lookup<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: Debug> Debug for Lookup<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup").field("root", &self.root).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests
