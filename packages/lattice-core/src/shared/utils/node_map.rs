//! Node-keyed associative maps
//!
//! Adjacency records are stored per node in a map from neighbor index to a
//! value. Two interchangeable backends exist:
//! - [`HashedNodeMap`]: ahash-backed, O(1) lookup, unordered iteration
//! - [`SortedNodeMap`]: sorted vector, O(log n) lookup, ascending iteration,
//!   compact for the small fan-outs typical of recognizer lattices
//!
//! [`AdjacencyMap`] selects one of them at runtime from
//! [`AdjacencyBackend`](crate::config::AdjacencyBackend).

use ahash::AHashMap;

use crate::config::AdjacencyBackend;
use crate::shared::models::NodeIndex;

/// Map from node index to `V`, at most one entry per key
pub trait NodeMap<V> {
    fn find(&self, key: NodeIndex) -> Option<&V>;

    fn find_mut(&mut self, key: NodeIndex) -> Option<&mut V>;

    /// Return the entry for `key`, inserting `V::default()` first if absent.
    /// The flag is true when the entry already existed.
    fn insert_or_get(&mut self, key: NodeIndex) -> (&mut V, bool)
    where
        V: Default;

    fn insert(&mut self, key: NodeIndex, value: V) -> Option<V>;

    fn remove(&mut self, key: NodeIndex) -> Option<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: NodeIndex) -> bool {
        self.find(key).is_some()
    }

    /// Keys in iteration order of the backend
    fn keys(&self) -> Vec<NodeIndex>;

    /// Snapshot of all entries, in iteration order of the backend
    fn entries(&self) -> Vec<(NodeIndex, V)>
    where
        V: Clone;

    fn clear(&mut self);
}

/// Hash-table backend
#[derive(Debug, Clone, Default)]
pub struct HashedNodeMap<V> {
    inner: AHashMap<NodeIndex, V>,
}

impl<V> HashedNodeMap<V> {
    pub fn new() -> Self {
        Self {
            inner: AHashMap::new(),
        }
    }
}

impl<V> NodeMap<V> for HashedNodeMap<V> {
    fn find(&self, key: NodeIndex) -> Option<&V> {
        self.inner.get(&key)
    }

    fn find_mut(&mut self, key: NodeIndex) -> Option<&mut V> {
        self.inner.get_mut(&key)
    }

    fn insert_or_get(&mut self, key: NodeIndex) -> (&mut V, bool)
    where
        V: Default,
    {
        let existed = self.inner.contains_key(&key);
        (self.inner.entry(key).or_default(), existed)
    }

    fn insert(&mut self, key: NodeIndex, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    fn remove(&mut self, key: NodeIndex) -> Option<V> {
        self.inner.remove(&key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn keys(&self) -> Vec<NodeIndex> {
        self.inner.keys().copied().collect()
    }

    fn entries(&self) -> Vec<(NodeIndex, V)>
    where
        V: Clone,
    {
        self.inner.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Sorted-array backend
#[derive(Debug, Clone, Default)]
pub struct SortedNodeMap<V> {
    entries: Vec<(NodeIndex, V)>,
}

impl<V> SortedNodeMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, key: NodeIndex) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&key, |(k, _)| *k)
    }
}

impl<V> NodeMap<V> for SortedNodeMap<V> {
    fn find(&self, key: NodeIndex) -> Option<&V> {
        self.position(key).ok().map(|pos| &self.entries[pos].1)
    }

    fn find_mut(&mut self, key: NodeIndex) -> Option<&mut V> {
        match self.position(key) {
            Ok(pos) => Some(&mut self.entries[pos].1),
            Err(_) => None,
        }
    }

    fn insert_or_get(&mut self, key: NodeIndex) -> (&mut V, bool)
    where
        V: Default,
    {
        match self.position(key) {
            Ok(pos) => (&mut self.entries[pos].1, true),
            Err(pos) => {
                self.entries.insert(pos, (key, V::default()));
                (&mut self.entries[pos].1, false)
            }
        }
    }

    fn insert(&mut self, key: NodeIndex, value: V) -> Option<V> {
        match self.position(key) {
            Ok(pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            Err(pos) => {
                self.entries.insert(pos, (key, value));
                None
            }
        }
    }

    fn remove(&mut self, key: NodeIndex) -> Option<V> {
        match self.position(key) {
            Ok(pos) => Some(self.entries.remove(pos).1),
            Err(_) => None,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<NodeIndex> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    fn entries(&self) -> Vec<(NodeIndex, V)>
    where
        V: Clone,
    {
        self.entries.clone()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Runtime-selected adjacency map
#[derive(Debug, Clone)]
pub enum AdjacencyMap<V> {
    Hashed(HashedNodeMap<V>),
    Sorted(SortedNodeMap<V>),
}

impl<V> AdjacencyMap<V> {
    pub fn with_backend(backend: AdjacencyBackend) -> Self {
        match backend {
            AdjacencyBackend::Hashed => AdjacencyMap::Hashed(HashedNodeMap::new()),
            AdjacencyBackend::Sorted => AdjacencyMap::Sorted(SortedNodeMap::new()),
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $map:ident => $body:expr) => {
        match $self {
            AdjacencyMap::Hashed($map) => $body,
            AdjacencyMap::Sorted($map) => $body,
        }
    };
}

impl<V> NodeMap<V> for AdjacencyMap<V> {
    fn find(&self, key: NodeIndex) -> Option<&V> {
        dispatch!(self, m => m.find(key))
    }

    fn find_mut(&mut self, key: NodeIndex) -> Option<&mut V> {
        dispatch!(self, m => m.find_mut(key))
    }

    fn insert_or_get(&mut self, key: NodeIndex) -> (&mut V, bool)
    where
        V: Default,
    {
        dispatch!(self, m => m.insert_or_get(key))
    }

    fn insert(&mut self, key: NodeIndex, value: V) -> Option<V> {
        dispatch!(self, m => m.insert(key, value))
    }

    fn remove(&mut self, key: NodeIndex) -> Option<V> {
        dispatch!(self, m => m.remove(key))
    }

    fn len(&self) -> usize {
        dispatch!(self, m => m.len())
    }

    fn keys(&self) -> Vec<NodeIndex> {
        dispatch!(self, m => m.keys())
    }

    fn entries(&self) -> Vec<(NodeIndex, V)>
    where
        V: Clone,
    {
        dispatch!(self, m => m.entries())
    }

    fn clear(&mut self) {
        dispatch!(self, m => m.clear())
    }
}
