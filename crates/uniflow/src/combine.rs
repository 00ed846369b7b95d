//! Keyed reducer composition.
//!
//! [`combine_reducers`] turns a mapping of named slice reducers into one
//! root reducer over a [`SliceMap`] aggregate. Each slice lives behind its
//! own `Arc`; a slice reducer that has nothing to do returns the input `Arc`
//! unchanged, and when no slice changed the previous aggregate itself is
//! returned. Subscribers can therefore decide "did anything I care about
//! move?" with a pointer comparison instead of a deep diff.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Result, StoreError};
use crate::reducer::Reducer;

/// Key naming one slice of a [`SliceMap`]. Keys are defined in code, next to
/// the reducers they name.
pub type SliceKey = &'static str;

/// Keyed aggregate state produced by [`combine_reducers`].
///
/// Cloning is cheap (one `Arc` bump); [`SliceMap::ptr_eq`] compares two
/// aggregates by identity, which is exact because every transition that
/// changes any slice allocates a fresh inner map.
pub struct SliceMap<V> {
    slices: Arc<BTreeMap<SliceKey, Arc<V>>>,
}

impl<V> SliceMap<V> {
    pub fn new() -> Self {
        Self {
            slices: Arc::new(BTreeMap::new()),
        }
    }

    /// Build a preloaded aggregate, e.g. from a persisted snapshot.
    pub fn from_slices(entries: impl IntoIterator<Item = (SliceKey, V)>) -> Self {
        Self {
            slices: Arc::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Arc::new(value)))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, key: SliceKey) -> Option<&V> {
        self.slices.get(key).map(Arc::as_ref)
    }

    /// The slice behind its `Arc`, for identity comparisons against an
    /// earlier snapshot.
    pub fn arc(&self, key: SliceKey) -> Option<&Arc<V>> {
        self.slices.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = SliceKey> + '_ {
        self.slices.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Identity comparison: `true` iff both aggregates share the same inner
    /// map allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slices, &other.slices)
    }
}

impl<V> Clone for SliceMap<V> {
    fn clone(&self) -> Self {
        Self {
            slices: Arc::clone(&self.slices),
        }
    }
}

impl<V> Default for SliceMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for SliceMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.slices.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for SliceMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.slices == other.slices
    }
}

impl<V: Serialize> Serialize for SliceMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slices.len()))?;
        for (key, value) in self.slices.iter() {
            map.serialize_entry(key, value.as_ref())?;
        }
        map.end()
    }
}

/// Reducer over one slice of a [`SliceMap`].
///
/// `slice` is `None` when the key has not been materialized yet (first
/// dispatch, or a key added by [`replace_reducer`](crate::Store::replace_reducer));
/// the reducer must answer with its default in that case. For an action it
/// does not recognize it returns the input `Arc` unchanged. `Ok(None)` means
/// the reducer produced no value at all, which the composer reports as
/// [`StoreError::InvalidReducerOutput`].
pub trait SliceReducer<V, A>: Send + Sync {
    fn reduce_slice(&self, slice: Option<&Arc<V>>, action: &A) -> Result<Option<Arc<V>>>;
}

impl<V, A, F> SliceReducer<V, A> for F
where
    F: Fn(Option<&Arc<V>>, &A) -> Result<Option<Arc<V>>> + Send + Sync,
{
    fn reduce_slice(&self, slice: Option<&Arc<V>>, action: &A) -> Result<Option<Arc<V>>> {
        self(slice, action)
    }
}

/// Root reducer over a [`SliceMap`], built by [`combine_reducers`].
pub struct CombinedReducer<V, A> {
    children: Vec<(SliceKey, Box<dyn SliceReducer<V, A>>)>,
}

/// Combine named slice reducers into one root reducer.
///
/// Children run in the order given; the composed reducer owns the aggregate
/// shape (keys present in the previous state but not in the mapping are
/// dropped).
///
/// # Panics
///
/// Panics if the same key is registered twice.
pub fn combine_reducers<V, A>(
    children: Vec<(SliceKey, Box<dyn SliceReducer<V, A>>)>,
) -> CombinedReducer<V, A> {
    let mut seen = std::collections::BTreeSet::new();
    for (key, _) in &children {
        assert!(seen.insert(*key), "duplicate slice key `{key}`");
    }
    CombinedReducer { children }
}

impl<V, A> Reducer<SliceMap<V>, A> for CombinedReducer<V, A>
where
    V: Send + Sync,
    A: Send,
{
    fn reduce(&self, state: &SliceMap<V>, action: &A) -> Result<SliceMap<V>> {
        let mut next: Vec<(SliceKey, Arc<V>)> = Vec::with_capacity(self.children.len());
        let mut changed = state.len() != self.children.len();

        for (key, child) in &self.children {
            let prev = state.arc(*key);
            let out = child
                .reduce_slice(prev, action)?
                .ok_or(StoreError::InvalidReducerOutput { key: *key })?;
            changed |= !prev.is_some_and(|p| Arc::ptr_eq(p, &out));
            next.push((*key, out));
        }

        if !changed {
            return Ok(state.clone());
        }

        for key in state.keys() {
            if !self.children.iter().any(|(k, _)| *k == key) {
                log::debug!("dropping stale slice `{key}` not covered by the composer");
            }
        }

        Ok(SliceMap {
            slices: Arc::new(next.into_iter().collect()),
        })
    }
}
