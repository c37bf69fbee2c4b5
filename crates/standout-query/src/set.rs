//! Hash-keyed tables and the set-operation stages built on them.
//!
//! [`KeyTable`] stores each distinct key once, in first-seen order, and
//! answers lookups through the active [`EqualityComparer`]. It backs distinct,
//! union, intersect and except here, and grouping and joins in
//! [`group`](crate::group).

use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

use ahash::RandomState;
use hashbrown::HashTable;

use crate::compare::{DefaultEquality, EqualityComparer};
use crate::query::Query;
use crate::stage::deferred;

/// Distinct keys in first-seen order, indexed by a hash table of
/// `(hash, position)` entries.
pub(crate) struct KeyTable<K, C> {
    keys: Vec<K>,
    table: HashTable<(u64, usize)>,
    state: RandomState,
    comparer: Arc<C>,
}

impl<K, C: EqualityComparer<K>> KeyTable<K, C> {
    pub(crate) fn new(comparer: Arc<C>) -> Self {
        KeyTable {
            keys: Vec::new(),
            table: HashTable::new(),
            state: RandomState::new(),
            comparer,
        }
    }

    fn hash_key(&self, key: &K) -> u64 {
        let mut hasher = self.state.build_hasher();
        self.comparer.hash(key, &mut hasher);
        hasher.finish()
    }

    /// Returns the position of `key`, if an equal key was inserted before.
    pub(crate) fn find(&self, key: &K) -> Option<usize> {
        let hash = self.hash_key(key);
        self.table
            .find(hash, |&(h, idx)| {
                h == hash && self.comparer.equals(&self.keys[idx], key)
            })
            .map(|&(_, idx)| idx)
    }

    /// Inserts `key` unless an equal key is present.
    ///
    /// Returns the key's position and whether it was newly inserted.
    pub(crate) fn insert(&mut self, key: K) -> (usize, bool) {
        let hash = self.hash_key(&key);
        let keys = &self.keys;
        let comparer = &self.comparer;
        if let Some(&(_, idx)) = self
            .table
            .find(hash, |&(h, idx)| h == hash && comparer.equals(&keys[idx], &key))
        {
            return (idx, false);
        }

        let idx = self.keys.len();
        self.keys.push(key);
        self.table.insert_unique(hash, (hash, idx), |&(h, _)| h);
        (idx, true)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    pub(crate) fn into_keys(self) -> Vec<K> {
        self.keys
    }
}

impl<'a, T: 'a> Query<'a, T> {
    /// Removes duplicate elements, keeping the first occurrence.
    pub fn distinct(&self) -> Query<'a, T>
    where
        T: Clone + Eq + Hash,
    {
        self.distinct_with(DefaultEquality)
    }

    /// Removes elements equal, under `comparer`, to an earlier element.
    pub fn distinct_with<C>(&self, comparer: C) -> Query<'a, T>
    where
        T: Clone,
        C: EqualityComparer<T> + 'a,
    {
        let comparer = Arc::new(comparer);
        self.compose(move |upstream| {
            let mut seen = KeyTable::new(Arc::clone(&comparer));
            upstream.filter(move |item| seen.insert(item.clone()).1)
        })
    }

    /// Distinct elements of this query, then the not-yet-seen elements of
    /// `other`.
    pub fn union(&self, other: &Query<'a, T>) -> Query<'a, T>
    where
        T: Clone + Eq + Hash,
    {
        self.union_with(other, DefaultEquality)
    }

    /// [`union`](Self::union) under a custom equality.
    pub fn union_with<C>(&self, other: &Query<'a, T>, comparer: C) -> Query<'a, T>
    where
        T: Clone,
        C: EqualityComparer<T> + 'a,
    {
        let comparer = Arc::new(comparer);
        let other = other.clone();
        self.compose(move |upstream| {
            let mut seen = KeyTable::new(Arc::clone(&comparer));
            let second = other.clone();
            upstream
                .chain(deferred(move || second.iter()))
                .filter(move |item| seen.insert(item.clone()).1)
        })
    }

    /// Distinct elements of this query that also occur in `other`.
    ///
    /// `other` is consumed completely on the first pull.
    pub fn intersect(&self, other: &Query<'a, T>) -> Query<'a, T>
    where
        T: Eq + Hash,
    {
        self.intersect_with(other, DefaultEquality)
    }

    /// [`intersect`](Self::intersect) under a custom equality.
    pub fn intersect_with<C>(&self, other: &Query<'a, T>, comparer: C) -> Query<'a, T>
    where
        C: EqualityComparer<T> + 'a,
    {
        let comparer = Arc::new(comparer);
        let other = other.clone();
        self.compose(move |upstream| {
            let comparer = Arc::clone(&comparer);
            let second = other.clone();
            deferred(move || {
                let mut table = KeyTable::new(comparer);
                for item in second.iter() {
                    table.insert(item);
                }
                tracing::trace!(keys = table.len(), "built intersect table");

                let mut emitted = vec![false; table.len()];
                upstream.filter(move |item| match table.find(item) {
                    Some(idx) if !emitted[idx] => {
                        emitted[idx] = true;
                        true
                    }
                    _ => false,
                })
            })
        })
    }

    /// Distinct elements of this query that do not occur in `other`.
    ///
    /// `other` is consumed completely on the first pull.
    pub fn except(&self, other: &Query<'a, T>) -> Query<'a, T>
    where
        T: Clone + Eq + Hash,
    {
        self.except_with(other, DefaultEquality)
    }

    /// [`except`](Self::except) under a custom equality.
    pub fn except_with<C>(&self, other: &Query<'a, T>, comparer: C) -> Query<'a, T>
    where
        T: Clone,
        C: EqualityComparer<T> + 'a,
    {
        let comparer = Arc::new(comparer);
        let other = other.clone();
        self.compose(move |upstream| {
            let comparer = Arc::clone(&comparer);
            let second = other.clone();
            deferred(move || {
                let mut seen = KeyTable::new(comparer);
                for item in second.iter() {
                    seen.insert(item);
                }
                tracing::trace!(keys = seen.len(), "built except table");

                upstream.filter(move |item| seen.insert(item.clone()).1)
            })
        })
    }
}
