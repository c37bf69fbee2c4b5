//! Terminal evaluators.
//!
//! Every terminal opens a fresh cursor and either drains it or stops as soon
//! as the answer is known (`any`, `all`, `contains`, `first*`, `element_at`,
//! `single*` after a second match).

use std::cmp::Ordering;
use std::collections::hash_map::{Entry, HashMap};
use std::hash::{BuildHasher, Hash};
use std::iter::Sum;

use crate::compare::EqualityComparer;
use crate::error::{QueryError, Result};
use crate::query::Query;
use crate::value::{Mean, Number};

impl<'a, T: 'a> Query<'a, T> {
    // ========================================================================
    // Materialization
    // ========================================================================

    /// Collects every element into a vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Appends every element to a caller-supplied container.
    pub fn collect_into<E: Extend<T>>(&self, dest: &mut E) {
        dest.extend(self.iter());
    }

    /// Builds a map from projected keys and values.
    ///
    /// Fails with [`QueryError::DuplicateKey`] when two elements produce the
    /// same key.
    pub fn to_map<K, V, KF, VF>(&self, key: KF, value: VF) -> Result<HashMap<K, V>>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> K,
        VF: FnMut(T) -> V,
    {
        let mut map = HashMap::new();
        self.to_map_into(&mut map, key, value)?;
        Ok(map)
    }

    /// Inserts projected entries into an existing map.
    ///
    /// A key already present in `map`, or produced twice, fails with
    /// [`QueryError::DuplicateKey`]. Entries inserted before the failure stay
    /// in the map.
    pub fn to_map_into<K, V, S, KF, VF>(
        &self,
        map: &mut HashMap<K, V, S>,
        mut key: KF,
        mut value: VF,
    ) -> Result<()>
    where
        K: Eq + Hash,
        S: BuildHasher,
        KF: FnMut(&T) -> K,
        VF: FnMut(T) -> V,
    {
        for (position, item) in self.iter().enumerate() {
            match map.entry(key(&item)) {
                Entry::Occupied(_) => return Err(QueryError::DuplicateKey { position }),
                Entry::Vacant(slot) => {
                    slot.insert(value(item));
                }
            }
        }
        Ok(())
    }

    /// Builds a map, combining the values of colliding keys with `merge`.
    ///
    /// `merge` receives the value stored so far and the new value.
    pub fn to_map_with<K, V, KF, VF, MF>(&self, mut key: KF, mut value: VF, mut merge: MF) -> HashMap<K, V>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> K,
        VF: FnMut(T) -> V,
        MF: FnMut(V, V) -> V,
    {
        let mut map = HashMap::new();
        for item in self.iter() {
            let k = key(&item);
            let v = value(item);
            let merged = match map.remove(&k) {
                Some(existing) => merge(existing, v),
                None => v,
            };
            map.insert(k, merged);
        }
        map
    }

    /// Calls `f` on every element.
    pub fn for_each<F: FnMut(T)>(&self, f: F) {
        self.iter().for_each(f);
    }

    // ========================================================================
    // Counting and quantifiers
    // ========================================================================

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Number of elements satisfying `predicate`.
    pub fn count_where<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> usize {
        self.iter().filter(|item| predicate(item)).count()
    }

    /// Returns `true` if the query yields at least one element.
    pub fn any(&self) -> bool {
        self.iter().next().is_some()
    }

    /// Returns `true` if some element satisfies `predicate`.
    pub fn any_where<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> bool {
        self.iter().any(|item| predicate(&item))
    }

    /// Returns `true` if every element satisfies `predicate` (vacuously true
    /// when empty).
    pub fn all<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> bool {
        self.iter().all(|item| predicate(&item))
    }

    /// Returns `true` if an element equals `value`.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|item| item == *value)
    }

    /// Returns `true` if an element equals `value` under `comparer`.
    pub fn contains_with<C>(&self, value: &T, comparer: &C) -> bool
    where
        C: EqualityComparer<T>,
    {
        self.iter().any(|item| comparer.equals(&item, value))
    }

    /// Returns `true` if both queries yield equal elements in the same order.
    pub fn sequence_equal(&self, other: &Query<'a, T>) -> bool
    where
        T: PartialEq,
    {
        self.iter().eq(other.iter())
    }

    // ========================================================================
    // Numeric aggregates
    // ========================================================================

    /// Sums the elements; an empty query sums to the identity.
    pub fn sum(&self) -> T
    where
        T: Sum<T>,
    {
        self.iter().sum()
    }

    /// Arithmetic mean of the elements.
    pub fn average(&self) -> Result<f64>
    where
        T: Into<Number>,
    {
        let mut mean = Mean::default();
        for item in self.iter() {
            mean.push(item.into());
        }
        mean.finish()
            .ok_or(QueryError::EmptySequence { op: "average" })
    }

    /// Smallest element; the first one wins ties.
    ///
    /// Values that do not compare with themselves (such as NaN) are skipped.
    /// They are returned only when no element compares.
    pub fn min(&self) -> Result<T>
    where
        T: PartialOrd,
    {
        extreme(self.iter(), Ordering::Less).ok_or(QueryError::EmptySequence { op: "min" })
    }

    /// Largest element; the first one wins ties.
    ///
    /// Incomparable values are skipped as in [`min`](Self::min).
    pub fn max(&self) -> Result<T>
    where
        T: PartialOrd,
    {
        extreme(self.iter(), Ordering::Greater).ok_or(QueryError::EmptySequence { op: "max" })
    }

    /// Element with the smallest key; the first one wins ties.
    pub fn min_by_key<K: Ord, F: FnMut(&T) -> K>(&self, key: F) -> Result<T> {
        self.iter()
            .min_by_key(key)
            .ok_or(QueryError::EmptySequence { op: "min_by_key" })
    }

    /// Element with the largest key; the first one wins ties.
    pub fn max_by_key<K: Ord, F: FnMut(&T) -> K>(&self, mut key: F) -> Result<T> {
        self.iter()
            .map(|item| (key(&item), item))
            .reduce(|best, next| if next.0 > best.0 { next } else { best })
            .map(|(_, item)| item)
            .ok_or(QueryError::EmptySequence { op: "max_by_key" })
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Left fold starting from `seed`.
    pub fn fold<A, F: FnMut(A, T) -> A>(&self, seed: A, f: F) -> A {
        self.iter().fold(seed, f)
    }

    /// Left fold seeded with the first element.
    pub fn reduce<F: FnMut(T, T) -> T>(&self, f: F) -> Result<T> {
        self.iter()
            .reduce(f)
            .ok_or(QueryError::EmptySequence { op: "reduce" })
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// First element; [`QueryError::NotFound`] when empty.
    pub fn first(&self) -> Result<T> {
        self.iter()
            .next()
            .ok_or(QueryError::NotFound { op: "first" })
    }

    /// First element satisfying `predicate`.
    pub fn first_where<P: FnMut(&T) -> bool>(&self, predicate: P) -> Result<T> {
        self.iter()
            .find(predicate)
            .ok_or(QueryError::NotFound { op: "first_where" })
    }

    /// First element, or `default` when the query is empty.
    pub fn first_or(&self, default: T) -> T {
        self.iter().next().unwrap_or(default)
    }

    /// Last element; [`QueryError::NotFound`] when empty.
    pub fn last(&self) -> Result<T> {
        self.iter()
            .last()
            .ok_or(QueryError::NotFound { op: "last" })
    }

    /// Last element satisfying `predicate`.
    pub fn last_where<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> Result<T> {
        self.iter()
            .filter(|item| predicate(item))
            .last()
            .ok_or(QueryError::NotFound { op: "last_where" })
    }

    /// Last element, or `default` when the query is empty.
    pub fn last_or(&self, default: T) -> T {
        self.iter().last().unwrap_or(default)
    }

    /// The only element.
    ///
    /// Fails with [`QueryError::NotFound`] when empty and with
    /// [`QueryError::MoreThanOne`] when there is a second element.
    pub fn single(&self) -> Result<T> {
        single_of(self.iter(), "single")?.ok_or(QueryError::NotFound { op: "single" })
    }

    /// The only element satisfying `predicate`.
    pub fn single_where<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> Result<T> {
        let matches = self.iter().filter(|item| predicate(item));
        single_of(matches, "single_where")?.ok_or(QueryError::NotFound { op: "single_where" })
    }

    /// The only element, or `default` when empty.
    ///
    /// More than one element still fails with [`QueryError::MoreThanOne`].
    pub fn single_or(&self, default: T) -> Result<T> {
        Ok(single_of(self.iter(), "single_or")?.unwrap_or(default))
    }

    /// Element at a zero-based position.
    pub fn element_at(&self, index: usize) -> Result<T> {
        let mut len = 0;
        for item in self.iter() {
            if len == index {
                return Ok(item);
            }
            len += 1;
        }
        Err(QueryError::IndexOutOfRange { index, len })
    }

    /// Element at a zero-based position, or `default` past the end.
    pub fn element_at_or(&self, index: usize, default: T) -> T {
        self.iter().nth(index).unwrap_or(default)
    }
}

/// Keeps the first element that beats every other one in direction `wanted`.
///
/// An incomparable first element is only a placeholder: the first element that
/// compares with itself replaces it.
fn extreme<T: PartialOrd>(iter: impl Iterator<Item = T>, wanted: Ordering) -> Option<T> {
    let mut best: Option<T> = None;
    let mut seeded = false;
    for item in iter {
        let comparable = item.partial_cmp(&item).is_some();
        let replace = match &best {
            None => true,
            Some(_) if !seeded => comparable,
            Some(current) => item.partial_cmp(current) == Some(wanted),
        };
        if replace {
            seeded = comparable;
            best = Some(item);
        }
    }
    best
}

/// Pulls at most two elements: `Ok(None)` when empty, `Ok(Some)` for exactly
/// one, an error for more.
fn single_of<T>(mut iter: impl Iterator<Item = T>, op: &'static str) -> Result<Option<T>> {
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    if iter.next().is_some() {
        return Err(QueryError::MoreThanOne { op });
    }
    Ok(Some(first))
}
