//! Hash-keyed grouping and joins.

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::Arc;

use crate::compare::{DefaultEquality, EqualityComparer};
use crate::query::Query;
use crate::set::KeyTable;
use crate::stage::deferred;

/// A key and the values that mapped to it, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K, V> {
    /// The key every value mapped to.
    pub key: K,
    /// Values in encounter order.
    pub values: Vec<V>,
}

impl<K, V> Group<K, V> {
    /// The shared key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Values in encounter order.
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Number of values in the group.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false` for groups emitted by `group_by`.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }
}

/// A materialized one-to-many index from keys to values.
///
/// Keys keep first-seen order and are compared with the lookup's
/// [`EqualityComparer`]. Built by [`Query::to_lookup`] and internally by the
/// join operators.
pub struct Lookup<K, V, C = DefaultEquality> {
    keys: KeyTable<K, C>,
    values: Vec<Vec<V>>,
}

impl<K, V, C: EqualityComparer<K>> Lookup<K, V, C> {
    pub(crate) fn new(comparer: Arc<C>) -> Self {
        Lookup {
            keys: KeyTable::new(comparer),
            values: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, key: K, value: V) {
        let (idx, inserted) = self.keys.insert(key);
        if inserted {
            self.values.push(Vec::new());
        }
        self.values[idx].push(value);
    }

    fn slot(&self, key: &K) -> Option<usize> {
        self.keys.find(key)
    }

    /// Values stored under `key`; empty when the key is absent.
    pub fn get(&self, key: &K) -> &[V] {
        match self.slot(key) {
            Some(idx) => &self.values[idx],
            None => &[],
        }
    }

    /// Returns `true` if `key` has at least one value.
    pub fn contains_key(&self, key: &K) -> bool {
        self.slot(key).is_some()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no key was inserted.
    pub fn is_empty(&self) -> bool {
        self.keys.len() == 0
    }

    /// Keys with their values, in first-seen key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.keys
            .keys()
            .iter()
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Converts into groups in first-seen key order.
    pub fn into_groups(self) -> Vec<Group<K, V>> {
        self.keys
            .into_keys()
            .into_iter()
            .zip(self.values)
            .map(|(key, values)| Group { key, values })
            .collect()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: EqualityComparer<K>> fmt::Debug for Lookup<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, T: 'a> Query<'a, T> {
    // ========================================================================
    // Grouping
    // ========================================================================

    /// Groups elements by key.
    ///
    /// Groups come out in the order their keys were first seen; each group's
    /// values keep encounter order. The whole upstream is consumed on the
    /// first pull.
    ///
    /// ```
    /// use standout_query::from;
    ///
    /// let rows = from(vec![("a", 1), ("b", 2), ("a", 3)]);
    /// let groups = rows.group_by_map(|r| r.0, |r| r.1).to_vec();
    ///
    /// assert_eq!(groups[0].key, "a");
    /// assert_eq!(groups[0].values, vec![1, 3]);
    /// assert_eq!(groups[1].key, "b");
    /// assert_eq!(groups[1].values, vec![2]);
    /// ```
    pub fn group_by<K, F>(&self, key: F) -> Query<'a, Group<K, T>>
    where
        K: Eq + Hash + 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
    {
        self.group_by_with(key, |item| item, DefaultEquality)
    }

    /// Groups elements by key, projecting each element with `value`.
    pub fn group_by_map<K, V, F, S>(&self, key: F, value: S) -> Query<'a, Group<K, V>>
    where
        K: Eq + Hash + 'a,
        V: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        S: Fn(T) -> V + Send + Sync + 'a,
    {
        self.group_by_with(key, value, DefaultEquality)
    }

    /// Groups elements by key under a custom key equality.
    pub fn group_by_with<K, V, F, S, C>(
        &self,
        key: F,
        value: S,
        comparer: C,
    ) -> Query<'a, Group<K, V>>
    where
        K: 'a,
        V: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        S: Fn(T) -> V + Send + Sync + 'a,
        C: EqualityComparer<K> + 'a,
    {
        let key = Arc::new(key);
        let value = Arc::new(value);
        let comparer = Arc::new(comparer);
        self.compose(move |upstream| {
            let key = Arc::clone(&key);
            let value = Arc::clone(&value);
            let comparer = Arc::clone(&comparer);
            deferred(move || {
                let mut lookup = Lookup::new(comparer);
                for item in upstream {
                    lookup.push(key(&item), value(item));
                }
                tracing::trace!(groups = lookup.len(), "grouped input");
                lookup.into_groups().into_iter()
            })
        })
    }

    // ========================================================================
    // Joins
    // ========================================================================

    /// Inner join: one result per (outer, matching inner) pair.
    ///
    /// The inner query is indexed on the first pull; the outer query streams.
    /// Matches for one outer element come out in inner encounter order, and
    /// outer elements without a match produce nothing.
    ///
    /// ```
    /// use standout_query::from;
    ///
    /// let people = from(vec![(1, "ann"), (2, "bob"), (3, "cy")]);
    /// let pets = from(vec![(1, "cat"), (3, "eel"), (1, "dog")]);
    ///
    /// let owned = people.join(&pets, |p| p.0, |a| a.0, |p, a| format!("{}:{}", p.1, a.1));
    /// assert_eq!(owned.to_vec(), vec!["ann:cat", "ann:dog", "cy:eel"]);
    /// ```
    pub fn join<I, K, R, OK, IK, RS>(
        &self,
        inner: &Query<'a, I>,
        outer_key: OK,
        inner_key: IK,
        result: RS,
    ) -> Query<'a, R>
    where
        I: 'a,
        K: Eq + Hash + 'a,
        R: 'a,
        OK: Fn(&T) -> K + Send + Sync + 'a,
        IK: Fn(&I) -> K + Send + Sync + 'a,
        RS: Fn(&T, &I) -> R + Send + Sync + 'a,
    {
        self.join_with(inner, outer_key, inner_key, result, DefaultEquality)
    }

    /// [`join`](Self::join) under a custom key equality.
    pub fn join_with<I, K, R, OK, IK, RS, C>(
        &self,
        inner: &Query<'a, I>,
        outer_key: OK,
        inner_key: IK,
        result: RS,
        comparer: C,
    ) -> Query<'a, R>
    where
        I: 'a,
        K: 'a,
        R: 'a,
        OK: Fn(&T) -> K + Send + Sync + 'a,
        IK: Fn(&I) -> K + Send + Sync + 'a,
        RS: Fn(&T, &I) -> R + Send + Sync + 'a,
        C: EqualityComparer<K> + 'a,
    {
        let inner = inner.clone();
        let outer_key = Arc::new(outer_key);
        let inner_key = Arc::new(inner_key);
        let result = Arc::new(result);
        let comparer = Arc::new(comparer);
        self.compose(move |outer| {
            let inner = inner.clone();
            let outer_key = Arc::clone(&outer_key);
            let inner_key = Arc::clone(&inner_key);
            let result = Arc::clone(&result);
            let comparer = Arc::clone(&comparer);
            deferred(move || {
                let lookup = Rc::new(index_inner(&inner, &*inner_key, comparer));
                outer.flat_map(move |item| {
                    let lookup = Rc::clone(&lookup);
                    let result = Arc::clone(&result);
                    let slot = lookup.slot(&outer_key(&item));
                    let matches = slot.map_or(0, |idx| lookup.values[idx].len());
                    (0..matches).filter_map(move |n| {
                        let idx = slot?;
                        Some(result(&item, &lookup.values[idx][n]))
                    })
                })
            })
        })
    }

    /// Group join: exactly one result per outer element, paired with every
    /// matching inner element (possibly none).
    ///
    /// ```
    /// use standout_query::from;
    ///
    /// let people = from(vec![(1, "ann"), (2, "bob")]);
    /// let pets = from(vec![(1, "cat"), (1, "dog")]);
    ///
    /// let counts = people.group_join(&pets, |p| p.0, |a| a.0, |p, pets| (p.1, pets.len()));
    /// assert_eq!(counts.to_vec(), vec![("ann", 2), ("bob", 0)]);
    /// ```
    pub fn group_join<I, K, R, OK, IK, RS>(
        &self,
        inner: &Query<'a, I>,
        outer_key: OK,
        inner_key: IK,
        result: RS,
    ) -> Query<'a, R>
    where
        I: 'a,
        K: Eq + Hash + 'a,
        R: 'a,
        OK: Fn(&T) -> K + Send + Sync + 'a,
        IK: Fn(&I) -> K + Send + Sync + 'a,
        RS: Fn(&T, &[I]) -> R + Send + Sync + 'a,
    {
        self.group_join_with(inner, outer_key, inner_key, result, DefaultEquality)
    }

    /// [`group_join`](Self::group_join) under a custom key equality.
    pub fn group_join_with<I, K, R, OK, IK, RS, C>(
        &self,
        inner: &Query<'a, I>,
        outer_key: OK,
        inner_key: IK,
        result: RS,
        comparer: C,
    ) -> Query<'a, R>
    where
        I: 'a,
        K: 'a,
        R: 'a,
        OK: Fn(&T) -> K + Send + Sync + 'a,
        IK: Fn(&I) -> K + Send + Sync + 'a,
        RS: Fn(&T, &[I]) -> R + Send + Sync + 'a,
        C: EqualityComparer<K> + 'a,
    {
        let inner = inner.clone();
        let outer_key = Arc::new(outer_key);
        let inner_key = Arc::new(inner_key);
        let result = Arc::new(result);
        let comparer = Arc::new(comparer);
        self.compose(move |outer| {
            let inner = inner.clone();
            let outer_key = Arc::clone(&outer_key);
            let inner_key = Arc::clone(&inner_key);
            let result = Arc::clone(&result);
            let comparer = Arc::clone(&comparer);
            deferred(move || {
                let lookup = index_inner(&inner, &*inner_key, comparer);
                outer.map(move |item| result(&item, lookup.get(&outer_key(&item))))
            })
        })
    }

    // ========================================================================
    // Lookup terminals
    // ========================================================================

    /// Materializes a [`Lookup`] from key to projected values.
    pub fn to_lookup<K, V, F, S>(&self, key: F, value: S) -> Lookup<K, V>
    where
        K: Eq + Hash,
        F: FnMut(&T) -> K,
        S: FnMut(T) -> V,
    {
        self.to_lookup_with(key, value, DefaultEquality)
    }

    /// [`to_lookup`](Self::to_lookup) under a custom key equality.
    pub fn to_lookup_with<K, V, F, S, C>(&self, mut key: F, mut value: S, comparer: C) -> Lookup<K, V, C>
    where
        F: FnMut(&T) -> K,
        S: FnMut(T) -> V,
        C: EqualityComparer<K>,
    {
        let mut lookup = Lookup::new(Arc::new(comparer));
        for item in self.iter() {
            lookup.push(key(&item), value(item));
        }
        lookup
    }
}

fn index_inner<'a, I, K, C>(
    inner: &Query<'a, I>,
    inner_key: &dyn Fn(&I) -> K,
    comparer: Arc<C>,
) -> Lookup<K, I, C>
where
    I: 'a,
    C: EqualityComparer<K>,
{
    let mut lookup = Lookup::new(comparer);
    for item in inner.iter() {
        lookup.push(inner_key(&item), item);
    }
    tracing::trace!(keys = lookup.len(), "indexed join input");
    lookup
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::IgnoreAsciiCase;
    use crate::from;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        k: &'static str,
        v: i32,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { k: "a", v: 1 },
            Row { k: "b", v: 2 },
            Row { k: "a", v: 3 },
        ]
    }

    #[test]
    fn group_by_first_seen_key_order() {
        let groups = from(rows()).group_by(|r| r.k).to_vec();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key(), &"a");
        assert_eq!(
            groups[0].iter().map(|r| r.v).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(groups[1].key(), &"b");
        assert_eq!(groups[1].len(), 1);
        assert!(!groups[1].is_empty());
    }

    #[test]
    fn group_by_with_custom_equality() {
        let words = from(vec!["Apple", "apple", "Pear", "APPLE"]);
        let groups = words
            .group_by_with(|w| w.to_string(), |w| w.len(), IgnoreAsciiCase)
            .to_vec();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "Apple");
        assert_eq!(groups[0].values(), &[5, 5, 5]);
        assert_eq!(groups[1].key, "Pear");
    }

    #[test]
    fn join_matches_nested_loop() {
        let outer = from(vec![1, 2, 3, 2]);
        let inner = from(vec![(2, 'x'), (3, 'y'), (2, 'z'), (4, 'w')]);

        let joined = outer
            .join(&inner, |o| *o, |i| i.0, |o, i| (*o, i.1))
            .to_vec();

        let mut expected = Vec::new();
        for o in [1, 2, 3, 2] {
            for i in [(2, 'x'), (3, 'y'), (2, 'z'), (4, 'w')] {
                if o == i.0 {
                    expected.push((o, i.1));
                }
            }
        }
        assert_eq!(joined, expected);
    }

    #[test]
    fn group_join_emits_one_result_per_outer() {
        let outer = from(vec!["x", "y"]);
        let inner = from(vec![("x", 1), ("x", 2)]);

        let joined = outer
            .group_join(&inner, |o| *o, |i| i.0, |o, matches| {
                (*o, matches.iter().map(|m| m.1).sum::<i32>())
            })
            .to_vec();
        assert_eq!(joined, vec![("x", 3), ("y", 0)]);
    }

    #[test]
    fn join_with_custom_equality() {
        let outer = from(vec!["ANN"]);
        let inner = from(vec!["ann", "Ann", "bob"]);

        let joined = outer
            .join_with(&inner, |o| *o, |i| *i, |_, i| *i, IgnoreAsciiCase)
            .to_vec();
        assert_eq!(joined, vec!["ann", "Ann"]);
    }

    #[test]
    fn lookup_access() {
        let lookup = from(rows()).to_lookup(|r| r.k, |r| r.v);

        assert_eq!(lookup.len(), 2);
        assert!(!lookup.is_empty());
        assert_eq!(lookup.get(&"a"), &[1, 3]);
        assert!(lookup.get(&"z").is_empty());
        assert!(lookup.contains_key(&"b"));
        assert_eq!(
            lookup.iter().map(|(k, v)| (*k, v.len())).collect::<Vec<_>>(),
            vec![("a", 2), ("b", 1)]
        );
        assert_eq!(format!("{lookup:?}"), r#"{"a": [1, 3], "b": [2]}"#);
    }
}
