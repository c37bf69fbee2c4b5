//! Pluggable ordering and equality.
//!
//! Every operator whose result depends on ordering (the `order_by` family) takes
//! a [`Comparer`]; every operator that depends on equality (distinct, set
//! operations, grouping, joins) takes an [`EqualityComparer`]. Both fall back
//! to the element's own `Ord` / `Eq + Hash` when the caller does not supply one.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A total order over `K`.
///
/// Any `Fn(&K, &K) -> Ordering` closure that is `Send + Sync` is a comparer.
pub trait Comparer<K: ?Sized>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparer<K> for NaturalOrder {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: ?Sized, F> Comparer<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Equality plus a hash that agrees with it.
///
/// Implementations must be pure: `equals(a, b)` implies that `hash` feeds the
/// same bytes for `a` and `b`, and neither method may depend on how often it
/// was called before.
pub trait EqualityComparer<T: ?Sized>: Send + Sync {
    fn equals(&self, a: &T, b: &T) -> bool;

    fn hash<H: Hasher>(&self, value: &T, state: &mut H);
}

/// Compares values with their own [`Eq`] and [`Hash`] implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultEquality;

impl<T: Eq + Hash + ?Sized> EqualityComparer<T> for DefaultEquality {
    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }

    fn hash<H: Hasher>(&self, value: &T, state: &mut H) {
        value.hash(state);
    }
}

/// Treats two values as equal when a projection of them is equal.
///
/// ```
/// use standout_query::{from, ByKey};
///
/// let words = from(vec!["apple", "avocado", "banana"]);
/// let by_initial = words.distinct_with(ByKey::new(|w: &&str| w.chars().next()));
/// assert_eq!(by_initial.to_vec(), vec!["apple", "banana"]);
/// ```
pub struct ByKey<F, K> {
    selector: F,
    _key: PhantomData<fn() -> K>,
}

impl<F, K> ByKey<F, K> {
    pub fn new(selector: F) -> Self {
        ByKey {
            selector,
            _key: PhantomData,
        }
    }
}

impl<T: ?Sized, K, F> EqualityComparer<T> for ByKey<F, K>
where
    F: Fn(&T) -> K + Send + Sync,
    K: Eq + Hash,
{
    fn equals(&self, a: &T, b: &T) -> bool {
        (self.selector)(a) == (self.selector)(b)
    }

    fn hash<H: Hasher>(&self, value: &T, state: &mut H) {
        (self.selector)(value).hash(state);
    }
}

/// ASCII case-insensitive equality for string-like values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreAsciiCase;

impl<S: AsRef<str> + ?Sized> EqualityComparer<S> for IgnoreAsciiCase {
    fn equals(&self, a: &S, b: &S) -> bool {
        a.as_ref().eq_ignore_ascii_case(b.as_ref())
    }

    fn hash<H: Hasher>(&self, value: &S, state: &mut H) {
        for byte in value.as_ref().bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        // Same terminator `str::hash` writes.
        state.write_u8(0xff);
    }
}
