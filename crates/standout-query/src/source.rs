//! Sequence sources.
//!
//! [`IntoQuery`] turns native containers, borrowed slices, strings, channels
//! and optional sources into a [`Query`]. Owned containers are moved into a
//! shared `Arc<[T]>` once, and every enumeration clones elements out of it, so
//! the resulting query can be enumerated again.

use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{QueryError, Result};
use crate::query::Query;

/// Conversion into a [`Query`].
pub trait IntoQuery<'a> {
    type Item: 'a;

    fn into_query(self) -> Query<'a, Self::Item>;
}

/// Creates a query over any supported source.
///
/// ```
/// use standout_query::from;
///
/// let words = vec!["a", "bb", "ccc"];
/// assert_eq!(from(&words).map(|w| w.len()).to_vec(), vec![1, 2, 3]);
/// assert_eq!(from("hé").count(), 2);
/// assert!(from(None::<Vec<i32>>).to_vec().is_empty());
/// ```
pub fn from<'a, S: IntoQuery<'a>>(source: S) -> Query<'a, S::Item> {
    source.into_query()
}

fn shared<'a, T>(items: Arc<[T]>) -> Query<'a, T>
where
    T: Clone + Send + Sync + 'a,
{
    Query::new(move || {
        let items = Arc::clone(&items);
        (0..items.len()).map(move |idx| items[idx].clone())
    })
}

// ============================================================================
// Owned containers
// ============================================================================

impl<'a, T: Clone + Send + Sync + 'a> IntoQuery<'a> for Vec<T> {
    type Item = T;

    fn into_query(self) -> Query<'a, T> {
        shared(Arc::from(self))
    }
}

impl<'a, T: Clone + Send + Sync + 'a> IntoQuery<'a> for Box<[T]> {
    type Item = T;

    fn into_query(self) -> Query<'a, T> {
        shared(Arc::from(self))
    }
}

impl<'a, T: Clone + Send + Sync + 'a> IntoQuery<'a> for Arc<[T]> {
    type Item = T;

    fn into_query(self) -> Query<'a, T> {
        shared(self)
    }
}

impl<'a, T: Clone + Send + Sync + 'a> IntoQuery<'a> for VecDeque<T> {
    type Item = T;

    fn into_query(self) -> Query<'a, T> {
        shared(Arc::from(Vec::from(self)))
    }
}

impl<'a, T: Clone + Send + Sync + 'a, const N: usize> IntoQuery<'a> for [T; N] {
    type Item = T;

    fn into_query(self) -> Query<'a, T> {
        shared(Arc::from(Vec::from(self)))
    }
}

impl<'a, K, V, S> IntoQuery<'a> for HashMap<K, V, S>
where
    K: Clone + Send + Sync + 'a,
    V: Clone + Send + Sync + 'a,
{
    type Item = (K, V);

    /// Pairs come out in the map's iteration order, fixed for the life of
    /// the query.
    fn into_query(self) -> Query<'a, (K, V)> {
        shared(self.into_iter().collect::<Vec<_>>().into())
    }
}

impl<'a, K, V> IntoQuery<'a> for BTreeMap<K, V>
where
    K: Clone + Send + Sync + 'a,
    V: Clone + Send + Sync + 'a,
{
    type Item = (K, V);

    fn into_query(self) -> Query<'a, (K, V)> {
        shared(self.into_iter().collect::<Vec<_>>().into())
    }
}

// ============================================================================
// Borrowed containers
// ============================================================================

impl<'a, T: Sync + 'a> IntoQuery<'a> for &'a [T] {
    type Item = &'a T;

    fn into_query(self) -> Query<'a, &'a T> {
        Query::new(move || self.iter())
    }
}

impl<'a, T: Sync + 'a> IntoQuery<'a> for &'a Vec<T> {
    type Item = &'a T;

    fn into_query(self) -> Query<'a, &'a T> {
        self.as_slice().into_query()
    }
}

impl<'a, T: Sync + 'a, const N: usize> IntoQuery<'a> for &'a [T; N] {
    type Item = &'a T;

    fn into_query(self) -> Query<'a, &'a T> {
        self.as_slice().into_query()
    }
}

impl<'a, K: Sync, V: Sync, S: Sync> IntoQuery<'a> for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);

    fn into_query(self) -> Query<'a, (&'a K, &'a V)> {
        Query::new(move || self.iter())
    }
}

impl<'a, K: Sync, V: Sync> IntoQuery<'a> for &'a BTreeMap<K, V> {
    type Item = (&'a K, &'a V);

    fn into_query(self) -> Query<'a, (&'a K, &'a V)> {
        Query::new(move || self.iter())
    }
}

// ============================================================================
// Text
// ============================================================================

impl<'a> IntoQuery<'a> for &'a str {
    type Item = char;

    fn into_query(self) -> Query<'a, char> {
        Query::new(move || self.chars())
    }
}

impl<'a> IntoQuery<'a> for String {
    type Item = char;

    fn into_query(self) -> Query<'a, char> {
        let text: Arc<str> = Arc::from(self);
        Query::new(move || {
            let text = Arc::clone(&text);
            let mut offset = 0;
            std::iter::from_fn(move || {
                let ch = text[offset..].chars().next()?;
                offset += ch.len_utf8();
                Some(ch)
            })
        })
    }
}

// ============================================================================
// Channels, options and queries
// ============================================================================

/// Yields values as they arrive, blocking on each pull until a value is
/// available or every sender has been dropped.
///
/// The receiver is shared by every enumeration of the query: each value is
/// delivered to exactly one cursor.
impl<'a, T: Send + 'a> IntoQuery<'a> for Receiver<T> {
    type Item = T;

    fn into_query(self) -> Query<'a, T> {
        let receiver = Arc::new(Mutex::new(self));
        Query::new(move || {
            let receiver = Arc::clone(&receiver);
            std::iter::from_fn(move || receiver.lock().recv().ok())
        })
    }
}

/// `None` is an empty query.
impl<'a, S: IntoQuery<'a>> IntoQuery<'a> for Option<S> {
    type Item = S::Item;

    fn into_query(self) -> Query<'a, S::Item> {
        match self {
            Some(source) => source.into_query(),
            None => Query::empty(),
        }
    }
}

impl<'a, T: 'a> IntoQuery<'a> for Query<'a, T> {
    type Item = T;

    fn into_query(self) -> Query<'a, T> {
        self
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl<'a, T: 'a> Query<'a, T> {
    /// A query that yields nothing.
    pub fn empty() -> Self {
        Query::new(std::iter::empty)
    }

    /// Yields `value` `count` times.
    pub fn repeat(value: T, count: usize) -> Self
    where
        T: Clone + Send + Sync,
    {
        Query::new(move || std::iter::repeat(value.clone()).take(count))
    }

    /// Restarts by cloning `iter` for every enumeration.
    ///
    /// Unbounded iterators are fine as long as a bounding operator or a
    /// short-circuiting terminal sits downstream.
    ///
    /// ```
    /// use standout_query::Query;
    ///
    /// let evens = Query::from_iter_cloned(0u32..).filter(|n| n % 2 == 0);
    /// assert_eq!(evens.take(3).to_vec(), vec![0, 2, 4]);
    /// ```
    pub fn from_iter_cloned<I>(iter: I) -> Self
    where
        I: Iterator<Item = T> + Clone + Send + Sync + 'a,
    {
        Query::new(move || iter.clone())
    }
}

impl<'a> Query<'a, i64> {
    /// Yields `count` consecutive integers starting at `start`.
    ///
    /// Stops early rather than wrap if the sequence would overflow.
    pub fn range(start: i64, count: usize) -> Self {
        Query::new(move || (0..count).map_while(move |idx| start.checked_add(idx as i64)))
    }
}

impl<T: Clone + Send + Sync + 'static> Query<'static, T> {
    /// Builds a query from a type-erased source.
    ///
    /// Recognizes `Query<'static, T>`, `Vec<T>`, `Box<[T]>`, `VecDeque<T>`,
    /// `Option<Vec<T>>` and `Receiver<T>`. When `T` is `char`, `String` and
    /// `&'static str` are recognized too. Anything else fails with
    /// [`QueryError::UnsupportedSource`].
    pub fn from_any(source: Box<dyn Any + Send>) -> Result<Self> {
        take::<Query<'static, T>>(source)
            .or_else(|source| take::<Vec<T>>(source).map(from))
            .or_else(|source| take::<Box<[T]>>(source).map(from))
            .or_else(|source| take::<VecDeque<T>>(source).map(from))
            .or_else(|source| take::<Option<Vec<T>>>(source).map(from))
            .or_else(|source| take::<Receiver<T>>(source).map(from))
            .or_else(text::<T>)
            .map_err(|_| QueryError::UnsupportedSource {
                item: type_name::<T>(),
            })
    }
}

type Erased = Box<dyn Any + Send>;

fn take<S: Any>(source: Erased) -> std::result::Result<S, Erased> {
    source.downcast::<S>().map(|boxed| *boxed)
}

fn text<T: 'static>(source: Erased) -> std::result::Result<Query<'static, T>, Erased> {
    let chars: Query<'static, char> = match take::<String>(source) {
        Ok(owned) => from(owned),
        Err(source) => from(take::<&'static str>(source)?),
    };
    take::<Query<'static, T>>(Box::new(chars))
}
