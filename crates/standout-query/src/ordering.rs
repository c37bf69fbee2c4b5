//! Deferred multi-key ordering.
//!
//! [`Query::order_by`] and friends return an [`OrderedQuery`], which records
//! sort keys without touching the source. `then_by` appends a key. The sort
//! runs once per enumeration, on the first pull: the upstream is buffered,
//! each key is computed once per element, and the buffer positions are stably
//! sorted with the keys compared in declaration order. Elements equal under
//! every key keep their source order.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::compare::{Comparer, NaturalOrder};
use crate::query::{Cursor, Query};
use crate::stage::deferred;

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    #[default]
    Asc,
    Desc,
}

impl Dir {
    /// Orients a comparison result: unchanged for `Asc`, reversed for `Desc`.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        })
    }
}

/// One recorded sort key: computes its key column for a buffered input.
trait SortKey<'a, T>: Send + Sync {
    fn column(&self, items: &[T]) -> Box<dyn KeyColumn + 'a>;
}

/// Keys of one sort level, compared by buffer position.
trait KeyColumn {
    fn compare(&self, a: usize, b: usize) -> Ordering;
}

struct KeySpec<K, F, C> {
    selector: F,
    comparer: Arc<C>,
    dir: Dir,
    _key: PhantomData<fn() -> K>,
}

impl<'a, T, K, F, C> SortKey<'a, T> for KeySpec<K, F, C>
where
    K: 'a,
    F: Fn(&T) -> K + Send + Sync,
    C: Comparer<K> + 'a,
{
    fn column(&self, items: &[T]) -> Box<dyn KeyColumn + 'a> {
        Box::new(Column {
            keys: items.iter().map(|item| (self.selector)(item)).collect(),
            comparer: Arc::clone(&self.comparer),
            dir: self.dir,
        })
    }
}

struct Column<K, C> {
    keys: Vec<K>,
    comparer: Arc<C>,
    dir: Dir,
}

impl<K, C: Comparer<K>> KeyColumn for Column<K, C> {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        self.dir
            .apply(self.comparer.compare(&self.keys[a], &self.keys[b]))
    }
}

type SortKeys<'a, T> = Vec<Arc<dyn SortKey<'a, T> + 'a>>;

/// Stably sorts `items` by `keys`, primary key first.
fn sort_buffer<'a, T>(items: Vec<T>, keys: &[Arc<dyn SortKey<'a, T> + 'a>]) -> Vec<T> {
    let columns: Vec<Box<dyn KeyColumn + 'a>> = keys.iter().map(|key| key.column(&items)).collect();

    let mut order: Vec<usize> = (0..items.len()).collect();
    // `sort_by` is stable, so positions equal under every key stay in source order.
    order.sort_by(|&a, &b| {
        columns
            .iter()
            .map(|column| column.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    tracing::trace!(rows = items.len(), keys = keys.len(), "sorted buffer");

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}

/// A query with an accumulated multi-key sort.
///
/// Dereferences to the sorted [`Query`], so every operator and terminal is
/// available; `then_by` and its variants add tie-breaking keys.
///
/// ```
/// use standout_query::from;
///
/// let people = from(vec![("bo", 30), ("al", 25), ("cy", 30), ("di", 25)]);
/// let sorted = people.order_by_desc(|p| p.1).then_by(|p| p.0);
///
/// assert_eq!(
///     sorted.map(|p| p.0).to_vec(),
///     vec!["bo", "cy", "al", "di"]
/// );
/// ```
pub struct OrderedQuery<'a, T> {
    source: Query<'a, T>,
    keys: SortKeys<'a, T>,
    sorted: Query<'a, T>,
}

impl<'a, T> Clone for OrderedQuery<'a, T> {
    fn clone(&self) -> Self {
        OrderedQuery {
            source: self.source.clone(),
            keys: self.keys.clone(),
            sorted: self.sorted.clone(),
        }
    }
}

impl<'a, T> fmt::Debug for OrderedQuery<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedQuery")
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T: 'a> OrderedQuery<'a, T> {
    fn with_keys(source: Query<'a, T>, keys: SortKeys<'a, T>) -> Self {
        let sort_keys = keys.clone();
        let sorted = source.compose(move |upstream| {
            let keys = sort_keys.clone();
            deferred(move || sort_buffer(upstream.collect(), &keys).into_iter())
        });
        OrderedQuery {
            source,
            keys,
            sorted,
        }
    }

    fn then_key<K, F, C>(&self, selector: F, comparer: C, dir: Dir) -> Self
    where
        K: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        C: Comparer<K> + 'a,
    {
        let mut keys = self.keys.clone();
        keys.push(key_spec(selector, comparer, dir));
        OrderedQuery::with_keys(self.source.clone(), keys)
    }

    /// Breaks ties with an ascending key.
    pub fn then_by<K, F>(&self, selector: F) -> Self
    where
        K: Ord + 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
    {
        self.then_key(selector, NaturalOrder, Dir::Asc)
    }

    /// Breaks ties with a descending key.
    pub fn then_by_desc<K, F>(&self, selector: F) -> Self
    where
        K: Ord + 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
    {
        self.then_key(selector, NaturalOrder, Dir::Desc)
    }

    /// Breaks ties with an ascending key under `comparer`.
    pub fn then_by_with<K, F, C>(&self, selector: F, comparer: C) -> Self
    where
        K: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        C: Comparer<K> + 'a,
    {
        self.then_key(selector, comparer, Dir::Asc)
    }

    /// Breaks ties with a descending key under `comparer`.
    pub fn then_by_desc_with<K, F, C>(&self, selector: F, comparer: C) -> Self
    where
        K: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        C: Comparer<K> + 'a,
    {
        self.then_key(selector, comparer, Dir::Desc)
    }

    /// Number of sort keys recorded so far.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the sorted query, dropping the ability to add keys.
    pub fn into_query(self) -> Query<'a, T> {
        self.sorted
    }
}

impl<'a, T> Deref for OrderedQuery<'a, T> {
    type Target = Query<'a, T>;

    fn deref(&self) -> &Query<'a, T> {
        &self.sorted
    }
}

impl<'q, 'a, T: 'a> IntoIterator for &'q OrderedQuery<'a, T> {
    type Item = T;
    type IntoIter = Cursor<'a, T>;

    fn into_iter(self) -> Cursor<'a, T> {
        self.sorted.iter()
    }
}

fn key_spec<'a, T, K, F, C>(selector: F, comparer: C, dir: Dir) -> Arc<dyn SortKey<'a, T> + 'a>
where
    K: 'a,
    F: Fn(&T) -> K + Send + Sync + 'a,
    C: Comparer<K> + 'a,
{
    Arc::new(KeySpec {
        selector,
        comparer: Arc::new(comparer),
        dir,
        _key: PhantomData,
    })
}

impl<'a, T: 'a> Query<'a, T> {
    /// Sorts by an ascending key. Ties keep source order.
    pub fn order_by<K, F>(&self, selector: F) -> OrderedQuery<'a, T>
    where
        K: Ord + 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
    {
        self.order_by_dir(selector, NaturalOrder, Dir::Asc)
    }

    /// Sorts by a descending key. Ties keep source order.
    pub fn order_by_desc<K, F>(&self, selector: F) -> OrderedQuery<'a, T>
    where
        K: Ord + 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
    {
        self.order_by_dir(selector, NaturalOrder, Dir::Desc)
    }

    /// Sorts by an ascending key under `comparer`.
    pub fn order_by_with<K, F, C>(&self, selector: F, comparer: C) -> OrderedQuery<'a, T>
    where
        K: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        C: Comparer<K> + 'a,
    {
        self.order_by_dir(selector, comparer, Dir::Asc)
    }

    /// Sorts by a descending key under `comparer`.
    pub fn order_by_desc_with<K, F, C>(&self, selector: F, comparer: C) -> OrderedQuery<'a, T>
    where
        K: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        C: Comparer<K> + 'a,
    {
        self.order_by_dir(selector, comparer, Dir::Desc)
    }

    /// Sorts by a key in the given direction under `comparer`.
    pub fn order_by_dir<K, F, C>(&self, selector: F, comparer: C, dir: Dir) -> OrderedQuery<'a, T>
    where
        K: 'a,
        F: Fn(&T) -> K + Send + Sync + 'a,
        C: Comparer<K> + 'a,
    {
        OrderedQuery::with_keys(self.clone(), vec![key_spec(selector, comparer, dir)])
    }
}
