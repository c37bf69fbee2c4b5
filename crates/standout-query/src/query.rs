//! Restartable query pipelines and their element-wise deferred operators.
//!
//! A [`Query`] only records intent. It owns a factory that builds a fresh
//! [`Cursor`] every time the query is enumerated, so one query can be iterated
//! any number of times, from any number of threads, without the enumerations
//! observing each other.

use std::fmt;
use std::sync::Arc;

use crate::stage::deferred;

/// A single-use pull cursor produced by enumerating a [`Query`].
///
/// Calling `next` is the "advance" step of the pipeline: `Some(value)` hands
/// out the next element, `None` means the enumeration is exhausted.
pub type Cursor<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

type Factory<'a, T> = dyn Fn() -> Cursor<'a, T> + Send + Sync + 'a;

/// An immutable, restartable description of a lazy pipeline.
///
/// Queries are cheap to clone (they share the factory) and every operator
/// returns a new query wrapping the previous one. Nothing runs until a
/// terminal evaluator, or a caller holding a [`Cursor`], pulls.
///
/// # Example
///
/// ```
/// use standout_query::from;
///
/// let query = from(vec![3, 1, 2]).filter(|x| *x > 1);
///
/// assert_eq!(query.to_vec(), vec![3, 2]);
/// assert_eq!(query.order_by(|x| *x).to_vec(), vec![2, 3]);
/// // Re-enumerating starts over from the source.
/// assert_eq!(query.to_vec(), vec![3, 2]);
/// ```
pub struct Query<'a, T> {
    factory: Arc<Factory<'a, T>>,
}

impl<'a, T> Clone for Query<'a, T> {
    fn clone(&self) -> Self {
        Query {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<'a, T> fmt::Debug for Query<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

impl<'a, T: 'a> Query<'a, T> {
    // ========================================================================
    // Construction and extension
    // ========================================================================

    /// Creates a query from a cursor factory.
    ///
    /// The factory is called once per enumeration and must build its state
    /// from scratch each time. Cursors are fused: once one returns `None` it
    /// keeps returning `None`.
    ///
    /// This is the extension point for custom sources and operators.
    ///
    /// ```
    /// use standout_query::Query;
    ///
    /// let squares = Query::new(|| (1..=3).map(|n| n * n));
    /// assert_eq!(squares.to_vec(), vec![1, 4, 9]);
    /// ```
    pub fn new<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'a,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        let factory: Arc<Factory<'a, T>> =
            Arc::new(move || -> Cursor<'a, T> { Box::new(factory().into_iter().fuse()) });
        Query { factory }
    }

    /// Begins a new enumeration.
    pub fn iter(&self) -> Cursor<'a, T> {
        (self.factory)()
    }

    /// Wraps this query in a custom stage.
    ///
    /// `stage` receives the upstream cursor of one enumeration and returns
    /// the cursor for the new stage. Built-in operators are written this way;
    /// third-party operators need nothing more.
    ///
    /// ```
    /// use standout_query::{from, Query};
    ///
    /// fn pairwise_sums<'a>(query: &Query<'a, i32>) -> Query<'a, i32> {
    ///     query.compose(|upstream| {
    ///         let mut previous = None;
    ///         upstream.filter_map(move |x| previous.replace(x).map(|p| p + x))
    ///     })
    /// }
    ///
    /// assert_eq!(pairwise_sums(&from(vec![1, 2, 3, 4])).to_vec(), vec![3, 5, 7]);
    /// ```
    pub fn compose<U, F, I>(&self, stage: F) -> Query<'a, U>
    where
        U: 'a,
        F: Fn(Cursor<'a, T>) -> I + Send + Sync + 'a,
        I: IntoIterator<Item = U>,
        I::IntoIter: 'a,
    {
        let upstream = self.clone();
        Query::new(move || stage(upstream.iter()))
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    /// Keeps the elements that satisfy `predicate`, in source order.
    pub fn filter<P>(&self, predicate: P) -> Query<'a, T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'a,
    {
        let predicate = Arc::new(predicate);
        self.compose(move |upstream| {
            let predicate = Arc::clone(&predicate);
            upstream.filter(move |item| predicate(item))
        })
    }

    /// Like [`filter`](Self::filter), with the element's source position.
    pub fn filter_indexed<P>(&self, predicate: P) -> Query<'a, T>
    where
        P: Fn(usize, &T) -> bool + Send + Sync + 'a,
    {
        let predicate = Arc::new(predicate);
        self.compose(move |upstream| {
            let predicate = Arc::clone(&predicate);
            upstream
                .enumerate()
                .filter(move |(idx, item)| predicate(*idx, item))
                .map(|(_, item)| item)
        })
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Transforms every element.
    pub fn map<U, F>(&self, selector: F) -> Query<'a, U>
    where
        U: 'a,
        F: Fn(T) -> U + Send + Sync + 'a,
    {
        let selector = Arc::new(selector);
        self.compose(move |upstream| {
            let selector = Arc::clone(&selector);
            upstream.map(move |item| selector(item))
        })
    }

    /// Transforms every element, with its source position.
    pub fn map_indexed<U, F>(&self, selector: F) -> Query<'a, U>
    where
        U: 'a,
        F: Fn(usize, T) -> U + Send + Sync + 'a,
    {
        let selector = Arc::new(selector);
        self.compose(move |upstream| {
            let selector = Arc::clone(&selector);
            upstream
                .enumerate()
                .map(move |(idx, item)| selector(idx, item))
        })
    }

    /// Maps every element to a collection and flattens the results.
    pub fn flat_map<U, I, F>(&self, selector: F) -> Query<'a, U>
    where
        U: 'a,
        I: IntoIterator<Item = U> + 'a,
        I::IntoIter: 'a,
        F: Fn(T) -> I + Send + Sync + 'a,
    {
        let selector = Arc::new(selector);
        self.compose(move |upstream| {
            let selector = Arc::clone(&selector);
            upstream.flat_map(move |item| selector(item))
        })
    }

    /// Flattens a per-element collection, pairing each inner value with its
    /// parent through `result`.
    ///
    /// ```
    /// use standout_query::from;
    ///
    /// let owners = from(vec![("ann", vec!["cat", "dog"]), ("bob", vec!["fish"])]);
    /// let pets = owners.flat_map_with(|o| o.1.clone(), |o, pet| format!("{}:{}", o.0, pet));
    /// assert_eq!(pets.to_vec(), vec!["ann:cat", "ann:dog", "bob:fish"]);
    /// ```
    pub fn flat_map_with<U, R, I, F, S>(&self, collection: F, result: S) -> Query<'a, R>
    where
        R: 'a,
        I: IntoIterator<Item = U>,
        I::IntoIter: 'a,
        F: Fn(&T) -> I + Send + Sync + 'a,
        S: Fn(&T, U) -> R + Send + Sync + 'a,
    {
        let collection = Arc::new(collection);
        let result = Arc::new(result);
        self.compose(move |upstream| {
            let collection = Arc::clone(&collection);
            let result = Arc::clone(&result);
            upstream.flat_map(move |item| {
                let values = collection(&item).into_iter();
                let result = Arc::clone(&result);
                values.map(move |value| result(&item, value))
            })
        })
    }

    /// Calls `f` on each element as it flows past, without changing it.
    pub fn inspect<F>(&self, f: F) -> Query<'a, T>
    where
        F: Fn(&T) + Send + Sync + 'a,
    {
        let f = Arc::new(f);
        self.compose(move |upstream| {
            let f = Arc::clone(&f);
            upstream.inspect(move |item| f(item))
        })
    }

    // ========================================================================
    // Windowing
    // ========================================================================

    /// Yields at most the first `count` elements.
    pub fn take(&self, count: usize) -> Query<'a, T> {
        self.compose(move |upstream| upstream.take(count))
    }

    /// Yields elements while `predicate` holds, then stops for good.
    pub fn take_while<P>(&self, predicate: P) -> Query<'a, T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'a,
    {
        let predicate = Arc::new(predicate);
        self.compose(move |upstream| {
            let predicate = Arc::clone(&predicate);
            upstream.take_while(move |item| predicate(item))
        })
    }

    /// Skips the first `count` elements.
    pub fn skip(&self, count: usize) -> Query<'a, T> {
        self.compose(move |upstream| upstream.skip(count))
    }

    /// Skips elements while `predicate` holds, then yields the rest.
    pub fn skip_while<P>(&self, predicate: P) -> Query<'a, T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'a,
    {
        let predicate = Arc::new(predicate);
        self.compose(move |upstream| {
            let predicate = Arc::clone(&predicate);
            upstream.skip_while(move |item| predicate(item))
        })
    }

    // ========================================================================
    // Combining
    // ========================================================================

    /// Yields this query's elements followed by `other`'s.
    pub fn concat(&self, other: &Query<'a, T>) -> Query<'a, T> {
        let other = other.clone();
        self.compose(move |upstream| {
            let other = other.clone();
            upstream.chain(deferred(move || other.iter()))
        })
    }

    /// Yields this query's elements followed by `value`.
    pub fn append(&self, value: T) -> Query<'a, T>
    where
        T: Clone + Send + Sync,
    {
        self.compose(move |upstream| upstream.chain(std::iter::once(value.clone())))
    }

    /// Yields `value` followed by this query's elements.
    pub fn prepend(&self, value: T) -> Query<'a, T>
    where
        T: Clone + Send + Sync,
    {
        self.compose(move |upstream| std::iter::once(value.clone()).chain(upstream))
    }

    /// Pairs elements positionally, stopping at the shorter side.
    pub fn zip<U: 'a>(&self, other: &Query<'a, U>) -> Query<'a, (T, U)> {
        self.zip_with(other, |left, right| (left, right))
    }

    /// Combines elements positionally with `result`, stopping at the shorter
    /// side.
    pub fn zip_with<U, R, F>(&self, other: &Query<'a, U>, result: F) -> Query<'a, R>
    where
        U: 'a,
        R: 'a,
        F: Fn(T, U) -> R + Send + Sync + 'a,
    {
        let other = other.clone();
        let result = Arc::new(result);
        self.compose(move |upstream| {
            let result = Arc::clone(&result);
            upstream
                .zip(other.iter())
                .map(move |(left, right)| result(left, right))
        })
    }

    /// Yields `value` once if the upstream turns out to be empty.
    pub fn default_if_empty(&self, value: T) -> Query<'a, T>
    where
        T: Clone + Send + Sync,
    {
        self.compose(move |upstream| {
            let fallback = value.clone();
            deferred(move || {
                let mut upstream = upstream.peekable();
                let fallback = upstream.peek().is_none().then_some(fallback);
                upstream.chain(fallback)
            })
        })
    }

    /// Yields the elements in reverse order.
    ///
    /// The whole upstream is buffered on the first pull.
    pub fn reverse(&self) -> Query<'a, T> {
        self.compose(|upstream| {
            deferred(move || {
                let buffer: Vec<T> = upstream.collect();
                tracing::trace!(rows = buffer.len(), "buffered input for reverse");
                buffer.into_iter().rev()
            })
        })
    }
}

impl<'q, 'a, T: 'a> IntoIterator for &'q Query<'a, T> {
    type Item = T;
    type IntoIter = Cursor<'a, T>;

    fn into_iter(self) -> Cursor<'a, T> {
        self.iter()
    }
}

impl<'a, T: 'a> IntoIterator for Query<'a, T> {
    type Item = T;
    type IntoIter = Cursor<'a, T>;

    fn into_iter(self) -> Cursor<'a, T> {
        self.iter()
    }
}
