//! Building blocks for stages that postpone work until the first pull.

/// An iterator that runs `init` on its first `next` call and then yields from
/// the iterator it produced.
///
/// Eager stages (sorting, grouping, reversing, hash lookups) wrap their
/// materializing step in a `Deferred` so that opening a cursor stays free and
/// the buffer belongs to exactly one enumeration.
pub struct Deferred<I, F> {
    init: Option<F>,
    iter: Option<I>,
}

impl<I, F> Iterator for Deferred<I, F>
where
    I: Iterator,
    F: FnOnce() -> I,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if let Some(init) = self.init.take() {
            self.iter = Some(init());
        }
        self.iter.as_mut()?.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.iter {
            Some(iter) => iter.size_hint(),
            None => (0, None),
        }
    }
}

/// Creates a [`Deferred`] iterator.
///
/// ```
/// use standout_query::deferred;
///
/// let mut iter = deferred(|| vec![3, 1, 2].into_iter().rev());
/// assert_eq!(iter.next(), Some(2));
/// ```
pub fn deferred<I, F>(init: F) -> Deferred<I, F>
where
    I: Iterator,
    F: FnOnce() -> I,
{
    Deferred {
        init: Some(init),
        iter: None,
    }
}
