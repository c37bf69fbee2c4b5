//! Query - Lazy, restartable query pipelines over in-memory sequences.
//!
//! A [`Query`] describes a chain of operations over a sequence of values:
//! filtering, projection, set operations, multi-key ordering, grouping, joins
//! and aggregation. Building a query touches nothing. Work happens only when
//! a terminal evaluator (or a caller holding a [`Cursor`]) pulls, and each
//! enumeration starts over from the source with its own private state.
//!
//! # Quick Start
//!
//! ```rust
//! use standout_query::from;
//!
//! #[derive(Clone)]
//! struct Task {
//!     name: &'static str,
//!     owner: &'static str,
//!     priority: i32,
//! }
//!
//! let tasks = vec![
//!     Task { name: "Write docs", owner: "ann", priority: 3 },
//!     Task { name: "Fix bug", owner: "bob", priority: 5 },
//!     Task { name: "Old task", owner: "ann", priority: 1 },
//! ];
//!
//! let urgent = from(tasks)
//!     .filter(|t| t.priority >= 3)
//!     .order_by_desc(|t| t.priority)
//!     .map(|t| t.name);
//!
//! assert_eq!(urgent.to_vec(), vec!["Fix bug", "Write docs"]);
//! assert_eq!(urgent.first(), Ok("Fix bug"));
//! ```
//!
//! # Evaluation Model
//!
//! ```text
//! source ──> stage ──> stage ──> ... ──> terminal
//!            (lazy)    (lazy)            (pulls)
//! ```
//!
//! - **Deferred stages** (`filter`, `map`, `take`, `concat`, `distinct`, ...)
//!   return a new query and enumerate nothing.
//! - **Eager stages** (`order_by`, `group_by`, `join`, `reverse`,
//!   `intersect`, `except`) buffer what they need on the first pull of each
//!   enumeration, never at construction.
//! - **Terminals** (`to_vec`, `count`, `first`, `sum`, `to_map`, ...) open a
//!   fresh cursor and stop pulling as soon as the answer is known.
//!
//! # Ordering
//!
//! ```rust
//! use standout_query::from;
//!
//! let people = from(vec![("ann", 31), ("bob", 25), ("cid", 31)]);
//! let sorted = people.order_by_desc(|p| p.1).then_by(|p| p.0);
//!
//! assert_eq!(sorted.to_vec(), vec![("ann", 31), ("cid", 31), ("bob", 25)]);
//! ```
//!
//! Sorting is stable: elements with equal keys keep their source order.
//!
//! # Grouping and Joins
//!
//! ```rust
//! use standout_query::from;
//!
//! let rows = from(vec![("a", 1), ("b", 2), ("a", 3)]);
//! let groups = rows.group_by_map(|r| r.0, |r| r.1).to_vec();
//!
//! assert_eq!(groups[0].key, "a");
//! assert_eq!(groups[0].values, vec![1, 3]);
//! assert_eq!(groups[1].values, vec![2]);
//! ```
//!
//! Keys are hashed and compared through an [`EqualityComparer`]. The default
//! is [`DefaultEquality`]; [`ByKey`] and [`IgnoreAsciiCase`] cover the common
//! custom cases.
//!
//! # Errors
//!
//! Deferred stages never fail. Terminals that can have no answer return
//! [`Result`] with a [`QueryError`].
//!
//! # Custom Operators
//!
//! [`Query::compose`] wraps the upstream cursor of each enumeration, and
//! [`deferred`] postpones buffering work to the first pull:
//!
//! ```rust
//! use standout_query::{deferred, from, Query};
//!
//! fn rotate_left<'a>(query: &Query<'a, i32>) -> Query<'a, i32> {
//!     query.compose(|upstream| {
//!         deferred(move || {
//!             let mut items: Vec<i32> = upstream.collect();
//!             if !items.is_empty() {
//!                 items.rotate_left(1);
//!             }
//!             items.into_iter()
//!         })
//!     })
//! }
//!
//! assert_eq!(rotate_left(&from(vec![1, 2, 3])).to_vec(), vec![2, 3, 1]);
//! ```

mod compare;
mod error;
mod group;
mod ordering;
mod query;
mod set;
mod source;
mod stage;
mod terminal;
mod value;

pub use compare::{ByKey, Comparer, DefaultEquality, EqualityComparer, IgnoreAsciiCase, NaturalOrder};
pub use error::{QueryError, Result};
pub use group::{Group, Lookup};
pub use ordering::{Dir, OrderedQuery};
pub use query::{Cursor, Query};
pub use source::{from, IntoQuery};
pub use stage::{deferred, Deferred};
pub use value::Number;
