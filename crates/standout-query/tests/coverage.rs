//! Operator-by-operator coverage through the public API.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use standout_query::{
    deferred, from, ByKey, Dir, EqualityComparer, Group, IgnoreAsciiCase, NaturalOrder, Number,
    Query, QueryError,
};

#[derive(Debug, Clone, PartialEq)]
struct Employee {
    name: &'static str,
    dept: &'static str,
    salary: u32,
}

fn staff() -> Vec<Employee> {
    vec![
        Employee { name: "ann", dept: "eng", salary: 120 },
        Employee { name: "bob", dept: "ops", salary: 90 },
        Employee { name: "cid", dept: "eng", salary: 100 },
        Employee { name: "dee", dept: "sales", salary: 90 },
        Employee { name: "eve", dept: "ops", salary: 110 },
    ]
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_filter_then_order() {
    let query = from(vec![3, 1, 2]).filter(|x| *x > 1);
    assert_eq!(query.to_vec(), vec![3, 2]);
    assert_eq!(query.order_by(|x| *x).to_vec(), vec![2, 3]);
}

#[test]
fn scenario_group_by_key() {
    let rows = from(vec![("a", 1), ("b", 2), ("a", 3)]);
    let groups = rows.group_by_map(|r| r.0, |r| r.1).to_vec();

    assert_eq!(
        groups,
        vec![
            Group { key: "a", values: vec![1, 3] },
            Group { key: "b", values: vec![2] },
        ]
    );
}

#[test]
fn scenario_duplicate_map_key() {
    let pairs = from(vec![(1, "x"), (1, "y")]);
    let err = pairs.to_map(|p| p.0, |p| p.1).unwrap_err();
    assert_eq!(err, QueryError::DuplicateKey { position: 1 });
}

#[test]
fn scenario_first_on_empty() {
    let empty = Query::<i32>::empty();
    assert!(matches!(empty.first(), Err(QueryError::NotFound { .. })));
    assert_eq!(empty.first_or(42), 42);
}

// ============================================================================
// Laziness and restartability
// ============================================================================

#[test]
fn nothing_runs_until_a_terminal_pulls() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pulls);
    let employees = from(staff()).inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let pipeline = employees
        .filter(|e| e.salary > 95)
        .order_by(|e| e.name)
        .map(|e| e.name)
        .distinct()
        .reverse();
    let grouped = employees.group_by(|e| e.dept);
    let joined = employees.join(&employees, |e| e.dept, |e| e.dept, |a, b| (a.name, b.name));
    assert_eq!(pulls.load(Ordering::SeqCst), 0);

    assert_eq!(pipeline.to_vec(), vec!["eve", "cid", "ann"]);
    assert_eq!(pulls.load(Ordering::SeqCst), 5);

    assert_eq!(grouped.count(), 3);
    assert_eq!(joined.count(), 4 + 4 + 1);
}

#[test]
fn every_enumeration_starts_over() {
    let query = from(staff())
        .order_by_desc(|e| e.salary)
        .then_by(|e| e.name)
        .map(|e| e.name);

    let first = query.to_vec();
    assert_eq!(first, vec!["ann", "eve", "cid", "bob", "dee"]);
    assert_eq!(query.to_vec(), first);
    assert_eq!(query.iter().collect::<Vec<_>>(), first);
}

#[test]
fn interleaved_cursors_do_not_share_state() {
    let query = from(vec![1, 2, 2, 3]).distinct().skip(1);
    let mut a = query.iter();
    let mut b = query.iter();

    assert_eq!(a.next(), Some(2));
    assert_eq!(b.next(), Some(2));
    assert_eq!(a.next(), Some(3));
    assert_eq!(a.next(), None);
    assert_eq!(b.next(), Some(3));
}

type PullLog = Arc<Mutex<Vec<String>>>;

fn logged(values: Vec<i32>, side: &'static str, log: &PullLog) -> Query<'static, i32> {
    let log = Arc::clone(log);
    from(values).inspect(move |v| log.lock().push(format!("{side}{v}")))
}

#[test]
fn intersect_and_except_drain_the_right_side_first() {
    let log: PullLog = Arc::default();
    let left = logged(vec![1, 2, 3], "a", &log);
    let right = logged(vec![2, 3], "b", &log);

    let except = left.except(&right);
    let intersect = left.intersect(&right);
    assert!(log.lock().is_empty());

    let mut cursor = except.iter();
    assert!(log.lock().is_empty());
    assert_eq!(cursor.next(), Some(1));
    assert_eq!(*log.lock(), vec!["b2", "b3", "a1"]);
    assert_eq!(cursor.next(), None);
    assert_eq!(*log.lock(), vec!["b2", "b3", "a1", "a2", "a3"]);

    log.lock().clear();
    let mut cursor = intersect.iter();
    assert!(log.lock().is_empty());
    assert_eq!(cursor.next(), Some(2));
    assert_eq!(*log.lock(), vec!["b2", "b3", "a1", "a2"]);
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn borrowed_and_owned_sources() {
    let names = vec!["x".to_string(), "yy".to_string()];
    assert_eq!(from(&names).map(|s| s.len()).sum(), 3);
    assert_eq!(from(names.as_slice()).count(), 2);
    assert_eq!(from(names).map(|s| s.len()).to_vec(), vec![1, 2]);

    let counts: HashMap<&str, i32> = HashMap::from([("a", 1), ("b", 2)]);
    assert_eq!(from(&counts).map(|(_, v)| *v).sum(), 3);
}

#[test]
fn sources_can_be_optional() {
    let missing: Option<Vec<u8>> = None;
    assert_eq!(from(missing).count(), 0);
}

#[test]
fn type_erased_sources() {
    let query = Query::<u32>::from_any(Box::new(vec![1u32, 2])).unwrap();
    assert_eq!(query.sum(), 3);

    let err = Query::<u32>::from_any(Box::new(3.5f64)).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedSource { .. }));
    assert!(err.to_string().contains("u32"));
}

#[test]
fn generated_sources() {
    assert_eq!(Query::range(-1, 3).to_vec(), vec![-1, 0, 1]);
    assert_eq!(Query::repeat('z', 2).to_vec(), vec!['z', 'z']);

    let naturals = Query::from_iter_cloned(1u64..);
    assert_eq!(naturals.skip(5).take(2).to_vec(), vec![6, 7]);
    assert_eq!(naturals.first_where(|n| n * n > 50), Ok(8));
}

// ============================================================================
// Projection and windowing
// ============================================================================

#[test]
fn projections() {
    let query = from(staff());
    assert_eq!(
        query.map_indexed(|idx, e| format!("{idx}:{}", e.name)).take(2).to_vec(),
        vec!["0:ann", "1:bob"]
    );
    assert_eq!(
        query.filter_indexed(|idx, _| idx >= 3).map(|e| e.name).to_vec(),
        vec!["dee", "eve"]
    );
    assert_eq!(
        from(vec!["ab", "c"]).flat_map(|s| s.chars()).to_vec(),
        vec!['a', 'b', 'c']
    );
}

#[test]
fn windowing_composes() {
    let query = Query::range(1, 10);
    assert_eq!(
        query.skip_while(|n| *n < 3).take_while(|n| *n < 7).skip(1).take(2).to_vec(),
        vec![4, 5]
    );
}

#[test]
fn zip_stops_at_shorter_side() {
    let names = from(vec!["a", "b", "c"]);
    let scores = from(vec![10, 20]);
    assert_eq!(names.zip(&scores).to_vec(), vec![("a", 10), ("b", 20)]);
}

// ============================================================================
// Set operations
// ============================================================================

#[test]
fn set_operations() {
    let a = from(vec![1, 2, 3, 3]);
    let b = from(vec![3, 4, 4]);

    assert_eq!(a.union(&b).to_vec(), vec![1, 2, 3, 4]);
    assert_eq!(a.intersect(&b).to_vec(), vec![3]);
    assert_eq!(a.except(&b).to_vec(), vec![1, 2]);
    assert_eq!(a.concat(&b).distinct().to_vec(), vec![1, 2, 3, 4]);
}

#[test]
fn set_operations_under_custom_equality() {
    let depts = from(staff()).map(|e| e.dept.to_uppercase());
    let wanted = from(vec!["eng".to_string(), "hr".to_string()]);

    assert_eq!(
        depts.intersect_with(&wanted, IgnoreAsciiCase).to_vec(),
        vec!["ENG"]
    );
    assert_eq!(depts.distinct_with(IgnoreAsciiCase).count(), 3);
}

#[test]
fn by_key_equality_is_usable_directly() {
    let by_dept: ByKey<_, &str> = ByKey::new(|e: &Employee| e.dept);
    let all = staff();
    assert!(by_dept.equals(&all[0], &all[2]));
    assert!(!by_dept.equals(&all[0], &all[1]));

    let first_per_dept = from(all).distinct_with(by_dept).map(|e| e.name);
    assert_eq!(first_per_dept.to_vec(), vec!["ann", "bob", "dee"]);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn multi_key_ordering() {
    let sorted = from(staff())
        .order_by(|e| e.dept)
        .then_by_desc(|e| e.salary)
        .map(|e| e.name);
    assert_eq!(sorted.to_vec(), vec!["ann", "cid", "eve", "bob", "dee"]);
}

#[test]
fn ordering_with_direction_and_comparer() {
    let by_length = |a: &&str, b: &&str| a.len().cmp(&b.len());
    let words = from(vec!["ccc", "a", "bb", "dd"]);

    let sorted = words
        .order_by_dir(|w| *w, by_length, Dir::Desc)
        .then_by_with(|w| *w, NaturalOrder);
    assert_eq!(sorted.to_vec(), vec!["ccc", "bb", "dd", "a"]);
    assert_eq!(sorted.key_count(), 2);

    let top = sorted.into_query().take(1);
    assert_eq!(top.single(), Ok("ccc"));
}

// ============================================================================
// Grouping and joins
// ============================================================================

#[test]
fn group_by_then_aggregate() {
    let payroll = from(staff())
        .group_by(|e| e.dept)
        .map(|g| (g.key, g.values.iter().map(|e| e.salary).sum::<u32>()));
    assert_eq!(
        payroll.to_vec(),
        vec![("eng", 220), ("ops", 200), ("sales", 90)]
    );
}

#[test]
fn joins() {
    let depts = from(vec![("eng", "Engineering"), ("ops", "Operations"), ("hr", "People")]);
    let employees = from(staff());

    let named = employees.join(&depts, |e| e.dept, |d| d.0, |e, d| (e.name, d.1));
    assert_eq!(
        named.to_vec(),
        vec![
            ("ann", "Engineering"),
            ("bob", "Operations"),
            ("cid", "Engineering"),
            ("eve", "Operations"),
        ]
    );

    let headcount = depts.group_join(&employees, |d| d.0, |e| e.dept, |d, es| (d.0, es.len()));
    assert_eq!(headcount.to_vec(), vec![("eng", 2), ("ops", 2), ("hr", 0)]);
}

#[test]
fn lookup_terminal() {
    let lookup = from(staff()).to_lookup(|e| e.salary, |e| e.name);
    assert_eq!(lookup.get(&90), &["bob", "dee"]);
    assert_eq!(lookup.len(), 4);

    let groups = lookup.into_groups();
    assert_eq!(groups[0].key, 120);
}

// ============================================================================
// Terminals
// ============================================================================

#[test]
fn aggregates() {
    let salaries = from(staff()).map(|e| e.salary);
    assert_eq!(salaries.sum(), 510);
    assert_eq!(salaries.min(), Ok(90));
    assert_eq!(salaries.max(), Ok(120));
    assert_eq!(salaries.average(), Ok(102.0));
    assert_eq!(salaries.fold(0u64, |acc, s| acc + u64::from(s)), 510);
    assert_eq!(salaries.reduce(|a, b| a.max(b)), Ok(120));

    let staff = from(staff());
    assert_eq!(staff.min_by_key(|e| e.salary).map(|e| e.name), Ok("bob"));
    assert_eq!(staff.max_by_key(|e| e.salary).map(|e| e.name), Ok("ann"));

    let floats = from(vec![1.5f64, 2.5]);
    assert_eq!(floats.average(), Ok(2.0));
    assert_eq!(Number::from(3u8).to_f64(), 3.0);
}

#[test]
fn empty_aggregates() {
    let empty = Query::<u32>::empty();
    assert_eq!(empty.sum(), 0);
    assert_eq!(empty.count(), 0);
    assert!(matches!(empty.min(), Err(QueryError::EmptySequence { .. })));
    assert!(matches!(empty.average(), Err(QueryError::EmptySequence { .. })));
    assert!(matches!(empty.reduce(|a, _| a), Err(QueryError::EmptySequence { .. })));
}

#[test]
fn element_access() {
    let names = from(staff()).map(|e| e.name);
    assert_eq!(names.last(), Ok("eve"));
    assert_eq!(names.element_at(1), Ok("bob"));
    assert_eq!(
        names.element_at(7),
        Err(QueryError::IndexOutOfRange { index: 7, len: 5 })
    );
    assert_eq!(names.single_where(|n| n.starts_with('c')), Ok("cid"));
    assert_eq!(names.single_or("none"), Err(QueryError::MoreThanOne { op: "single_or" }));
    assert_eq!(names.filter(|n| n.len() > 3).single_or("none"), Ok("none"));
    assert_eq!(names.last_where(|n| n.contains('e')), Ok("eve"));
}

#[test]
fn collecting() {
    let query = from(staff());

    let mut names = BTreeSet::new();
    query.map(|e| e.name).collect_into(&mut names);
    assert_eq!(names.len(), 5);

    let by_name = query.to_map(|e| e.name, |e| e.salary).unwrap();
    assert_eq!(by_name["cid"], 100);

    let by_dept = query.to_map_with(|e| e.dept, |e| e.salary, |a, b| a + b);
    assert_eq!(by_dept["ops"], 200);

    assert!(query.any_where(|e| e.dept == "sales"));
    assert!(query.all(|e| e.salary >= 90));
    assert_eq!(query.count_where(|e| e.dept == "eng"), 2);
    assert!(query.contains(&staff()[4]));
    assert!(query.map(|e| e.dept).contains_with(&"OPS", &IgnoreAsciiCase));
    assert!(query.sequence_equal(&from(staff())));
}

// ============================================================================
// Extension
// ============================================================================

fn running_total<'a>(query: &Query<'a, u32>) -> Query<'a, u32> {
    query.compose(|upstream| {
        let mut total = 0;
        upstream.map(move |x| {
            total += x;
            total
        })
    })
}

fn median<'a>(query: &Query<'a, u32>) -> Query<'a, u32> {
    query.compose(|upstream| {
        deferred(move || {
            let mut items: Vec<u32> = upstream.collect();
            items.sort_unstable();
            let mid = items.len() / 2;
            items.into_iter().skip(mid).take(1)
        })
    })
}

#[test]
fn custom_operators_compose_with_builtins() {
    let salaries = from(staff()).map(|e| e.salary);
    assert_eq!(running_total(&salaries).last(), Ok(510));
    assert_eq!(median(&salaries).single(), Ok(100));
    assert_eq!(median(&salaries.take(0)).to_vec(), Vec::<u32>::new());
}

#[test]
fn extension_through_query_new() {
    let fib = Query::new(|| {
        let mut state = (0u64, 1u64);
        std::iter::from_fn(move || {
            let next = state.0;
            state = (state.1, state.0 + state.1);
            Some(next)
        })
    });
    assert_eq!(fib.take(7).to_vec(), vec![0, 1, 1, 2, 3, 5, 8]);
    assert_eq!(fib.element_at(10), Ok(55));
}
