//! Exact dispatch order and payloads of list mutations.
//!
//! The cases share one list and run in sequence, mirroring how the protocol
//! is exercised by real bindings: each mutation starts from the state the
//! previous one left behind.

use std::cell::RefCell;
use std::rc::Rc;

use fbind_core::{List, Value};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    LengthFrom(Value),
    LengthTo(Value),
    BeforeContent { index: usize, add: Vec<Value>, remove: Vec<Value> },
    Content { index: usize, add: Vec<Value>, remove: Vec<Value> },
    Was(usize, Value),
    Now(usize, Value),
}

use Event::*;

type Log = Rc<RefCell<Vec<Event>>>;

fn n(v: i32) -> Value {
    Value::from(v)
}

fn ns(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::from).collect()
}

fn before(index: usize, add: Vec<Value>, remove: Vec<Value>) -> Event {
    BeforeContent { index, add, remove }
}

fn after(index: usize, add: Vec<Value>, remove: Vec<Value>) -> Event {
    Content { index, add, remove }
}

fn spy(list: &List) -> Log {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    list.add_before_length_change_listener(move |len| l.borrow_mut().push(LengthFrom(len.clone())));
    let l = Rc::clone(&log);
    list.add_length_change_listener(move |len| l.borrow_mut().push(LengthTo(len.clone())));
    let l = Rc::clone(&log);
    list.add_before_content_change_listener(move |plus, minus, index| {
        l.borrow_mut().push(before(index, plus.to_vec(), minus.to_vec()));
    });
    let l = Rc::clone(&log);
    list.add_content_change_listener(move |plus, minus, index| {
        l.borrow_mut().push(after(index, plus.to_vec(), minus.to_vec()));
    });
    let l = Rc::clone(&log);
    list.add_before_each_content_change_listener(move |value, index| {
        l.borrow_mut().push(Was(index, value.clone()));
    });
    let l = Rc::clone(&log);
    list.add_each_content_change_listener(move |value, index| {
        l.borrow_mut().push(Now(index, value.clone()));
    });
    log
}

fn take(log: &Log) -> Vec<Event> {
    std::mem::take(&mut *log.borrow_mut())
}

const U: Value = Value::Undefined;

#[test]
fn mutation_sequence_reports_exact_events() {
    let array = List::from(ns(&[1, 2, 3]));
    let log = spy(&array);

    // wipe initial values
    array.wipe();
    assert!(array.is_empty());
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(3)),
            before(0, vec![], ns(&[1, 2, 3])),
            Was(0, n(1)),
            Was(1, n(2)),
            Was(2, n(3)),
            Now(0, U),
            Now(1, U),
            Now(2, U),
            after(0, vec![], ns(&[1, 2, 3])),
            LengthTo(n(0)),
        ]
    );

    // push two values on empty array
    array.push(ns(&[10, 20]));
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(0)),
            before(0, ns(&[10, 20]), vec![]),
            Was(0, U),
            Was(1, U),
            Now(0, n(10)),
            Now(1, n(20)),
            after(0, ns(&[10, 20]), vec![]),
            LengthTo(n(2)),
        ]
    );

    // pop one value
    assert_eq!(array.pop(), Some(n(20)));
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(2)),
            before(1, vec![], ns(&[20])),
            Was(1, n(20)),
            Now(1, U),
            after(1, vec![], ns(&[20])),
            LengthTo(n(1)),
        ]
    );

    // push two values on top of the existing one
    array.push(ns(&[40, 50]));
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(1)),
            before(1, ns(&[40, 50]), vec![]),
            Was(1, U),
            Was(2, U),
            Now(1, n(40)),
            Now(2, n(50)),
            after(1, ns(&[40, 50]), vec![]),
            LengthTo(n(3)),
        ]
    );

    // splice two values into the middle
    assert!(array.splice(1, 0, ns(&[20, 30])).is_empty());
    assert_eq!(array.to_vec(), ns(&[10, 20, 30, 40, 50]));
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(3)),
            before(1, ns(&[20, 30]), vec![]),
            Was(1, n(40)),
            Was(2, n(50)),
            Was(3, U),
            Was(4, U),
            Now(1, n(20)),
            Now(2, n(30)),
            Now(3, n(40)),
            Now(4, n(50)),
            after(1, ns(&[20, 30]), vec![]),
            LengthTo(n(5)),
        ]
    );

    // push one value to the end
    array.push([n(60)]);
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(5)),
            before(5, ns(&[60]), vec![]),
            Was(5, U),
            Now(5, n(60)),
            after(5, ns(&[60]), vec![]),
            LengthTo(n(6)),
        ]
    );

    // splice in place: no length events
    let a = Value::from("A");
    let b = Value::from("B");
    assert_eq!(array.splice(2, 2, [a.clone(), b.clone()]), ns(&[30, 40]));
    assert_eq!(
        take(&log),
        vec![
            before(2, vec![a.clone(), b.clone()], ns(&[30, 40])),
            Was(2, n(30)),
            Was(3, n(40)),
            Now(2, a.clone()),
            Now(3, b.clone()),
            after(2, vec![a, b], ns(&[30, 40])),
        ]
    );
}

#[test]
fn shift_and_set_report_exact_events() {
    let array = List::from(ns(&[10, 20, 30]));
    let log = spy(&array);

    assert_eq!(array.shift(), Some(n(10)));
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(3)),
            before(0, vec![], ns(&[10])),
            Was(0, n(10)),
            Was(1, n(20)),
            Was(2, n(30)),
            Now(0, n(20)),
            Now(1, n(30)),
            Now(2, U),
            after(0, vec![], ns(&[10])),
            LengthTo(n(2)),
        ]
    );

    // set new value at end
    array.set(2, n(40));
    assert_eq!(array.to_vec(), ns(&[20, 30, 40]));
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(2)),
            before(2, ns(&[40]), vec![]),
            Was(2, U),
            Now(2, n(40)),
            after(2, ns(&[40]), vec![]),
            LengthTo(n(3)),
        ]
    );

    // set new value at beginning
    array.set(0, n(10));
    assert_eq!(array.to_vec(), ns(&[10, 30, 40]));
    assert_eq!(
        take(&log),
        vec![
            before(0, ns(&[10]), ns(&[20])),
            Was(0, n(20)),
            Now(0, n(10)),
            after(0, ns(&[10]), ns(&[20])),
        ]
    );
}

#[test]
fn unshift_reverse_and_sort_report_final_values() {
    let array = List::new();
    let log = spy(&array);

    array.unshift([n(30)]);
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(0)),
            before(0, ns(&[30]), vec![]),
            Was(0, U),
            Now(0, n(30)),
            after(0, ns(&[30]), vec![]),
            LengthTo(n(1)),
        ]
    );

    array.unshift(ns(&[10, 20]));
    assert_eq!(array.to_vec(), ns(&[10, 20, 30]));
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(1)),
            before(0, ns(&[10, 20]), vec![]),
            Was(0, n(30)),
            Was(1, U),
            Was(2, U),
            Now(0, n(10)),
            Now(1, n(20)),
            Now(2, n(30)),
            after(0, ns(&[10, 20]), vec![]),
            LengthTo(n(3)),
        ]
    );

    array.reverse();
    assert_eq!(array.to_vec(), ns(&[30, 20, 10]));
    assert_eq!(
        take(&log),
        vec![
            before(0, ns(&[10, 20, 30]), ns(&[10, 20, 30])),
            Was(0, n(10)),
            Was(1, n(20)),
            Was(2, n(30)),
            Now(0, n(30)),
            Now(1, n(20)),
            Now(2, n(10)),
            after(0, ns(&[30, 20, 10]), ns(&[30, 20, 10])),
        ]
    );

    array.sort();
    assert_eq!(array.to_vec(), ns(&[10, 20, 30]));
    assert_eq!(
        take(&log),
        vec![
            before(0, ns(&[30, 20, 10]), ns(&[30, 20, 10])),
            Was(0, n(30)),
            Was(1, n(20)),
            Was(2, n(10)),
            Now(0, n(10)),
            Now(1, n(20)),
            Now(2, n(30)),
            after(0, ns(&[10, 20, 30]), ns(&[10, 20, 30])),
        ]
    );

    array.wipe();
    assert_eq!(
        take(&log),
        vec![
            LengthFrom(n(3)),
            before(0, vec![], ns(&[10, 20, 30])),
            Was(0, n(10)),
            Was(1, n(20)),
            Was(2, n(30)),
            Now(0, U),
            Now(1, U),
            Now(2, U),
            after(0, vec![], ns(&[10, 20, 30])),
            LengthTo(n(0)),
        ]
    );
}

fn forward(from: &List, to: &List) {
    let weak_to = to.downgrade();
    from.add_content_change_listener(move |plus, minus, index| {
        let Some(to) = weak_to.upgrade() else { return };
        // a change that originated in `to` must not be sent back
        if to.content_change_descriptor().is_active {
            return;
        }
        to.splice(index, minus.len(), plus.to_vec());
    });
}

#[test]
fn cyclic_content_listeners_converge() {
    let foo = List::new();
    let bar = List::new();
    forward(&foo, &bar);
    forward(&bar, &foo);

    foo.push(ns(&[10, 20, 30]));
    assert_eq!(bar.to_vec(), ns(&[10, 20, 30]));
    assert_eq!(foo.to_vec(), ns(&[10, 20, 30]));

    bar.pop();
    assert_eq!(foo.to_vec(), ns(&[10, 20]));
}

#[test]
fn length_is_observable_without_content_listeners() {
    let array = List::from(ns(&[1, 2, 3]));
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    array.add_length_change_listener(move |len| *sink.borrow_mut() = Some(len.clone()));
    array.push([n(4)]);
    assert_eq!(*seen.borrow(), Some(n(4)));
}

#[derive(Debug, Clone)]
enum Op {
    Splice(usize, usize, Vec<i32>),
    Reverse,
    Sort,
    Set(usize, i32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..12, 0usize..5, prop::collection::vec(-50i32..50, 0..5))
            .prop_map(|(i, r, p)| Op::Splice(i, r, p)),
        1 => Just(Op::Reverse),
        1 => Just(Op::Sort),
        2 => (0usize..12, -50i32..50).prop_map(|(i, v)| Op::Set(i, v)),
    ]
}

proptest! {
    #[test]
    fn replaying_content_events_reproduces_the_list(ops in prop::collection::vec(op(), 1..40)) {
        let list = List::new();
        let replica = Rc::new(RefCell::new(Vec::<Value>::new()));
        let sink = Rc::clone(&replica);
        list.add_content_change_listener(move |plus, minus, index| {
            let mut replica = sink.borrow_mut();
            replica.splice(index..index + minus.len(), plus.iter().cloned());
        });
        for op in ops {
            match op {
                Op::Splice(i, r, p) => { list.splice(i, r, ns(&p)); }
                Op::Reverse => list.reverse(),
                Op::Sort => list.sort(),
                Op::Set(i, v) => list.set(i, n(v)),
            }
            prop_assert_eq!(&*replica.borrow(), &list.to_vec());
        }
    }
}
