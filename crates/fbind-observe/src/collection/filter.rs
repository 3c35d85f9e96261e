#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fbind_core::{List, Value};

use super::relation::Relations;
use super::{ContentHandler, list_observer, watch_content};
use crate::observer::{Cancel, Emit, Observer, Scope, distinct};

/// Kept flags per input with prefix counts in `O(log n)` (a Fenwick tree).
#[derive(Default)]
struct KeptCounts {
    flags: Vec<bool>,
    tree: Vec<usize>,
}

impl KeptCounts {
    fn replace(&mut self, index: usize, removed: usize, plus: &[Value]) {
        let end = index.saturating_add(removed).min(self.flags.len());
        self.flags.splice(index.min(end)..end, plus.iter().map(Value::truthy));
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let n = self.flags.len();
        self.tree.clear();
        self.tree.resize(n + 1, 0);
        for i in 1..=n {
            self.tree[i] += usize::from(self.flags[i - 1]);
            let parent = i + (i & i.wrapping_neg());
            if parent <= n {
                self.tree[parent] += self.tree[i];
            }
        }
    }

    /// Number of kept inputs in `0..end`.
    fn prefix(&self, end: usize) -> usize {
        let mut i = end.min(self.flags.len());
        let mut sum = 0;
        while i > 0 {
            sum += self.tree[i];
            i &= i - 1;
        }
        sum
    }

    /// Set the flag at `index`; returns whether it changed.
    fn set(&mut self, index: usize, kept: bool) -> bool {
        match self.flags.get_mut(index) {
            Some(flag) if *flag != kept => *flag = kept,
            _ => return false,
        }
        let n = self.flags.len();
        let mut i = index + 1;
        while i <= n {
            if kept {
                self.tree[i] += 1;
            } else {
                self.tree[i] -= 1;
            }
            i += i & i.wrapping_neg();
        }
        true
    }
}

struct FilterBlock {
    output: List,
    relations: Relations,
    kept: RefCell<KeptCounts>,
}

impl FilterBlock {
    fn new(output: &List, predicate: &Observer, scope: &Scope) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this = this.clone();
            Self {
                output: output.clone(),
                relations: Relations::new(
                    Rc::clone(predicate),
                    scope,
                    Rc::new(move |index: usize, old: &Value, new: &Value| {
                        if let Some(this) = this.upgrade() {
                            this.flip(index, old.truthy(), new.truthy());
                        }
                    }),
                ),
                kept: RefCell::default(),
            }
        })
    }

    fn flip(&self, index: usize, was: bool, is: bool) {
        if was == is {
            return;
        }
        let at = {
            let mut kept = self.kept.borrow_mut();
            if !kept.set(index, is) {
                return;
            }
            kept.prefix(index)
        };
        if is {
            self.output.splice(at, 0, [self.relations.input(index)]);
        } else {
            self.output.splice(at, 1, []);
        }
    }
}

impl ContentHandler for FilterBlock {
    fn reset(&self, items: &[Value]) {
        let flags = self.relations.reset(items);
        self.kept.borrow_mut().replace(0, usize::MAX, &flags);
        let kept: Vec<Value> = items
            .iter()
            .zip(&flags)
            .filter(|(_, flag)| flag.truthy())
            .map(|(item, _)| item.clone())
            .collect();
        super::reconcile(&self.output, &kept);
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        let (at, dropped) = {
            let kept = self.kept.borrow();
            let at = kept.prefix(index);
            (at, kept.prefix(index + removed) - at)
        };
        let flags = self.relations.splice(index, removed, plus);
        self.kept.borrow_mut().replace(index, removed, &flags);
        let kept: Vec<Value> = plus
            .iter()
            .zip(&flags)
            .filter(|(_, flag)| flag.truthy())
            .map(|(item, _)| item.clone())
            .collect();
        self.output.splice(at, dropped, kept);
    }
}

/// `collection.filter{predicate}`: inputs whose predicate is truthy, in order.
pub fn filter(collection: Observer, predicate: Observer) -> Observer {
    list_observer(collection, move |output, scope| {
        FilterBlock::new(output, &predicate, scope)
    })
}

/// Emits whether the predicate holds for all or for any element.
struct Quantifier {
    relations: Relations,
    emit: Emit,
    all: bool,
}

impl Quantifier {
    fn publish(&self) {
        let flags = self.relations.outputs();
        let holds = if self.all {
            flags.iter().all(Value::truthy)
        } else {
            flags.iter().any(Value::truthy)
        };
        (self.emit)(Value::Bool(holds));
    }
}

impl ContentHandler for Quantifier {
    fn reset(&self, items: &[Value]) {
        self.relations.reset(items);
        self.publish();
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        self.relations.splice(index, removed, plus);
        self.publish();
    }
}

fn quantifier(collection: Observer, predicate: Observer, all: bool) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let handler = Rc::new_cyclic(|this: &Weak<Quantifier>| {
            let this = this.clone();
            Quantifier {
                relations: Relations::new(
                    Rc::clone(&predicate),
                    scope,
                    Rc::new(move |_: usize, _: &Value, _: &Value| {
                        if let Some(this) = this.upgrade() {
                            this.publish();
                        }
                    }),
                ),
                emit: distinct(Rc::clone(&emit)),
                all,
            }
        });
        let watcher: Rc<dyn ContentHandler> = handler.clone();
        let cancel = watch_content(&collection, scope, watcher);
        Cancel::join([cancel, Cancel::new(move || drop(handler))])
    })
}

/// `collection.every{predicate}`; true for an empty collection.
pub fn every(collection: Observer, predicate: Observer) -> Observer {
    quantifier(collection, predicate, true)
}

/// `collection.some{predicate}`; false for an empty collection.
pub fn some(collection: Observer, predicate: Observer) -> Observer {
    quantifier(collection, predicate, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::testing::{nums, prop, record, scope_with, start};
    use crate::operators::{self, OperatorTable};
    use crate::primitive::{literal, value};

    fn greater_than(n: i32) -> Observer {
        let table = OperatorTable::standard();
        let gt = table.get("greaterThan").expect("greaterThan").func.clone();
        operators::observe(gt, vec![value(), literal(Value::from(n))])
    }

    #[test]
    fn filter_reports_splices_in_output_coordinates() {
        let list = List::from(nums(&[5, 1, 6, 2, 7]));
        let (_root, scope) = scope_with(&list);
        let started = start(&filter(prop("items"), greater_than(4)), &scope);
        let output = started.output();
        assert_eq!(output.to_vec(), nums(&[5, 6, 7]));

        let log = record(&output);
        list.splice(2, 2, nums(&[3, 8, 9]));
        assert_eq!(list.to_vec(), nums(&[5, 1, 3, 8, 9, 7]));
        assert_eq!(output.to_vec(), nums(&[5, 8, 9, 7]));
        assert_eq!(*log.borrow(), vec![(nums(&[8, 9]), nums(&[6]), 1)]);

        list.splice(0, 2, []);
        assert_eq!(output.to_vec(), nums(&[8, 9, 7]));
    }

    #[test]
    fn filter_tracks_predicate_flips() {
        let items: Vec<fbind_core::Object> = (0..3)
            .map(|i| {
                let object = fbind_core::Object::new();
                object.set("id", i);
                object.set("done", false);
                object
            })
            .collect();
        let list: List = items.iter().cloned().map(Value::from).collect();
        let (_root, scope) = scope_with(&list);
        let started = start(&filter(prop("items"), prop("done")), &scope);
        let output = started.output();
        items[2].set("done", true);
        items[0].set("done", true);
        assert_eq!(
            output.to_vec(),
            vec![Value::from(items[0].clone()), Value::from(items[2].clone())]
        );
        items[0].set("done", false);
        assert_eq!(output.to_vec(), vec![Value::from(items[2].clone())]);
    }

    proptest::proptest! {
        #[test]
        fn kept_counts_match_a_linear_count(
            initial in proptest::collection::vec(proptest::bool::ANY, 0..24),
            flips in proptest::collection::vec((0..24usize, proptest::bool::ANY), 0..16),
            cut in 0..24usize,
            removed in 0..6usize,
            inserted in proptest::collection::vec(proptest::bool::ANY, 0..6),
        ) {
            let mut counts = KeptCounts::default();
            let mut naive: Vec<bool> = initial.clone();
            let values = |flags: &[bool]| -> Vec<Value> {
                flags.iter().copied().map(Value::Bool).collect()
            };
            counts.replace(0, usize::MAX, &values(&initial));
            for (index, kept) in flips {
                let changed = naive.get(index).is_some_and(|flag| *flag != kept);
                proptest::prop_assert_eq!(counts.set(index, kept), changed);
                if changed {
                    naive[index] = kept;
                }
            }
            let at = cut.min(naive.len());
            let end = (at + removed).min(naive.len());
            naive.splice(at..end, inserted.iter().copied());
            counts.replace(at, removed, &values(&inserted));
            for end in 0..=naive.len() {
                let expected = naive[..end].iter().filter(|flag| **flag).count();
                proptest::prop_assert_eq!(counts.prefix(end), expected);
            }
        }
    }

    #[test]
    fn every_and_some_follow_content() {
        let list = List::from(nums(&[5, 6]));
        let (_root, scope) = scope_with(&list);
        let all = start(&every(prop("items"), greater_than(4)), &scope);
        let any = start(&some(prop("items"), greater_than(5)), &scope);
        assert_eq!((all.last(), any.last()), (Value::Bool(true), Value::Bool(true)));
        list.splice(1, 1, nums(&[1]));
        assert_eq!((all.last(), any.last()), (Value::Bool(false), Value::Bool(false)));
        list.wipe();
        assert_eq!((all.last(), any.last()), (Value::Bool(true), Value::Bool(false)));
        assert_eq!(
            *all.emitted.borrow(),
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)]
        );
    }
}
