#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use fbind_core::Value;

use super::relation::Relations;
use super::{ContentHandler, watch_content};
use crate::observer::{Cancel, Emit, Observer, Scope, distinct};

/// Tracks the input with the least (or greatest) key.
struct Extent {
    relations: Relations,
    emit: Emit,
    wanted: Ordering,
}

impl Extent {
    fn publish(&self) {
        let inputs = self.relations.inputs();
        let keys = self.relations.outputs();
        let mut best: Option<usize> = None;
        for (index, key) in keys.iter().enumerate() {
            // strict comparison: the first of several equal extremes wins
            if best.is_none_or(|b| key.compare(&keys[b]) == self.wanted) {
                best = Some(index);
            }
        }
        (self.emit)(best.map(|i| inputs[i].clone()).unwrap_or_default());
    }
}

impl ContentHandler for Extent {
    fn reset(&self, items: &[Value]) {
        self.relations.reset(items);
        self.publish();
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        self.relations.splice(index, removed, plus);
        self.publish();
    }
}

fn extent(collection: Observer, by: Observer, wanted: Ordering) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let handler = Rc::new_cyclic(|this: &Weak<Extent>| {
            let this = this.clone();
            Extent {
                relations: Relations::new(
                    Rc::clone(&by),
                    scope,
                    Rc::new(move |_: usize, _: &Value, _: &Value| {
                        if let Some(this) = this.upgrade() {
                            this.publish();
                        }
                    }),
                ),
                emit: distinct(Rc::clone(&emit)),
                wanted,
            }
        });
        let cancel = watch_content(
            &collection,
            scope,
            Rc::clone(&handler) as Rc<dyn ContentHandler>,
        );
        Cancel::join([cancel, Cancel::new(move || drop(handler))])
    })
}

/// `collection.min{by}`: the element with the least key, `Undefined` when empty.
pub fn min(collection: Observer, by: Observer) -> Observer {
    extent(collection, by, Ordering::Less)
}

/// `collection.max{by}`: the element with the greatest key, `Undefined` when empty.
pub fn max(collection: Observer, by: Observer) -> Observer {
    extent(collection, by, Ordering::Greater)
}
