#![forbid(unsafe_code)]

use std::rc::{Rc, Weak};

use fbind_core::{List, Value};

use super::relation::Relations;
use super::{ContentHandler, list_observer, reconcile};
use crate::observer::{Observer, Scope};

/// Sort is global: every change re-derives the order and lands as one
/// trimmed splice of the output.
struct SortedBlock {
    output: List,
    relations: Relations,
}

impl SortedBlock {
    fn new(output: &List, by: &Observer, scope: &Scope) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this = this.clone();
            Self {
                output: output.clone(),
                relations: Relations::new(
                    Rc::clone(by),
                    scope,
                    Rc::new(move |_: usize, _: &Value, _: &Value| {
                        if let Some(this) = this.upgrade() {
                            this.resort();
                        }
                    }),
                ),
            }
        })
    }

    fn resort(&self) {
        let inputs = self.relations.inputs();
        let keys = self.relations.outputs();
        let mut order: Vec<usize> = (0..inputs.len()).collect();
        // stable: equal keys keep input order
        order.sort_by(|&a, &b| keys[a].compare(&keys[b]));
        let next: Vec<Value> = order.into_iter().map(|i| inputs[i].clone()).collect();
        reconcile(&self.output, &next);
    }
}

impl ContentHandler for SortedBlock {
    fn reset(&self, items: &[Value]) {
        self.relations.reset(items);
        self.resort();
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        self.relations.splice(index, removed, plus);
        self.resort();
    }
}

/// `collection.sorted{by}`: inputs ordered by their key, stable.
pub fn sorted(collection: Observer, by: Observer) -> Observer {
    list_observer(collection, move |output, scope| SortedBlock::new(output, &by, scope))
}
