#![forbid(unsafe_code)]

use std::rc::{Rc, Weak};

use fbind_core::{List, Value};

use super::relation::Relations;
use super::{ContentHandler, list_observer, reconcile};
use crate::observer::{Observer, Scope};

struct MapBlock {
    output: List,
    relations: Relations,
}

impl MapBlock {
    fn new(output: &List, relation: &Observer, scope: &Scope) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this = this.clone();
            Self {
                output: output.clone(),
                relations: Relations::new(
                    Rc::clone(relation),
                    scope,
                    Rc::new(move |index: usize, _: &Value, new: &Value| {
                        if let Some(this) = this.upgrade() {
                            this.output.set(index, new.clone());
                        }
                    }),
                ),
            }
        })
    }
}

impl ContentHandler for MapBlock {
    fn reset(&self, items: &[Value]) {
        let mapped = self.relations.reset(items);
        reconcile(&self.output, &mapped);
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        let mapped = self.relations.splice(index, removed, plus);
        self.output.splice(index, removed, mapped);
    }
}

/// `collection.map{relation}`: one output element per input element.
pub fn map(collection: Observer, relation: Observer) -> Observer {
    list_observer(collection, move |output, scope| {
        MapBlock::new(output, &relation, scope)
    })
}
