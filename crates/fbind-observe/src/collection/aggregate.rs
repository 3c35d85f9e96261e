#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use fbind_core::Value;

use super::{ContentHandler, watch_content};
use crate::observer::{Cancel, Emit, Observer, Scope, distinct};

/// Keeps a replica of the upstream content and re-derives a number from it.
struct Aggregate {
    items: RefCell<Vec<Value>>,
    emit: Emit,
    reduce: fn(&[f64]) -> f64,
}

impl Aggregate {
    fn publish(&self) {
        let numbers: Vec<f64> = self
            .items
            .borrow()
            .iter()
            .filter_map(Value::as_number)
            .collect();
        (self.emit)(Value::Number((self.reduce)(&numbers)));
    }
}

impl ContentHandler for Aggregate {
    fn reset(&self, items: &[Value]) {
        *self.items.borrow_mut() = items.to_vec();
        self.publish();
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        {
            let mut items = self.items.borrow_mut();
            let index = index.min(items.len());
            let end = (index + removed).min(items.len());
            items.splice(index..end, plus.iter().cloned());
        }
        self.publish();
    }
}

fn aggregate(collection: Observer, reduce: fn(&[f64]) -> f64) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let handler = Rc::new(Aggregate {
            items: RefCell::new(Vec::new()),
            emit: distinct(emit),
            reduce,
        });
        watch_content(&collection, scope, handler)
    })
}

/// Total of the numeric elements; other elements are ignored.
pub fn sum(collection: Observer) -> Observer {
    aggregate(collection, |numbers| numbers.iter().sum())
}

/// Mean of the numeric elements; `NaN` when there are none.
pub fn average(collection: Observer) -> Observer {
    aggregate(collection, |numbers| {
        numbers.iter().sum::<f64>() / numbers.len() as f64
    })
}
