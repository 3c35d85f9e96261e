#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fbind_core::{List, Value};

use super::{ContentHandler, list_observer, replace_span};
use crate::observer::{Cancel, Observer, Scope};

/// One outer element: where it sits and how many inner values it contributes.
struct Segment {
    index: Cell<usize>,
    len: Cell<usize>,
    cancel: RefCell<Cancel>,
}

struct Flatten {
    this: Weak<Flatten>,
    output: List,
    segments: RefCell<Vec<Rc<Segment>>>,
}

fn contents(value: &Value) -> Vec<Value> {
    value.as_list().map(List::to_vec).unwrap_or_default()
}

impl Flatten {
    fn offset(&self, index: usize) -> usize {
        self.segments.borrow()[..index].iter().map(|s| s.len.get()).sum()
    }

    fn watch(&self, index: usize, value: &Value) -> Rc<Segment> {
        let segment = Rc::new(Segment {
            index: Cell::new(index),
            len: Cell::new(contents(value).len()),
            cancel: RefCell::new(Cancel::noop()),
        });
        if let Value::List(inner) = value {
            let this = self.this.clone();
            let weak_segment = Rc::downgrade(&segment);
            let weak_inner = inner.downgrade();
            let id = inner.add_content_change_listener(move |_, _, _| {
                let (Some(this), Some(segment), Some(inner)) =
                    (this.upgrade(), weak_segment.upgrade(), weak_inner.upgrade())
                else {
                    return;
                };
                this.refill(&segment, &inner.to_vec());
            });
            let inner = inner.downgrade();
            *segment.cancel.borrow_mut() = Cancel::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.remove_content_change_listener(id);
                }
            });
        }
        segment
    }

    /// Re-derive one segment's span of the output from its current inner content.
    fn refill(&self, segment: &Segment, next: &[Value]) {
        let offset = self.offset(segment.index.get());
        let old_len = segment.len.replace(next.len());
        replace_span(&self.output, offset, old_len, next);
    }
}

impl ContentHandler for Flatten {
    fn reset(&self, items: &[Value]) {
        let len = self.segments.borrow().len();
        self.splice(0, len, items);
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        let (offset, stale) = {
            let mut segments = self.segments.borrow_mut();
            let index = index.min(segments.len());
            let end = (index + removed).min(segments.len());
            let offset: usize = segments[..index].iter().map(|s| s.len.get()).sum();
            (offset, segments.drain(index..end).collect::<Vec<_>>())
        };
        let stale_len: usize = stale.iter().map(|s| s.len.get()).sum();
        for segment in &stale {
            segment.cancel.borrow_mut().cancel();
        }
        let fresh: Vec<Rc<Segment>> = plus
            .iter()
            .enumerate()
            .map(|(i, value)| self.watch(index + i, value))
            .collect();
        {
            let mut segments = self.segments.borrow_mut();
            let index = index.min(segments.len());
            segments.splice(index..index, fresh);
            for (position, segment) in segments.iter().enumerate().skip(index) {
                segment.index.set(position);
            }
        }
        let inserted: Vec<Value> = plus.iter().flat_map(contents).collect();
        self.output.splice(offset, stale_len, inserted);
    }
}

impl Drop for Flatten {
    fn drop(&mut self) {
        for segment in self.segments.get_mut().drain(..) {
            segment.cancel.borrow_mut().cancel();
        }
    }
}

/// `collection.flatten()`: inner lists concatenated in outer-then-inner order.
pub fn flatten(collection: Observer) -> Observer {
    list_observer(collection, |output: &List, _: &Scope| {
        Rc::new_cyclic(|this| Flatten {
            this: this.clone(),
            output: output.clone(),
            segments: RefCell::new(Vec::new()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::testing::{nums, prop, record, scope_with, start};

    #[test]
    fn flatten_follows_outer_and_inner_changes() {
        let a = List::from(nums(&[1, 2]));
        let b = List::from(nums(&[3]));
        let outer = List::from(vec![Value::from(a.clone()), Value::from(b.clone())]);
        let (_root, scope) = scope_with(&outer);
        let started = start(&flatten(prop("items")), &scope);
        let output = started.output();
        assert_eq!(output.to_vec(), nums(&[1, 2, 3]));

        let log = record(&output);
        b.push(nums(&[4]));
        assert_eq!(output.to_vec(), nums(&[1, 2, 3, 4]));
        assert_eq!(*log.borrow(), vec![(nums(&[4]), vec![], 3)]);

        a.set(0, Value::from(10));
        assert_eq!(output.to_vec(), nums(&[10, 2, 3, 4]));

        outer.shift();
        assert_eq!(output.to_vec(), nums(&[3, 4]));
        a.push(nums(&[99]));
        assert_eq!(output.to_vec(), nums(&[3, 4]));
        assert_eq!(a.content_change_descriptor().listener_count(), 0);

        outer.unshift([Value::from(5)]);
        assert_eq!(output.to_vec(), nums(&[3, 4]));
    }
}
