#![forbid(unsafe_code)]

//! Index-transforming views: upstream index events are translated, not
//! re-derived.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fbind_core::{List, Value};

use super::{ContentHandler, list_observer, reconcile, replace_span, watch_content};
use crate::observer::{Cancel, Emit, Observer, Scope, observe_args};

// ---------------------------------------------------------------------------
// enumerate
// ---------------------------------------------------------------------------

struct Enumerate {
    output: List,
}

impl Enumerate {
    fn entries(start: usize, items: &[Value]) -> Vec<Value> {
        items
            .iter()
            .enumerate()
            .map(|(offset, item)| {
                Value::List(List::from(vec![Value::from(start + offset), item.clone()]))
            })
            .collect()
    }
}

impl ContentHandler for Enumerate {
    fn reset(&self, items: &[Value]) {
        let len = self.output.len();
        self.output.splice(0, len, Self::entries(0, items));
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        self.output.splice(index, removed, Self::entries(index, plus));
        if removed != plus.len() {
            // entries after the splice moved; renumber them in place
            for position in index + plus.len()..self.output.len() {
                if let Value::List(entry) = self.output.get(position) {
                    entry.set(0, Value::from(position));
                }
            }
        }
    }
}

/// `collection.enumerate()`: `[index, value]` entries.
pub fn enumerate(collection: Observer) -> Observer {
    list_observer(collection, |output, _| {
        Rc::new(Enumerate {
            output: output.clone(),
        })
    })
}

// ---------------------------------------------------------------------------
// reversed
// ---------------------------------------------------------------------------

struct Reversed {
    output: List,
}

impl ContentHandler for Reversed {
    fn reset(&self, items: &[Value]) {
        let next: Vec<Value> = items.iter().rev().cloned().collect();
        reconcile(&self.output, &next);
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        let len = self.output.len();
        let at = len.saturating_sub(index + removed);
        self.output.splice(at, removed, plus.iter().rev().cloned());
    }
}

/// `collection.reversed()`: the upstream in reverse order.
pub fn reversed(collection: Observer) -> Observer {
    list_observer(collection, |output, _| {
        Rc::new(Reversed {
            output: output.clone(),
        })
    })
}

// ---------------------------------------------------------------------------
// range
// ---------------------------------------------------------------------------

/// `range(n)`: `[0, 1, .., n - 1]`, grown and shrunk at the tail.
pub fn range(length: Observer) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let output = List::new();
        let target = output.clone();
        let cancel = length(
            Rc::new(move |value: Value| {
                let wanted = value.as_index().unwrap_or(0);
                let len = target.len();
                if wanted > len {
                    target.push((len..wanted).map(Value::from));
                } else if wanted < len {
                    target.splice(wanted, len - wanted, []);
                }
            }),
            scope,
        );
        emit(Value::List(output));
        cancel
    })
}

// ---------------------------------------------------------------------------
// view
// ---------------------------------------------------------------------------

/// Replica of the upstream plus the visible window.
struct View {
    output: List,
    items: RefCell<Vec<Value>>,
    start: Cell<usize>,
    length: Cell<usize>,
}

impl View {
    fn window(&self) -> Vec<Value> {
        let items = self.items.borrow();
        let end = (self.start.get() + self.length.get()).min(items.len());
        let start = self.start.get().min(end);
        items[start..end].to_vec()
    }

    fn refresh(&self) {
        reconcile(&self.output, &self.window());
    }
}

impl ContentHandler for View {
    fn reset(&self, items: &[Value]) {
        *self.items.borrow_mut() = items.to_vec();
        self.refresh();
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        {
            let mut items = self.items.borrow_mut();
            let index = index.min(items.len());
            let end = (index + removed).min(items.len());
            items.splice(index..end, plus.iter().cloned());
        }
        let start = self.start.get();
        let visible = self.length.get();
        if index >= start + visible {
            return;
        }
        if removed == plus.len() && index >= start {
            // in-place change inside or straddling the window end
            let offset = index - start;
            let span = removed.min(visible - offset);
            replace_span(&self.output, offset, span, &plus[..span]);
            return;
        }
        self.refresh();
    }
}

/// `collection.view(start, length)`: a sliding window over the upstream.
pub fn view(collection: Observer, start: Observer, length: Observer) -> Observer {
    let bounds = [start, length];
    Rc::new(move |emit: Emit, scope: &Scope| {
        let handler = Rc::new(View {
            output: List::new(),
            items: RefCell::new(Vec::new()),
            start: Cell::new(0),
            length: Cell::new(0),
        });
        let window = Rc::clone(&handler);
        let bounds_cancel = observe_args(&bounds, scope, move |values| {
            window.start.set(values[0].as_index().unwrap_or(0));
            window.length.set(values[1].as_index().unwrap_or(0));
            window.refresh();
        });
        let content_cancel = watch_content(
            &collection,
            scope,
            Rc::clone(&handler) as Rc<dyn ContentHandler>,
        );
        emit(Value::List(handler.output.clone()));
        Cancel::join([content_cancel, bounds_cancel])
    })
}
