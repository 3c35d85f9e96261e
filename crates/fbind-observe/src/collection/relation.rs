#![forbid(unsafe_code)]

//! Per-element relation observers.
//!
//! Block constructs (`mapBlock`, `filterBlock`, `sortedBlock`, ...) evaluate a
//! relation once per input element, with the element as the scope value.
//! [`Relations`] keeps one running relation per element, aligned with the
//! upstream list, and reports later changes of any element's result.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fbind_core::Value;

use crate::observer::{Cancel, Observer, Scope};

/// Called with `(index, old_output, new_output)` when a started relation re-emits.
pub(crate) type OnUpdate = Rc<dyn Fn(usize, &Value, &Value)>;

struct Entry {
    index: Cell<usize>,
    input: Value,
    output: RefCell<Value>,
    started: Cell<bool>,
    cancel: RefCell<Cancel>,
}

pub(crate) struct Relations {
    relation: Observer,
    scope: Scope,
    entries: RefCell<Vec<Rc<Entry>>>,
    on_update: OnUpdate,
}

impl Relations {
    pub(crate) fn new(relation: Observer, scope: &Scope, on_update: OnUpdate) -> Self {
        Self {
            relation,
            scope: scope.clone(),
            entries: RefCell::new(Vec::new()),
            on_update,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn input(&self, index: usize) -> Value {
        self.entries
            .borrow()
            .get(index)
            .map(|entry| entry.input.clone())
            .unwrap_or_default()
    }

    pub(crate) fn inputs(&self) -> Vec<Value> {
        self.entries.borrow().iter().map(|e| e.input.clone()).collect()
    }

    pub(crate) fn outputs(&self) -> Vec<Value> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.output.borrow().clone())
            .collect()
    }

    /// Drop every entry and start relations for `items`. Returns their outputs.
    pub(crate) fn reset(&self, items: &[Value]) -> Vec<Value> {
        let len = self.len();
        self.splice(0, len, items)
    }

    /// Mirror an upstream splice. Returns the outputs of the inserted entries.
    pub(crate) fn splice(&self, index: usize, removed: usize, plus: &[Value]) -> Vec<Value> {
        let stale: Vec<Rc<Entry>> = {
            let mut entries = self.entries.borrow_mut();
            let index = index.min(entries.len());
            let end = (index + removed).min(entries.len());
            entries.drain(index..end).collect()
        };
        for entry in &stale {
            entry.cancel.borrow_mut().cancel();
        }

        let fresh: Vec<Rc<Entry>> = plus
            .iter()
            .enumerate()
            .map(|(offset, input)| self.start(index + offset, input.clone()))
            .collect();
        let outputs = fresh.iter().map(|e| e.output.borrow().clone()).collect();

        let mut entries = self.entries.borrow_mut();
        let index = index.min(entries.len());
        entries.splice(index..index, fresh);
        for (position, entry) in entries.iter().enumerate().skip(index) {
            entry.index.set(position);
        }
        outputs
    }

    fn start(&self, index: usize, input: Value) -> Rc<Entry> {
        let entry = Rc::new(Entry {
            index: Cell::new(index),
            input: input.clone(),
            output: RefCell::new(Value::Undefined),
            started: Cell::new(false),
            cancel: RefCell::new(Cancel::noop()),
        });
        let weak: Weak<Entry> = Rc::downgrade(&entry);
        let on_update = Rc::clone(&self.on_update);
        let cancel = (self.relation)(
            Rc::new(move |value: Value| {
                let Some(entry) = weak.upgrade() else { return };
                let old = entry.output.replace(value.clone());
                if entry.started.get() && !old.same(&value) {
                    on_update(entry.index.get(), &old, &value);
                }
            }),
            &self.scope.nest(input),
        );
        entry.started.set(true);
        *entry.cancel.borrow_mut() = cancel;
        entry
    }
}

impl Drop for Relations {
    fn drop(&mut self) {
        for entry in self.entries.get_mut().drain(..) {
            entry.cancel.borrow_mut().cancel();
        }
    }
}
