#![forbid(unsafe_code)]

//! Views over an object's own keys, in insertion order.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use fbind_core::{List, Object, Value};

use super::reconcile;
use crate::observer::{Cancel, Emit, Observer, Scope, observe_each};

#[derive(Clone, Copy)]
enum Projection {
    Keys,
    Values,
    Items,
}

/// Rebuilds the output from the current object, reusing item tuples by key.
struct Projector {
    projection: Projection,
    output: List,
    tuples: RefCell<AHashMap<String, List>>,
}

impl Projector {
    fn refresh(&self, object: Option<&Object>) {
        let entries = object.map(Object::entries).unwrap_or_default();
        let next: Vec<Value> = match self.projection {
            Projection::Keys => entries.into_iter().map(|(key, _)| Value::from(key)).collect(),
            Projection::Values => entries.into_iter().map(|(_, value)| value).collect(),
            Projection::Items => {
                let mut tuples = self.tuples.borrow_mut();
                let mut kept = AHashMap::with_capacity(entries.len());
                let next = entries
                    .into_iter()
                    .map(|(key, value)| {
                        let tuple = match tuples.remove(&key) {
                            Some(tuple) => {
                                tuple.set(1, value);
                                tuple
                            }
                            None => List::from(vec![Value::from(key.as_str()), value]),
                        };
                        kept.insert(key, tuple.clone());
                        Value::List(tuple)
                    })
                    .collect();
                *tuples = kept;
                next
            }
        };
        reconcile(&self.output, &next);
    }
}

fn project(object: Observer, projection: Projection) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let projector = Rc::new(Projector {
            projection,
            output: List::new(),
            tuples: RefCell::new(AHashMap::new()),
        });
        let watcher = Rc::clone(&projector);
        let cancel = observe_each(&object, scope, move |value, _| match value {
            Value::Object(object) => {
                watcher.refresh(Some(&object));
                let forward = Rc::clone(&watcher);
                let weak = object.downgrade();
                let id = object.add_map_change_listener(move |_, _| {
                    if let Some(object) = weak.upgrade() {
                        forward.refresh(Some(&object));
                    }
                });
                let object = object.downgrade();
                Cancel::new(move || {
                    if let Some(object) = object.upgrade() {
                        object.remove_map_change_listener(id);
                    }
                })
            }
            _ => {
                watcher.refresh(None);
                Cancel::noop()
            }
        });
        emit(Value::List(projector.output.clone()));
        cancel
    })
}

/// `object.keys()`.
pub fn keys(object: Observer) -> Observer {
    project(object, Projection::Keys)
}

/// `object.values()`.
pub fn values(object: Observer) -> Observer {
    project(object, Projection::Values)
}

/// `object.items()`: `[key, value]` tuples; a tuple is updated in place when
/// only its value changes.
pub fn items(object: Observer) -> Observer {
    project(object, Projection::Items)
}
