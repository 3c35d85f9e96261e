#![forbid(unsafe_code)]

//! Primitive observers: the atoms every compiled expression bottoms out in.

use std::rc::Rc;

use fbind_core::{Object, Value};

use crate::observer::{Cancel, CancelSlot, Emit, Observer, Scope, distinct, observe_args};
use crate::registry::Registry;

/// Emits `value` once and never again.
pub fn literal(value: Value) -> Observer {
    Rc::new(move |emit: Emit, _: &Scope| {
        emit(value.clone());
        Cancel::noop()
    })
}

/// The scope's value.
pub fn value() -> Observer {
    Rc::new(|emit: Emit, scope: &Scope| {
        emit(scope.value.clone());
        Cancel::noop()
    })
}

/// The scope's parameters.
pub fn parameters() -> Observer {
    Rc::new(|emit: Emit, scope: &Scope| {
        emit(scope.parameters.clone());
        Cancel::noop()
    })
}

fn resolve(
    kind: &'static str,
    registry: Option<&Rc<dyn Registry>>,
    name: &str,
    emit: Emit,
) -> Cancel {
    match registry {
        Some(registry) => registry.observe(name, emit),
        None => {
            tracing::debug!(kind, name, "no registry in scope");
            emit(Value::Undefined);
            Cancel::noop()
        }
    }
}

/// The element registered under `id`.
pub fn element(id: String) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        resolve("element", scope.elements.as_ref(), &id, emit)
    })
}

/// The component registered under `label`.
pub fn component(label: String) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        resolve("component", scope.components.as_ref(), &label, emit)
    })
}

/// An object whose keys track the given observers.
///
/// The object is created once per start and emitted once; later changes
/// update its properties in place.
pub fn record(fields: Vec<(String, Observer)>) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let object = Object::new();
        let handles: Vec<Cancel> = fields
            .iter()
            .map(|(key, field)| {
                let target = object.downgrade();
                let key = key.clone();
                field(
                    Rc::new(move |value: Value| {
                        if let Some(target) = target.upgrade() {
                            target.set(&key, value);
                        }
                    }),
                    scope,
                )
            })
            .collect();
        emit(Value::Object(object.clone()));
        // keep the record alive for as long as the observer runs
        Cancel::join(handles.into_iter().chain([Cancel::new(move || drop(object))]))
    })
}

/// `object[key]`, following both the object and the key.
pub fn property(object: Observer, key: Observer) -> Observer {
    let args = [object, key];
    Rc::new(move |emit: Emit, scope: &Scope| {
        let emit = distinct(emit);
        let slot = CancelSlot::new();
        let inner = Rc::clone(&slot);
        let upstream = observe_args(&args, scope, move |values| {
            let (target, key) = (values[0].clone(), values[1].clone());
            let emit = Rc::clone(&emit);
            inner.restart(move || observe_key(&target, &key, emit));
        });
        Cancel::join([upstream, slot.handle()])
    })
}

/// String form of a property key; numbers print without a fraction.
pub(crate) fn key_string(key: &Value) -> String {
    key.to_string()
}

/// Emit `target[key]` now and after every change of that slot.
///
/// Objects are read by key, lists by index or `length`, strings by
/// `length`. Anything else reads as `Undefined`.
pub(crate) fn observe_key(target: &Value, key: &Value, emit: Emit) -> Cancel {
    match target {
        Value::Object(object) => {
            let key = key_string(key);
            emit(object.get(&key));
            let id = object.add_property_change_listener(&key, move |value| emit(value.clone()));
            let object = object.downgrade();
            Cancel::new(move || {
                if let Some(object) = object.upgrade() {
                    object.remove_property_change_listener(&key, id);
                }
            })
        }
        Value::List(list) if key.as_str() == Some("length") => {
            emit(Value::from(list.len()));
            let id = list.add_length_change_listener(move |len| emit(len.clone()));
            let list = list.downgrade();
            Cancel::new(move || {
                if let Some(list) = list.upgrade() {
                    list.remove_length_change_listener(id);
                }
            })
        }
        Value::List(list) => match key.as_index() {
            Some(index) => {
                emit(list.get(index));
                let weak = list.downgrade();
                let id = list.add_content_change_listener(move |_, _, _| {
                    if let Some(list) = weak.upgrade() {
                        emit(list.get(index));
                    }
                });
                let list = list.downgrade();
                Cancel::new(move || {
                    if let Some(list) = list.upgrade() {
                        list.remove_content_change_listener(id);
                    }
                })
            }
            None => {
                emit(Value::Undefined);
                Cancel::noop()
            }
        },
        Value::String(s) if key.as_str() == Some("length") => {
            emit(Value::from(s.chars().count()));
            Cancel::noop()
        }
        _ => {
            emit(Value::Undefined);
            Cancel::noop()
        }
    }
}
