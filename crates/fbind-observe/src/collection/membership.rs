#![forbid(unsafe_code)]

use std::rc::Rc;

use fbind_core::Value;

use crate::observer::{Cancel, CancelSlot, Emit, Observer, Scope, distinct, observe_args};
use crate::primitive::key_string;

/// Emit whether `collection` holds `value` now and after every change.
///
/// Lists are searched with [`Value::same`]; objects are checked for a key.
fn observe_membership(collection: &Value, value: &Value, emit: Emit) -> Cancel {
    match collection {
        Value::List(list) => {
            emit(Value::Bool(list.contains(value)));
            let weak = list.downgrade();
            let needle = value.clone();
            let id = list.add_content_change_listener(move |_, _, _| {
                if let Some(list) = weak.upgrade() {
                    emit(Value::Bool(list.contains(&needle)));
                }
            });
            let list = list.downgrade();
            Cancel::new(move || {
                if let Some(list) = list.upgrade() {
                    list.remove_content_change_listener(id);
                }
            })
        }
        Value::Object(object) => {
            let key = key_string(value);
            emit(Value::Bool(object.has(&key)));
            let weak = object.downgrade();
            let id = object.add_map_change_listener(move |_, _| {
                if let Some(object) = weak.upgrade() {
                    emit(Value::Bool(object.has(&key)));
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
            emit(Value::Bool(false));
            Cancel::noop()
        }
    }
}

/// `collection.has(value)`.
pub fn has(collection: Observer, value: Observer) -> Observer {
    let args = [collection, value];
    Rc::new(move |emit: Emit, scope: &Scope| {
        let emit = distinct(emit);
        let slot = CancelSlot::new();
        let inner = Rc::clone(&slot);
        let upstream = observe_args(&args, scope, move |values| {
            let (collection, value) = (values[0].clone(), values[1].clone());
            let emit = Rc::clone(&emit);
            inner.restart(move || observe_membership(&collection, &value, emit));
        });
        Cancel::join([upstream, slot.handle()])
    })
}
