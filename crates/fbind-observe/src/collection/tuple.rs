#![forbid(unsafe_code)]

use std::rc::Rc;

use fbind_core::{List, Value};

use crate::observer::{Cancel, Emit, Observer, Scope};

/// `[a, b, ..]`: a fixed-length list whose slots track the argument observers.
pub fn tuple(elements: Vec<Observer>) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let output = List::from(vec![Value::Undefined; elements.len()]);
        let handles: Vec<Cancel> = elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                let target = output.downgrade();
                element(
                    Rc::new(move |value: Value| {
                        if let Some(target) = target.upgrade() {
                            target.set(index, value);
                        }
                    }),
                    scope,
                )
            })
            .collect();
        emit(Value::List(output.clone()));
        Cancel::join(handles.into_iter().chain([Cancel::new(move || drop(output))]))
    })
}
