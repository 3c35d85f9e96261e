#![forbid(unsafe_code)]

//! Binders: the write side of an expression.
//!
//! A [`Binder`] is handed a [`Source`] (a subscription already bound to the
//! source's scope) and writes every value the source emits into whatever
//! location the expression denotes in the target scope. Only expressions
//! with a meaningful inverse have binders; the compiler rejects the rest.

use std::rc::Rc;

use fbind_core::Value;

use crate::observer::{Cancel, CancelSlot, Emit, Observer, Scope, observe_args, observe_each};
use crate::operators::InverseFn;
use crate::primitive::key_string;

/// Subscribe to the values to be written.
pub type Source = Rc<dyn Fn(Emit) -> Cancel>;

/// Write a source into the location an expression denotes.
pub type Binder = Rc<dyn Fn(Source, &Scope) -> Cancel>;

/// A [`Source`] that starts `observer` in `scope`.
pub fn source(observer: Observer, scope: Scope) -> Source {
    Rc::new(move |emit: Emit| observer(emit, &scope))
}

/// Follow the binder's location arguments and re-subscribe the source into
/// `write` whenever they change.
fn bind_location(
    args: &[Observer],
    source: Source,
    scope: &Scope,
    write: fn(&Value, &Value, Value),
) -> Cancel {
    let slot = CancelSlot::new();
    let inner = Rc::clone(&slot);
    let upstream = observe_args(args, scope, move |values| {
        let (target, key) = (values[0].clone(), values[1].clone());
        let source = Rc::clone(&source);
        inner.restart(move || source(Rc::new(move |value: Value| write(&target, &key, value))));
    });
    Cancel::join([upstream, slot.handle()])
}

fn assign(target: &Value, key: &Value, value: Value) {
    match target {
        Value::Object(object) => object.set(&key_string(key), value),
        Value::List(list) => match key.as_index() {
            Some(index) => list.set(index, value),
            None => tracing::debug!(%key, "list assignment needs an index"),
        },
        _ => tracing::debug!(kind = target.kind_name(), %key, "assignment into scalar dropped"),
    }
}

fn toggle(collection: &Value, member: &Value, present: Value) {
    let present = present.truthy();
    match collection {
        Value::List(list) => {
            if present {
                if !list.contains(member) {
                    list.push([member.clone()]);
                }
            } else {
                while list.delete(member) {}
            }
        }
        Value::Object(object) => {
            let key = key_string(member);
            if present {
                object.set(&key, true);
            } else {
                object.delete(&key);
            }
        }
        _ => tracing::debug!(kind = collection.kind_name(), "membership toggle on scalar dropped"),
    }
}

/// `object[key] = source`.
pub fn property(object: Observer, key: Observer) -> Binder {
    let args = [object, key];
    Rc::new(move |source: Source, scope: &Scope| bind_location(&args, source, scope, assign))
}

/// `collection.has(value) = source`: truthy adds the member, falsy removes it.
pub fn has(collection: Observer, value: Observer) -> Binder {
    let args = [collection, value];
    Rc::new(move |source: Source, scope: &Scope| bind_location(&args, source, scope, toggle))
}

/// Write through an invertible unary operator.
pub fn invert(inverse: InverseFn, operand: Binder) -> Binder {
    Rc::new(move |source: Source, scope: &Scope| {
        let inverse = Rc::clone(&inverse);
        let mapped: Source = Rc::new(move |emit: Emit| {
            let inverse = Rc::clone(&inverse);
            source(Rc::new(move |value: Value| emit(inverse(&value))))
        });
        operand(mapped, scope)
    })
}

/// `left == right` as a target: whenever the source is truthy, `right`'s value
/// is written into `left`. A falsy source writes nothing.
pub fn equals(left: Binder, right: Observer) -> Binder {
    Rc::new(move |source: Source, scope: &Scope| {
        let right_scope = scope.clone();
        let right = Rc::clone(&right);
        let gated: Source = Rc::new(move |emit: Emit| {
            let flag = Rc::clone(&source);
            let flag: Observer = Rc::new(move |emit: Emit, _: &Scope| flag(emit));
            observe_args(&[flag, Rc::clone(&right)], &right_scope, move |values| {
                if values[0].truthy() {
                    emit(values[1].clone());
                }
            })
        });
        left(gated, scope)
    })
}

/// Bind `body` inside whatever `context` currently evaluates to.
pub fn with(context: Observer, body: Binder) -> Binder {
    Rc::new(move |source: Source, scope: &Scope| {
        let body = Rc::clone(&body);
        observe_each(&context, scope, move |value, scope| {
            body(Rc::clone(&source), &scope.nest(value))
        })
    })
}
