#![forbid(unsafe_code)]

//! Context switching and conditional observers.
//!
//! Both are switches: at most one downstream subtree is live at a time, and
//! the previous one is cancelled before the next one starts.

use std::rc::Rc;

use fbind_core::Value;

use crate::observer::{Emit, Observer, Scope, distinct, observe_each};

/// Evaluate `body` with the scope value replaced by whatever `context` emits.
pub fn with(context: Observer, body: Observer) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let body = Rc::clone(&body);
        observe_each(&context, scope, move |value, scope| {
            body(Rc::clone(&emit), &scope.nest(value))
        })
    })
}

/// `condition ? consequent : alternate`; only the selected branch is subscribed.
///
/// The branch is only switched when the condition's truthiness flips.
pub fn condition(condition: Observer, consequent: Observer, alternate: Observer) -> Observer {
    let truthy: Observer = Rc::new(move |emit: Emit, scope: &Scope| {
        let emit = distinct(emit);
        condition(Rc::new(move |value: Value| emit(Value::Bool(value.truthy()))), scope)
    });
    Rc::new(move |emit: Emit, scope: &Scope| {
        let consequent = Rc::clone(&consequent);
        let alternate = Rc::clone(&alternate);
        observe_each(&truthy, scope, move |flag, scope| {
            let branch = if flag.truthy() { &consequent } else { &alternate };
            branch(Rc::clone(&emit), scope)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Cancel;
    use crate::primitive::{literal, property, value};
    use fbind_core::Object;
    use std::cell::{Cell, RefCell};

    fn prop(key: &str) -> Observer {
        property(value(), literal(Value::from(key)))
    }

    fn start(observer: &Observer, scope: &Scope) -> (Cancel, Rc<RefCell<Vec<Value>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let cancel = observer(Rc::new(move |v: Value| sink.borrow_mut().push(v)), scope);
        (cancel, log)
    }

    /// Counts how many times it was started.
    fn counting(value: Value, starts: &Rc<Cell<usize>>) -> Observer {
        let starts = Rc::clone(starts);
        Rc::new(move |emit: Emit, _: &Scope| {
            starts.set(starts.get() + 1);
            emit(value.clone());
            Cancel::noop()
        })
    }

    #[test]
    fn with_rebinds_inside_new_context() {
        let root = Object::new();
        let a = Object::new();
        a.set("name", "a");
        root.set("ctx", a.clone());
        let (_cancel, log) = start(&with(prop("ctx"), prop("name")), &Scope::new(root.clone()));

        let b = Object::new();
        b.set("name", "b");
        root.set("ctx", b.clone());
        a.set("name", "ignored");
        b.set("name", "bb");
        assert_eq!(
            *log.borrow(),
            vec![Value::from("a"), Value::from("b"), Value::from("bb")]
        );
        assert_eq!(a.listener_count(), 0);
    }

    #[test]
    fn condition_switches_only_on_truthiness_flip() {
        let root = Object::new();
        root.set("flag", 1);
        let yes = Rc::new(Cell::new(0));
        let no = Rc::new(Cell::new(0));
        let observer = condition(
            prop("flag"),
            counting(Value::from("yes"), &yes),
            counting(Value::from("no"), &no),
        );
        let (cancel, log) = start(&observer, &Scope::new(root.clone()));
        root.set("flag", 2);
        root.set("flag", 0);
        assert_eq!(*log.borrow(), vec![Value::from("yes"), Value::from("no")]);
        assert_eq!((yes.get(), no.get()), (1, 1));
        drop(cancel);
        assert_eq!(root.listener_count(), 0);
    }
}
