#![forbid(unsafe_code)]

//! Element and component lookup.
//!
//! `element` and `component` nodes resolve names through a [`Registry`]
//! supplied by the embedder (a UI layer, a template instance). The core only
//! needs "watch this name and tell me what it currently refers to".

use std::rc::Rc;

use fbind_core::Object;

use crate::observer::{Cancel, Emit};

/// Named, observable references.
pub trait Registry {
    /// Emit the entry called `name` now and whenever it is replaced.
    ///
    /// Absent entries are reported as `Undefined`.
    fn observe(&self, name: &str, emit: Emit) -> Cancel;
}

/// A [`Registry`] backed by an observable [`Object`]: each key is an entry.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    entries: Object,
}

impl ObjectRegistry {
    #[must_use]
    pub fn new(entries: Object) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &Object {
        &self.entries
    }

    #[must_use]
    pub fn into_shared(self) -> Rc<dyn Registry> {
        Rc::new(self)
    }
}

impl Registry for ObjectRegistry {
    fn observe(&self, name: &str, emit: Emit) -> Cancel {
        if !self.entries.has(name) {
            tracing::debug!(name, "registry entry not present");
        }
        emit(self.entries.get(name));
        let id = self
            .entries
            .add_property_change_listener(name, move |value| emit(value.clone()));
        let entries = self.entries.downgrade();
        let name = name.to_owned();
        Cancel::new(move || {
            if let Some(entries) = entries.upgrade() {
                entries.remove_property_change_listener(&name, id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbind_core::Value;
    use std::cell::RefCell;

    #[test]
    fn replacement_is_reported_until_cancelled() {
        let registry = ObjectRegistry::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let cancel = registry.observe("button", Rc::new(move |v: Value| sink.borrow_mut().push(v)));
        registry.entries().set("button", "ok");
        drop(cancel);
        registry.entries().set("button", "cancel");
        assert_eq!(*seen.borrow(), vec![Value::Undefined, Value::from("ok")]);
        assert_eq!(registry.entries().listener_count(), 0);
    }
}
