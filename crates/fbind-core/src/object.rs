#![forbid(unsafe_code)]

//! Observable keyed object.
//!
//! An [`Object`] maps string keys to [`Value`]s in insertion order. Each key
//! can be observed with before/after property change listeners, and the
//! whole object with map change listeners.
//!
//! # Invariants
//!
//! 1. Assigning a value that is [`Value::same`] as the current one is a no-op:
//!    no listener fires.
//! 2. Before-property listeners receive the old value; property listeners
//!    receive the new value, after the assignment is visible.
//! 3. Deleting a key reports `Undefined` as the new value.
//! 4. No borrow of the object is held while a listener runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::change::{
    DispatchDepth, ListenerId, ListenerList, MapChangeListener, PropertyChangeDescriptor,
    PropertyDescriptor,
};
use crate::value::Value;

#[derive(Default)]
struct ObjectInner {
    properties: IndexMap<String, Value>,
    descriptors: AHashMap<String, PropertyDescriptor>,
    map_listeners: ListenerList<MapChangeListener>,
}

/// Shared, observable, keyed object.
#[derive(Clone, Default)]
pub struct Object {
    inner: Rc<RefCell<ObjectInner>>,
}

/// Non-owning handle to an [`Object`].
#[derive(Clone, Default)]
pub struct WeakObject {
    inner: Weak<RefCell<ObjectInner>>,
}

impl WeakObject {
    #[must_use]
    pub fn upgrade(&self) -> Option<Object> {
        self.inner.upgrade().map(|inner| Object { inner })
    }
}

impl Object {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Value at `key`, or `Undefined`.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .borrow()
            .properties
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.inner.borrow().properties.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().properties.keys().cloned().collect()
    }

    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.inner.borrow().properties.values().cloned().collect()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Assign `value` to `key`, notifying listeners if it changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let (present, old) = {
            let inner = self.inner.borrow();
            match inner.properties.get(key) {
                Some(old) => (true, old.clone()),
                None => (false, Value::Undefined),
            }
        };
        if present && old.same(&value) {
            return;
        }
        if !present && value.is_undefined() {
            // The property value is unchanged; only the key set grows.
            self.inner
                .borrow_mut()
                .properties
                .insert(key.to_owned(), Value::Undefined);
            if let Some(_depth) = DispatchDepth::enter("object") {
                self.fire_map(key, &Value::Undefined);
            }
            return;
        }
        self.change(key, &old, move |properties| {
            properties.insert(key.to_owned(), value.clone());
            value
        });
    }

    /// Remove `key`, returning its value. Listeners see `Undefined`.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let old = self.inner.borrow().properties.get(key).cloned()?;
        self.change(key, &old, |properties| {
            properties.shift_remove(key);
            Value::Undefined
        });
        Some(old)
    }

    fn change(
        &self,
        key: &str,
        old: &Value,
        assign: impl FnOnce(&mut IndexMap<String, Value>) -> Value,
    ) {
        let Some(_depth) = DispatchDepth::enter("object") else {
            assign(&mut self.inner.borrow_mut().properties);
            return;
        };
        tracing::trace!(key, "object property change");
        let (before, after) = {
            let inner = self.inner.borrow();
            inner
                .descriptors
                .get(key)
                .map(|d| (d.before.arm(), d.after.arm()))
                .unwrap_or_default()
        };
        for listener in &before {
            if let Some(callback) = listener.get() {
                callback(old);
            }
        }
        let new = assign(&mut self.inner.borrow_mut().properties);
        for listener in &after {
            if let Some(callback) = listener.get() {
                callback(&new);
            }
        }
        self.fire_map(key, &new);
    }

    fn fire_map(&self, key: &str, value: &Value) {
        let map_listeners = self.inner.borrow().map_listeners.arm();
        for listener in &map_listeners {
            if let Some(callback) = listener.get() {
                callback(key, value);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Listener registration
    // -----------------------------------------------------------------------

    fn with_descriptor<R>(&self, key: &str, f: impl FnOnce(&mut PropertyDescriptor) -> R) -> R {
        let mut inner = self.inner.borrow_mut();
        f(inner.descriptors.entry(key.to_owned()).or_default())
    }

    fn without_descriptor(&self, key: &str, f: impl FnOnce(&mut PropertyDescriptor) -> bool) {
        let mut inner = self.inner.borrow_mut();
        let empty = match inner.descriptors.get_mut(key) {
            Some(descriptor) => {
                f(descriptor);
                descriptor.is_empty()
            }
            None => return,
        };
        if empty {
            inner.descriptors.remove(key);
        }
    }

    /// Called with the old value before `key` changes.
    pub fn add_before_property_change_listener(
        &self,
        key: &str,
        listener: impl Fn(&Value) + 'static,
    ) -> ListenerId {
        self.with_descriptor(key, |d| d.before.add(Rc::new(listener)))
    }

    /// Called with the new value after `key` changes.
    pub fn add_property_change_listener(
        &self,
        key: &str,
        listener: impl Fn(&Value) + 'static,
    ) -> ListenerId {
        self.with_descriptor(key, |d| d.after.add(Rc::new(listener)))
    }

    pub fn remove_before_property_change_listener(&self, key: &str, id: ListenerId) {
        self.without_descriptor(key, |d| d.before.remove(id));
    }

    pub fn remove_property_change_listener(&self, key: &str, id: ListenerId) {
        self.without_descriptor(key, |d| d.after.remove(id));
    }

    /// Called with `(key, new_value)` after any key is assigned or deleted.
    pub fn add_map_change_listener(&self, listener: impl Fn(&str, &Value) + 'static) -> ListenerId {
        self.inner.borrow_mut().map_listeners.add(Rc::new(listener))
    }

    pub fn remove_map_change_listener(&self, id: ListenerId) {
        self.inner.borrow_mut().map_listeners.remove(id);
    }

    /// Snapshot of the change descriptor for `key`.
    #[must_use]
    pub fn property_change_descriptor(&self, key: &str) -> PropertyChangeDescriptor {
        PropertyChangeDescriptor::of(self.inner.borrow().descriptors.get(key))
    }

    /// Number of listeners registered on any key, plus map change listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner
            .descriptors
            .values()
            .map(|d| d.before.len() + d.after.len())
            .sum::<usize>()
            + inner.map_listeners.len()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f.debug_map().entries(inner.properties.iter()).finish(),
            Err(_) => f.write_str("{<borrowed>}"),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let object = Self::new();
        object.inner.borrow_mut().properties = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn property_listeners_see_old_then_new() {
        let object = Object::new();
        object.set("bar", 20);
        let log = Rc::new(RefCell::new(Vec::new()));
        let before = Rc::clone(&log);
        object.add_before_property_change_listener("bar", move |v| {
            before.borrow_mut().push(format!("from {v}"));
        });
        let after = Rc::clone(&log);
        let weak = object.downgrade();
        object.add_property_change_listener("bar", move |v| {
            let visible = weak.upgrade().map(|o| o.get("bar")).unwrap_or_default();
            after.borrow_mut().push(format!("to {v} (visible {visible})"));
        });
        object.set("bar", 30);
        assert_eq!(*log.borrow(), vec!["from 20", "to 30 (visible 30)"]);
    }

    #[test]
    fn same_value_assignment_is_silent() {
        let object = Object::new();
        object.set("on", false);
        let fired = Rc::new(Cell::new(0));
        let count = Rc::clone(&fired);
        object.add_property_change_listener("on", move |_| count.set(count.get() + 1));
        object.set("on", false);
        assert_eq!(fired.get(), 0);
        object.set("on", true);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn delete_reports_undefined() {
        let object: Object = [("a", Value::from(1))].into_iter().collect();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        object.add_map_change_listener(move |key, value| {
            sink.borrow_mut().push((key.to_owned(), value.clone()));
        });
        assert_eq!(object.delete("a"), Some(Value::from(1)));
        assert_eq!(object.delete("a"), None);
        assert_eq!(*seen.borrow(), vec![("a".to_owned(), Value::Undefined)]);
        assert!(!object.has("a"));
    }

    #[test]
    fn creating_a_key_with_undefined_notifies_map_listeners_only() {
        let object = Object::new();
        let keys = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&keys);
        object.add_map_change_listener(move |key, _| sink.borrow_mut().push(key.to_owned()));
        let fired = Rc::new(Cell::new(0));
        let count = Rc::clone(&fired);
        object.add_property_change_listener("k", move |_| count.set(count.get() + 1));

        object.set("k", Value::Undefined);
        assert!(object.has("k"));
        assert_eq!(*keys.borrow(), vec!["k"]);
        assert_eq!(fired.get(), 0);

        object.set("k", Value::Undefined);
        assert_eq!(keys.borrow().len(), 1);
    }

    #[test]
    fn removing_last_listener_drops_descriptor() {
        let object = Object::new();
        let id = object.add_property_change_listener("x", |_| {});
        assert_eq!(object.property_change_descriptor("x").listeners, 1);
        object.remove_property_change_listener("x", id);
        object.remove_property_change_listener("x", id);
        object.remove_property_change_listener("never", id);
        assert_eq!(object.listener_count(), 0);
        assert!(object.inner.borrow().descriptors.is_empty());
    }

    #[test]
    fn keys_keep_insertion_order() {
        let object = Object::new();
        object.set("b", 1);
        object.set("a", 2);
        object.set("b", 3);
        assert_eq!(object.keys(), vec!["b", "a"]);
    }
}
