#![forbid(unsafe_code)]

//! Observable ordered collection.
//!
//! Every mutation of a [`List`] is funnelled through a single splice-shaped
//! change and dispatched synchronously, in this order:
//!
//! 1. before-`length` listeners (old length), only if the length changes;
//! 2. before-content listeners `(added, removed, index)`;
//! 3. before-each-content listeners, once per affected index, ascending, with
//!    the value currently at that index;
//! 4. the mutation itself;
//! 5. each-content listeners, once per affected index, ascending, with the
//!    value now at that index;
//! 6. content listeners `(added, removed, index)`;
//! 7. `length` listeners (new length), only if the length changed.
//!
//! # Invariants
//!
//! 1. Reported spans are minimal: a splice reports exactly the elements it
//!    removed and inserted at the index where it did so.
//! 2. When the length changes, the affected index range runs from the splice
//!    index to the larger of the old and new lengths; otherwise it covers only
//!    the inserted span.
//! 3. Reorders (`reverse`, `sort`) report one change spanning the whole list
//!    with the full pre-sequence before and the full post-sequence after.
//! 4. [`List::is_active`] is true exactly while the list's own content
//!    dispatch (steps 2 through 6) is on the stack.
//! 5. No `RefCell` borrow of the list is held while a listener or a sort
//!    comparator runs, so both may read and mutate the list reentrantly. A
//!    splice whose range was changed by a before-phase listener is clamped to
//!    the contents it finds; after-phase listeners see what it actually did.
//!
//! # Failure Modes
//!
//! - Out-of-range splice index: clamped to the length.
//! - Out-of-range remove count: clamped to the available tail.
//! - A splice that neither removes nor inserts dispatches nothing.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use crate::change::{
    ContentChangeDescriptor, ContentDescriptor, DispatchDepth, ListenerId,
    PropertyChangeDescriptor, PropertyDescriptor,
};
use crate::value::Value;

#[derive(Default)]
struct ListInner {
    items: Vec<Value>,
    content: Option<Box<ContentDescriptor>>,
    length: Option<Box<PropertyDescriptor>>,
}

#[derive(Default)]
struct ListCell {
    inner: RefCell<ListInner>,
    dispatching: Cell<usize>,
}

/// Shared, observable, ordered collection of [`Value`]s.
///
/// Cloning a `List` clones the handle; all clones observe and mutate the same
/// contents.
#[derive(Clone, Default)]
pub struct List {
    cell: Rc<ListCell>,
}

/// Non-owning handle to a [`List`].
#[derive(Clone, Default)]
pub struct WeakList {
    cell: Weak<ListCell>,
}

impl WeakList {
    #[must_use]
    pub fn upgrade(&self) -> Option<List> {
        self.cell.upgrade().map(|cell| List { cell })
    }
}

/// Values reported to content listeners for one phase.
struct Reported {
    index: usize,
    added: Vec<Value>,
    removed: Vec<Value>,
}

struct Change {
    index: usize,
    span: Range<usize>,
    old_len: usize,
    new_len: usize,
}

/// Marks the list as dispatching for the guard's lifetime.
struct ActiveGuard<'a>(&'a Cell<usize>);

impl<'a> ActiveGuard<'a> {
    fn new(counter: &'a Cell<usize>) -> Self {
        counter.set(counter.get() + 1);
        Self(counter)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl List {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakList {
        WeakList {
            cell: Rc::downgrade(&self.cell),
        }
    }

    /// Whether two handles refer to the same list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cell.inner.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `Undefined` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Value {
        self.cell
            .inner
            .borrow()
            .items
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.cell.inner.borrow().items.clone()
    }

    /// Copy of `range`, clamped to the current length.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Vec<Value> {
        let inner = self.cell.inner.borrow();
        let end = range.end.min(inner.items.len());
        let start = range.start.min(end);
        inner.items[start..end].to_vec()
    }

    /// Whether any element is [`Value::same`] as `value`.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    #[must_use]
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.cell
            .inner
            .borrow()
            .items
            .iter()
            .position(|item| item.same(value))
    }

    /// The reentrancy flag of this list's content change descriptor.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cell.dispatching.get() > 0
    }

    /// Snapshot of the content change descriptor.
    #[must_use]
    pub fn content_change_descriptor(&self) -> ContentChangeDescriptor {
        let inner = self.cell.inner.borrow();
        let mut descriptor = ContentChangeDescriptor {
            is_active: self.is_active(),
            ..ContentChangeDescriptor::default()
        };
        if let Some(content) = inner.content.as_deref() {
            descriptor.before_content_listeners = content.before.len();
            descriptor.content_listeners = content.after.len();
            descriptor.before_each_content_listeners = content.before_each.len();
            descriptor.each_content_listeners = content.after_each.len();
        }
        descriptor
    }

    /// Snapshot of the `length` property change descriptor.
    #[must_use]
    pub fn length_change_descriptor(&self) -> PropertyChangeDescriptor {
        PropertyChangeDescriptor::of(self.cell.inner.borrow().length.as_deref())
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Remove `remove` elements at `index` and insert `plus` in their place.
    ///
    /// Returns the removed elements.
    pub fn splice(
        &self,
        index: usize,
        remove: usize,
        plus: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        let plus: Vec<Value> = plus.into_iter().collect();
        let (index, minus, old_len) = {
            let inner = self.cell.inner.borrow();
            let len = inner.items.len();
            let index = index.min(len);
            let remove = remove.min(len - index);
            (index, inner.items[index..index + remove].to_vec(), len)
        };
        if plus.is_empty() && minus.is_empty() {
            return minus;
        }
        let new_len = old_len - minus.len() + plus.len();
        let span = if new_len == old_len {
            index..index + plus.len()
        } else {
            index..old_len.max(new_len)
        };
        let change = Change {
            index,
            span,
            old_len,
            new_len,
        };
        let removed_len = minus.len();
        let before = Reported {
            index,
            added: plus.clone(),
            removed: minus,
        };
        let after = self.apply(change, before, move |list| {
            let mut inner = list.cell.inner.borrow_mut();
            let len = inner.items.len();
            let start = index.min(len);
            let end = (index + removed_len).min(len);
            let removed = inner.items.splice(start..end, plus.iter().cloned()).collect();
            Reported {
                index: start,
                added: plus,
                removed,
            }
        });
        after.removed
    }

    /// Append values at the end.
    pub fn push(&self, values: impl IntoIterator<Item = Value>) {
        let len = self.len();
        self.splice(len, 0, values);
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.splice(len - 1, 1, []).pop()
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        self.splice(0, 1, []).pop()
    }

    /// Insert values at the front.
    pub fn unshift(&self, values: impl IntoIterator<Item = Value>) {
        self.splice(0, 0, values);
    }

    /// Assign `value` at `index`. Assigning past the end pads with `Undefined`.
    pub fn set(&self, index: usize, value: Value) {
        let len = self.len();
        if index < len {
            if self.get(index).same(&value) {
                return;
            }
            self.splice(index, 1, [value]);
        } else {
            let padding = std::iter::repeat_n(Value::Undefined, index - len);
            self.splice(len, 0, padding.chain([value]));
        }
    }

    /// Remove the first element that is [`Value::same`] as `value`.
    pub fn delete(&self, value: &Value) -> bool {
        match self.index_of(value) {
            Some(index) => {
                self.splice(index, 1, []);
                true
            }
            None => false,
        }
    }

    /// Remove every element.
    pub fn wipe(&self) {
        let len = self.len();
        self.splice(0, len, []);
    }

    /// Replace the whole contents.
    pub fn replace_all(&self, values: impl IntoIterator<Item = Value>) {
        let len = self.len();
        self.splice(0, len, values);
    }

    /// Reverse in place, reported as one whole-list change.
    pub fn reverse(&self) {
        self.reorder(|items| items.reverse());
    }

    /// Stable sort by [`Value::compare`], reported as one whole-list change.
    pub fn sort(&self) {
        self.sort_by(Value::compare);
    }

    /// Stable sort by `compare`, reported as one whole-list change.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.reorder(move |items| items.sort_by(|a, b| compare(a, b)));
    }

    fn reorder(&self, reorder: impl FnOnce(&mut Vec<Value>)) {
        let current = self.to_vec();
        let len = current.len();
        if len == 0 {
            return;
        }
        let change = Change {
            index: 0,
            span: 0..len,
            old_len: len,
            new_len: len,
        };
        let before = Reported {
            index: 0,
            added: current.clone(),
            removed: current,
        };
        self.apply(change, before, |list| {
            let mut items = list.to_vec();
            reorder(&mut items);
            list.cell.inner.borrow_mut().items.clone_from(&items);
            Reported {
                index: 0,
                added: items.clone(),
                removed: items,
            }
        });
    }

    fn apply(
        &self,
        change: Change,
        before: Reported,
        mutate: impl FnOnce(&Self) -> Reported,
    ) -> Reported {
        let Some(_depth) = DispatchDepth::enter("list") else {
            return mutate(self);
        };
        tracing::trace!(
            index = change.index,
            added = before.added.len(),
            removed = before.removed.len(),
            old_len = change.old_len,
            new_len = change.new_len,
            "list content change"
        );
        let length_changes = change.old_len != change.new_len;
        if length_changes {
            self.fire_length(true, change.old_len);
        }

        let active = ActiveGuard::new(&self.cell.dispatching);
        for listener in self.armed(|c| c.before.arm()) {
            if let Some(callback) = listener.get() {
                callback(&before.added, &before.removed, before.index);
            }
        }
        self.fire_each(true, change.span.clone());

        let after = mutate(self);

        self.fire_each(false, change.span.clone());
        for listener in self.armed(|c| c.after.arm()) {
            if let Some(callback) = listener.get() {
                callback(&after.added, &after.removed, after.index);
            }
        }
        drop(active);

        if length_changes {
            self.fire_length(false, self.len());
        }
        after
    }

    fn armed<T>(&self, arm: impl FnOnce(&ContentDescriptor) -> Vec<T>) -> Vec<T> {
        self.cell
            .inner
            .borrow()
            .content
            .as_deref()
            .map(arm)
            .unwrap_or_default()
    }

    fn fire_each(&self, before: bool, span: Range<usize>) {
        let listeners = self.armed(|c| {
            if before {
                c.before_each.arm()
            } else {
                c.after_each.arm()
            }
        });
        if listeners.is_empty() {
            return;
        }
        for index in span {
            let value = self.get(index);
            for listener in &listeners {
                if let Some(callback) = listener.get() {
                    callback(&value, index);
                }
            }
        }
    }

    fn fire_length(&self, before: bool, len: usize) {
        let listeners = self
            .cell
            .inner
            .borrow()
            .length
            .as_deref()
            .map(|d| if before { d.before.arm() } else { d.after.arm() })
            .unwrap_or_default();
        let value = Value::from(len);
        for listener in &listeners {
            if let Some(callback) = listener.get() {
                callback(&value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Listener registration
// ---------------------------------------------------------------------------

impl List {
    fn with_content<R>(&self, f: impl FnOnce(&mut ContentDescriptor) -> R) -> R {
        let mut inner = self.cell.inner.borrow_mut();
        f(inner.content.get_or_insert_with(Box::default))
    }

    fn without_content(&self, f: impl FnOnce(&mut ContentDescriptor) -> bool) {
        let mut inner = self.cell.inner.borrow_mut();
        let empty = match inner.content.as_deref_mut() {
            Some(content) => {
                f(content);
                content.is_empty()
            }
            None => return,
        };
        if empty {
            inner.content = None;
        }
    }

    fn with_length<R>(&self, f: impl FnOnce(&mut PropertyDescriptor) -> R) -> R {
        let mut inner = self.cell.inner.borrow_mut();
        f(inner.length.get_or_insert_with(Box::default))
    }

    fn without_length(&self, f: impl FnOnce(&mut PropertyDescriptor) -> bool) {
        let mut inner = self.cell.inner.borrow_mut();
        let empty = match inner.length.as_deref_mut() {
            Some(length) => {
                f(length);
                length.is_empty()
            }
            None => return,
        };
        if empty {
            inner.length = None;
        }
    }

    /// Called with `(to_add, to_remove, index)` before a content change.
    pub fn add_before_content_change_listener(
        &self,
        listener: impl Fn(&[Value], &[Value], usize) + 'static,
    ) -> ListenerId {
        self.with_content(|c| c.before.add(Rc::new(listener)))
    }

    /// Called with `(added, removed, index)` after a content change.
    pub fn add_content_change_listener(
        &self,
        listener: impl Fn(&[Value], &[Value], usize) + 'static,
    ) -> ListenerId {
        self.with_content(|c| c.after.add(Rc::new(listener)))
    }

    /// Called with `(old_value, index)` for each affected index before a change.
    pub fn add_before_each_content_change_listener(
        &self,
        listener: impl Fn(&Value, usize) + 'static,
    ) -> ListenerId {
        self.with_content(|c| c.before_each.add(Rc::new(listener)))
    }

    /// Called with `(new_value, index)` for each affected index after a change.
    pub fn add_each_content_change_listener(
        &self,
        listener: impl Fn(&Value, usize) + 'static,
    ) -> ListenerId {
        self.with_content(|c| c.after_each.add(Rc::new(listener)))
    }

    pub fn remove_before_content_change_listener(&self, id: ListenerId) {
        self.without_content(|c| c.before.remove(id));
    }

    pub fn remove_content_change_listener(&self, id: ListenerId) {
        self.without_content(|c| c.after.remove(id));
    }

    pub fn remove_before_each_content_change_listener(&self, id: ListenerId) {
        self.without_content(|c| c.before_each.remove(id));
    }

    pub fn remove_each_content_change_listener(&self, id: ListenerId) {
        self.without_content(|c| c.after_each.remove(id));
    }

    /// Called with the old length before a length-changing mutation.
    pub fn add_before_length_change_listener(
        &self,
        listener: impl Fn(&Value) + 'static,
    ) -> ListenerId {
        self.with_length(|d| d.before.add(Rc::new(listener)))
    }

    /// Called with the new length after a length-changing mutation.
    pub fn add_length_change_listener(&self, listener: impl Fn(&Value) + 'static) -> ListenerId {
        self.with_length(|d| d.after.add(Rc::new(listener)))
    }

    pub fn remove_before_length_change_listener(&self, id: ListenerId) {
        self.without_length(|d| d.before.remove(id));
    }

    pub fn remove_length_change_listener(&self, id: ListenerId) {
        self.without_length(|d| d.after.remove(id));
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let list = Self::new();
        list.cell.inner.borrow_mut().items = iter.into_iter().collect();
        list
    }
}

impl From<Vec<Value>> for List {
    fn from(items: Vec<Value>) -> Self {
        items.into_iter().collect()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.inner.try_borrow() {
            Ok(inner) => f.debug_list().entries(inner.items.iter()).finish(),
            Err(_) => f.write_str("[<borrowed>]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[i32]) -> Vec<Value> {
        values.iter().copied().map(Value::from).collect()
    }

    fn record_content(list: &List) -> Rc<RefCell<Vec<(Vec<Value>, Vec<Value>, usize)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        list.add_content_change_listener(move |plus: &[Value], minus: &[Value], index| {
            sink.borrow_mut().push((plus.to_vec(), minus.to_vec(), index));
        });
        log
    }

    #[test]
    fn splice_returns_removed_and_reports_minimal_span() {
        let list = List::from(nums(&[10, 40, 50]));
        let log = record_content(&list);
        assert!(list.splice(1, 0, nums(&[20, 30])).is_empty());
        assert_eq!(list.to_vec(), nums(&[10, 20, 30, 40, 50]));
        assert_eq!(*log.borrow(), vec![(nums(&[20, 30]), vec![], 1)]);
    }

    #[test]
    fn noop_splice_dispatches_nothing() {
        let list = List::from(nums(&[1]));
        let log = record_content(&list);
        list.splice(5, 3, []);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn set_in_place_does_not_touch_length() {
        let list = List::from(nums(&[20, 30, 40]));
        let lengths = Rc::new(Cell::new(0));
        let seen = Rc::clone(&lengths);
        list.add_length_change_listener(move |_| seen.set(seen.get() + 1));
        list.set(0, Value::from(10));
        assert_eq!(list.to_vec(), nums(&[10, 30, 40]));
        assert_eq!(lengths.get(), 0);
    }

    #[test]
    fn set_past_end_pads_with_undefined() {
        let list = List::new();
        list.set(2, Value::from(7));
        assert_eq!(list.to_vec(), vec![Value::Undefined, Value::Undefined, Value::from(7)]);
    }

    #[test]
    fn sort_is_stable_and_reports_full_span() {
        let a = Value::from("a");
        let list = List::from(vec![Value::from(2), a.clone(), Value::from(1)]);
        let log = record_content(&list);
        list.sort();
        assert_eq!(list.to_vec(), vec![Value::from(1), Value::from(2), a]);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].2, 0);
        assert_eq!(log[0].0, list.to_vec());
        assert_eq!(log[0].1, list.to_vec());
    }

    #[test]
    fn before_listener_may_shrink_the_list_under_a_splice() {
        let list = List::from(nums(&[1, 2, 3]));
        let log = record_content(&list);
        let wiped = Rc::new(Cell::new(false));
        let handle = list.downgrade();
        let once = Rc::clone(&wiped);
        list.add_before_content_change_listener(move |_, _, _| {
            if !once.replace(true) {
                if let Some(list) = handle.upgrade() {
                    list.wipe();
                }
            }
        });
        list.push(nums(&[4]));
        assert_eq!(list.to_vec(), nums(&[4]));
        assert_eq!(
            *log.borrow(),
            vec![(vec![], nums(&[1, 2, 3]), 0), (nums(&[4]), vec![], 0)]
        );
        assert!(wiped.get());
    }

    #[test]
    fn clamped_splice_returns_what_it_removed() {
        let list = List::from(nums(&[1, 2, 3]));
        let handle = list.downgrade();
        let shifted = Rc::new(Cell::new(false));
        let once = Rc::clone(&shifted);
        list.add_before_content_change_listener(move |_, _, _| {
            if !once.replace(true) {
                if let Some(list) = handle.upgrade() {
                    list.shift();
                }
            }
        });
        let log = record_content(&list);
        assert_eq!(list.splice(1, 2, []), nums(&[3]));
        assert_eq!(list.to_vec(), nums(&[2]));
        assert_eq!(log.borrow().last(), Some(&(vec![], nums(&[3]), 1)));
    }

    #[test]
    fn sort_comparator_may_read_the_list() {
        let list = List::from(nums(&[3, 1, 2]));
        let other = list.clone();
        list.sort_by(move |a, b| {
            assert_eq!(other.len(), 3);
            assert!(other.contains(a));
            a.compare(b)
        });
        assert_eq!(list.to_vec(), nums(&[1, 2, 3]));
    }

    #[test]
    fn descriptor_is_created_and_dropped_with_listeners() {
        let list = List::new();
        assert_eq!(list.content_change_descriptor().listener_count(), 0);
        let id = list.add_each_content_change_listener(|_, _| {});
        assert_eq!(list.content_change_descriptor().each_content_listeners, 1);
        list.remove_each_content_change_listener(id);
        list.remove_each_content_change_listener(id);
        assert!(list.cell.inner.borrow().content.is_none());
    }

    #[test]
    fn is_active_only_during_own_dispatch() {
        let list = List::new();
        let observed = Rc::new(Cell::new(false));
        let weak = list.downgrade();
        let flag = Rc::clone(&observed);
        list.add_content_change_listener(move |_, _, _| {
            if let Some(list) = weak.upgrade() {
                flag.set(list.is_active());
            }
        });
        list.push([Value::from(1)]);
        assert!(observed.get());
        assert!(!list.is_active());
    }

    #[test]
    fn listener_removed_during_dispatch_does_not_fire() {
        let list = List::new();
        let fired = Rc::new(Cell::new(0));
        let second: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let weak = list.downgrade();
        let victim = Rc::clone(&second);
        list.add_content_change_listener(move |_, _, _| {
            if let (Some(list), Some(id)) = (weak.upgrade(), victim.get()) {
                list.remove_content_change_listener(id);
            }
        });
        let count = Rc::clone(&fired);
        second.set(Some(
            list.add_content_change_listener(move |_, _, _| count.set(count.get() + 1)),
        ));
        list.push([Value::from(1)]);
        assert_eq!(fired.get(), 0);
    }
}

#[cfg(test)]
mod depth_tests {
    use super::*;
    use crate::config::{DepthPolicy, EngineConfig};
    use tracing_test::traced_test;

    fn mirror(from: &List, to: &List) {
        let to = to.downgrade();
        from.add_content_change_listener(move |plus, minus, index| {
            if let Some(to) = to.upgrade() {
                to.splice(index, minus.len(), plus.to_vec());
            }
        });
    }

    #[test]
    #[traced_test]
    fn unguarded_mirror_cycle_stops_at_depth_limit() {
        let previous = EngineConfig {
            max_dispatch_depth: 6,
            on_depth_exceeded: DepthPolicy::Skip,
        }
        .install();
        let foo = List::new();
        let bar = List::new();
        mirror(&foo, &bar);
        mirror(&bar, &foo);
        foo.push([Value::from(1)]);
        previous.install();

        assert!(foo.len() > 1);
        assert!(logs_contain("dispatch depth limit reached"));
    }

    #[test]
    #[should_panic(expected = "dispatch depth limit")]
    fn panic_policy_surfaces_cycles() {
        EngineConfig {
            max_dispatch_depth: 4,
            on_depth_exceeded: DepthPolicy::Panic,
        }
        .install();
        let foo = List::new();
        let bar = List::new();
        mirror(&foo, &bar);
        mirror(&bar, &foo);
        foo.push([Value::from(1)]);
    }
}
