#![forbid(unsafe_code)]

//! Listener bookkeeping shared by [`List`](crate::List) and
//! [`Object`](crate::Object).
//!
//! Every observed entity lazily owns change descriptors: a
//! [`PropertyDescriptor`] per observed property and, for lists, one
//! [`ContentDescriptor`]. A descriptor is created on the first listener
//! registration and dropped again when its last listener is removed.
//!
//! # Invariants
//!
//! 1. Listeners fire in registration order.
//! 2. A listener removed while a dispatch is in flight is not invoked for the
//!    remainder of that dispatch.
//! 3. Removing a listener that was never registered (or already removed) is a
//!    no-op.
//! 4. Nested dispatch depth is bounded by
//!    [`EngineConfig::max_dispatch_depth`](crate::EngineConfig).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Depth limit hit | Listener cycle without an `is_active` check | Policy from [`DepthPolicy`](crate::DepthPolicy) |
//! | Listener panics | User callback | Unwinds through the mutating call |

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{self, DepthPolicy};
use crate::value::Value;

/// Global counter for unique listener ids.
static LISTENER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Called with the property's value (old value before, new value after).
pub type PropertyListener = dyn Fn(&Value);

/// Called with `(added, removed, index)`.
pub type ContentListener = dyn Fn(&[Value], &[Value], usize);

/// Called with `(value, index)` once per affected index.
pub type EachContentListener = dyn Fn(&Value, usize);

/// Called with `(key, value)` whenever an object key is assigned or deleted.
pub type MapChangeListener = dyn Fn(&str, &Value);

struct Entry<F: ?Sized> {
    id: ListenerId,
    live: Rc<Cell<bool>>,
    callback: Rc<F>,
}

/// A listener captured for one dispatch pass.
pub(crate) struct Armed<F: ?Sized> {
    live: Rc<Cell<bool>>,
    callback: Rc<F>,
}

impl<F: ?Sized> Armed<F> {
    /// The callback, unless it was removed after the pass started.
    pub(crate) fn get(&self) -> Option<&F> {
        self.live.get().then_some(&*self.callback)
    }
}

/// Ordered listener set.
pub(crate) struct ListenerList<F: ?Sized> {
    entries: Vec<Entry<F>>,
}

impl<F: ?Sized> Default for ListenerList<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> ListenerList<F> {
    pub(crate) fn add(&mut self, callback: Rc<F>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push(Entry {
            id,
            live: Rc::new(Cell::new(true)),
            callback,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let Some(pos) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        entry.live.set(false);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn arm(&self) -> Vec<Armed<F>> {
        self.entries
            .iter()
            .map(|entry| Armed {
                live: Rc::clone(&entry.live),
                callback: Rc::clone(&entry.callback),
            })
            .collect()
    }
}

/// Before/after listeners for one property.
#[derive(Default)]
pub(crate) struct PropertyDescriptor {
    pub(crate) before: ListenerList<PropertyListener>,
    pub(crate) after: ListenerList<PropertyListener>,
}

impl PropertyDescriptor {
    pub(crate) fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Content listeners of one list.
#[derive(Default)]
pub(crate) struct ContentDescriptor {
    pub(crate) before: ListenerList<ContentListener>,
    pub(crate) after: ListenerList<ContentListener>,
    pub(crate) before_each: ListenerList<EachContentListener>,
    pub(crate) after_each: ListenerList<EachContentListener>,
}

impl ContentDescriptor {
    pub(crate) fn is_empty(&self) -> bool {
        self.before.is_empty()
            && self.after.is_empty()
            && self.before_each.is_empty()
            && self.after_each.is_empty()
    }
}

/// Snapshot of a list's content change descriptor.
///
/// `is_active` is the reentrancy flag: it is true while the list is
/// dispatching its own content change. Listeners that mirror one collection
/// into another check the *other* collection's flag before forwarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentChangeDescriptor {
    pub is_active: bool,
    pub before_content_listeners: usize,
    pub content_listeners: usize,
    pub before_each_content_listeners: usize,
    pub each_content_listeners: usize,
}

impl ContentChangeDescriptor {
    /// Total number of registered content listeners of every flavor.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.before_content_listeners
            + self.content_listeners
            + self.before_each_content_listeners
            + self.each_content_listeners
    }
}

/// Snapshot of one property's change descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyChangeDescriptor {
    pub before_listeners: usize,
    pub listeners: usize,
}

impl PropertyChangeDescriptor {
    pub(crate) fn of(descriptor: Option<&PropertyDescriptor>) -> Self {
        descriptor.map_or_else(Self::default, |d| Self {
            before_listeners: d.before.len(),
            listeners: d.after.len(),
        })
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.before_listeners + self.listeners
    }
}

thread_local! {
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII marker for one level of nested dispatch.
pub(crate) struct DispatchDepth(());

impl DispatchDepth {
    /// Enter a dispatch level, or `None` when the configured limit is reached.
    ///
    /// # Panics
    ///
    /// Panics when the limit is reached and the policy is [`DepthPolicy::Panic`].
    pub(crate) fn enter(entity: &'static str) -> Option<Self> {
        let config = config::current();
        let depth = DISPATCH_DEPTH.with(Cell::get);
        if depth >= config.max_dispatch_depth {
            match config.on_depth_exceeded {
                DepthPolicy::Skip => {
                    tracing::warn!(
                        entity,
                        depth,
                        "dispatch depth limit reached; mutation applied without notification"
                    );
                    return None;
                }
                DepthPolicy::Panic => {
                    panic!("{entity} dispatch depth limit ({depth}) reached; listener cycle?")
                }
            }
        }
        DISPATCH_DEPTH.with(|d| d.set(depth + 1));
        Some(Self(()))
    }
}

impl Drop for DispatchDepth {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
