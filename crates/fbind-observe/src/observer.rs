#![forbid(unsafe_code)]

//! Observer plumbing: emit callbacks, cancellation handles, and scopes.
//!
//! An [`Observer`] is started with an [`Emit`] callback and a [`Scope`]. It
//! emits its current value synchronously before returning, then re-emits on
//! every relevant change until the returned [`Cancel`] is cancelled or
//! dropped.
//!
//! # Invariants
//!
//! 1. Cancelling a [`Cancel`] runs its teardown at most once.
//! 2. A [`CancelSlot`] holds at most one live child: restarting it cancels
//!    the previous child before starting the next.
//! 3. A child started into a slot that was restarted or cancelled while the
//!    child was starting is cancelled immediately.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use fbind_core::Value;

use crate::registry::Registry;

/// Receives every value an observer produces.
pub type Emit = Rc<dyn Fn(Value)>;

/// A compiled expression: start watching and emit into the callback.
pub type Observer = Rc<dyn Fn(Emit, &Scope) -> Cancel>;

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// Idempotent teardown handle. Dropping it cancels.
#[must_use = "dropping a Cancel stops the observer immediately"]
#[derive(Default)]
pub struct Cancel {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Cancel {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Combine several handles; they are cancelled in the given order.
    pub fn join(handles: impl IntoIterator<Item = Cancel>) -> Self {
        let handles: Vec<Cancel> = handles.into_iter().collect();
        Self::new(move || {
            for mut handle in handles {
                handle.cancel();
            }
        })
    }

    /// Run the teardown if it has not run yet.
    pub fn cancel(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.teardown.is_none()
    }
}

impl Drop for Cancel {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancel")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Holder for the one live child of a switching observer.
#[derive(Default)]
pub struct CancelSlot {
    current: RefCell<Cancel>,
    generation: Cell<u64>,
    closed: Cell<bool>,
}

impl CancelSlot {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Cancel the current child, then start and keep a new one.
    pub fn restart(&self, start: impl FnOnce() -> Cancel) {
        if self.closed.get() {
            return;
        }
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let mut previous = self.current.replace(Cancel::noop());
        previous.cancel();
        let mut next = start();
        if self.closed.get() || self.generation.get() != generation {
            next.cancel();
            return;
        }
        let mut stale = self.current.replace(next);
        stale.cancel();
    }

    /// Cancel the current child and refuse further restarts.
    pub fn cancel(&self) {
        self.closed.set(true);
        let mut current = self.current.replace(Cancel::noop());
        current.cancel();
    }

    /// A handle that closes this slot.
    pub fn handle(self: &Rc<Self>) -> Cancel {
        let slot = Rc::clone(self);
        Cancel::new(move || slot.cancel())
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Evaluation context handed to every observer.
#[derive(Clone, Default)]
pub struct Scope {
    /// The value `value` nodes observe.
    pub value: Value,
    /// The value `parameters` nodes observe.
    pub parameters: Value,
    pub elements: Option<Rc<dyn Registry>>,
    pub components: Option<Rc<dyn Registry>>,
}

impl Scope {
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<Value>) -> Self {
        self.parameters = parameters.into();
        self
    }

    #[must_use]
    pub fn with_elements(mut self, registry: Rc<dyn Registry>) -> Self {
        self.elements = Some(registry);
        self
    }

    #[must_use]
    pub fn with_components(mut self, registry: Rc<dyn Registry>) -> Self {
        self.components = Some(registry);
        self
    }

    /// Same parameters and registries, different `value`.
    #[must_use]
    pub fn nest(&self, value: Value) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("value", &self.value)
            .field("parameters", &self.parameters)
            .field("elements", &self.elements.is_some())
            .field("components", &self.components.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Composition helpers
// ---------------------------------------------------------------------------

/// Wrap `emit` so consecutive [`Value::same`] values are forwarded once.
pub fn distinct(emit: Emit) -> Emit {
    let last: RefCell<Option<Value>> = RefCell::new(None);
    Rc::new(move |value: Value| {
        {
            let mut last = last.borrow_mut();
            if last.as_ref().is_some_and(|prev| prev.same(&value)) {
                return;
            }
            *last = Some(value.clone());
        }
        emit(value);
    })
}

/// For every value `source` emits, cancel the previous `each` and start a new one.
pub fn observe_each(
    source: &Observer,
    scope: &Scope,
    each: impl Fn(Value, &Scope) -> Cancel + 'static,
) -> Cancel {
    let slot = CancelSlot::new();
    let inner = Rc::clone(&slot);
    let each_scope = scope.clone();
    let upstream = source(
        Rc::new(move |value: Value| inner.restart(|| each(value, &each_scope))),
        scope,
    );
    Cancel::join([upstream, slot.handle()])
}

/// Observe every argument; call `on_change` with all latest values once every
/// argument has started, and again whenever one of them changes.
pub fn observe_args(
    args: &[Observer],
    scope: &Scope,
    on_change: impl Fn(&[Value]) + 'static,
) -> Cancel {
    let values = Rc::new(RefCell::new(vec![Value::Undefined; args.len()]));
    let ready = Rc::new(Cell::new(false));
    let on_change: Rc<dyn Fn(&[Value])> = Rc::new(on_change);
    let mut handles = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let values = Rc::clone(&values);
        let ready = Rc::clone(&ready);
        let on_change = Rc::clone(&on_change);
        handles.push(arg(
            Rc::new(move |value: Value| {
                {
                    let mut values = values.borrow_mut();
                    if values[index].same(&value) {
                        return;
                    }
                    values[index] = value;
                }
                if ready.get() {
                    let snapshot = values.borrow().clone();
                    on_change(&snapshot);
                }
            }),
            scope,
        ));
    }
    ready.set(true);
    let snapshot = values.borrow().clone();
    on_change(&snapshot);
    Cancel::join(handles)
}

/// Observer that applies `map` to every value `source` emits.
pub fn map_observer(source: Observer, map: impl Fn(Value) -> Value + 'static) -> Observer {
    let map = Rc::new(map);
    Rc::new(move |emit: Emit, scope: &Scope| {
        let map = Rc::clone(&map);
        source(Rc::new(move |value| emit(map(value))), scope)
    })
}
