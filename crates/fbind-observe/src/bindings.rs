#![forbid(unsafe_code)]

//! Binding descriptors installed on a target object.
//!
//! A [`Bindings`] set owns every binding defined on one target. Each binding
//! applies its initial value while it is being defined and keeps propagating
//! until it is cancelled, either through [`Bindings::cancel_all`] or by
//! dropping the set.
//!
//! # Invariants
//!
//! 1. Bindings are installed in declaration order; the most recent
//!    definition's initial write wins on overlapping targets.
//! 2. A two-way binding never echoes a write back into the side it came from.
//! 3. Teardown runs in reverse declaration order.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use fbind_core::{Object, UnobservableTarget, Value};
use serde::Deserialize;

use crate::binder::Source;
use crate::compile::Compiler;
use crate::error::BindError;
use crate::observer::{Cancel, Emit, Observer, Scope};
use crate::operators::{self, OperatorFn};
use crate::syntax::Syntax;

/// How a target is fed.
#[derive(Clone, Deserialize)]
pub enum Descriptor {
    /// `target <- source`
    #[serde(rename = "<-")]
    OneWay(Syntax),
    /// `target <-> source`
    #[serde(rename = "<->")]
    TwoWay(Syntax),
    /// `target <- compute(args..)`
    #[serde(skip_deserializing)]
    Compute { args: Vec<Syntax>, compute: OperatorFn },
}

impl Descriptor {
    /// A computed one-way binding from a plain function.
    pub fn compute(args: Vec<Syntax>, compute: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self::Compute {
            args,
            compute: Rc::new(compute),
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneWay(source) => f.debug_tuple("OneWay").field(source).finish(),
            Self::TwoWay(source) => f.debug_tuple("TwoWay").field(source).finish(),
            Self::Compute { args, .. } => f.debug_struct("Compute").field("args", args).finish(),
        }
    }
}

/// Start `observer`, forwarding only while `syncing` is clear and `ready`
/// (when given) is set. `syncing` is held for the duration of each write.
fn guarded(
    observer: Observer,
    scope: Scope,
    syncing: Rc<Cell<bool>>,
    ready: Option<Rc<Cell<bool>>>,
) -> Source {
    Rc::new(move |emit: Emit| {
        let syncing = Rc::clone(&syncing);
        let ready = ready.clone();
        observer(
            Rc::new(move |value: Value| {
                if syncing.get() || ready.as_ref().is_some_and(|ready| !ready.get()) {
                    return;
                }
                syncing.set(true);
                emit(value);
                syncing.set(false);
            }),
            &scope,
        )
    })
}

struct Installed {
    target: Syntax,
    cancel: Cancel,
}

/// The bindings defined on one target object.
pub struct Bindings {
    target: Object,
    scope: Scope,
    compiler: Compiler,
    installed: Vec<Installed>,
}

impl Bindings {
    /// Bindings on `target`, which must be an object.
    pub fn new(target: impl Into<Value>) -> Result<Self, BindError> {
        match target.into() {
            Value::Object(object) => Ok(Self {
                scope: Scope::new(object.clone()),
                target: object,
                compiler: Compiler::new(),
                installed: Vec::new(),
            }),
            other => Err(UnobservableTarget {
                kind: other.kind_name(),
                key: None,
            }
            .into()),
        }
    }

    /// Create a set and define every `(path, descriptor)` pair in order.
    pub fn create<K: AsRef<str>>(
        target: impl Into<Value>,
        definitions: impl IntoIterator<Item = (K, Descriptor)>,
    ) -> Result<Self, BindError> {
        let mut bindings = Self::new(target)?;
        bindings.define_all(definitions)?;
        Ok(bindings)
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Value observed by `parameters` nodes.
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<Value>) -> Self {
        self.scope.parameters = parameters.into();
        self
    }

    /// Scope both sides of every binding are evaluated in.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope.nest(Value::Object(self.target.clone()));
        self
    }

    #[must_use]
    pub fn target(&self) -> &Object {
        &self.target
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.installed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }

    /// Target expressions of the live bindings, in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = &Syntax> {
        self.installed.iter().map(|installed| &installed.target)
    }

    /// Define bindings whose targets are dotted paths from the target object.
    pub fn define_all<K: AsRef<str>>(
        &mut self,
        definitions: impl IntoIterator<Item = (K, Descriptor)>,
    ) -> Result<(), BindError> {
        for (path, descriptor) in definitions {
            self.define(&Syntax::path(path.as_ref()), descriptor)?;
        }
        Ok(())
    }

    /// Install one binding and apply its initial value.
    ///
    /// Fails without side effects when either side does not compile or a
    /// written side is not invertible.
    pub fn define(&mut self, target: &Syntax, descriptor: Descriptor) -> Result<(), BindError> {
        let cancel = match &descriptor {
            Descriptor::OneWay(source) => {
                let observer = self.compiler.compile(source)?;
                self.bind_one_way(target, observer)?
            }
            Descriptor::Compute { args, compute } => {
                let args = args
                    .iter()
                    .map(|arg| self.compiler.compile(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.bind_one_way(target, operators::observe(Rc::clone(compute), args))?
            }
            Descriptor::TwoWay(source) => self.bind_two_way(target, source)?,
        };
        tracing::debug!(target_kind = %target.kind, ?descriptor, "binding defined");
        self.installed.push(Installed {
            target: target.clone(),
            cancel,
        });
        Ok(())
    }

    fn bind_one_way(&self, target: &Syntax, source: Observer) -> Result<Cancel, BindError> {
        let binder = self.compiler.compile_binder(target)?;
        Ok(binder(crate::binder::source(source, self.scope.clone()), &self.scope))
    }

    fn bind_two_way(&self, target: &Syntax, source: &Syntax) -> Result<Cancel, BindError> {
        let forward = self.compiler.compile_binder(target)?;
        let backward = self.compiler.compile_binder(source)?;
        let source_observer = self.compiler.compile(source)?;
        let target_observer = self.compiler.compile(target)?;

        let syncing = Rc::new(Cell::new(false));
        let ready = Rc::new(Cell::new(false));
        let forward_cancel = forward(
            guarded(source_observer, self.scope.clone(), Rc::clone(&syncing), None),
            &self.scope,
        );
        // the target's current value was just written from the source
        let backward_cancel = backward(
            guarded(target_observer, self.scope.clone(), syncing, Some(Rc::clone(&ready))),
            &self.scope,
        );
        ready.set(true);
        Ok(Cancel::join([backward_cancel, forward_cancel]))
    }

    /// Cancel every binding, most recent first.
    pub fn cancel_all(&mut self) {
        let count = self.installed.len();
        while let Some(mut installed) = self.installed.pop() {
            installed.cancel.cancel();
        }
        if count > 0 {
            tracing::debug!(count, "bindings cancelled");
        }
    }
}

impl Drop for Bindings {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("target", &self.target)
            .field("bindings", &self.installed.len())
            .finish()
    }
}
