#![forbid(unsafe_code)]

//! Observer compiler, collection observers, and bindings for FrankenBind.
//!
//! A parsed binding expression ([`Syntax`]) is compiled into an
//! [`Observer`]: a function that, given an emit callback and a [`Scope`],
//! emits the expression's current value and re-emits whenever anything it
//! depends on changes. Expressions that denote a location (a property, a
//! membership test, an invertible operator) can also be compiled into a
//! [`Binder`] that writes into that location.
//!
//! [`Bindings`] puts both halves together: one-way, two-way, and computed
//! bindings installed on a target [`Object`](fbind_core::Object).
//!
//! # Example
//!
//! ```
//! use fbind_core::{Object, Value};
//! use fbind_observe::{Bindings, Descriptor, Syntax};
//!
//! let object = Object::new();
//! object.set("foo", 10);
//! let definitions = [("bar", Descriptor::OneWay(Syntax::path("foo")))];
//! let bindings = Bindings::create(object.clone(), definitions).expect("valid bindings");
//! object.set("foo", 20);
//! assert_eq!(object.get("bar"), Value::from(20));
//! drop(bindings);
//! ```
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous. Observers are `Rc`
//! closures; cancellation is RAII through [`Cancel`]. Collection observers
//! own a stable output list and keep it current with minimal splices, so a
//! chain of collection observers stays incremental end to end.

pub mod binder;
pub mod bindings;
pub mod collection;
pub mod compile;
pub mod error;
pub mod observer;
pub mod operators;
pub mod primitive;
pub mod reconcile;
pub mod registry;
pub mod syntax;

pub use binder::{Binder, Source};
pub use bindings::{Bindings, Descriptor};
pub use compile::{Compiler, Construct};
pub use error::{BindError, CompileError};
pub use observer::{Cancel, CancelSlot, Emit, Observer, Scope};
pub use operators::{Operator, OperatorFn, OperatorTable};
pub use registry::{ObjectRegistry, Registry};
pub use syntax::{Args, Syntax};
