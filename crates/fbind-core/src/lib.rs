#![forbid(unsafe_code)]

//! Observable values and the change-notification protocol for FrankenBind.
//!
//! This crate provides the mutable state that bindings watch:
//!
//! - [`Value`]: dynamically typed values; containers are shared handles.
//! - [`Object`]: keyed object with per-property before/after listeners.
//! - [`List`]: ordered collection with content, each-content, and `length`
//!   listeners, dispatched in a strict, index-accurate order.
//! - [`ContentChangeDescriptor`]: queryable listener bookkeeping, including
//!   the `is_active` reentrancy flag used to break mirror cycles.
//! - [`EngineConfig`]: per-thread dispatch limits loaded from TOML.
//!
//! # Architecture
//!
//! Containers use `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Listener sets are created lazily per entity and released with their last
//! listener. Dispatch is synchronous: a mutating call returns only after
//! every listener it triggered (transitively) has run.

pub mod change;
pub mod config;
pub mod error;
pub mod list;
pub mod object;
pub mod observe;
pub mod value;

pub use change::{ContentChangeDescriptor, ListenerId, PropertyChangeDescriptor};
pub use config::{DepthPolicy, EngineConfig};
pub use error::{ConfigError, UnobservableTarget};
pub use list::{List, WeakList};
pub use object::{Object, WeakObject};
pub use value::Value;
