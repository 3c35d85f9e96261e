#![forbid(unsafe_code)]

//! FrankenBind public facade.
//!
//! Re-exports the observable state of [`fbind_core`] and the compiler and
//! bindings of [`fbind_observe`]. Most embedders only need the [`prelude`].
//!
//! ```
//! use fbind::prelude::*;
//!
//! let object = Object::new();
//! object.set("foo", 10);
//! let mut bindings = Bindings::new(object.clone()).expect("object target");
//! bindings
//!     .define(&Syntax::path("bar"), Descriptor::TwoWay(Syntax::path("foo")))
//!     .expect("invertible");
//! object.set("bar", 30);
//! assert_eq!(object.get("foo"), Value::from(30));
//! ```

pub use fbind_core as core;
pub use fbind_observe as observe;

pub use fbind_core::{
    ConfigError, DepthPolicy, EngineConfig, List, ListenerId, Object, UnobservableTarget, Value,
};
pub use fbind_observe::{
    BindError, Binder, Bindings, Cancel, CompileError, Compiler, Descriptor, Emit, ObjectRegistry,
    Observer, Operator, OperatorTable, Registry, Scope, Syntax,
};

/// Everything needed to define bindings on plain objects.
pub mod prelude {
    pub use fbind_core::{List, Object, Value};
    pub use fbind_observe::{
        BindError, Bindings, Cancel, CompileError, Compiler, Descriptor, Observer, Scope, Syntax,
    };
}
